// SPDX-FileCopyrightText: 2026 Ember Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `put`, `pop` and `reap` subcommands.

use std::io::Write;

use ember_config::EmberConfig;
use ember_core::{Algorithm, EmberError};
use ember_storage::Database;
use ember_vault::{Reaper, Vault};
use secrecy::ExposeSecret;
use tokio::io::AsyncReadExt;
use tracing::info;
use zeroize::Zeroizing;

use crate::shutdown;
use crate::transport;

/// Read a secret from stdin, store it and print its token.
///
/// One trailing newline is dropped unless `raw` is set, so
/// `echo secret | ember put` stores `secret`.
pub async fn put(config: &EmberConfig, algorithm: Option<Algorithm>, raw: bool) -> Result<(), EmberError> {
    let limit = config.vault.max_secret_bytes;
    let mut secret = Zeroizing::new(Vec::new());
    // One byte past the limit (plus a newline) is enough to report the size.
    tokio::io::stdin()
        .take(limit as u64 + 2)
        .read_to_end(&mut secret)
        .await
        .map_err(|e| EmberError::Internal(format!("failed to read stdin: {e}")))?;
    if !raw {
        strip_one_newline(&mut secret);
    }

    let db = Database::open_with_config(&config.storage).await?;
    let vault = Vault::new(db, &config.vault);
    let token = match algorithm {
        Some(algorithm) => vault.put(&secret, algorithm).await?,
        None => vault.put_default(&secret).await?,
    };

    println!("{}", transport::encode_token(&token).as_str());
    Ok(())
}

/// Spend a token and write its secret to stdout.
pub async fn pop(config: &EmberConfig, token: &str) -> Result<(), EmberError> {
    let token = transport::decode_token(token)?;
    let db = Database::open_with_config(&config.storage).await?;
    let vault = Vault::new(db, &config.vault);
    let secret = vault.pop(&token).await?;

    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(secret.expose_secret())
        .and_then(|()| stdout.flush())
        .map_err(|e| EmberError::Internal(format!("failed to write secret: {e}")))
}

/// Delete expired secrets once, or keep sweeping until a shutdown signal.
pub async fn reap(config: &EmberConfig, once: bool) -> Result<(), EmberError> {
    let db = Database::open_with_config(&config.storage).await?;
    let reaper = Reaper::new(db.clone(), &config.reaper);

    if once {
        let removed = reaper.sweep().await?;
        println!("{removed}");
        return Ok(());
    }

    if !config.reaper.enabled {
        info!("reaper disabled in configuration, nothing to do");
        return Ok(());
    }

    let cancel = shutdown::install_signal_handler();
    reaper.run(cancel).await;
    db.close().await
}

fn strip_one_newline(buf: &mut Vec<u8>) {
    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    }
}
