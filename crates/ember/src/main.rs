// SPDX-FileCopyrightText: 2026 Ember Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ember - one-time secrets from the command line.
//!
//! `ember put` stores stdin and prints a token, `ember pop <TOKEN>` prints the
//! secret once, `ember reap` deletes secrets that were never collected.

mod commands;
mod shutdown;
mod transport;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use ember_core::Algorithm;
use tracing::error;

/// Ember - store a secret, hand out a token, reveal it once.
#[derive(Parser, Debug)]
#[command(name = "ember", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Store a secret read from stdin and print its one-time token.
    Put {
        /// Cipher suite: `xchacha20poly1305` or `passphrase`.
        /// Defaults to `vault.default_algorithm`.
        #[arg(long)]
        algorithm: Option<Algorithm>,

        /// Keep a trailing newline instead of stripping it.
        #[arg(long)]
        raw: bool,
    },
    /// Reveal and destroy the secret behind a token.
    Pop {
        /// Token printed by `ember put`.
        token: String,
    },
    /// Delete expired secrets.
    Reap {
        /// Sweep once, print the number removed and exit.
        #[arg(long)]
        once: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => ember_config::load_and_validate_path(path),
        None => ember_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            ember_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.log.level);

    let result = match cli.command {
        Commands::Put { algorithm, raw } => commands::put(&config, algorithm, raw).await,
        Commands::Pop { token } => commands::pop(&config, &token).await,
        Commands::Reap { once } => commands::reap(&config, once).await,
    };

    if let Err(e) = result {
        // Full detail goes to the log; the requester only sees the client message.
        error!(error = %e, "command failed");
        eprintln!("ember: {}", e.client_message());
        std::process::exit(if e.is_not_found() { 2 } else { 1 });
    }
}

/// Initialize the tracing subscriber. `RUST_LOG` overrides `log.level`.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "ember={log_level},ember_vault={log_level},ember_storage={log_level},warn"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn put_accepts_algorithm_names() {
        let cli = Cli::try_parse_from(["ember", "put", "--algorithm", "passphrase"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Put {
                algorithm: Some(Algorithm::StorageManagedPassphrase),
                raw: false
            }
        ));
        assert!(Cli::try_parse_from(["ember", "put", "--algorithm", "rot13"]).is_err());
    }

    #[test]
    fn config_flag_is_global() {
        let cli = Cli::try_parse_from(["ember", "reap", "--once", "--config", "/tmp/e.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/e.toml")));
        assert!(matches!(cli.command, Commands::Reap { once: true }));
    }
}
