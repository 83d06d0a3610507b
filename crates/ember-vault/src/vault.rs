// SPDX-FileCopyrightText: 2026 Ember Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One-time secret storage: `put` returns a token, `pop` spends it.
//!
//! `pop` takes the database write lock, decrypts, and deletes the record in
//! the same transaction. The delete is committed only after decryption
//! succeeded, so a bad token can never destroy a record and two holders of a
//! good token cannot both read it. There is no in-process locking; several
//! `Vault`s (or processes) on one database file are serialized by SQLite.

use ember_config::model::VaultConfig;
use ember_core::{Algorithm, EmberError, Locator};
use ember_storage::{Database, engine_cipher};
use ember_storage::database::map_tr_err;
use ember_storage::queries::secrets::{self, Insert};
use secrecy::SecretSlice;
use tracing::{debug, warn};
use zeroize::Zeroizing;

use crate::cipher::{CipherSuite, Unsealed};
use crate::token::Token;

/// Insert attempts before a locator collision is reported as a storage error.
const MAX_PUT_ATTEMPTS: u32 = 3;

/// Handle for storing and retrieving one-time secrets.
#[derive(Clone)]
pub struct Vault {
    db: Database,
    retention_secs: u64,
    max_secret_bytes: usize,
    default_algorithm: Algorithm,
}

impl std::fmt::Debug for Vault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vault")
            .field("retention_secs", &self.retention_secs)
            .field("max_secret_bytes", &self.max_secret_bytes)
            .field("default_algorithm", &self.default_algorithm)
            .finish_non_exhaustive()
    }
}

impl Vault {
    pub fn new(db: Database, config: &VaultConfig) -> Self {
        Self {
            db,
            retention_secs: config.retention_secs,
            max_secret_bytes: config.max_secret_bytes,
            default_algorithm: config.default_algorithm,
        }
    }

    pub fn default_algorithm(&self) -> Algorithm {
        self.default_algorithm
    }

    /// Store `secret` with the configured default algorithm.
    pub async fn put_default(&self, secret: &[u8]) -> Result<Zeroizing<Vec<u8>>, EmberError> {
        self.put(secret, self.default_algorithm).await
    }

    /// Encrypt and store `secret`, returning the packed token.
    ///
    /// The token is the only copy of the key. A locator collision is retried
    /// with a fresh locator (and, for the AEAD suite, a fresh ciphertext since
    /// the locator is authenticated).
    pub async fn put(&self, secret: &[u8], algorithm: Algorithm) -> Result<Zeroizing<Vec<u8>>, EmberError> {
        self.put_with_locators(secret, algorithm, &[]).await
    }

    /// [`put`](Self::put), with attempt `n` stored at `pinned[n]` when given
    /// and at a random locator otherwise.
    pub(crate) async fn put_with_locators(
        &self,
        secret: &[u8],
        algorithm: Algorithm,
        pinned: &[Locator],
    ) -> Result<Zeroizing<Vec<u8>>, EmberError> {
        if secret.len() > self.max_secret_bytes {
            return Err(EmberError::SecretTooLarge {
                size: secret.len(),
                limit: self.max_secret_bytes,
            });
        }

        let suite = CipherSuite::generate(algorithm)?;
        let retention_secs = self.retention_secs;

        for attempt in 1..=MAX_PUT_ATTEMPTS {
            let locator = pinned.get(attempt as usize - 1).copied();
            let sealed = suite.seal_at(secret, locator)?;
            let inserted = self
                .db
                .connection()
                .call(move |conn| Ok::<_, rusqlite::Error>(sealed.store(conn, retention_secs)))
                .await
                .map_err(map_tr_err)?
                .map_err(store_error)?;

            match inserted {
                Insert::Stored(locator) => {
                    debug!(%locator, %algorithm, size = secret.len(), "secret stored");
                    return Ok(suite.token(locator).pack());
                }
                Insert::Collision => {
                    warn!(attempt, %algorithm, "locator collision, retrying with a new locator");
                }
            }
        }

        Err(EmberError::Storage {
            source: format!("locator collision persisted after {MAX_PUT_ATTEMPTS} attempts").into(),
        })
    }

    /// Spend a token: return its secret and destroy the record.
    ///
    /// A missing record, an expired one, and a key that does not decrypt all
    /// yield [`EmberError::NotFound`]. In the latter case the record is left
    /// untouched.
    pub async fn pop(&self, token_bytes: &[u8]) -> Result<SecretSlice<u8>, EmberError> {
        let token = Token::parse(token_bytes)?;
        let locator = token.locator;
        let Ok(suite) = CipherSuite::from_token(&token) else {
            debug!(%locator, algorithm = %token.algorithm, "pop rejected: unusable key material");
            return Err(EmberError::NotFound);
        };
        drop(token);

        let outcome = self
            .db
            .connection()
            .call(move |conn| -> Result<Unsealed, rusqlite::Error> {
                let tx = secrets::begin_locked(conn)?;
                let outcome = suite.unseal(&tx, &locator)?;
                match &outcome {
                    Unsealed::Revealed { id, .. } => {
                        secrets::delete_by_id(&tx, *id)?;
                        tx.commit()?;
                    }
                    Unsealed::Missing | Unsealed::Rejected => tx.rollback()?,
                }
                Ok(outcome)
            })
            .await
            .map_err(map_tr_err)?;

        match outcome {
            Unsealed::Revealed { id, mut plaintext } => {
                debug!(%locator, id, "secret revealed and destroyed");
                Ok(SecretSlice::from(std::mem::take(&mut *plaintext)))
            }
            Unsealed::Missing => {
                debug!(%locator, "pop missed: no live record");
                Err(EmberError::NotFound)
            }
            Unsealed::Rejected => {
                debug!(%locator, "pop rejected: decryption failed, record kept");
                Err(EmberError::NotFound)
            }
        }
    }
}

/// Engine-side encryption failures keep their kind; the rest is storage.
fn store_error(e: rusqlite::Error) -> EmberError {
    engine_cipher::take_failure(e).unwrap_or_else(|e| EmberError::Storage {
        source: Box::new(e),
    })
}
