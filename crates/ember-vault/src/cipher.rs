// SPDX-FileCopyrightText: 2026 Ember Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The two cipher suites a token can name.
//!
//! [`CipherSuite::EmbeddedKeyAead`] encrypts in process and stores only the
//! sealed blob. [`CipherSuite::StorageManagedPassphrase`] hands plaintext and
//! passphrase to the storage engine's `sym_encrypt` inside the insert, and the
//! passphrase back to `sym_decrypt` inside the locking read. In both cases the
//! key exists only in the token.

use ember_core::{Algorithm, EmberError, Locator};
use ember_storage::engine_cipher;
use ember_storage::queries::secrets::{self, Insert};
use rusqlite::{Connection, Transaction};
use thiserror::Error;
use zeroize::Zeroizing;

use crate::crypto::{self, KEY_LEN};
use crate::token::Token;

/// Random bytes behind a generated passphrase (hex-encoded in the token).
const PASSPHRASE_BYTES: usize = 32;

/// The key material did not open the ciphertext, or could not have.
///
/// Deliberately carries no detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("authentication failed")]
pub struct AuthenticationFailure;

/// A cipher suite with its key material.
pub enum CipherSuite {
    EmbeddedKeyAead { key: Zeroizing<[u8; KEY_LEN]> },
    StorageManagedPassphrase { passphrase: Zeroizing<String> },
}

impl std::fmt::Debug for CipherSuite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CipherSuite")
            .field("algorithm", &self.algorithm())
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// Output of [`CipherSuite::seal`], ready to be written.
pub enum Sealed {
    /// Encrypted in process under `locator`.
    Ciphertext { locator: Locator, blob: Vec<u8> },
    /// To be encrypted by the engine during the insert. Without a locator
    /// the engine draws one.
    InEngine {
        locator: Option<Locator>,
        plaintext: Zeroizing<Vec<u8>>,
        passphrase: Zeroizing<String>,
    },
}

impl Sealed {
    /// Write the record.
    pub fn store(&self, conn: &Connection, retention_secs: u64) -> rusqlite::Result<Insert> {
        match self {
            Sealed::Ciphertext { locator, blob } => secrets::insert_sealed(
                conn,
                locator,
                Algorithm::EmbeddedKeyAead,
                blob,
                retention_secs,
            ),
            Sealed::InEngine {
                locator,
                plaintext,
                passphrase,
            } => secrets::insert_engine_sealed(
                conn,
                locator.as_ref(),
                plaintext,
                passphrase,
                retention_secs,
            ),
        }
    }
}

/// Outcome of a locked read-and-decrypt.
pub enum Unsealed {
    /// No live record at the locator.
    Missing,
    /// A record exists but the key does not open it.
    Rejected,
    Revealed {
        id: i64,
        plaintext: Zeroizing<Vec<u8>>,
    },
}

impl CipherSuite {
    /// Fresh key material for `algorithm`.
    pub fn generate(algorithm: Algorithm) -> Result<Self, EmberError> {
        match algorithm {
            Algorithm::EmbeddedKeyAead => Ok(Self::EmbeddedKeyAead {
                key: crypto::generate_key()?,
            }),
            Algorithm::StorageManagedPassphrase => {
                let bytes = Zeroizing::new(crypto::random_array::<PASSPHRASE_BYTES>()?);
                Ok(Self::StorageManagedPassphrase {
                    passphrase: Zeroizing::new(hex::encode(bytes.as_slice())),
                })
            }
        }
    }

    /// Recover the suite named by a parsed token.
    ///
    /// Key material that could never open a record fails here, before any
    /// storage access: an empty key, an AEAD key that is not 32 bytes, or a
    /// passphrase that is not UTF-8.
    pub fn from_token(token: &Token) -> Result<Self, AuthenticationFailure> {
        if token.key.is_empty() {
            return Err(AuthenticationFailure);
        }
        match token.algorithm {
            Algorithm::EmbeddedKeyAead => {
                let key: [u8; KEY_LEN] = token
                    .key
                    .as_slice()
                    .try_into()
                    .map_err(|_| AuthenticationFailure)?;
                Ok(Self::EmbeddedKeyAead {
                    key: Zeroizing::new(key),
                })
            }
            Algorithm::StorageManagedPassphrase => {
                let passphrase = std::str::from_utf8(&token.key).map_err(|_| AuthenticationFailure)?;
                Ok(Self::StorageManagedPassphrase {
                    passphrase: Zeroizing::new(passphrase.to_string()),
                })
            }
        }
    }

    pub fn algorithm(&self) -> Algorithm {
        match self {
            Self::EmbeddedKeyAead { .. } => Algorithm::EmbeddedKeyAead,
            Self::StorageManagedPassphrase { .. } => Algorithm::StorageManagedPassphrase,
        }
    }

    /// Key bytes as they appear in a token.
    pub fn key_bytes(&self) -> Zeroizing<Vec<u8>> {
        match self {
            Self::EmbeddedKeyAead { key } => Zeroizing::new(key.to_vec()),
            Self::StorageManagedPassphrase { passphrase } => {
                Zeroizing::new(passphrase.as_bytes().to_vec())
            }
        }
    }

    /// Build the token for a record stored at `locator`.
    pub fn token(&self, locator: Locator) -> Token {
        Token {
            algorithm: self.algorithm(),
            locator,
            key: self.key_bytes(),
        }
    }

    /// Prepare `plaintext` for storage under a fresh random locator.
    pub fn seal(&self, plaintext: &[u8]) -> Result<Sealed, EmberError> {
        self.seal_at(plaintext, None)
    }

    /// Prepare `plaintext` for storage at `locator`, or at a fresh random one.
    pub(crate) fn seal_at(&self, plaintext: &[u8], locator: Option<Locator>) -> Result<Sealed, EmberError> {
        match self {
            Self::EmbeddedKeyAead { key } => {
                let locator = match locator {
                    Some(locator) => locator,
                    None => crypto::generate_locator()?,
                };
                let blob = crypto::seal(key, &locator, plaintext)?;
                Ok(Sealed::Ciphertext { locator, blob })
            }
            Self::StorageManagedPassphrase { passphrase } => Ok(Sealed::InEngine {
                locator,
                plaintext: Zeroizing::new(plaintext.to_vec()),
                passphrase: passphrase.clone(),
            }),
        }
    }

    /// Decrypt a stored blob in process.
    pub fn decrypt(&self, locator: &Locator, blob: &[u8]) -> Result<Zeroizing<Vec<u8>>, AuthenticationFailure> {
        let opened = match self {
            Self::EmbeddedKeyAead { key } => crypto::open(key, locator, blob),
            Self::StorageManagedPassphrase { passphrase } => {
                engine_cipher::open(passphrase.as_bytes(), blob)
            }
        };
        opened.ok_or(AuthenticationFailure)
    }

    /// Read the record at `locator` under the transaction's write lock and
    /// decrypt it. Nothing is deleted here. A record sealed by the other suite
    /// is `Rejected` without being decrypted.
    pub fn unseal(&self, tx: &Transaction<'_>, locator: &Locator) -> rusqlite::Result<Unsealed> {
        match self {
            Self::EmbeddedKeyAead { .. } => {
                let Some(record) = secrets::lock_by_locator(tx, locator)? else {
                    return Ok(Unsealed::Missing);
                };
                if record.algorithm != self.algorithm() {
                    return Ok(Unsealed::Rejected);
                }
                Ok(match self.decrypt(&record.locator, &record.ciphertext) {
                    Ok(plaintext) => Unsealed::Revealed {
                        id: record.id,
                        plaintext,
                    },
                    Err(AuthenticationFailure) => Unsealed::Rejected,
                })
            }
            Self::StorageManagedPassphrase { passphrase } => {
                Ok(match secrets::lock_and_unseal(tx, locator, passphrase)? {
                    None => Unsealed::Missing,
                    Some((_, None)) => Unsealed::Rejected,
                    Some((id, Some(plaintext))) => Unsealed::Revealed {
                        id,
                        plaintext: Zeroizing::new(plaintext),
                    },
                })
            }
        }
    }
}
