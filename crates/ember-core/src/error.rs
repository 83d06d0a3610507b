// SPDX-FileCopyrightText: 2026 Ember Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Ember secret vault.

use thiserror::Error;

/// The primary error type returned by the vault, storage, and reaper.
///
/// `NotFound` deliberately covers both a missing record and a failed
/// decryption. Callers must not try to tell the two apart.
#[derive(Debug, Error)]
pub enum EmberError {
    /// Configuration errors (invalid TOML, out-of-range values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Token is structurally invalid (too short to carry a locator).
    #[error("malformed token")]
    MalformedToken,

    /// Token carries a version byte this build does not understand.
    #[error("unsupported token version {0}")]
    UnsupportedVersion(u8),

    /// Token or request names an algorithm tag with no cipher behind it.
    #[error("unknown algorithm tag {0}")]
    UnknownAlgorithm(u8),

    /// No live secret at the locator, or the token failed to decrypt it.
    #[error("secret not found")]
    NotFound,

    /// Secret exceeds the configured size limit.
    #[error("secret is {size} bytes, limit is {limit}")]
    SecretTooLarge { size: usize, limit: usize },

    /// Storage backend errors (connection, query failure, write collision).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Randomness or sealing failure while creating a secret.
    #[error("encryption error: {0}")]
    Encryption(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl EmberError {
    /// Returns true for the merged missing-or-undecryptable outcome.
    pub fn is_not_found(&self) -> bool {
        matches!(self, EmberError::NotFound)
    }

    /// The only text that may be shown to whoever presented the token.
    ///
    /// Internal detail (SQL errors, cipher diagnostics) never leaves the
    /// process through this path.
    pub fn client_message(&self) -> &'static str {
        match self {
            EmberError::NotFound => "not found",
            EmberError::MalformedToken
            | EmberError::UnsupportedVersion(_)
            | EmberError::UnknownAlgorithm(_)
            | EmberError::SecretTooLarge { .. } => "bad request",
            EmberError::Config(_)
            | EmberError::Storage { .. }
            | EmberError::Encryption(_)
            | EmberError::Internal(_) => "internal error",
        }
    }
}
