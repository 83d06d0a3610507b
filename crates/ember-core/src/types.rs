// SPDX-FileCopyrightText: 2026 Ember Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared by the vault and the storage layer.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::EmberError;

/// Length in bytes of a record locator.
pub const LOCATOR_LEN: usize = 16;

/// Cipher suite selector carried in byte 1 of every token.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(ascii_case_insensitive)]
#[repr(u8)]
pub enum Algorithm {
    /// Passphrase handed to the storage engine's own cipher. Kept for tokens
    /// issued before the embedded-key suite existed.
    #[strum(serialize = "passphrase")]
    #[serde(rename = "passphrase")]
    StorageManagedPassphrase = 0,

    /// XChaCha20-Poly1305 with the key carried only in the token.
    #[strum(serialize = "xchacha20poly1305")]
    #[serde(rename = "xchacha20poly1305")]
    EmbeddedKeyAead = 1,
}

impl Algorithm {
    /// Wire tag for this algorithm.
    pub const fn tag(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for Algorithm {
    type Error = EmberError;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        match tag {
            0 => Ok(Algorithm::StorageManagedPassphrase),
            1 => Ok(Algorithm::EmbeddedKeyAead),
            other => Err(EmberError::UnknownAlgorithm(other)),
        }
    }
}

/// Random 128-bit name of a stored record.
///
/// Doubles as the lookup key and as associated data for the embedded-key
/// cipher, so a ciphertext only opens under the locator it was written to.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Locator(pub [u8; LOCATOR_LEN]);

impl Locator {
    /// Build a locator from exactly [`LOCATOR_LEN`] bytes.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        bytes.try_into().ok().map(Locator)
    }

    pub fn as_bytes(&self) -> &[u8; LOCATOR_LEN] {
        &self.0
    }
}

impl fmt::Debug for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Locator({})", hex::encode(self.0))
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// A stored secret as read back under lock.
///
/// `ciphertext` is opaque to the storage layer; `algorithm` is the suite it was
/// sealed with; `expires_at` is an ISO-8601 UTC timestamp written by SQLite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretRecord {
    pub id: i64,
    pub locator: Locator,
    pub algorithm: Algorithm,
    pub ciphertext: Vec<u8>,
    pub expires_at: String,
}
