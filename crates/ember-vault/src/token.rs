// SPDX-FileCopyrightText: 2026 Ember Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Capability token wire format.
//!
//! ```text
//! byte 0      version (1)
//! byte 1      algorithm tag
//! bytes 2-17  locator
//! bytes 18..  key material, to the end of the input
//! ```
//!
//! Parsing is purely structural. A token that parses may still fail to open
//! its record.

use ember_core::{Algorithm, EmberError, LOCATOR_LEN, Locator};
use zeroize::Zeroizing;

/// The only wire version this build reads or writes.
pub const TOKEN_VERSION: u8 = 1;

/// Bytes before the key material.
pub const HEADER_LEN: usize = 2 + LOCATOR_LEN;

/// A parsed capability token.
#[derive(Clone, PartialEq, Eq)]
pub struct Token {
    pub algorithm: Algorithm,
    pub locator: Locator,
    /// Raw AEAD key or UTF-8 passphrase, depending on `algorithm`.
    pub key: Zeroizing<Vec<u8>>,
}

impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Token")
            .field("algorithm", &self.algorithm)
            .field("locator", &self.locator)
            .field("key", &"[REDACTED]")
            .finish()
    }
}

impl Token {
    /// Encode to wire bytes. The result holds key material.
    pub fn pack(&self) -> Zeroizing<Vec<u8>> {
        let mut out = Zeroizing::new(Vec::with_capacity(HEADER_LEN + self.key.len()));
        out.push(TOKEN_VERSION);
        out.push(self.algorithm.tag());
        out.extend_from_slice(self.locator.as_bytes());
        out.extend_from_slice(&self.key);
        out
    }

    /// Decode wire bytes.
    ///
    /// Length is checked before version, so a short input is always
    /// `MalformedToken`. A zero-length key is accepted here.
    pub fn parse(bytes: &[u8]) -> Result<Self, EmberError> {
        if bytes.len() < HEADER_LEN {
            return Err(EmberError::MalformedToken);
        }
        if bytes[0] != TOKEN_VERSION {
            return Err(EmberError::UnsupportedVersion(bytes[0]));
        }
        let algorithm = Algorithm::try_from(bytes[1])?;
        let locator = Locator::from_slice(&bytes[2..HEADER_LEN]).ok_or(EmberError::MalformedToken)?;
        Ok(Self {
            algorithm,
            locator,
            key: Zeroizing::new(bytes[HEADER_LEN..].to_vec()),
        })
    }
}
