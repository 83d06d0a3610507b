// SPDX-FileCopyrightText: 2026 Ember Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! XChaCha20-Poly1305 seal/open bound to a locator, plus CSPRNG helpers.
//!
//! Sealed blobs are `nonce (24) || ciphertext || tag (16)`. Every seal draws a
//! fresh 192-bit nonce, so random nonces are safe for the lifetime of a key.

use chacha20poly1305::aead::{Aead, Payload};
use chacha20poly1305::{Key, KeyInit, XChaCha20Poly1305, XNonce};
use ember_core::{EmberError, LOCATOR_LEN, Locator};
use ring::rand::{SecureRandom, SystemRandom};
use zeroize::Zeroizing;

pub const KEY_LEN: usize = 32;
pub const NONCE_LEN: usize = 24;
pub const TAG_LEN: usize = 16;

/// Fill a fixed-size array from the system CSPRNG.
pub fn random_array<const N: usize>() -> Result<[u8; N], EmberError> {
    let mut buf = [0u8; N];
    SystemRandom::new()
        .fill(&mut buf)
        .map_err(|_| EmberError::Encryption("system random source failed".to_string()))?;
    Ok(buf)
}

/// Generate a fresh 256-bit key.
pub fn generate_key() -> Result<Zeroizing<[u8; KEY_LEN]>, EmberError> {
    random_array().map(Zeroizing::new)
}

/// Generate a fresh record locator.
pub fn generate_locator() -> Result<Locator, EmberError> {
    random_array::<LOCATOR_LEN>().map(Locator)
}

/// Encrypt `plaintext` under `key`, authenticating `locator` as associated data.
pub fn seal(key: &[u8; KEY_LEN], locator: &Locator, plaintext: &[u8]) -> Result<Vec<u8>, EmberError> {
    let cipher = XChaCha20Poly1305::new(Key::from_slice(key));
    let nonce_bytes: [u8; NONCE_LEN] = random_array()?;

    let ciphertext = cipher
        .encrypt(
            XNonce::from_slice(&nonce_bytes),
            Payload {
                msg: plaintext,
                aad: locator.as_bytes(),
            },
        )
        .map_err(|_| EmberError::Encryption("XChaCha20-Poly1305 encryption failed".to_string()))?;

    let mut blob = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    blob.extend_from_slice(&nonce_bytes);
    blob.extend_from_slice(&ciphertext);
    Ok(blob)
}

/// Decrypt a blob produced by [`seal`]. `None` on any failure: short blob,
/// wrong key, wrong locator or tampered bytes.
pub fn open(key: &[u8; KEY_LEN], locator: &Locator, blob: &[u8]) -> Option<Zeroizing<Vec<u8>>> {
    if blob.len() < NONCE_LEN + TAG_LEN {
        return None;
    }
    let (nonce_bytes, ciphertext) = blob.split_at(NONCE_LEN);
    let cipher = XChaCha20Poly1305::new(Key::from_slice(key));
    cipher
        .decrypt(
            XNonce::from_slice(nonce_bytes),
            Payload {
                msg: ciphertext,
                aad: locator.as_bytes(),
            },
        )
        .ok()
        .map(Zeroizing::new)
}
