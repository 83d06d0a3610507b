// SPDX-FileCopyrightText: 2026 Ember Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The storage engine's own passphrase cipher, exposed to SQL.
//!
//! Three scalar functions are registered on every connection:
//!
//! - `sym_encrypt(plaintext, passphrase)` derives a key with Argon2id from the
//!   passphrase and a fresh salt, then seals with AES-256-GCM.
//! - `sym_decrypt(blob, passphrase)` reverses it and yields NULL when the
//!   passphrase is wrong or the blob is corrupt. It never yields partial
//!   plaintext.
//! - `random_bytes(n)` returns `n` bytes from the system CSPRNG.
//!
//! Blob layout: format byte, Argon2id memory cost, iterations and parallelism
//! (u32 little-endian each), 16-byte salt, 96-bit nonce, ciphertext with tag.
//! The KDF parameters travel with the blob so existing rows stay readable after
//! the configured cost changes. They are attacker-reachable input, so both
//! sealing and opening refuse anything above the `KDF_MAX_*` ceilings before
//! Argon2 runs.
//!
//! A function error crosses SQLite as a plain message. Encryption failures
//! carry [`FAILURE_MARKER`] so [`take_failure`] can turn them back into
//! [`EmberError::Encryption`] on the caller's side.

use ember_config::model::{KDF_MAX_ITERATIONS, KDF_MAX_MEMORY_COST, KDF_MAX_PARALLELISM, StorageConfig};
use ember_core::EmberError;
use ring::aead::{AES_256_GCM, Aad, LessSafeKey, Nonce, UnboundKey};
use ring::rand::{SecureRandom, SystemRandom};
use rusqlite::functions::{Context, FunctionFlags};
use zeroize::Zeroizing;

const FORMAT_V1: u8 = 1;
const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;
const PARAMS_LEN: usize = 12;
const HEADER_LEN: usize = 1 + PARAMS_LEN + SALT_LEN + NONCE_LEN;
const TAG_LEN: usize = 16;

/// Prefix of the SQLite error message raised by a failing cipher function.
pub const FAILURE_MARKER: &str = "engine cipher failure: ";

/// Upper bound for `random_bytes(n)`.
pub const MAX_RANDOM_BYTES: i64 = 1024;

/// Argon2id cost parameters used when sealing new blobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    pub memory_cost: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl KdfParams {
    /// Whether every parameter is at or below its ceiling.
    pub fn within_ceiling(&self) -> bool {
        self.memory_cost <= KDF_MAX_MEMORY_COST
            && self.iterations <= KDF_MAX_ITERATIONS
            && self.parallelism <= KDF_MAX_PARALLELISM
    }
}

impl From<&StorageConfig> for KdfParams {
    fn from(config: &StorageConfig) -> Self {
        Self {
            memory_cost: config.kdf_memory_cost,
            iterations: config.kdf_iterations,
            parallelism: config.kdf_parallelism,
        }
    }
}

/// Register `sym_encrypt`, `sym_decrypt` and `random_bytes` on a connection.
pub fn register_functions(conn: &rusqlite::Connection, params: KdfParams) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        "sym_encrypt",
        2,
        FunctionFlags::SQLITE_UTF8,
        move |ctx| {
            let plaintext = bytes_arg(ctx, 0)?;
            let passphrase = bytes_arg(ctx, 1)?;
            seal(params, passphrase, plaintext).map_err(user_err)
        },
    )?;

    conn.create_scalar_function(
        "sym_decrypt",
        2,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let blob = bytes_arg(ctx, 0)?;
            let passphrase = bytes_arg(ctx, 1)?;
            Ok(open(passphrase, blob).map(|plaintext| plaintext.to_vec()))
        },
    )?;

    conn.create_scalar_function("random_bytes", 1, FunctionFlags::SQLITE_UTF8, |ctx| {
        let n: i64 = ctx.get(0)?;
        if !(1..=MAX_RANDOM_BYTES).contains(&n) {
            return Err(user_err(EmberError::Internal(format!(
                "random_bytes({n}) out of range 1..={MAX_RANDOM_BYTES}"
            ))));
        }
        random_bytes(n as usize).map_err(user_err)
    })?;

    Ok(())
}

fn bytes_arg<'a>(ctx: &'a Context<'_>, idx: usize) -> rusqlite::Result<&'a [u8]> {
    ctx.get_raw(idx)
        .as_bytes()
        .map_err(|e| rusqlite::Error::UserFunctionError(Box::new(e)))
}

fn user_err(e: EmberError) -> rusqlite::Error {
    let message = match e {
        EmberError::Encryption(detail) => format!("{FAILURE_MARKER}{detail}"),
        other => other.to_string(),
    };
    rusqlite::Error::UserFunctionError(message.into())
}

/// Recover an encryption failure raised inside `sym_encrypt` or
/// `random_bytes` from the statement error it surfaced as. Any other error is
/// handed back unchanged.
pub fn take_failure(err: rusqlite::Error) -> Result<EmberError, rusqlite::Error> {
    if let rusqlite::Error::SqliteFailure(_, Some(message)) = &err
        && let Some(detail) = message.strip_prefix(FAILURE_MARKER)
    {
        return Ok(EmberError::Encryption(detail.to_string()));
    }
    Err(err)
}

/// Seal `plaintext` under a key derived from `passphrase`.
pub fn seal(params: KdfParams, passphrase: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, EmberError> {
    if !params.within_ceiling() {
        return Err(EmberError::Encryption(format!(
            "Argon2id parameters {params:?} exceed the configured ceiling"
        )));
    }
    let rng = SystemRandom::new();
    let mut salt = [0u8; SALT_LEN];
    let mut nonce_bytes = [0u8; NONCE_LEN];
    rng.fill(&mut salt)
        .and_then(|()| rng.fill(&mut nonce_bytes))
        .map_err(|_| EmberError::Encryption("failed to generate salt or nonce".to_string()))?;

    let key = derive_key(passphrase, &salt, params)?;
    let sealing_key = aes_key(&key)?;

    let mut blob = Vec::with_capacity(HEADER_LEN + plaintext.len() + TAG_LEN);
    blob.push(FORMAT_V1);
    blob.extend_from_slice(&params.memory_cost.to_le_bytes());
    blob.extend_from_slice(&params.iterations.to_le_bytes());
    blob.extend_from_slice(&params.parallelism.to_le_bytes());
    blob.extend_from_slice(&salt);
    blob.extend_from_slice(&nonce_bytes);

    let mut in_out = plaintext.to_vec();
    sealing_key
        .seal_in_place_append_tag(Nonce::assume_unique_for_key(nonce_bytes), Aad::empty(), &mut in_out)
        .map_err(|_| EmberError::Encryption("AES-256-GCM encryption failed".to_string()))?;
    blob.extend_from_slice(&in_out);

    Ok(blob)
}

/// Open a blob produced by [`seal`]. `None` for a wrong passphrase, a
/// truncated or tampered blob, an unknown format byte, or KDF parameters
/// above the ceiling.
pub fn open(passphrase: &[u8], blob: &[u8]) -> Option<Zeroizing<Vec<u8>>> {
    if blob.len() < HEADER_LEN + TAG_LEN || blob[0] != FORMAT_V1 {
        return None;
    }
    let (header, sealed) = blob.split_at(HEADER_LEN);
    let word = |i: usize| {
        let start = 1 + i * 4;
        u32::from_le_bytes([header[start], header[start + 1], header[start + 2], header[start + 3]])
    };
    let params = KdfParams {
        memory_cost: word(0),
        iterations: word(1),
        parallelism: word(2),
    };
    if !params.within_ceiling() {
        return None;
    }
    let salt: [u8; SALT_LEN] = header[1 + PARAMS_LEN..1 + PARAMS_LEN + SALT_LEN].try_into().ok()?;
    let nonce_bytes: [u8; NONCE_LEN] = header[HEADER_LEN - NONCE_LEN..].try_into().ok()?;

    let key = derive_key(passphrase, &salt, params).ok()?;
    let opening_key = aes_key(&key).ok()?;

    let mut in_out = Zeroizing::new(sealed.to_vec());
    let len = opening_key
        .open_in_place(Nonce::assume_unique_for_key(nonce_bytes), Aad::empty(), &mut in_out)
        .ok()?
        .len();
    in_out.truncate(len);
    Some(in_out)
}

/// Fill a buffer of `n` bytes from the system CSPRNG.
pub fn random_bytes(n: usize) -> Result<Vec<u8>, EmberError> {
    let mut buf = vec![0u8; n];
    SystemRandom::new()
        .fill(&mut buf)
        .map_err(|_| EmberError::Encryption("failed to generate random bytes".to_string()))?;
    Ok(buf)
}

fn derive_key(
    passphrase: &[u8],
    salt: &[u8; SALT_LEN],
    params: KdfParams,
) -> Result<Zeroizing<[u8; 32]>, EmberError> {
    let argon_params = argon2::Params::new(
        params.memory_cost,
        params.iterations,
        params.parallelism,
        Some(32),
    )
    .map_err(|e| EmberError::Encryption(format!("invalid Argon2id parameters: {e}")))?;
    let argon2 = argon2::Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, argon_params);

    let mut output = Zeroizing::new([0u8; 32]);
    argon2
        .hash_password_into(passphrase, salt, output.as_mut())
        .map_err(|e| EmberError::Encryption(format!("Argon2id key derivation failed: {e}")))?;
    Ok(output)
}

fn aes_key(key: &[u8; 32]) -> Result<LessSafeKey, EmberError> {
    UnboundKey::new(&AES_256_GCM, key)
        .map(LessSafeKey::new)
        .map_err(|_| EmberError::Encryption("failed to create AES-256-GCM key".to_string()))
}
