// SPDX-FileCopyrightText: 2026 Ember Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Operations on the `secrets` table.
//!
//! The synchronous functions take a borrowed connection or transaction and
//! are meant to run inside a `tokio-rusqlite` `call` closure, so a caller can
//! compose lock, decrypt and delete under one transaction. Rows whose
//! `expires_at` has passed are invisible to lookups even before the sweep
//! removes them.

use ember_core::{Algorithm, EmberError, Locator, SecretRecord};
use rusqlite::{Connection, Transaction, TransactionBehavior, params};

use crate::database::Database;

/// Outcome of an insert attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insert {
    Stored(Locator),
    /// The locator already exists. Nothing was written.
    Collision,
}

/// Start a transaction that takes the database write lock immediately.
///
/// SQLite has no row locks; `BEGIN IMMEDIATE` serializes every writer on the
/// file, which is a superset of locking the one row a retrieval touches.
/// Competing writers wait up to `busy_timeout`.
pub fn begin_locked(conn: &mut Connection) -> rusqlite::Result<Transaction<'_>> {
    conn.transaction_with_behavior(TransactionBehavior::Immediate)
}

fn expiry_modifier(retention_secs: u64) -> String {
    format!("+{retention_secs} seconds")
}

fn classify_insert(result: rusqlite::Result<Locator>) -> rusqlite::Result<Insert> {
    match result {
        Ok(locator) => Ok(Insert::Stored(locator)),
        Err(rusqlite::Error::SqliteFailure(err, _))
            if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            Ok(Insert::Collision)
        }
        Err(e) => Err(e),
    }
}

/// Store a blob already encrypted under `algorithm` at `locator`.
pub fn insert_sealed(
    conn: &Connection,
    locator: &Locator,
    algorithm: Algorithm,
    ciphertext: &[u8],
    retention_secs: u64,
) -> rusqlite::Result<Insert> {
    let result = conn
        .execute(
            "INSERT INTO secrets (locator, algorithm, ciphertext, expires_at)
             VALUES (?1, ?2, ?3, strftime('%Y-%m-%dT%H:%M:%fZ', 'now', ?4))",
            params![
                locator.as_bytes().as_slice(),
                algorithm.tag(),
                ciphertext,
                expiry_modifier(retention_secs)
            ],
        )
        .map(|_| *locator);
    classify_insert(result)
}

/// Encrypt `plaintext` with the engine's own passphrase cipher during the
/// insert. The engine draws the locator unless one is given. Returns the
/// locator the row was stored under.
pub fn insert_engine_sealed(
    conn: &Connection,
    locator: Option<&Locator>,
    plaintext: &[u8],
    passphrase: &str,
    retention_secs: u64,
) -> rusqlite::Result<Insert> {
    let result = conn.query_row(
        "INSERT INTO secrets (locator, algorithm, ciphertext, expires_at)
         VALUES (COALESCE(?4, random_bytes(16)), ?5, sym_encrypt(?1, ?2),
                 strftime('%Y-%m-%dT%H:%M:%fZ', 'now', ?3))
         RETURNING locator",
        params![
            plaintext,
            passphrase,
            expiry_modifier(retention_secs),
            locator.map(|l| l.as_bytes().as_slice()),
            Algorithm::StorageManagedPassphrase.tag()
        ],
        |row| {
            let bytes: Vec<u8> = row.get(0)?;
            Locator::from_slice(&bytes).ok_or_else(|| {
                rusqlite::Error::FromSqlConversionFailure(
                    0,
                    rusqlite::types::Type::Blob,
                    format!("locator has {} bytes", bytes.len()).into(),
                )
            })
        },
    );
    classify_insert(result)
}

/// Read the live record at `locator`. Call inside [`begin_locked`].
pub fn lock_by_locator(tx: &Transaction<'_>, locator: &Locator) -> rusqlite::Result<Option<SecretRecord>> {
    let result = tx.query_row(
        "SELECT id, algorithm, ciphertext, expires_at FROM secrets
         WHERE locator = ?1 AND expires_at > strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
        params![locator.as_bytes().as_slice()],
        |row| {
            let tag: u8 = row.get(1)?;
            let algorithm = Algorithm::try_from(tag).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Integer, Box::new(e))
            })?;
            Ok(SecretRecord {
                id: row.get(0)?,
                locator: *locator,
                algorithm,
                ciphertext: row.get(2)?,
                expires_at: row.get(3)?,
            })
        },
    );
    match result {
        Ok(record) => Ok(Some(record)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Read the live record at `locator` and decrypt it in the engine.
///
/// `None` when there is no live record; `Some((id, None))` when the record
/// exists but the passphrase does not open it. Rows sealed by another suite
/// are never handed to `sym_decrypt` and also come back as `Some((id, None))`.
pub fn lock_and_unseal(
    tx: &Transaction<'_>,
    locator: &Locator,
    passphrase: &str,
) -> rusqlite::Result<Option<(i64, Option<Vec<u8>>)>> {
    let result = tx.query_row(
        "SELECT id, CASE WHEN algorithm = ?3 THEN sym_decrypt(ciphertext, ?2) END
         FROM secrets
         WHERE locator = ?1 AND expires_at > strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
        params![
            locator.as_bytes().as_slice(),
            passphrase,
            Algorithm::StorageManagedPassphrase.tag()
        ],
        |row| Ok((row.get(0)?, row.get(1)?)),
    );
    match result {
        Ok(found) => Ok(Some(found)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Delete one record by row id. Returns the number of rows removed.
pub fn delete_by_id(conn: &Connection, id: i64) -> rusqlite::Result<usize> {
    conn.execute("DELETE FROM secrets WHERE id = ?1", params![id])
}

/// Delete every record whose expiry has passed.
pub fn delete_expired(conn: &Connection) -> rusqlite::Result<usize> {
    conn.execute(
        "DELETE FROM secrets WHERE expires_at <= strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
        [],
    )
}

/// Remove expired records and return how many were deleted.
pub async fn prune_expired(db: &Database) -> Result<usize, EmberError> {
    db.connection()
        .call(|conn| delete_expired(conn))
        .await
        .map_err(crate::database::map_tr_err)
}

/// Number of records that are not yet expired.
pub async fn count_live(db: &Database) -> Result<i64, EmberError> {
    db.connection()
        .call(|conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM secrets
                 WHERE expires_at > strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
                [],
                |row| row.get(0),
            )
        })
        .await
        .map_err(crate::database::map_tr_err)
}
