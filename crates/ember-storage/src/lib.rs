// SPDX-FileCopyrightText: 2026 Ember Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence for the Ember one-time secret vault.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, the storage
//! engine's passphrase cipher as SQL functions, and the record-level
//! operations the vault composes into single transactions.

pub mod database;
pub mod engine_cipher;
pub mod migrations;
pub mod models;
pub mod queries;

pub use database::Database;
pub use engine_cipher::KdfParams;
pub use models::*;
