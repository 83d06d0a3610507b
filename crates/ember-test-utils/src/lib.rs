// SPDX-FileCopyrightText: 2026 Ember Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Ember integration tests.
//!
//! [`TestVault`] opens a vault and reaper over a throwaway SQLite file with
//! cheap KDF settings, and exposes the few storage manipulations tests need
//! (backdating expiry, counting rows, opening a second connection).

pub mod harness;

pub use harness::{TestVault, TestVaultBuilder};
