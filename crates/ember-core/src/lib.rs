// SPDX-FileCopyrightText: 2026 Ember Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Ember one-time secret vault.
//!
//! Holds the error taxonomy and the small set of domain types that both the
//! vault and the storage layer need to agree on.

pub mod error;
pub mod types;

pub use error::EmberError;
pub use types::{Algorithm, LOCATOR_LEN, Locator, SecretRecord};
