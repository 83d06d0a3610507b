// SPDX-FileCopyrightText: 2026 Ember Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One-time secret vault.
//!
//! A secret is stored encrypted and a self-contained bearer token is handed
//! back. Presenting the token once returns the secret and destroys it. The
//! [`Reaper`] deletes secrets nobody collected within the retention window.

pub mod cipher;
pub mod crypto;
pub mod reaper;
pub mod token;
pub mod vault;

pub use cipher::{AuthenticationFailure, CipherSuite};
pub use reaper::Reaper;
pub use token::Token;
pub use vault::Vault;
