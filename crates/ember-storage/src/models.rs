// SPDX-FileCopyrightText: 2026 Ember Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row types. Defined in `ember-core` so the vault can name them without a
//! storage dependency in its public signatures.

pub use ember_core::types::{Locator, SecretRecord};
pub use crate::queries::secrets::Insert;
