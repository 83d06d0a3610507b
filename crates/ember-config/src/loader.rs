// SPDX-FileCopyrightText: 2026 Ember Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./ember.toml` > `~/.config/ember/ember.toml` > `/etc/ember/ember.toml`
//! with environment variable overrides via `EMBER_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::EmberConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/ember/ember.toml` (system-wide)
/// 3. `~/.config/ember/ember.toml` (user XDG config)
/// 4. `./ember.toml` (local directory)
/// 5. `EMBER_*` environment variables
pub fn load_config() -> Result<EmberConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<EmberConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(EmberConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<EmberConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(EmberConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading.
///
/// Returns the Figment before extraction so callers can inspect metadata.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(EmberConfig::default()))
        .merge(Toml::file("/etc/ember/ember.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("ember/ember.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("ember.toml"))
        .merge(env_provider())
}

/// Create the environment variable provider using explicit `map()` for section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` because key names contain
/// underscores: `EMBER_VAULT_RETENTION_SECS` must map to
/// `vault.retention_secs`, not `vault.retention.secs`.
fn env_provider() -> Env {
    Env::prefixed("EMBER_").map(|key| {
        let key_str = key.as_str();
        SECTIONS
            .iter()
            .find_map(|section| {
                key_str
                    .strip_prefix(section)
                    .and_then(|rest| rest.strip_prefix('_'))
                    .map(|rest| format!("{section}.{rest}"))
            })
            .unwrap_or_else(|| key_str.to_string())
            .into()
    })
}

/// Top-level config tables, used to split env var names at the first underscore
/// that ends a section name.
const SECTIONS: &[&str] = &["log", "storage", "vault", "reaper"];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_overrides_nested_keys() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("EMBER_VAULT_RETENTION_SECS", "120");
            jail.set_env("EMBER_REAPER_INTERVAL_SECS", "30");
            jail.set_env("EMBER_STORAGE_DATABASE_PATH", "/tmp/jail.db");
            let config = load_config()?;
            assert_eq!(config.vault.retention_secs, 120);
            assert_eq!(config.reaper.interval_secs, 30);
            assert_eq!(config.storage.database_path, "/tmp/jail.db");
            Ok(())
        });
    }

    #[test]
    fn local_file_overrides_defaults() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "ember.toml",
                r#"
[log]
level = "debug"

[vault]
default_algorithm = "passphrase"
"#,
            )?;
            let config = load_config()?;
            assert_eq!(config.log.level, "debug");
            assert_eq!(
                config.vault.default_algorithm,
                ember_core::Algorithm::StorageManagedPassphrase
            );
            Ok(())
        });
    }
}
