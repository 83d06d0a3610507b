// SPDX-FileCopyrightText: 2026 Ember Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Ember vault.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use ember_core::Algorithm;
use serde::{Deserialize, Serialize};

/// Top-level Ember configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EmberConfig {
    /// Logging settings.
    #[serde(default)]
    pub log: LogConfig,

    /// SQLite storage settings, including the engine-side passphrase cipher.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Secret lifetime and size settings.
    #[serde(default)]
    pub vault: VaultConfig,

    /// Expiry sweep settings.
    #[serde(default)]
    pub reaper: ReaperConfig,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    /// Logging level (trace, debug, info, warn, error). `RUST_LOG` wins if set.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,

    /// How long a transaction waits for another holder's lock, in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Argon2id memory cost in KiB for `sym_encrypt` (default: 65536 = 64 MiB).
    #[serde(default = "default_kdf_memory_cost")]
    pub kdf_memory_cost: u32,

    /// Argon2id iteration count for `sym_encrypt` (default: 3).
    #[serde(default = "default_kdf_iterations")]
    pub kdf_iterations: u32,

    /// Argon2id parallelism lanes for `sym_encrypt` (default: 4).
    #[serde(default = "default_kdf_parallelism")]
    pub kdf_parallelism: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
            busy_timeout_ms: default_busy_timeout_ms(),
            kdf_memory_cost: default_kdf_memory_cost(),
            kdf_iterations: default_kdf_iterations(),
            kdf_parallelism: default_kdf_parallelism(),
        }
    }
}

/// Largest Argon2id memory cost (KiB) the passphrase cipher will seal or open
/// with. Blob headers above any of these ceilings are refused unread.
pub const KDF_MAX_MEMORY_COST: u32 = 1024 * 1024;

/// Largest Argon2id iteration count the passphrase cipher will use.
pub const KDF_MAX_ITERATIONS: u32 = 16;

/// Largest Argon2id parallelism the passphrase cipher will use.
pub const KDF_MAX_PARALLELISM: u32 = 16;

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("ember").join("ember.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("ember.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

fn default_kdf_memory_cost() -> u32 {
    65536
}

fn default_kdf_iterations() -> u32 {
    3
}

fn default_kdf_parallelism() -> u32 {
    4
}

/// Secret lifetime and admission configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct VaultConfig {
    /// Seconds an unread secret lives before the reaper may delete it.
    #[serde(default = "default_retention_secs")]
    pub retention_secs: u64,

    /// Largest secret accepted by `put`, in bytes.
    #[serde(default = "default_max_secret_bytes")]
    pub max_secret_bytes: usize,

    /// Algorithm used when the caller does not pick one.
    #[serde(default = "default_algorithm")]
    pub default_algorithm: Algorithm,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            retention_secs: default_retention_secs(),
            max_secret_bytes: default_max_secret_bytes(),
            default_algorithm: default_algorithm(),
        }
    }
}

fn default_retention_secs() -> u64 {
    24 * 60 * 60
}

fn default_max_secret_bytes() -> usize {
    1 << 16
}

fn default_algorithm() -> Algorithm {
    Algorithm::EmbeddedKeyAead
}

/// Expiry sweep configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ReaperConfig {
    /// Run the sweep alongside the vault.
    #[serde(default = "default_reaper_enabled")]
    pub enabled: bool,

    /// Seconds between sweeps.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self {
            enabled: default_reaper_enabled(),
            interval_secs: default_interval_secs(),
        }
    }
}

fn default_reaper_enabled() -> bool {
    true
}

fn default_interval_secs() -> u64 {
    60 * 60
}
