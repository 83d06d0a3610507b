// SPDX-FileCopyrightText: 2026 Ember Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as non-empty paths, non-zero intervals, and Argon2id minimums.

use crate::diagnostic::ConfigError;
use crate::model::{EmberConfig, KDF_MAX_ITERATIONS, KDF_MAX_MEMORY_COST, KDF_MAX_PARALLELISM};

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &EmberConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if config.storage.busy_timeout_ms == 0 {
        errors.push(ConfigError::Validation {
            message: "storage.busy_timeout_ms must be at least 1".to_string(),
        });
    }

    // Argon2id parameters for the engine-side passphrase cipher
    if config.storage.kdf_memory_cost < 32768 {
        errors.push(ConfigError::Validation {
            message: format!(
                "storage.kdf_memory_cost must be at least 32768 (32 MiB), got {}",
                config.storage.kdf_memory_cost
            ),
        });
    }
    if config.storage.kdf_memory_cost > KDF_MAX_MEMORY_COST {
        errors.push(ConfigError::Validation {
            message: format!(
                "storage.kdf_memory_cost must be at most {KDF_MAX_MEMORY_COST} (1 GiB), got {}",
                config.storage.kdf_memory_cost
            ),
        });
    }

    if !(2..=KDF_MAX_ITERATIONS).contains(&config.storage.kdf_iterations) {
        errors.push(ConfigError::Validation {
            message: format!(
                "storage.kdf_iterations must be between 2 and {KDF_MAX_ITERATIONS}, got {}",
                config.storage.kdf_iterations
            ),
        });
    }

    if !(1..=KDF_MAX_PARALLELISM).contains(&config.storage.kdf_parallelism) {
        errors.push(ConfigError::Validation {
            message: format!(
                "storage.kdf_parallelism must be between 1 and {KDF_MAX_PARALLELISM}, got {}",
                config.storage.kdf_parallelism
            ),
        });
    }

    if config.vault.retention_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "vault.retention_secs must be at least 1".to_string(),
        });
    }

    if config.vault.max_secret_bytes == 0 {
        errors.push(ConfigError::Validation {
            message: "vault.max_secret_bytes must be at least 1".to_string(),
        });
    }

    if config.reaper.interval_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "reaper.interval_secs must be at least 1".to_string(),
        });
    }

    if !tracing_level_is_valid(&config.log.level) {
        errors.push(ConfigError::Validation {
            message: format!(
                "log.level `{}` is not one of trace, debug, info, warn, error",
                config.log.level
            ),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn tracing_level_is_valid(level: &str) -> bool {
    level.parse::<tracing::Level>().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        let config = EmberConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn empty_database_path_fails_validation() {
        let mut config = EmberConfig::default();
        config.storage.database_path = "".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("database_path"))));
    }

    #[test]
    fn zero_retention_fails_validation() {
        let mut config = EmberConfig::default();
        config.vault.retention_secs = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("retention_secs"))));
    }

    #[test]
    fn weak_kdf_parameters_fail_validation() {
        let mut config = EmberConfig::default();
        config.storage.kdf_memory_cost = 1024;
        config.storage.kdf_iterations = 1;
        config.storage.kdf_parallelism = 0;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3, "all three KDF errors are collected");
    }

    #[test]
    fn oversized_kdf_parameters_fail_validation() {
        let mut config = EmberConfig::default();
        config.storage.kdf_memory_cost = KDF_MAX_MEMORY_COST + 1;
        config.storage.kdf_iterations = KDF_MAX_ITERATIONS + 1;
        config.storage.kdf_parallelism = KDF_MAX_PARALLELISM + 1;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors
            .iter()
            .all(|e| matches!(e, ConfigError::Validation { message } if message.contains("at most") || message.contains("between"))));
    }

    #[test]
    fn unknown_log_level_fails_validation() {
        let mut config = EmberConfig::default();
        config.log.level = "loud".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("log.level"))));
    }

    #[test]
    fn valid_custom_config_passes() {
        let mut config = EmberConfig::default();
        config.storage.database_path = "/tmp/test.db".to_string();
        config.vault.retention_secs = 60;
        config.reaper.interval_secs = 5;
        config.log.level = "DEBUG".to_string();
        assert!(validate_config(&config).is_ok());
    }
}
