// SPDX-FileCopyrightText: 2026 Ember Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Ember configuration system.

use ember_config::diagnostic::ConfigError;
use ember_config::model::EmberConfig;
use ember_config::{load_and_validate_str, load_config_from_str};
use ember_core::Algorithm;

/// Valid TOML with all known fields deserializes successfully.
#[test]
fn valid_toml_deserializes_into_ember_config() {
    let toml = r#"
[log]
level = "debug"

[storage]
database_path = "/tmp/ember-test.db"
wal_mode = false
busy_timeout_ms = 250
kdf_memory_cost = 32768
kdf_iterations = 2
kdf_parallelism = 1

[vault]
retention_secs = 3600
max_secret_bytes = 1024
default_algorithm = "passphrase"

[reaper]
enabled = false
interval_secs = 60
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.log.level, "debug");
    assert_eq!(config.storage.database_path, "/tmp/ember-test.db");
    assert!(!config.storage.wal_mode);
    assert_eq!(config.storage.busy_timeout_ms, 250);
    assert_eq!(config.storage.kdf_memory_cost, 32768);
    assert_eq!(config.storage.kdf_iterations, 2);
    assert_eq!(config.storage.kdf_parallelism, 1);
    assert_eq!(config.vault.retention_secs, 3600);
    assert_eq!(config.vault.max_secret_bytes, 1024);
    assert_eq!(
        config.vault.default_algorithm,
        Algorithm::StorageManagedPassphrase
    );
    assert!(!config.reaper.enabled);
    assert_eq!(config.reaper.interval_secs, 60);
}

/// Empty input yields the compiled defaults.
#[test]
fn empty_toml_uses_defaults() {
    let config = load_config_from_str("").expect("empty config is valid");
    assert_eq!(config.log.level, "info");
    assert!(config.storage.wal_mode);
    assert_eq!(config.vault.retention_secs, 86_400);
    assert_eq!(config.vault.max_secret_bytes, 65_536);
    assert_eq!(config.vault.default_algorithm, Algorithm::EmbeddedKeyAead);
    assert!(config.reaper.enabled);
    assert_eq!(config.reaper.interval_secs, 3600);
    assert!(config.storage.database_path.ends_with("ember.db"));
}

/// Partial sections keep defaults for the keys they omit.
#[test]
fn partial_section_keeps_other_defaults() {
    let config = load_config_from_str("[vault]\nretention_secs = 10\n").unwrap();
    assert_eq!(config.vault.retention_secs, 10);
    assert_eq!(config.vault.max_secret_bytes, 65_536);
    assert_eq!(config.reaper.interval_secs, 3600);
}

/// Unknown field in [vault] is rejected with a suggestion.
#[test]
fn unknown_field_in_vault_suggests_correction() {
    let toml = r#"
[vault]
retension_secs = 10
"#;

    let errors = load_and_validate_str(toml).expect_err("should reject unknown field");
    let unknown = errors
        .iter()
        .find_map(|e| match e {
            ConfigError::UnknownKey {
                key, suggestion, ..
            } => Some((key.clone(), suggestion.clone())),
            _ => None,
        })
        .expect("should produce an UnknownKey error");
    assert_eq!(unknown.0, "retension_secs");
    assert_eq!(unknown.1.as_deref(), Some("retention_secs"));
}

/// Unknown top-level section is rejected.
#[test]
fn unknown_section_produces_error() {
    let err = load_config_from_str("[telegram]\nbot_token = \"x\"\n")
        .expect_err("should reject unknown section");
    assert!(format!("{err}").contains("telegram"));
}

/// Unknown algorithm names are rejected at load time.
#[test]
fn unknown_algorithm_is_rejected() {
    let errors = load_and_validate_str("[vault]\ndefault_algorithm = \"rot13\"\n")
        .expect_err("rot13 is not an algorithm");
    assert!(
        errors.iter().any(|e| e.to_string().contains("rot13")),
        "errors: {errors:?}"
    );
}

/// Wrong value types surface as InvalidType.
#[test]
fn wrong_type_produces_invalid_type() {
    let errors = load_and_validate_str("[reaper]\ninterval_secs = \"hourly\"\n")
        .expect_err("string is not an integer");
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::InvalidType { .. })),
        "errors: {errors:?}"
    );
}

/// Validation runs after a successful parse.
#[test]
fn zero_interval_fails_validation() {
    let errors = load_and_validate_str("[reaper]\ninterval_secs = 0\n").unwrap_err();
    assert!(errors.iter().any(
        |e| matches!(e, ConfigError::Validation { message } if message.contains("interval_secs"))
    ));
}

/// Defaults round-trip through TOML serialization.
#[test]
fn default_config_serializes_to_toml() {
    let rendered = toml::to_string(&EmberConfig::default()).expect("serializes");
    assert!(rendered.contains("[vault]"));
    assert!(rendered.contains("default_algorithm = \"xchacha20poly1305\""));
    let reparsed = load_config_from_str(&rendered).expect("reparses");
    assert_eq!(reparsed.vault.retention_secs, 86_400);
}
