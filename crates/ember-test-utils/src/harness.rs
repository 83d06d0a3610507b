// SPDX-FileCopyrightText: 2026 Ember Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Temp-database harness for vault and reaper tests.

use ember_config::model::{ReaperConfig, StorageConfig, VaultConfig};
use ember_core::{Algorithm, EmberError, Locator};
use ember_storage::Database;
use ember_storage::database::map_tr_err;
use ember_storage::queries::secrets;
use ember_vault::{Reaper, Vault};

/// Builder for [`TestVault`].
pub struct TestVaultBuilder {
    retention_secs: u64,
    max_secret_bytes: usize,
    default_algorithm: Algorithm,
    busy_timeout_ms: u64,
}

impl TestVaultBuilder {
    fn new() -> Self {
        let vault = VaultConfig::default();
        Self {
            retention_secs: vault.retention_secs,
            max_secret_bytes: vault.max_secret_bytes,
            default_algorithm: vault.default_algorithm,
            busy_timeout_ms: 10_000,
        }
    }

    pub fn with_retention_secs(mut self, secs: u64) -> Self {
        self.retention_secs = secs;
        self
    }

    pub fn with_max_secret_bytes(mut self, limit: usize) -> Self {
        self.max_secret_bytes = limit;
        self
    }

    pub fn with_default_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.default_algorithm = algorithm;
        self
    }

    /// Open the temp database and assemble the vault and reaper.
    pub async fn build(self) -> Result<TestVault, EmberError> {
        let temp_dir =
            tempfile::TempDir::new().map_err(|e| EmberError::Storage { source: e.into() })?;
        let db_path = temp_dir.path().join("ember-test.db");

        // Argon2 at its minimum cost; production minimums are enforced by
        // config validation, which tests bypass.
        let storage = StorageConfig {
            database_path: db_path.to_string_lossy().to_string(),
            wal_mode: true,
            busy_timeout_ms: self.busy_timeout_ms,
            kdf_memory_cost: 8192,
            kdf_iterations: 1,
            kdf_parallelism: 1,
        };
        let vault_config = VaultConfig {
            retention_secs: self.retention_secs,
            max_secret_bytes: self.max_secret_bytes,
            default_algorithm: self.default_algorithm,
        };

        let db = Database::open_with_config(&storage).await?;
        let vault = Vault::new(db.clone(), &vault_config);
        let reaper = Reaper::new(db.clone(), &ReaperConfig::default());

        Ok(TestVault {
            vault,
            reaper,
            db,
            storage,
            vault_config,
            _temp_dir: temp_dir,
        })
    }
}

/// A vault over a temp SQLite file, removed on drop.
pub struct TestVault {
    pub vault: Vault,
    pub reaper: Reaper,
    /// The connection shared by `vault` and `reaper`.
    pub db: Database,
    storage: StorageConfig,
    vault_config: VaultConfig,
    _temp_dir: tempfile::TempDir,
}

impl TestVault {
    pub fn builder() -> TestVaultBuilder {
        TestVaultBuilder::new()
    }

    /// A vault with default settings.
    pub async fn new() -> Result<Self, EmberError> {
        Self::builder().build().await
    }

    /// A second vault on its own connection to the same file, as another
    /// process or service instance would have.
    pub async fn open_peer(&self) -> Result<Vault, EmberError> {
        let db = Database::open_with_config(&self.storage).await?;
        Ok(Vault::new(db, &self.vault_config))
    }

    /// A reaper on its own connection to the same file.
    pub async fn open_peer_reaper(&self) -> Result<Reaper, EmberError> {
        let db = Database::open_with_config(&self.storage).await?;
        Ok(Reaper::new(db, &ReaperConfig::default()))
    }

    /// Move every record's expiry into the past.
    pub async fn expire_all(&self) -> Result<usize, EmberError> {
        self.db
            .connection()
            .call(|conn| {
                conn.execute(
                    "UPDATE secrets
                     SET expires_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now', '-1 seconds')",
                    [],
                )
            })
            .await
            .map_err(map_tr_err)
    }

    /// Rows in the table, expired or not.
    pub async fn row_count(&self) -> Result<i64, EmberError> {
        self.db
            .connection()
            .call(|conn| conn.query_row("SELECT COUNT(*) FROM secrets", [], |row| row.get(0)))
            .await
            .map_err(map_tr_err)
    }

    /// Rows that have not expired.
    pub async fn live_count(&self) -> Result<i64, EmberError> {
        secrets::count_live(&self.db).await
    }

    /// Write a row directly, bypassing the vault's sealing.
    pub async fn plant(&self, locator: Locator, algorithm: Algorithm, ciphertext: Vec<u8>) -> Result<(), EmberError> {
        let retention_secs = self.vault_config.retention_secs;
        let inserted = self
            .db
            .connection()
            .call(move |conn| secrets::insert_sealed(conn, &locator, algorithm, &ciphertext, retention_secs))
            .await
            .map_err(map_tr_err)?;
        match inserted {
            secrets::Insert::Stored(_) => Ok(()),
            secrets::Insert::Collision => Err(EmberError::Internal(format!("locator {locator} already planted"))),
        }
    }

    /// Rewrite the stored ciphertext at `locator` in place.
    pub async fn tamper<F>(&self, locator: Locator, edit: F) -> Result<(), EmberError>
    where
        F: FnOnce(&mut Vec<u8>) + Send + 'static,
    {
        self.db
            .connection()
            .call(move |conn| -> Result<(), rusqlite::Error> {
                let key = locator.as_bytes().to_vec();
                let mut blob: Vec<u8> =
                    conn.query_row("SELECT ciphertext FROM secrets WHERE locator = ?1", [&key], |row| row.get(0))?;
                edit(&mut blob);
                conn.execute(
                    "UPDATE secrets SET ciphertext = ?1 WHERE locator = ?2",
                    rusqlite::params![blob, key],
                )?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    /// Raw ciphertext of every stored row, in insertion order.
    pub async fn stored_ciphertexts(&self) -> Result<Vec<Vec<u8>>, EmberError> {
        self.db
            .connection()
            .call(|conn| -> Result<Vec<Vec<u8>>, rusqlite::Error> {
                let mut stmt = conn.prepare("SELECT ciphertext FROM secrets ORDER BY id")?;
                let rows = stmt.query_map([], |row| row.get(0))?;
                rows.collect()
            })
            .await
            .map_err(map_tr_err)
    }
}
