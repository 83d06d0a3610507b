// SPDX-FileCopyrightText: 2026 Ember Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Periodic deletion of expired secrets.
//!
//! The reaper shares nothing with [`Vault`](crate::Vault) except the database.
//! A sweep racing a `pop` on the same record is settled by SQLite's write
//! lock: whichever commits first wins and the other sees no row.

use std::time::Duration;

use ember_config::model::ReaperConfig;
use ember_core::EmberError;
use ember_storage::Database;
use ember_storage::queries::secrets;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Shortest sweep period. `tokio::time::interval` panics on zero.
const MIN_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Clone)]
pub struct Reaper {
    db: Database,
    interval: Duration,
}

impl Reaper {
    /// An `interval_secs` of zero is raised to one second.
    pub fn new(db: Database, config: &ReaperConfig) -> Self {
        Self {
            db,
            interval: Duration::from_secs(config.interval_secs).max(MIN_INTERVAL),
        }
    }

    /// Delete every expired record once. Returns the number removed.
    pub async fn sweep(&self) -> Result<usize, EmberError> {
        let removed = secrets::prune_expired(&self.db).await?;
        if removed > 0 {
            info!(removed, "reaped expired secrets");
        } else {
            debug!("reaper sweep found nothing to remove");
        }
        Ok(removed)
    }

    /// Sweep now and then once per interval until `cancel` fires.
    ///
    /// A failed sweep is logged and the loop carries on with the next tick.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(interval_secs = self.interval.as_secs(), "reaper started");

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("reaper shutting down");
                    break;
                }
                _ = interval.tick() => {
                    if let Err(e) = self.sweep().await {
                        error!(error = %e, "reaper sweep failed, will retry next tick");
                    }
                }
            }
        }
    }

    /// Run the loop on a background task.
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(cancel).await })
    }
}
