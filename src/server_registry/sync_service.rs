//! Registry Reconciler
//!
//! Brings the persisted registry in line with the panel's server list.
//! The remote list is fetched before the store is touched; the resulting
//! change set is applied as one batch followed by a single `save`.

use super::plan::ReconcilePlan;
use super::repository::ServerRegistry;
use super::types::*;
use crate::panel_client::{PanelClient, RemoteServer};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

/// Default periodic interval: 1 hour
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(3600);

/// Floor for the periodic interval
pub const MIN_SYNC_INTERVAL: Duration = Duration::from_secs(60);

/// Source of the authoritative server list
#[async_trait]
pub trait RemoteServerSource: Send + Sync {
    async fn list_servers(&self) -> crate::Result<Vec<RemoteServer>>;
}

#[async_trait]
impl RemoteServerSource for PanelClient {
    async fn list_servers(&self) -> crate::Result<Vec<RemoteServer>> {
        PanelClient::list_servers(self).await
    }
}

/// Registry Reconciler
pub struct RegistryReconciler {
    source: Arc<dyn RemoteServerSource>,
    registry: ServerRegistry,
    /// One pass at a time
    pass_lock: Mutex<()>,
    periodic_state: Arc<RwLock<PeriodicSyncState>>,
}

impl RegistryReconciler {
    pub fn new(source: Arc<dyn RemoteServerSource>, registry: ServerRegistry) -> Self {
        Self {
            source,
            registry,
            pass_lock: Mutex::new(()),
            periodic_state: Arc::new(RwLock::new(PeriodicSyncState::default())),
        }
    }

    pub fn registry(&self) -> &ServerRegistry {
        &self.registry
    }

    // ========================================
    // Reconciliation
    // ========================================

    /// Run one pass. On a fetch failure the registry is left untouched and
    /// the error is returned.
    pub async fn reconcile(&self) -> crate::Result<ReconcileReport> {
        let _pass = self.pass_lock.lock().await;

        let remote = self.fetch_remote().await?;
        let local = self.registry.load().await?;
        let plan = ReconcilePlan::build(&remote, local);

        if plan.is_noop() {
            debug!(servers = plan.result.len(), "Registry already up to date");
            return Ok(plan.into_report());
        }

        let store = self.registry.store();
        store.apply(&plan.ops()).await?;
        store.save().await?;

        let report = plan.into_report();
        Self::log_changes(&report);
        Ok(report)
    }

    /// Remote id -> display name. Entries without an identifier are skipped;
    /// a repeated identifier keeps the last name listed.
    async fn fetch_remote(&self) -> crate::Result<BTreeMap<String, String>> {
        let servers = self.source.list_servers().await?;
        let mut remote = BTreeMap::new();

        for server in servers {
            let Some(id) = server.identifier.filter(|id| !id.is_empty()) else {
                warn!(name = ?server.name, "Skipping remote server without identifier");
                continue;
            };
            let name = server.name.unwrap_or_else(|| id.clone());
            remote.insert(id, name);
        }

        debug!(remote_servers = remote.len(), "Fetched remote server list");
        Ok(remote)
    }

    fn log_changes(report: &ReconcileReport) {
        for removal in &report.removed {
            info!(
                local_key = %removal.local_key,
                server_id = ?removal.remote_id,
                reason = ?removal.reason,
                "Removed registry entry"
            );
        }
        for rename in &report.renamed {
            info!(
                local_key = %rename.local_key,
                server_id = %rename.remote_id,
                from = %rename.from,
                to = %rename.to,
                "Renamed registry entry"
            );
        }
        for created in &report.created {
            info!(
                local_key = %created.local_key,
                server_id = %created.remote_id,
                name = %created.name,
                "Added registry entry"
            );
        }
        info!(
            created = report.created.len(),
            renamed = report.renamed.len(),
            removed = report.removed.len(),
            total = report.servers.len(),
            "Registry reconciled"
        );
    }

    // ========================================
    // Periodic sync
    // ========================================

    /// Run `reconcile` forever. The first pass runs immediately; a transient
    /// panel failure reschedules after its cooldown instead of `interval`.
    pub async fn start_periodic_sync(self: Arc<Self>, interval: Option<Duration>) {
        let interval = interval
            .map(|i| i.max(MIN_SYNC_INTERVAL))
            .unwrap_or(DEFAULT_SYNC_INTERVAL);

        info!(
            interval_secs = interval.as_secs(),
            "Starting periodic registry sync"
        );

        loop {
            let delay = self.execute_periodic_sync(interval).await;
            tokio::time::sleep(delay).await;
        }
    }

    /// One scheduled pass; returns the delay before the next one
    pub async fn execute_periodic_sync(&self, interval: Duration) -> Duration {
        {
            let mut state = self.periodic_state.write().await;
            if state.is_running {
                warn!("Periodic sync already running, skipping");
                return interval;
            }
            state.is_running = true;
        }

        let result = self.reconcile().await;

        let mut state = self.periodic_state.write().await;
        state.is_running = false;

        let delay = match result {
            Ok(report) => {
                state.last_success = Some(Utc::now());
                state.consecutive_failures = 0;
                state.last_error = None;
                debug!(changes = report.change_count(), "Periodic sync completed");
                interval
            }
            Err(e) => {
                state.consecutive_failures += 1;
                state.last_error = Some(e.to_string());

                match e.as_panel().and_then(|p| p.retry_after()) {
                    Some(retry_after) => {
                        warn!(
                            error = %e,
                            retry_after_secs = retry_after.as_secs(),
                            consecutive_failures = state.consecutive_failures,
                            "Periodic sync blocked, retrying after cooldown"
                        );
                        retry_after
                    }
                    None => {
                        error!(
                            error = %e,
                            consecutive_failures = state.consecutive_failures,
                            "Periodic sync failed"
                        );
                        interval
                    }
                }
            }
        };

        state.next_sync_at = chrono::Duration::from_std(delay)
            .ok()
            .map(|d| Utc::now() + d);
        delay
    }

    pub async fn periodic_state(&self) -> PeriodicSyncState {
        self.periodic_state.read().await.clone()
    }
}
