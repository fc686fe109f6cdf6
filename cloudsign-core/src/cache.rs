//! Per-group snapshot of the servers the controller reports.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use scc::HashMap;
use scc::hash_map::Entry;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::controller::ControllerApi;
use crate::error::Result;
use crate::models::BackendServer;
use crate::registry::LocationRegistry;

/// Outcome of one [`ServerCache::refresh`] pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RefreshSummary {
    pub refreshed: usize,
    pub failed: usize,
}

/// In-memory cache of backend servers, keyed by group name.
///
/// Each group maps to an immutable list behind an `Arc`. A refresh swaps the
/// whole list, so readers see either the old or the new snapshot.
pub struct ServerCache {
    servers: HashMap<String, Arc<Vec<BackendServer>>>,
    controller: Arc<dyn ControllerApi>,
    registry: Arc<dyn LocationRegistry>,
}

impl ServerCache {
    pub fn new(controller: Arc<dyn ControllerApi>, registry: Arc<dyn LocationRegistry>) -> Self {
        Self {
            servers: HashMap::new(),
            controller,
            registry,
        }
    }

    /// Latest snapshot for `group`. Empty until the first successful refresh.
    pub async fn servers_by_group(&self, group: &str) -> Arc<Vec<BackendServer>> {
        self.servers
            .read_async(group, |_, servers| Arc::clone(servers))
            .await
            .unwrap_or_default()
    }

    /// Replace the snapshot of a single group.
    pub async fn replace(&self, group: &str, servers: Vec<BackendServer>) {
        let servers = Arc::new(servers);
        match self.servers.entry_async(group.to_string()).await {
            Entry::Occupied(mut entry) => {
                *entry.get_mut() = servers;
            }
            Entry::Vacant(entry) => {
                entry.insert_entry(servers);
            }
        }
    }

    /// Fetch every registered group from the controller.
    ///
    /// A failing group keeps its previous snapshot and does not stop the
    /// others. Groups that are no longer registered are dropped.
    pub async fn refresh(&self) -> Result<RefreshSummary> {
        let groups = self.registry.groups().await?;
        let mut summary = RefreshSummary::default();

        for group in &groups {
            match self.controller.servers_by_group(group).await {
                Ok(servers) => {
                    debug!(group = %group, count = servers.len(), "refreshed server cache");
                    self.replace(group, servers).await;
                    summary.refreshed += 1;
                }
                Err(err) => {
                    warn!(group = %group, error = %err, "failed to refresh servers, keeping last snapshot");
                    summary.failed += 1;
                }
            }
        }

        let registered: HashSet<&String> = groups.iter().collect();
        self.servers
            .retain_async(|group, _| registered.contains(group))
            .await;

        Ok(summary)
    }

    pub async fn clear(&self) {
        self.servers.retain_async(|_, _| false).await;
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }

    /// Refresh every `interval` until `cancel` fires.
    pub async fn run(self: Arc<Self>, interval: Duration, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(interval_ms = interval.as_millis() as u64, "server cache refresher started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    if let Err(err) = self.refresh().await {
                        warn!(error = %err, "server cache refresh failed");
                    }
                }
            }
        }

        info!("server cache refresher stopped");
    }
}
