//! Node Monitor
//!
//! Applies watch events to the registry, reports status changes to the
//! registered peer, and answers queries about the current view.
//!
//! The registry sits behind one mutex and the peer configuration behind
//! one rwlock. The lock is never held across a delivery; a delivery is
//! only recorded if the node has not transitioned while it was in flight.

use std::net::IpAddr;

use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::config::NodeWatchConfig;
use crate::error::Result;
use crate::protocol::{NodeEntry, ServiceNodes, ServiceNodesReport, TenantRegistration};
use crate::report::{PeerConfig, Reporter};
use crate::state::{Node, NodeStatus, Registry};
use crate::watch::{WatchAction, WatchEvent, WatchSource};

/// Process-wide monitor state
pub struct Monitor {
    registry: Mutex<Registry>,
    peer: RwLock<Option<PeerConfig>>,
    reporter: Reporter,
    report_path: String,
}

impl Monitor {
    /// Create a monitor with no nodes and no peer
    pub fn new(reporter: Reporter, report_path: impl Into<String>) -> Self {
        Self {
            registry: Mutex::new(Registry::new()),
            peer: RwLock::new(None),
            reporter,
            report_path: report_path.into(),
        }
    }

    /// Create a monitor from configuration
    pub fn from_config(config: &NodeWatchConfig) -> Result<Self> {
        let reporter = Reporter::new(config.report_timeout())?;
        Ok(Self::new(reporter, config.reporter.path.clone()))
    }

    /// Consume events until the source fails. Only returns on error.
    pub async fn watch<S: WatchSource + ?Sized>(&self, source: &mut S) -> Result<()> {
        info!("Watching for node changes");
        loop {
            let event = match source.next_event().await {
                Ok(event) => event,
                Err(e) => {
                    error!("Watch stream lost: {}", e);
                    return Err(e);
                }
            };
            self.handle_event(event).await;
        }
    }

    /// Apply one event and report the affected node
    pub async fn handle_event(&self, event: WatchEvent) {
        let Some(key) = self.apply_event(event).await else {
            return;
        };

        match self.report_status(&key).await {
            Ok(true) => debug!(key = %key, "Node status reported"),
            Ok(false) => {}
            Err(e) => warn!(key = %key, error = %e, "Failed to report node status"),
        }
    }

    /// Apply one event to the registry. Returns the affected key, or
    /// `None` if the event was skipped.
    pub async fn apply_event(&self, event: WatchEvent) -> Option<String> {
        match &event.action {
            WatchAction::Set | WatchAction::Update => {
                let info = match event.node_info() {
                    Ok(info) => info,
                    Err(e) => {
                        warn!(key = %event.key, error = %e, "Skipping event with malformed value");
                        return None;
                    }
                };
                let signal = info.signal();

                let mut registry = self.registry.lock().await;
                match registry.get_mut(&event.key) {
                    Some(node) => {
                        let from = node.status();
                        if node.apply_signal(signal) {
                            debug!(key = %event.key, %from, to = %node.status(), "Node updated");
                        }
                    }
                    None => {
                        let node = Node::new(event.key.clone(), info.ip, info.service, signal);
                        debug!(
                            key = %event.key,
                            service = %node.service,
                            status = %node.status(),
                            "Node discovered"
                        );
                        registry.put(node);
                    }
                }
            }
            WatchAction::Delete => {
                let mut registry = self.registry.lock().await;
                match registry.get_mut(&event.key) {
                    Some(node) => {
                        let from = node.status();
                        if node.delete() {
                            debug!(key = %event.key, %from, "Node removed");
                        }
                    }
                    None => debug!(key = %event.key, "Delete for unknown node"),
                }
            }
            WatchAction::Expire => {
                let mut registry = self.registry.lock().await;
                match registry.get_mut(&event.key) {
                    Some(node) => {
                        let from = node.status();
                        if node.expire() {
                            debug!(key = %event.key, %from, to = %node.status(), "Node expired");
                        }
                    }
                    None => debug!(key = %event.key, "Expiry for unknown node"),
                }
            }
            WatchAction::Other(action) => {
                warn!(key = %event.key, action = %action, "Ignoring unrecognized watch action");
                return None;
            }
        }

        Some(event.key)
    }

    /// Deliver the node's status to the peer unless it is already reported
    /// or no peer is registered. Returns whether a delivery was recorded.
    pub async fn report_status(&self, key: &str) -> Result<bool> {
        let peer = self.peer.read().await.clone();
        let Some(peer) = peer else {
            return Ok(false);
        };

        let (report, revision) = {
            let registry = self.registry.lock().await;
            match registry.get(key) {
                Some(node) if !node.reported() => {
                    (ServiceNodesReport::single(&peer.tenant_id, node), node.revision())
                }
                _ => return Ok(false),
            }
        };

        self.reporter.deliver(&peer.endpoint, &report).await?;

        let mut registry = self.registry.lock().await;
        Ok(registry
            .get_mut(key)
            .map(|node| node.mark_reported(revision))
            .unwrap_or(false))
    }

    /// Current view of the named services
    pub async fn nodes_for_services<S: AsRef<str>>(&self, names: &[S]) -> ServiceNodesReport {
        let tenant_id = self
            .peer
            .read()
            .await
            .as_ref()
            .map(|p| p.tenant_id.clone())
            .unwrap_or_default();

        let registry = self.registry.lock().await;
        let services = names
            .iter()
            .map(|name| ServiceNodes {
                serv_name: name.as_ref().to_string(),
                nodes: registry
                    .nodes_for_service(name.as_ref())
                    .map(NodeEntry::from)
                    .collect(),
            })
            .collect();

        ServiceNodesReport {
            tenant_id,
            services,
        }
    }

    /// Replace the peer registration
    pub async fn register_peer(
        &self,
        registration: &TenantRegistration,
        source: IpAddr,
    ) -> Result<PeerConfig> {
        let peer = PeerConfig::from_registration(registration, source, &self.report_path)?;
        info!("Registered peer {} for tenant {}", peer.endpoint, peer.tenant_id);
        *self.peer.write().await = Some(peer.clone());
        Ok(peer)
    }

    /// Current peer registration
    pub async fn peer(&self) -> Option<PeerConfig> {
        self.peer.read().await.clone()
    }

    /// Copy of a single node
    pub async fn node(&self, key: &str) -> Option<Node> {
        self.registry.lock().await.get(key).cloned()
    }

    /// Number of nodes ever observed
    pub async fn node_count(&self) -> usize {
        self.registry.lock().await.len()
    }

    /// Node counts by status
    pub async fn summary(&self) -> NodeSummary {
        let registry = self.registry.lock().await;
        let mut summary = NodeSummary::default();

        for node in registry.snapshot() {
            summary.total_nodes += 1;
            match node.status() {
                NodeStatus::Pending => summary.pending_nodes += 1,
                NodeStatus::Active => summary.active_nodes += 1,
                NodeStatus::Probationary => summary.probationary_nodes += 1,
                NodeStatus::Unreachable => summary.unreachable_nodes += 1,
                NodeStatus::Removed => summary.removed_nodes += 1,
            }
            if !node.reported() {
                summary.unreported_nodes += 1;
            }
        }

        summary
    }
}

/// Node counts by status
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NodeSummary {
    pub total_nodes: usize,
    pub pending_nodes: usize,
    pub active_nodes: usize,
    pub probationary_nodes: usize,
    pub unreachable_nodes: usize,
    pub removed_nodes: usize,
    pub unreported_nodes: usize,
}
