//! Node Registry
//!
//! In-memory mapping from watch key to node record. The registry does no
//! locking of its own; the monitor owns the lock around it.

use std::collections::HashMap;

use super::machine::{self, ExternalStatus, NodeStatus, Signal};

/// A service instance observed from the watch source
#[derive(Debug, Clone)]
pub struct Node {
    /// Watch key (immutable)
    pub key: String,
    /// Instance address
    pub address: String,
    /// Logical service name (immutable)
    pub service: String,
    status: NodeStatus,
    reported: bool,
    revision: u64,
}

impl Node {
    /// Create a node from its first set event
    pub fn new(key: String, address: String, service: String, signal: Signal) -> Self {
        Self {
            key,
            address,
            service,
            status: machine::initial_status(signal),
            reported: false,
            revision: 0,
        }
    }

    /// Current status
    pub fn status(&self) -> NodeStatus {
        self.status
    }

    /// Whether the current status has been delivered to the peer
    pub fn reported(&self) -> bool {
        self.reported
    }

    /// Counter bumped on every transition
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// UP/DOWN view of the current status
    pub fn external_status(&self) -> ExternalStatus {
        self.status.external()
    }

    /// Apply a set/update signal. Returns false on a no-op.
    pub fn apply_signal(&mut self, signal: Signal) -> bool {
        match machine::on_signal(self.status, signal) {
            Some(next) => {
                self.transition(next, true);
                true
            }
            None => false,
        }
    }

    /// Apply an expiry of the registration. Returns false on a no-op.
    pub fn expire(&mut self) -> bool {
        match machine::on_expire(self.status, self.reported) {
            Some(next) => {
                self.transition(next, true);
                true
            }
            None => false,
        }
    }

    /// Apply an explicit delete. Returns false when nothing changed.
    pub fn delete(&mut self) -> bool {
        let (next, reset) = machine::on_delete(self.status);
        if next == self.status && !reset {
            return false;
        }
        self.transition(next, reset);
        true
    }

    /// Record a successful delivery of the state at `revision`.
    /// Returns false if the node transitioned since.
    pub fn mark_reported(&mut self, revision: u64) -> bool {
        if self.revision != revision {
            return false;
        }
        self.reported = true;
        true
    }

    fn transition(&mut self, next: NodeStatus, reset: bool) {
        self.status = next;
        if reset {
            self.reported = false;
        }
        self.revision += 1;
    }
}

/// Key → node mapping
#[derive(Debug, Default)]
pub struct Registry {
    nodes: HashMap<String, Node>,
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a node
    pub fn get(&self, key: &str) -> Option<&Node> {
        self.nodes.get(key)
    }

    /// Look up a node for mutation
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Node> {
        self.nodes.get_mut(key)
    }

    /// Insert or replace the node stored under its key
    pub fn put(&mut self, node: Node) -> Option<Node> {
        self.nodes.insert(node.key.clone(), node)
    }

    /// Copy of every node
    pub fn snapshot(&self) -> Vec<Node> {
        self.nodes.values().cloned().collect()
    }

    /// Nodes belonging to a service
    pub fn nodes_for_service<'a>(&'a self, service: &'a str) -> impl Iterator<Item = &'a Node> + 'a {
        self.nodes.values().filter(move |n| n.service == service)
    }

    /// Number of nodes ever observed
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether no node has been observed yet
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
