//! Watch Source Module
//!
//! The stream of key changes coming from the coordination directory, and
//! the adapters producing it.

mod etcd;

pub use etcd::EtcdWatcher;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::{Error, Result};
use crate::state::Signal;

/// Kind of change reported for a key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchAction {
    Set,
    Update,
    Delete,
    Expire,
    /// Any action the monitor does not act on
    Other(String),
}

impl WatchAction {
    /// Map a coordination directory action name
    pub fn parse(action: &str) -> Self {
        match action {
            "set" | "create" | "compareAndSwap" => WatchAction::Set,
            "update" => WatchAction::Update,
            "delete" | "compareAndDelete" => WatchAction::Delete,
            "expire" => WatchAction::Expire,
            other => WatchAction::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for WatchAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WatchAction::Set => write!(f, "set"),
            WatchAction::Update => write!(f, "update"),
            WatchAction::Delete => write!(f, "delete"),
            WatchAction::Expire => write!(f, "expire"),
            WatchAction::Other(action) => write!(f, "{}", action),
        }
    }
}

/// A single change notification
#[derive(Debug, Clone)]
pub struct WatchEvent {
    pub action: WatchAction,
    pub key: String,
    pub value: Option<Bytes>,
}

impl WatchEvent {
    pub fn new(action: WatchAction, key: impl Into<String>, value: Option<Bytes>) -> Self {
        Self {
            action,
            key: key.into(),
            value,
        }
    }

    /// Decode the registration carried by the event
    pub fn node_info(&self) -> Result<NodeInfo> {
        let value = self.value.as_deref().unwrap_or_default();
        Ok(serde_json::from_slice(value)?)
    }
}

/// Registration value written by a service instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeInfo {
    pub ip: String,
    pub service: String,
    pub status: String,
}

impl NodeInfo {
    pub fn signal(&self) -> Signal {
        Signal::parse(&self.status)
    }
}

/// Ordered source of watch events
#[async_trait::async_trait]
pub trait WatchSource: Send {
    /// Wait for the next event. An error means the stream is lost.
    async fn next_event(&mut self) -> Result<WatchEvent>;
}

/// Watch source fed through a channel
pub struct ChannelSource {
    rx: mpsc::Receiver<WatchEvent>,
}

impl ChannelSource {
    /// Create a source and the sender feeding it
    pub fn new(buffer: usize) -> (mpsc::Sender<WatchEvent>, Self) {
        let (tx, rx) = mpsc::channel(buffer);
        (tx, Self { rx })
    }
}

#[async_trait::async_trait]
impl WatchSource for ChannelSource {
    async fn next_event(&mut self) -> Result<WatchEvent> {
        self.rx.recv().await.ok_or(Error::WatchClosed)
    }
}
