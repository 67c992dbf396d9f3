//! NodeWatch - Service Liveness Monitor
//!
//! Watches the service instances registered in a coordination directory
//! (etcd) and relays their UP/DOWN status to one registered peer.
//!
//! # Architecture
//!
//! A single watch loop is the only writer of node state. Each change
//! event moves the affected node through a five-state status machine,
//! then the node is reported to the peer unless its current status has
//! already been delivered. Peer registration and service queries arrive
//! over HTTP on independent request paths.
//!
//! # Features
//!
//! - Long-poll watch of the etcd v2 keys API with retry-until-connected startup
//! - At most one report per status transition
//! - Point-in-time query of all nodes of a service
//! - Dynamic registration of the reporting peer

pub mod config;
pub mod error;
pub mod state;
pub mod watch;
pub mod protocol;
pub mod report;
pub mod monitor;
pub mod api;

pub use config::NodeWatchConfig;
pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::NodeWatchConfig;
    pub use crate::error::{Error, Result};
    pub use crate::monitor::Monitor;
    pub use crate::state::{ExternalStatus, Node, NodeStatus, Registry};
    pub use crate::watch::{EtcdWatcher, WatchAction, WatchEvent, WatchSource};
}
