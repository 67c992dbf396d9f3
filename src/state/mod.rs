//! State Management Module
//!
//! Node records, the registry holding them, and the status state machine
//! that moves them between statuses.

pub mod machine;
mod registry;

pub use machine::{ExternalStatus, NodeStatus, Signal};
pub use registry::{Node, Registry};
