//! Node Status State Machine
//!
//! Converts raw watch events into a stable node status. Every rule is a
//! plain lookup over `(current status, event)`; there is no ordering
//! between statuses.
//!
//! ```text
//!                 up                               up
//!  Probationary ───────▶ Pending    Unreachable | Removed ───────▶ Active
//!       ▲                   │
//!       │ expire,           │ down, or expire
//!       │ unreported        │ once reported
//!       └───────────────────┤
//!                           ▼
//!                      Unreachable ◀──── down | expire ──── Active
//!
//!  delete: any status ───────▶ Removed
//! ```

use serde::{Deserialize, Serialize};

/// Status of a watched node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeStatus {
    /// Seen up, not yet confirmed by a later lifecycle step
    Pending,
    /// Confirmed up
    Active,
    /// Newly seen and not up, or demoted before being reported
    Probationary,
    /// Was up, then lost (expired registration or down signal)
    Unreachable,
    /// Explicitly deleted
    Removed,
}

impl NodeStatus {
    /// All statuses, in display order
    pub const ALL: [NodeStatus; 5] = [
        NodeStatus::Pending,
        NodeStatus::Active,
        NodeStatus::Probationary,
        NodeStatus::Unreachable,
        NodeStatus::Removed,
    ];

    /// Status as seen outside the monitor
    pub fn external(self) -> ExternalStatus {
        match self {
            NodeStatus::Pending | NodeStatus::Active => ExternalStatus::Up,
            NodeStatus::Probationary | NodeStatus::Unreachable | NodeStatus::Removed => {
                ExternalStatus::Down
            }
        }
    }
}

impl std::fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeStatus::Pending => write!(f, "PENDING"),
            NodeStatus::Active => write!(f, "ACTIVE"),
            NodeStatus::Probationary => write!(f, "PROBATIONARY"),
            NodeStatus::Unreachable => write!(f, "UNREACHABLE"),
            NodeStatus::Removed => write!(f, "REMOVED"),
        }
    }
}

/// Reported status vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExternalStatus {
    Up,
    Down,
}

impl std::fmt::Display for ExternalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExternalStatus::Up => write!(f, "UP"),
            ExternalStatus::Down => write!(f, "DOWN"),
        }
    }
}

/// Liveness signal carried by a set/update event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Up,
    Down,
    /// Neither "UP" nor "DOWN"
    Unknown,
}

impl Signal {
    /// Parse the status string of a registration value
    pub fn parse(status: &str) -> Self {
        match status {
            "UP" => Signal::Up,
            "DOWN" => Signal::Down,
            _ => Signal::Unknown,
        }
    }
}

/// Status of a node created by its first set event
pub fn initial_status(signal: Signal) -> NodeStatus {
    match signal {
        Signal::Up => NodeStatus::Pending,
        Signal::Down | Signal::Unknown => NodeStatus::Probationary,
    }
}

/// Next status after a set/update event; `None` is a no-op
pub fn on_signal(current: NodeStatus, signal: Signal) -> Option<NodeStatus> {
    use NodeStatus::*;

    match (signal, current) {
        (Signal::Up, Probationary) => Some(Pending),
        (Signal::Up, Unreachable | Removed) => Some(Active),
        (Signal::Up, Pending | Active) => None,
        (Signal::Down, Pending | Active) => Some(Unreachable),
        (Signal::Down, Probationary | Unreachable | Removed) => None,
        (Signal::Unknown, _) => None,
    }
}

/// Next status after the registration expired; `None` is a no-op
pub fn on_expire(current: NodeStatus, reported: bool) -> Option<NodeStatus> {
    use NodeStatus::*;

    match current {
        Active => Some(Unreachable),
        Pending if reported => Some(Unreachable),
        Pending => Some(Probationary),
        Probationary | Unreachable | Removed => None,
    }
}

/// Status after a delete event, and whether the reported flag resets
pub fn on_delete(current: NodeStatus) -> (NodeStatus, bool) {
    let reset = matches!(current, NodeStatus::Pending | NodeStatus::Active);
    (NodeStatus::Removed, reset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use NodeStatus::*;

    #[test]
    fn test_external_status_mapping() {
        for status in NodeStatus::ALL {
            let expected = if matches!(status, Pending | Active) {
                ExternalStatus::Up
            } else {
                ExternalStatus::Down
            };
            assert_eq!(status.external(), expected, "{}", status);
        }
    }

    #[test]
    fn test_external_status_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&ExternalStatus::Up).unwrap(), "\"UP\"");
        assert_eq!(serde_json::to_string(&ExternalStatus::Down).unwrap(), "\"DOWN\"");
    }

    #[test]
    fn test_signal_parse() {
        assert_eq!(Signal::parse("UP"), Signal::Up);
        assert_eq!(Signal::parse("DOWN"), Signal::Down);
        assert_eq!(Signal::parse("up"), Signal::Unknown);
        assert_eq!(Signal::parse(""), Signal::Unknown);
    }

    #[test]
    fn test_initial_status() {
        assert_eq!(initial_status(Signal::Up), Pending);
        assert_eq!(initial_status(Signal::Down), Probationary);
        assert_eq!(initial_status(Signal::Unknown), Probationary);
    }

    #[test]
    fn test_up_signal_table() {
        assert_eq!(on_signal(Probationary, Signal::Up), Some(Pending));
        assert_eq!(on_signal(Unreachable, Signal::Up), Some(Active));
        assert_eq!(on_signal(Removed, Signal::Up), Some(Active));
        assert_eq!(on_signal(Pending, Signal::Up), None);
        assert_eq!(on_signal(Active, Signal::Up), None);
    }

    #[test]
    fn test_down_signal_table() {
        assert_eq!(on_signal(Pending, Signal::Down), Some(Unreachable));
        assert_eq!(on_signal(Active, Signal::Down), Some(Unreachable));
        assert_eq!(on_signal(Probationary, Signal::Down), None);
        assert_eq!(on_signal(Unreachable, Signal::Down), None);
        assert_eq!(on_signal(Removed, Signal::Down), None);
    }

    #[test]
    fn test_unknown_signal_never_transitions() {
        for status in NodeStatus::ALL {
            assert_eq!(on_signal(status, Signal::Unknown), None);
        }
    }

    #[test]
    fn test_expire_table() {
        assert_eq!(on_expire(Active, false), Some(Unreachable));
        assert_eq!(on_expire(Active, true), Some(Unreachable));
        assert_eq!(on_expire(Pending, false), Some(Probationary));
        assert_eq!(on_expire(Pending, true), Some(Unreachable));
        for status in [Probationary, Unreachable, Removed] {
            assert_eq!(on_expire(status, false), None);
            assert_eq!(on_expire(status, true), None);
        }
    }

    #[test]
    fn test_delete_table() {
        assert_eq!(on_delete(Pending), (Removed, true));
        assert_eq!(on_delete(Active), (Removed, true));
        assert_eq!(on_delete(Probationary), (Removed, false));
        assert_eq!(on_delete(Unreachable), (Removed, false));
        assert_eq!(on_delete(Removed), (Removed, false));
    }
}
