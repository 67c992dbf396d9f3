//! Wire Types
//!
//! JSON bodies shared by the query API, peer registration and the
//! outbound status reports.

use serde::{Deserialize, Serialize};

use crate::state::{ExternalStatus, Node};

/// Status of a set of services, as queried or reported
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceNodesReport {
    #[serde(rename = "tenant-id")]
    pub tenant_id: String,
    pub services: Vec<ServiceNodes>,
}

/// Nodes of one service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceNodes {
    #[serde(rename = "serv-name")]
    pub serv_name: String,
    pub nodes: Vec<NodeEntry>,
}

/// One node and its UP/DOWN status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeEntry {
    pub ip: String,
    pub status: ExternalStatus,
}

impl From<&Node> for NodeEntry {
    fn from(node: &Node) -> Self {
        Self {
            ip: node.address.clone(),
            status: node.external_status(),
        }
    }
}

impl ServiceNodesReport {
    /// Report describing exactly one node of one service
    pub fn single(tenant_id: &str, node: &Node) -> Self {
        Self {
            tenant_id: tenant_id.to_string(),
            services: vec![ServiceNodes {
                serv_name: node.service.clone(),
                nodes: vec![NodeEntry::from(node)],
            }],
        }
    }
}

/// Peer registration request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantRegistration {
    pub port: String,
    #[serde(rename = "tenant-id")]
    pub tenant_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Signal;

    #[test]
    fn test_single_node_report_schema() {
        let node = Node::new("/service/web/1".into(), "10.0.0.9".into(), "web".into(), Signal::Up);
        let report = ServiceNodesReport::single("tenant-a", &node);

        assert_eq!(
            serde_json::to_value(&report).unwrap(),
            serde_json::json!({
                "tenant-id": "tenant-a",
                "services": [{
                    "serv-name": "web",
                    "nodes": [{"ip": "10.0.0.9", "status": "UP"}]
                }]
            })
        );
    }

    #[test]
    fn test_registration_requires_both_fields() {
        let ok: TenantRegistration =
            serde_json::from_str(r#"{"port":"8080","tenant-id":"t1"}"#).unwrap();
        assert_eq!(ok.port, "8080");
        assert_eq!(ok.tenant_id, "t1");

        assert!(serde_json::from_str::<TenantRegistration>(r#"{"port":"8080"}"#).is_err());
        assert!(serde_json::from_str::<TenantRegistration>(r#"{"port":8080,"tenant-id":"t1"}"#).is_err());
    }
}
