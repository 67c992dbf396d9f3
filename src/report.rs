//! Peer Reporting
//!
//! Delivers node status changes to the single registered peer.

use std::net::IpAddr;
use std::time::Duration;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::protocol::{ServiceNodesReport, TenantRegistration};

/// Where reports for the tenant are delivered
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeerConfig {
    #[serde(rename = "tenant-id")]
    pub tenant_id: String,
    pub endpoint: String,
}

impl PeerConfig {
    /// Build the peer endpoint from a registration and the address it came from
    pub fn from_registration(
        registration: &TenantRegistration,
        source: IpAddr,
        path: &str,
    ) -> Result<Self> {
        let port: u16 = registration.port.trim().parse().map_err(|_| {
            Error::InvalidRegistration(format!("invalid port: {:?}", registration.port))
        })?;
        if port == 0 {
            return Err(Error::InvalidRegistration("port cannot be 0".into()));
        }

        let host = match source.to_canonical() {
            IpAddr::V4(ip) => ip.to_string(),
            IpAddr::V6(ip) => format!("[{}]", ip),
        };

        Ok(Self {
            tenant_id: registration.tenant_id.clone(),
            endpoint: format!("http://{}:{}{}", host, port, path),
        })
    }
}

/// HTTP delivery of status reports
pub struct Reporter {
    client: reqwest::Client,
}

impl Reporter {
    /// Create a reporter whose deliveries give up after `timeout`
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Network(format!("failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// POST a report to the peer. Any completed HTTP exchange counts as delivered.
    pub async fn deliver(&self, endpoint: &str, report: &ServiceNodesReport) -> Result<()> {
        let response = self
            .client
            .post(endpoint)
            .json(report)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::DeliveryTimeout(endpoint.to_string())
                } else {
                    Error::Delivery {
                        endpoint: endpoint.to_string(),
                        reason: e.to_string(),
                    }
                }
            })?;

        if !response.status().is_success() {
            tracing::warn!("Peer {} answered {} to status report", endpoint, response.status());
        }
        Ok(())
    }
}
