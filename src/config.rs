//! NodeWatch Configuration
//!
//! This module provides configuration structures for the NodeWatch
//! service liveness monitor.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main NodeWatch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeWatchConfig {
    /// Coordination directory (etcd) configuration
    pub etcd: EtcdConfig,

    /// API configuration
    #[serde(default)]
    pub api: ApiConfig,

    /// Peer reporting configuration
    #[serde(default)]
    pub reporter: ReporterConfig,
}

/// Coordination directory configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EtcdConfig {
    /// Base URLs of the etcd members (e.g. "http://192.168.0.2:4001")
    pub endpoints: Vec<String>,

    /// Directory watched recursively for service registrations
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// Time allowed for etcd to answer the headers of a request
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Delay between startup connection attempts
    #[serde(default = "default_connect_retry_ms")]
    pub connect_retry_ms: u64,
}

/// API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// HTTP API bind address
    #[serde(default = "default_api_address")]
    pub bind_address: String,

    /// Enable CORS
    #[serde(default)]
    pub cors_enabled: bool,
}

/// Peer reporting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReporterConfig {
    /// Path appended to the registered peer's address
    #[serde(default = "default_report_path")]
    pub path: String,

    /// Upper bound for a single delivery
    #[serde(default = "default_report_timeout_ms")]
    pub timeout_ms: u64,
}

// Default value functions
fn default_prefix() -> String {
    "/service".to_string()
}

fn default_request_timeout_ms() -> u64 {
    1000
}

fn default_connect_retry_ms() -> u64 {
    1000
}

fn default_api_address() -> String {
    "0.0.0.0:7171".to_string()
}

fn default_report_path() -> String {
    "/api/v1.0/monitor".to_string()
}

fn default_report_timeout_ms() -> u64 {
    5000
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_api_address(),
            cors_enabled: false,
        }
    }
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            path: default_report_path(),
            timeout_ms: default_report_timeout_ms(),
        }
    }
}

impl NodeWatchConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &std::path::Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load configuration from a TOML string
    pub fn from_str(content: &str) -> crate::Result<Self> {
        let config: NodeWatchConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> crate::Result<()> {
        if self.etcd.endpoints.is_empty() {
            return Err(crate::Error::Config("etcd.endpoints cannot be empty".into()));
        }

        for endpoint in &self.etcd.endpoints {
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                return Err(crate::Error::Config(format!(
                    "etcd endpoint must be an http(s) URL: {}",
                    endpoint
                )));
            }
        }

        if !self.etcd.prefix.starts_with('/') {
            return Err(crate::Error::Config("etcd.prefix must start with '/'".into()));
        }

        if self.api.bind_address.is_empty() {
            return Err(crate::Error::Config("api.bind_address cannot be empty".into()));
        }

        if !self.reporter.path.starts_with('/') {
            return Err(crate::Error::Config("reporter.path must start with '/'".into()));
        }

        if self.reporter.timeout_ms == 0 {
            return Err(crate::Error::Config("reporter.timeout_ms must be greater than 0".into()));
        }

        Ok(())
    }

    /// Get the etcd header timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.etcd.request_timeout_ms)
    }

    /// Get the startup connection retry delay as Duration
    pub fn connect_retry(&self) -> Duration {
        Duration::from_millis(self.etcd.connect_retry_ms)
    }

    /// Get the delivery timeout as Duration
    pub fn report_timeout(&self) -> Duration {
        Duration::from_millis(self.reporter.timeout_ms)
    }
}
