//! etcd Watch Source
//!
//! Long-polls the etcd v2 keys API for changes under the service
//! directory. Each request waits for exactly one event; the next request
//! resumes from the index after it.

use std::time::Duration;

use bytes::Bytes;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::{WatchAction, WatchEvent, WatchSource};
use crate::config::NodeWatchConfig;
use crate::error::{Error, Result};

/// Response to a wait request
#[derive(Debug, Deserialize)]
struct WatchResponse {
    action: String,
    node: ResponseNode,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponseNode {
    key: String,
    #[serde(default)]
    value: Option<String>,
    #[serde(default)]
    modified_index: u64,
}

/// Error body returned by etcd
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EtcdError {
    error_code: u64,
    message: String,
    #[serde(default)]
    cause: Option<String>,
}

/// Watch source backed by an etcd v2 member
pub struct EtcdWatcher {
    client: reqwest::Client,
    endpoint: String,
    prefix: String,
    request_timeout: Duration,
    wait_index: Option<u64>,
}

impl EtcdWatcher {
    /// Create a watcher on a single endpoint without probing it
    pub fn new(endpoint: &str, prefix: &str, request_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(request_timeout)
            .build()
            .map_err(|e| Error::Watch(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            prefix: prefix.to_string(),
            request_timeout,
            wait_index: None,
        })
    }

    /// Connect to the first answering endpoint, retrying until one does
    pub async fn connect(config: &NodeWatchConfig) -> Result<Self> {
        let mut attempt: u64 = 0;
        loop {
            attempt += 1;
            for endpoint in &config.etcd.endpoints {
                let watcher = Self::new(endpoint, &config.etcd.prefix, config.request_timeout())?;
                match watcher.probe().await {
                    Ok(version) => {
                        info!("Connected to etcd at {} ({})", watcher.endpoint, version.trim());
                        return Ok(watcher);
                    }
                    Err(e) => {
                        warn!(attempt, endpoint = %endpoint, error = %e, "etcd connection failed");
                    }
                }
            }
            tokio::time::sleep(config.connect_retry()).await;
        }
    }

    /// Endpoint this watcher is bound to
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Index the next wait request resumes from
    pub fn wait_index(&self) -> Option<u64> {
        self.wait_index
    }

    async fn probe(&self) -> Result<String> {
        let url = format!("{}/version", self.endpoint);
        let response = tokio::time::timeout(self.request_timeout, self.client.get(&url).send())
            .await
            .map_err(|_| Error::Watch(format!("timeout probing {}", url)))?
            .map_err(|e| Error::Watch(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::Watch(format!("{} answered {}", url, response.status())));
        }
        response.text().await.map_err(|e| Error::Watch(e.to_string()))
    }

    fn keys_url(&self) -> String {
        format!("{}/v2/keys{}", self.endpoint, self.prefix)
    }
}

#[async_trait::async_trait]
impl WatchSource for EtcdWatcher {
    async fn next_event(&mut self) -> Result<WatchEvent> {
        loop {
            let mut request = self
                .client
                .get(self.keys_url())
                .query(&[("wait", "true"), ("recursive", "true")]);
            if let Some(index) = self.wait_index {
                request = request.query(&[("waitIndex", index)]);
            }

            // etcd flushes headers as soon as the wait is registered
            let response = tokio::time::timeout(self.request_timeout, request.send())
                .await
                .map_err(|_| Error::Watch(format!("timeout waiting on {}", self.endpoint)))?
                .map_err(|e| Error::Watch(e.to_string()))?;

            let status = response.status();
            let body = response
                .bytes()
                .await
                .map_err(|e| Error::Watch(e.to_string()))?;

            if !status.is_success() {
                return Err(Error::Watch(describe_error(status, &body)));
            }

            if body.is_empty() {
                debug!("Empty watch response from {}, waiting again", self.endpoint);
                continue;
            }

            let response: WatchResponse = serde_json::from_slice(&body)
                .map_err(|e| Error::Watch(format!("invalid watch response: {}", e)))?;

            self.wait_index = Some(response.node.modified_index + 1);

            return Ok(WatchEvent {
                action: WatchAction::parse(&response.action),
                key: response.node.key,
                value: response.node.value.map(Bytes::from),
            });
        }
    }
}

fn describe_error(status: reqwest::StatusCode, body: &[u8]) -> String {
    match serde_json::from_slice::<EtcdError>(body) {
        Ok(err) => match err.cause {
            Some(cause) => format!("etcd error {}: {} ({})", err.error_code, err.message, cause),
            None => format!("etcd error {}: {}", err.error_code, err.message),
        },
        Err(_) => format!("etcd answered {}", status),
    }
}
