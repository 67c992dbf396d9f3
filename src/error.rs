//! NodeWatch Error Types

use thiserror::Error;

/// Result type alias for NodeWatch operations
pub type Result<T> = std::result::Result<T, Error>;

/// NodeWatch error types
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    // Watch source errors
    #[error("Watch error: {0}")]
    Watch(String),

    #[error("Watch stream closed")]
    WatchClosed,

    #[error("Invalid node info: {0}")]
    InvalidNodeInfo(#[from] serde_json::Error),

    // Reporting errors
    #[error("Delivery to {endpoint} failed: {reason}")]
    Delivery { endpoint: String, reason: String },

    #[error("Delivery timeout to {0}")]
    DeliveryTimeout(String),

    #[error("Invalid registration: {0}")]
    InvalidRegistration(String),

    // Network errors
    #[error("Network error: {0}")]
    Network(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Check if this error ends the watch loop
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Watch(_) | Error::WatchClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_watch_loss_is_fatal() {
        assert!(Error::Watch("connection reset".into()).is_fatal());
        assert!(Error::WatchClosed.is_fatal());
        assert!(!Error::DeliveryTimeout("http://10.0.0.1:80/".into()).is_fatal());
        assert!(!Error::InvalidRegistration("bad port".into()).is_fatal());
    }
}
