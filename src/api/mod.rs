//! HTTP API Module
//!
//! Provides the REST API for peer registration and service queries.

mod http;

pub use http::HttpServer;
