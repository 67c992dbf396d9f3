//! HTTP API Server
//!
//! Peer registration, service queries and a health endpoint.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{ConnectInfo, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::ApiConfig;
use crate::error::{Error, Result};
use crate::monitor::{Monitor, NodeSummary};
use crate::protocol::TenantRegistration;

/// HTTP API server
pub struct HttpServer {
    config: ApiConfig,
    monitor: Arc<Monitor>,
}

impl HttpServer {
    /// Create a new HTTP server
    pub fn new(config: ApiConfig, monitor: Arc<Monitor>) -> Self {
        Self { config, monitor }
    }

    /// Create the router
    pub fn create_router(monitor: Arc<Monitor>, cors_enabled: bool) -> Router {
        let router = Router::new()
            .route("/v1.0/tenant", post(handle_register))
            .route("/v1.0/service/:serv_name", get(handle_service))
            .route("/health", get(handle_health))
            .with_state(monitor)
            .layer(TraceLayer::new_for_http());

        if cors_enabled {
            router.layer(CorsLayer::permissive())
        } else {
            router
        }
    }

    /// Start the HTTP server
    pub async fn start(&self) -> Result<()> {
        let app = Self::create_router(Arc::clone(&self.monitor), self.config.cors_enabled);

        let listener = tokio::net::TcpListener::bind(&self.config.bind_address).await?;
        tracing::info!("HTTP API listening on {}", self.config.bind_address);

        axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
            .await
            .map_err(|e| Error::Network(format!("HTTP server error: {}", e)))?;

        Ok(())
    }
}

// ============ Request/Response Types ============

/// Error response
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

/// Health response
#[derive(Debug, Serialize)]
struct HealthResponse {
    healthy: bool,
    #[serde(rename = "tenant-id")]
    tenant_id: String,
    peer: Option<String>,
    nodes: usize,
    summary: NodeSummary,
}

// ============ Handlers ============

fn bad_request(error: String) -> Response {
    (StatusCode::BAD_REQUEST, Json(ErrorResponse { error })).into_response()
}

async fn handle_register(
    State(monitor): State<Arc<Monitor>>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    body: Bytes,
) -> Response {
    let registration: TenantRegistration = match serde_json::from_slice(&body) {
        Ok(r) => r,
        Err(e) => {
            tracing::warn!("Rejected registration from {}: {}", remote, e);
            return bad_request(format!("invalid registration body: {}", e));
        }
    };

    match monitor.register_peer(&registration, remote.ip()).await {
        Ok(_) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::warn!("Rejected registration from {}: {}", remote, e);
            bad_request(e.to_string())
        }
    }
}

async fn handle_service(
    State(monitor): State<Arc<Monitor>>,
    Path(serv_name): Path<String>,
) -> impl IntoResponse {
    Json(monitor.nodes_for_services(&[serv_name]).await)
}

async fn handle_health(State(monitor): State<Arc<Monitor>>) -> impl IntoResponse {
    let peer = monitor.peer().await;

    Json(HealthResponse {
        healthy: true,
        tenant_id: peer.as_ref().map(|p| p.tenant_id.clone()).unwrap_or_default(),
        peer: peer.map(|p| p.endpoint),
        nodes: monitor.node_count().await,
        summary: monitor.summary().await,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{Method, Request};
    use tower::ServiceExt;

    use crate::report::Reporter;
    use crate::watch::{WatchAction, WatchEvent};

    fn monitor() -> Arc<Monitor> {
        Arc::new(Monitor::new(
            Reporter::new(Duration::from_secs(1)).unwrap(),
            "/api/v1.0/monitor",
        ))
    }

    fn request(method: Method, uri: &str, body: &'static str) -> Request<Body> {
        let mut request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([10, 0, 0, 5], 40312))));
        request
    }

    async fn send(router: Router, request: Request<Body>) -> (StatusCode, Bytes) {
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, body)
    }

    #[tokio::test]
    async fn test_register_echoes_body() {
        let monitor = monitor();
        let router = HttpServer::create_router(Arc::clone(&monitor), false);
        let body = r#"{"port":"9090","tenant-id":"tenant-a"}"#;

        let (status, echoed) = send(router, request(Method::POST, "/v1.0/tenant", body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(&echoed[..], body.as_bytes());

        let peer = monitor.peer().await.unwrap();
        assert_eq!(peer.tenant_id, "tenant-a");
        assert_eq!(peer.endpoint, "http://10.0.0.5:9090/api/v1.0/monitor");
    }

    #[tokio::test]
    async fn test_register_rejects_malformed_body() {
        let monitor = monitor();

        for body in ["not json", r#"{"tenant-id":"t"}"#, r#"{"port":"abc","tenant-id":"t"}"#] {
            let router = HttpServer::create_router(Arc::clone(&monitor), false);
            let (status, response) = send(router, request(Method::POST, "/v1.0/tenant", body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);

            let json: serde_json::Value = serde_json::from_slice(&response).unwrap();
            assert!(json["error"].is_string());
        }

        assert!(monitor.peer().await.is_none());
    }

    #[tokio::test]
    async fn test_query_service() {
        let monitor = monitor();
        monitor
            .apply_event(WatchEvent::new(
                WatchAction::Set,
                "/service/web/1",
                Some(Bytes::from_static(br#"{"ip":"10.0.0.1","service":"web","status":"UP"}"#)),
            ))
            .await;
        monitor
            .apply_event(WatchEvent::new(
                WatchAction::Set,
                "/service/db/1",
                Some(Bytes::from_static(br#"{"ip":"10.0.0.2","service":"db","status":"UP"}"#)),
            ))
            .await;

        let router = HttpServer::create_router(Arc::clone(&monitor), false);
        let (status, body) = send(router, request(Method::GET, "/v1.0/service/web", "")).await;
        assert_eq!(status, StatusCode::OK);

        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "tenant-id": "",
                "services": [{
                    "serv-name": "web",
                    "nodes": [{"ip": "10.0.0.1", "status": "UP"}]
                }]
            })
        );
    }

    #[tokio::test]
    async fn test_query_unknown_service_is_empty() {
        let router = HttpServer::create_router(monitor(), true);
        let (status, body) = send(router, request(Method::GET, "/v1.0/service/nothing", "")).await;
        assert_eq!(status, StatusCode::OK);

        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["services"][0]["serv-name"], "nothing");
        assert_eq!(json["services"][0]["nodes"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_health() {
        let monitor = monitor();
        monitor
            .apply_event(WatchEvent::new(
                WatchAction::Set,
                "/service/web/1",
                Some(Bytes::from_static(br#"{"ip":"10.0.0.1","service":"web","status":"UP"}"#)),
            ))
            .await;

        let router = HttpServer::create_router(Arc::clone(&monitor), false);
        let (status, body) = send(router, request(Method::GET, "/health", "")).await;
        assert_eq!(status, StatusCode::OK);

        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["healthy"], true);
        assert_eq!(json["tenant-id"], "");
        assert!(json["peer"].is_null());
        assert_eq!(json["nodes"], 1);
        assert_eq!(json["summary"]["total_nodes"], 1);
        assert_eq!(json["summary"]["pending_nodes"], 1);

        let registration = TenantRegistration {
            port: "9090".to_string(),
            tenant_id: "tenant-a".to_string(),
        };
        monitor
            .register_peer(&registration, "10.0.0.5".parse().unwrap())
            .await
            .unwrap();

        let router = HttpServer::create_router(Arc::clone(&monitor), false);
        let (_, body) = send(router, request(Method::GET, "/health", "")).await;
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["tenant-id"], "tenant-a");
        assert_eq!(json["peer"], "http://10.0.0.5:9090/api/v1.0/monitor");
    }
}
