//! HTTP query service over the job store

pub mod routes;
pub mod state;

use axum::{extract::State, http::StatusCode, routing::get, Router};
use std::net::SocketAddr;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::JobBoardConfig;
use crate::error::{Error, Result};
use state::AppState;

/// Job board HTTP server
pub struct JobBoardServer {
    config: JobBoardConfig,
    state: AppState,
}

impl JobBoardServer {
    /// Create a new server
    pub fn new(config: JobBoardConfig) -> Result<Self> {
        let state = AppState::new(config.clone())?;
        Ok(Self { config, state })
    }

    /// Build the router with all routes
    pub fn router(&self) -> Router {
        let router = Router::new()
            // Health check
            .route("/health", get(health_check))
            .route("/ready", get(readiness))
            .nest("/api", routes::api_routes())
            .with_state(self.state.clone())
            // Middleware layers (applied bottom to top)
            .layer(TraceLayer::new_for_http())
            .layer(CompressionLayer::new());

        if self.config.server.enable_cors {
            let cors = CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any);
            router.layer(cors)
        } else {
            router
        }
    }

    /// Start the server
    pub async fn start(self) -> Result<()> {
        let addr: SocketAddr = self
            .address()
            .parse()
            .map_err(|e| Error::config(format!("Invalid address: {}", e)))?;

        let router = self.router();

        tracing::info!("Starting job board server on http://{}", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| Error::internal(format!("Failed to bind {}: {}", addr, e)))?;

        axum::serve(listener, router)
            .await
            .map_err(|e| Error::internal(format!("Server error: {}", e)))?;

        Ok(())
    }

    /// Get the server address
    pub fn address(&self) -> String {
        format!("{}:{}", self.config.server.host, self.config.server.port)
    }
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

/// Readiness check endpoint
async fn readiness(State(state): State<AppState>) -> StatusCode {
    if state.is_ready().await {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request};
    use axum::response::Response;
    use std::path::Path;
    use tower::ServiceExt;

    use crate::config::FilterKey;
    use crate::storage::JobStore;
    use crate::types::JobPosting;

    /// Server over a fresh store file inside `dir`
    pub(crate) fn test_server(dir: &Path, filter_key: FilterKey) -> JobBoardServer {
        let mut config = JobBoardConfig::default();
        config.database.path = dir.join("jobs.db");
        config.query.filter_key = filter_key;
        JobBoardServer::new(config).unwrap()
    }

    pub(crate) fn seed(server: &JobBoardServer, postings: &[JobPosting]) {
        let mut store = JobStore::connect(&server.config.database.path).unwrap();
        for posting in postings {
            store.upsert(posting).unwrap();
        }
    }

    pub(crate) async fn send(server: &JobBoardServer, method: Method, uri: &str) -> Response {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        server.router().oneshot(request).await.unwrap()
    }

    pub(crate) async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_and_ready() {
        let dir = tempfile::tempdir().unwrap();
        let server = test_server(dir.path(), FilterKey::Department);

        let response = send(&server, Method::GET, "/health").await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = send(&server, Method::GET, "/ready").await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_not_ready_without_store() {
        let dir = tempfile::tempdir().unwrap();
        let server = test_server(dir.path(), FilterKey::Department);
        std::fs::remove_file(&server.config.database.path).unwrap();

        let response = send(&server, Method::GET, "/ready").await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_non_get_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let server = test_server(dir.path(), FilterKey::Department);

        for (method, uri) in [
            (Method::POST, "/api/jobs"),
            (Method::DELETE, "/api/jobs/123"),
            (Method::PUT, "/api/jobs/123"),
            (Method::HEAD, "/api/jobs"),
            (Method::HEAD, "/api/jobs/123"),
        ] {
            let response = send(&server, method, uri).await;
            assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
            assert_eq!(response.headers()[header::ALLOW], "GET");
        }
    }

    #[tokio::test]
    async fn test_categories_and_info() {
        let dir = tempfile::tempdir().unwrap();
        let server = test_server(dir.path(), FilterKey::Category);

        let response = send(&server, Method::GET, "/api/categories").await;
        assert_eq!(response.status(), StatusCode::OK);
        let categories = body_json(response).await;
        assert_eq!(categories[0]["name"], "后端");
        assert_eq!(categories[0]["code"], "6704215862557018372");

        let info = body_json(send(&server, Method::GET, "/api/info").await).await;
        assert_eq!(info["name"], "job-board");
        assert_eq!(info["filter_key"], "category");
    }
}
