//! HTTP surface over the memory coordinator
//!
//! - `POST /api/chat` runs one turn
//! - `GET /api/memory/{user_id}` shows the user's latest session
//! - `GET /api/aggregate/{user_id}` shows activity across sessions
//! - `GET /health`

pub mod error;
pub mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::error::{RecollectError, Result};
use crate::memory::MemoryCoordinator;

pub use error::ApiError;

/// Shared application state for all handlers
pub struct AppState {
    pub coordinator: Arc<MemoryCoordinator>,
}

/// Create the router with all routes configured
pub fn create_router(state: Arc<AppState>, request_timeout: Duration) -> Router {
    Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/api/chat", post(handlers::chat_handler))
        .route("/api/memory/{user_id}", get(handlers::memory_handler))
        .route("/api/aggregate/{user_id}", get(handlers::aggregate_handler))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub struct ApiServer {
    config: ServerConfig,
    coordinator: Arc<MemoryCoordinator>,
}

impl ApiServer {
    pub fn new(config: ServerConfig, coordinator: Arc<MemoryCoordinator>) -> Self {
        Self {
            config,
            coordinator,
        }
    }

    /// Bind and serve until Ctrl+C or SIGTERM. Deferred summaries are
    /// allowed to finish before returning.
    pub async fn serve(&self) -> Result<()> {
        let state = Arc::new(AppState {
            coordinator: Arc::clone(&self.coordinator),
        });
        let app = create_router(state, Duration::from_secs(self.config.request_timeout_secs));

        let addr: SocketAddr = self
            .config
            .listen_addr
            .parse()
            .map_err(|e| RecollectError::Config(format!("Invalid listen address: {e}")))?;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| RecollectError::Config(format!("Failed to bind to {addr}: {e}")))?;

        tracing::info!("Listening on {addr}");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| RecollectError::Io(std::io::Error::other(format!("Server error: {e}"))))?;

        tracing::info!("Waiting for pending summaries");
        self.coordinator.wait_idle().await;

        tracing::info!("Server shut down gracefully");
        Ok(())
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MemoryConfig;
    use crate::storage::InMemoryStore;
    use crate::testing::{FailingGenerator, HashEmbedder, ScriptedGenerator};
    use crate::providers::TextGenerator;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn test_app(generator: Arc<dyn TextGenerator>) -> Router {
        let config = MemoryConfig {
            defer_summaries: false,
            ..MemoryConfig::default()
        };
        let coordinator = MemoryCoordinator::new(
            Arc::new(InMemoryStore::new()),
            generator,
            Arc::new(HashEmbedder::new()),
            config,
        );
        create_router(
            Arc::new(AppState {
                coordinator: Arc::new(coordinator),
            }),
            Duration::from_secs(5),
        )
    }

    fn chat_request(body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/chat")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_check() {
        let app = test_app(Arc::new(ScriptedGenerator::new(["hi"])));
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_chat_defaults_session() {
        let app = test_app(Arc::new(ScriptedGenerator::new(["Hello!"])));
        let response = app
            .oneshot(chat_request(serde_json::json!({
                "user_id": "alice",
                "message": "I love spicy food."
            })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["reply"], "Hello!");
        assert_eq!(json["memory"]["short_term_count"], 1);
        assert_eq!(json["memory"]["episodic_facts"][0]["fact"], "I love spicy food");
    }

    #[tokio::test]
    async fn test_chat_rejects_bad_identifier() {
        let app = test_app(Arc::new(ScriptedGenerator::new(["x"])));
        let response = app
            .oneshot(chat_request(serde_json::json!({
                "user_id": "alice smith",
                "message": "hi"
            })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"]["type"], "invalid_input");
    }

    #[tokio::test]
    async fn test_chat_generation_failure_is_bad_gateway() {
        let app = test_app(Arc::new(FailingGenerator::rejected(500)));
        let response = app
            .oneshot(chat_request(serde_json::json!({
                "user_id": "alice",
                "session_id": "s1",
                "message": "hello there"
            })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            body_json(response).await["error"]["type"],
            "generation_rejected"
        );
    }

    #[tokio::test]
    async fn test_memory_view_for_unknown_user() {
        let app = test_app(Arc::new(ScriptedGenerator::new(["x"])));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/memory/nobody")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["session_id"], "default");
        assert_eq!(json["short_term"].as_array().unwrap().len(), 0);
        assert!(json["lifetime_digest"].is_null());
    }

    #[tokio::test]
    async fn test_aggregate_view_empty() {
        let app = test_app(Arc::new(ScriptedGenerator::new(["x"])));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/aggregate/nobody")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["daily_turn_counts"].as_array().unwrap().len(), 0);
        assert_eq!(json["recent_digests"].as_array().unwrap().len(), 0);
    }
}
