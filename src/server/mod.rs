//! HTTP surface
//!
//! Wires the axum router, request-size limits, and request tracing around
//! the removal engine. Everything below this module is transport-agnostic.

pub mod error;
pub mod handlers;

pub use error::ApiError;

use crate::config::ServiceConfig;
use crate::engine::RemovalEngine;
use crate::error::{RemovalError, Result};
use crate::session::SessionHolder;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Application state injected into handlers
#[derive(Clone)]
pub struct AppState {
    /// Shared pipeline engine holding the model session reference
    pub engine: Arc<RemovalEngine>,
    /// Service configuration
    pub config: Arc<ServiceConfig>,
}

/// Build the router with all routes and middleware
#[must_use]
pub fn build_router(engine: Arc<RemovalEngine>, config: Arc<ServiceConfig>) -> Router {
    let max_body_bytes = config.max_body_bytes;
    let state = AppState { engine, config };

    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        .route("/remove-bg", post(handlers::remove_bg))
        .route("/remove-bg-base64", post(handlers::remove_bg_base64))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind the listener and serve until shutdown.
///
/// Call only with a successfully initialized session; startup failures must
/// abort before this point so a broken session never receives traffic.
pub async fn serve(config: ServiceConfig, session: &SessionHolder) -> Result<()> {
    let config = Arc::new(config);
    let engine = Arc::new(RemovalEngine::new(session, &config));
    let router = build_router(engine, Arc::clone(&config));

    let listener = TcpListener::bind(config.bind_address()).await.map_err(|e| {
        RemovalError::internal(format!("Failed to bind {}: {e}", config.bind_address()))
    })?;
    let local_addr = listener
        .local_addr()
        .map_err(|e| RemovalError::internal(format!("Failed to read local address: {e}")))?;

    tracing::info!(
        address = %local_addr,
        model = session.source_label(),
        max_body_bytes = config.max_body_bytes,
        max_dimension = config.max_dimension,
        "Listening for connections"
    );

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| RemovalError::internal(format!("Server error: {e}")))?;

    tracing::info!("HTTP server stopped");
    Ok(())
}

/// Resolve on SIGINT or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
