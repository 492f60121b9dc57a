//! HTTP surface built on axum.
//!
//! Handlers stay thin: each request builds its own pipeline on a blocking
//! thread and maps any [`SegmentError`](crate::error::SegmentError) to a
//! `500 {"status": false, "error": ...}` envelope.

mod form;
mod handlers;

use crate::config::AppConfig;
use axum::{Router, routing::get};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

pub use handlers::ApiError;

/// Shared, read-only handler state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }
}

/// Build the router: `/train`, `/` (form + predict) and `/health`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/train", get(handlers::train))
        .route("/", get(handlers::form).post(handlers::predict))
        .route("/health", get(handlers::health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve on `server.host:server.port` until the process is stopped.
pub async fn run(config: AppConfig) -> Result<(), std::io::Error> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let app = router(AppState::new(config));
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %listener.local_addr()?, "Gateway listening");
    axum::serve(listener, app).await?;
    Ok(())
}
