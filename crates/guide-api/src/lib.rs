//! Guide API /v1: REST + SSE endpoints over the guide engine
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;

pub use error::ApiError;
pub use metrics::Metrics;

use axum::{
    routing::{get, post},
    Router,
};
use guide_engine::GuideEngine;
use guide_render::{GuideRenderer, MarkdownRenderer, RenderError};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<GuideEngine>,
    pub renderer: Arc<dyn GuideRenderer>,
    pub metrics: Arc<Metrics>,
}

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("metrics: {0}")]
    Metrics(#[from] prometheus::Error),
    #[error(transparent)]
    Render(#[from] RenderError),
}

impl AppState {
    /// Built-in Markdown templates and a fresh metrics registry
    pub fn new(engine: Arc<GuideEngine>) -> Result<Self, StartupError> {
        Ok(Self {
            engine,
            renderer: Arc::new(MarkdownRenderer::new()?),
            metrics: Arc::new(Metrics::new()?),
        })
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn GuideRenderer>) -> Self {
        self.renderer = renderer;
        self
    }
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/v1/guides", post(handlers::create_guide))
        .route("/v1/guides/stream", post(handlers::stream_guide))
        .route("/v1/trips/{id}", get(handlers::get_trip))
        .route("/v1/trips/{id}/guide.md", get(handlers::get_trip_markdown))
        .route("/v1/providers/health", get(handlers::providers_health))
        .route("/v1/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .layer(axum::middleware::from_fn(middleware::request_id))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::cors())
        .with_state(state)
}

pub async fn run(addr: &str, state: AppState) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("guide API listening on {}", addr);
    axum::serve(listener, create_app(state)).await
}
