use axum::{http::StatusCode, routing::get, Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    config::Config,
    db::Cache,
    graph::GraphStore,
    middleware::{make_span_with_request_id, request_id_middleware},
    services::ScoreFusionEngine,
};

pub mod movies;
pub mod recommendations;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub engine: ScoreFusionEngine,
    pub graph: Arc<dyn GraphStore>,
    /// Response cache; `None` when Redis is not configured
    pub cache: Option<Cache>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(
        engine: ScoreFusionEngine,
        graph: Arc<dyn GraphStore>,
        cache: Option<Cache>,
        config: Config,
    ) -> Self {
        Self {
            engine,
            graph,
            cache,
            config: Arc::new(config),
        }
    }
}

/// Creates the application router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_routes())
        .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// API routes under /api
fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/movies/search", get(movies::search))
        .route("/movies/:movie_id", get(movies::detail))
        .route(
            "/recommendations/:movie_id",
            get(recommendations::recommend),
        )
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}
