//! HTTP route handlers and router assembly

pub mod normalize;
pub mod quotes;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::AppState;

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(quotes::health))
        .route("/api/v1/quotes/estimate", post(quotes::estimate))
        .route("/api/v1/cache/invalidate", post(quotes::invalidate_cache))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
