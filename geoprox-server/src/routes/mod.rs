//! HTTP route handlers and router configuration

mod admin;
mod properties;

use crate::rate_limit;
use crate::state::AppState;
use axum::{
    middleware,
    routing::{delete, get},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the main application router
pub fn build_router(state: Arc<AppState>) -> Router {
    // API routes sit behind the per-client rate limiter
    let api_routes = Router::new()
        .route(
            "/api/v1/properties",
            get(properties::list).post(properties::create),
        )
        .route("/api/v1/properties/nearby", get(properties::nearby))
        .route(
            "/api/v1/properties/coordinate-range-indexing",
            get(properties::coordinate_range),
        )
        .route(
            "/api/v1/properties/get-property/:id",
            get(properties::get_by_id),
        )
        .route("/api/v1/properties/aggregate", get(properties::aggregate))
        .route("/api/v1/properties/cacheStats", get(properties::cache_stats))
        .route(
            "/api/v1/properties/clear-cache",
            delete(properties::clear_cache),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit::rate_limit,
        ))
        .with_state(state.clone());

    let mut router = Router::new()
        .route("/health", get(admin::health))
        .with_state(state.clone())
        .merge(api_routes);

    router = router.layer(TraceLayer::new_for_http());

    if state.config.cors_enabled {
        router = router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }

    router
}
