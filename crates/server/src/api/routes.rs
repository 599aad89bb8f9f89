use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::middleware::metrics_middleware;
use super::{handlers, statifications};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        // Health, config and metrics
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        .route("/metrics", get(handlers::metrics))
        // Statification queries
        .route(
            "/statifications",
            get(statifications::list_history).post(statifications::start_crawl),
        )
        .route("/statifications/status", get(statifications::get_status))
        .route("/statifications/count", get(statifications::get_count))
        .route("/statifications/current", get(statifications::get_current))
        .route("/statifications/{hash}", get(statifications::get_info))
        // Lifecycle operations
        .route("/statifications/current/stop", post(statifications::stop_crawl))
        .route("/statifications/current/save", post(statifications::save))
        .route("/statifications/{hash}/deploy", post(statifications::deploy))
        .route(
            "/statifications/{hash}/visualize",
            post(statifications::visualize),
        )
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
}
