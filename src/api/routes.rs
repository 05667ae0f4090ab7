use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::{make_span_with_request_id, request_id_middleware};

use super::handlers;
use super::AppState;

/// Creates the control API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", api_routes())
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// Routes under /api/v1
fn api_routes() -> Router<AppState> {
    Router::new()
        // Jobs
        .route("/jobs", get(handlers::list_jobs))
        .route("/jobs/:name/run", post(handlers::run_job))
        .route("/jobs/:name/cancel", post(handlers::cancel_job))
        // Recommendations
        .route("/recommendations", get(handlers::list_recommendations))
        .route(
            "/recommendations/:id/keep",
            post(handlers::keep_recommendation).delete(handlers::unkeep_recommendation),
        )
        .route(
            "/recommendations/:id/remove",
            post(handlers::remove_recommendation),
        )
}
