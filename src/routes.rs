use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::coach::handlers as coach_handlers;
use crate::middleware::cors_headers;
use crate::openapi::swagger_ui;
use crate::AppState;

/// Build the coach API routes
fn coach_routes() -> Router<AppState> {
    Router::new().route(
        "/api/coach",
        post(coach_handlers::generate)
            .options(coach_handlers::preflight)
            .fallback(coach_handlers::method_not_allowed),
    )
}

/// Build the complete application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health check at root level
        .route("/", get(coach_handlers::health))
        .route("/health", get(coach_handlers::health))
        .merge(coach_routes())
        // Swagger UI for API documentation
        .merge(swagger_ui())
        .layer(middleware::from_fn(cors_headers))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
