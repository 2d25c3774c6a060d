mod fonts;
mod middleware;

pub use fonts::{FontsState, SERVER_NAME};
pub use middleware::{REQUEST_ID_HEADER, RequestContext};

use axum::{Router, middleware as axum_middleware, routing::get};

use middleware::{log_responses, set_request_context};

/// Public surface: `/css`, `/s/{*path}` and a liveness check.
pub fn build_router(state: FontsState) -> Router {
    Router::new()
        .route("/css", get(fonts::stylesheet))
        .route("/s/{*path}", get(fonts::asset))
        .route("/_health", get(fonts::health))
        .with_state(state)
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}
