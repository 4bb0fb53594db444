pub mod internal;

use axum::routing::{get, post};
use axum::Router;

use crate::state::SharedState;

pub fn internal_routes() -> Router<SharedState> {
    Router::new()
        .route(
            "/internal/forms/{form_id}/submissions",
            post(internal::enqueue_submission),
        )
        .route("/internal/forms/{form_id}/fanout", post(internal::fan_out))
}

pub fn health_routes() -> Router<SharedState> {
    Router::new().route("/health", get(health))
}

async fn health() -> &'static str {
    "ok"
}
