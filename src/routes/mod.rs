use axum::Router;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::SharedState;

/// Swagger UI and OpenAPI document.
pub mod docs;
/// Health check.
pub mod health;
/// Match record reads and writes.
pub mod matches;
/// Match event streams.
pub mod sse;

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = health::router()
        .merge(matches::router())
        .merge(sse::router())
        .merge(docs::router());

    api_router.with_state(state)
}

/// [`router`] with the cross-cutting middleware the relay binary serves.
pub fn app(state: SharedState) -> Router<()> {
    router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
