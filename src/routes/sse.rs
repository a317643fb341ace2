use std::convert::Infallible;

use axum::{
    Router,
    extract::{Path, State},
    response::sse::Sse,
    routing::get,
};
use futures::Stream;
use tracing::info;

use crate::{
    dto::matches::MatchPath,
    error::AppError,
    services::{relay_service, sse_service},
    state::SharedState,
};

#[utoipa::path(
    get,
    path = "/matches/{id}/events",
    tag = "sse",
    params(MatchPath),
    responses(
        (status = 200, description = "`match.state` events: the current record first, then every write", content_type = "text/event-stream", body = String),
        (status = 400, description = "Malformed match id")
    )
)]
/// Stream the records of one match to a display.
pub async fn match_events(
    State(state): State<SharedState>,
    Path(path): Path<MatchPath>,
) -> Result<Sse<impl Stream<Item = Result<axum::response::sse::Event, Infallible>>>, AppError> {
    let id = path.into_match_id()?;
    let (receiver, initial) = relay_service::subscribe(&state, &id).await;
    info!(match_id = %id, has_record = initial.is_some(), "New match SSE connection");
    Ok(sse_service::to_sse_stream(state, id, receiver, initial))
}

/// Configure the SSE endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/matches/{id}/events", get(match_events))
}
