use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use serde_json::Value;

use crate::{
    dto::matches::MatchPath,
    error::AppError,
    services::relay_service,
    state::{MatchState, SharedState},
};

/// Routes storing and serving full match records.
pub fn router() -> Router<SharedState> {
    Router::new().route("/matches/{id}", get(get_match).put(put_match))
}

/// Replace the record of a match and push it to every subscriber.
///
/// Any JSON body is accepted; it is normalized before being stored.
#[utoipa::path(
    put,
    path = "/matches/{id}",
    tag = "matches",
    params(MatchPath),
    request_body = MatchState,
    responses(
        (status = 200, description = "Normalized record as stored", body = MatchState),
        (status = 400, description = "Malformed match id")
    )
)]
pub async fn put_match(
    State(state): State<SharedState>,
    Path(path): Path<MatchPath>,
    Json(payload): Json<Value>,
) -> Result<Json<MatchState>, AppError> {
    let id = path.into_match_id()?;
    let stored = relay_service::publish_state(&state, &id, &payload).await;
    Ok(Json(stored))
}

/// Return the last record written for a match.
#[utoipa::path(
    get,
    path = "/matches/{id}",
    tag = "matches",
    params(MatchPath),
    responses(
        (status = 200, description = "Current record", body = MatchState),
        (status = 400, description = "Malformed match id"),
        (status = 404, description = "Nothing was ever written for this match")
    )
)]
pub async fn get_match(
    State(state): State<SharedState>,
    Path(path): Path<MatchPath>,
) -> Result<Json<MatchState>, AppError> {
    let id = path.into_match_id()?;
    let current = relay_service::current_state(&state, &id).await?;
    Ok(Json(current))
}
