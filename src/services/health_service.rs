use tracing::debug;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Report liveness together with the number of matches currently streamed.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    let matches = state.topic_count();
    debug!(matches, "health check");
    HealthResponse::ok(matches)
}
