use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::{
    dto::sse::{MATCH_STATE_EVENT, ServerEvent},
    error::ServiceError,
    state::{MatchId, MatchState, SharedState, normalize},
};

/// Accept a full record for `id`: normalize, persist, then fan out to subscribers.
pub async fn publish_state(state: &SharedState, id: &MatchId, raw: &Value) -> MatchState {
    let normalized = normalize(raw);
    let topic = state.topic(id);

    topic.replace(normalized.clone()).await;
    state.store().save(id, &normalized).await;

    match state_event(&normalized) {
        Ok(event) => topic.hub().broadcast(event),
        Err(err) => warn!(match_id = %id, error = %err, "failed to encode match state event"),
    }
    debug!(
        match_id = %id,
        subscribers = topic.hub().subscriber_count(),
        "match state published"
    );

    state.release_topic(id);
    normalized
}

/// Last record written for `id`.
pub async fn current_state(state: &SharedState, id: &MatchId) -> Result<MatchState, ServiceError> {
    if let Some(topic) = state.existing_topic(id) {
        if let Some(latest) = topic.latest().await {
            return Ok(latest);
        }
    }

    state
        .store()
        .load(id)
        .await
        .ok_or_else(|| ServiceError::NotFound(format!("match {id}")))
}

/// Join the live stream of `id`, returning the receiver and the record to send first.
pub async fn subscribe(
    state: &SharedState,
    id: &MatchId,
) -> (broadcast::Receiver<ServerEvent>, Option<MatchState>) {
    let (topic, receiver) = state.subscribe_topic(id);

    let initial = match topic.latest().await {
        Some(latest) => Some(latest),
        None => {
            let stored = state.store().load(id).await;
            if let Some(record) = &stored {
                topic.replace(record.clone()).await;
            }
            stored
        }
    };

    (receiver, initial)
}

/// SSE event carrying `record`.
pub fn state_event(record: &MatchState) -> serde_json::Result<ServerEvent> {
    ServerEvent::json(MATCH_STATE_EVENT.to_string(), record)
}
