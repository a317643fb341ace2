use tokio::sync::{RwLock, broadcast};

use crate::{dto::sse::ServerEvent, state::match_state::MatchState};

/// Per-match fan-out: the last accepted state plus the hub its subscribers listen on.
pub struct MatchTopic {
    hub: SseHub,
    latest: RwLock<Option<MatchState>>,
}

impl MatchTopic {
    /// Create an empty topic whose hub buffers up to `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        Self {
            hub: SseHub::new(capacity),
            latest: RwLock::new(None),
        }
    }

    /// Broadcast hub of the topic.
    pub fn hub(&self) -> &SseHub {
        &self.hub
    }

    /// Last state written to this topic since the relay started.
    pub async fn latest(&self) -> Option<MatchState> {
        self.latest.read().await.clone()
    }

    /// Record a newly written state.
    pub async fn replace(&self, state: MatchState) {
        let mut guard = self.latest.write().await;
        *guard = Some(state);
    }
}

/// Simple broadcast hub wrapper used by the SSE services.
pub struct SseHub {
    sender: broadcast::Sender<ServerEvent>,
}

impl SseHub {
    /// Construct a new hub backed by a Tokio broadcast channel with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Register a new subscriber that will receive subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.sender.subscribe()
    }

    /// Send an event to all current subscribers, ignoring delivery errors.
    pub fn broadcast(&self, event: ServerEvent) {
        let _ = self.sender.send(event);
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
