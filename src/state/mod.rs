/// Match identifiers.
pub mod match_id;
/// Match record and normalization.
pub mod match_state;
/// Device mode machine.
pub mod mode;
mod serve;
mod sse;

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::broadcast;

use crate::{dao::local_store::LocalStore, dto::sse::ServerEvent};

pub use self::match_id::{InvalidMatchId, MatchId};
pub use self::match_state::{MatchState, Side, normalize};
pub use self::mode::{DeviceMode, DeviceRole, ModeEvent, ModeMachine};
pub use self::sse::{MatchTopic, SseHub};

/// Shared handle to the relay state.
pub type SharedState = Arc<AppState>;
/// Events buffered per subscriber before slow readers start skipping.
pub const TOPIC_CAPACITY: usize = 16;

/// Relay state: the store backing remote records and the live topics keyed by match.
pub struct AppState {
    store: LocalStore,
    topics: DashMap<MatchId, Arc<MatchTopic>>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    pub fn new(store: LocalStore) -> SharedState {
        Arc::new(Self {
            store,
            topics: DashMap::new(),
        })
    }

    /// Store the relay persists records into.
    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    /// Topic for `id`, created on first use.
    pub fn topic(&self, id: &MatchId) -> Arc<MatchTopic> {
        self.topics
            .entry(id.clone())
            .or_insert_with(|| Arc::new(MatchTopic::new(TOPIC_CAPACITY)))
            .clone()
    }

    /// Join the topic for `id`, creating it if needed.
    ///
    /// Subscribing happens under the map entry lock so a concurrent
    /// [`AppState::release_topic`] cannot drop the topic in between.
    pub fn subscribe_topic(
        &self,
        id: &MatchId,
    ) -> (Arc<MatchTopic>, broadcast::Receiver<ServerEvent>) {
        let entry = self
            .topics
            .entry(id.clone())
            .or_insert_with(|| Arc::new(MatchTopic::new(TOPIC_CAPACITY)));
        let receiver = entry.hub().subscribe();
        (entry.value().clone(), receiver)
    }

    /// Topic for `id` if one is live.
    pub fn existing_topic(&self, id: &MatchId) -> Option<Arc<MatchTopic>> {
        self.topics.get(id).map(|entry| entry.value().clone())
    }

    /// Drop the topic for `id` once nobody listens to it any more.
    ///
    /// The record itself survives in the store and is reloaded on next access.
    pub fn release_topic(&self, id: &MatchId) -> bool {
        self.topics
            .remove_if(id, |_, topic| topic.hub().subscriber_count() == 0)
            .is_some()
    }

    /// Number of live topics.
    pub fn topic_count(&self) -> usize {
        self.topics.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::kv::MemoryKeyValueStore;

    fn state() -> SharedState {
        AppState::new(LocalStore::new(Arc::new(MemoryKeyValueStore::new())))
    }

    #[test]
    fn topics_are_released_only_without_subscribers() {
        let state = state();
        let id = MatchId::parse("abc123").unwrap();

        let (_topic, receiver) = state.subscribe_topic(&id);
        assert_eq!(state.topic_count(), 1);
        assert!(!state.release_topic(&id));
        assert!(state.existing_topic(&id).is_some());

        drop(receiver);
        assert!(state.release_topic(&id));
        assert_eq!(state.topic_count(), 0);
    }

    #[test]
    fn topic_is_shared_per_match() {
        let state = state();
        let id = MatchId::parse("abc123").unwrap();
        let first = state.topic(&id);
        let (second, _receiver) = state.subscribe_topic(&id);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.hub().subscriber_count(), 1);
    }
}
