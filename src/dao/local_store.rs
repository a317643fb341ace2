//! Match-level view over the device key/value storage.
//!
//! Storage failures never reach callers: a failed write is logged and dropped,
//! a failed read behaves like a missing entry. Losing one write must not stop
//! the scoring flow.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::{
    dao::kv::KeyValueStore,
    state::{MatchId, MatchState},
};

const STATE_KEY_PREFIX: &str = "match-state.";
const ACTIVE_MATCH_KEY: &str = "active-match";
const DISPLAYED_MATCH_KEY: &str = "displayed-match";

/// Persistent per-device storage of match records and the active-match pointer.
#[derive(Clone)]
pub struct LocalStore {
    backend: Arc<dyn KeyValueStore>,
}

impl LocalStore {
    /// Wrap a key/value backend.
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    /// Storage key of a match record. Identical on every device.
    pub fn state_key(id: &MatchId) -> String {
        format!("{STATE_KEY_PREFIX}{id}")
    }

    /// Persist the full record of a match.
    pub async fn save(&self, id: &MatchId, state: &MatchState) {
        let bytes = match serde_json::to_vec(state) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(match_id = %id, error = %err, "failed to encode match state; write dropped");
                return;
            }
        };

        if let Err(err) = self.backend.set(&Self::state_key(id), bytes).await {
            warn!(match_id = %id, error = %err, "failed to persist match state; write dropped");
        }
    }

    /// Read a match record, normalized. `None` only when nothing was ever written
    /// (or the storage could not be read).
    pub async fn load(&self, id: &MatchId) -> Option<MatchState> {
        match self.backend.get(&Self::state_key(id)).await {
            Ok(Some(bytes)) => Some(MatchState::from_json_slice(&bytes)),
            Ok(None) => None,
            Err(err) => {
                warn!(match_id = %id, error = %err, "failed to read match state");
                None
            }
        }
    }

    /// Delete the local record of a match.
    pub async fn clear(&self, id: &MatchId) {
        if let Err(err) = self.backend.remove(&Self::state_key(id)).await {
            warn!(match_id = %id, error = %err, "failed to clear match state");
        }
    }

    /// Remember the match this device keeps score of, across restarts.
    pub async fn remember_active_match(&self, id: &MatchId) {
        self.write_pointer(ACTIVE_MATCH_KEY, id).await;
    }

    /// Forget the kept match.
    pub async fn forget_active_match(&self) {
        self.remove_pointer(ACTIVE_MATCH_KEY).await;
    }

    /// Match this device keeps score of, if any.
    pub async fn active_match(&self) -> Option<MatchId> {
        self.read_pointer(ACTIVE_MATCH_KEY).await
    }

    /// Remember the match this device last paired with as a display.
    ///
    /// Kept apart from [`LocalStore::active_match`]: a displayed match belongs to
    /// another keeper and is never resumed for scoring.
    pub async fn remember_displayed_match(&self, id: &MatchId) {
        self.write_pointer(DISPLAYED_MATCH_KEY, id).await;
    }

    /// Match this device last displayed, if any.
    pub async fn displayed_match(&self) -> Option<MatchId> {
        self.read_pointer(DISPLAYED_MATCH_KEY).await
    }

    async fn write_pointer(&self, key: &'static str, id: &MatchId) {
        let bytes = id.as_str().as_bytes().to_vec();
        if let Err(err) = self.backend.set(key, bytes).await {
            warn!(pointer = key, match_id = %id, error = %err, "failed to remember match");
        }
    }

    async fn remove_pointer(&self, key: &'static str) {
        if let Err(err) = self.backend.remove(key).await {
            warn!(pointer = key, error = %err, "failed to forget match");
        }
    }

    async fn read_pointer(&self, key: &'static str) -> Option<MatchId> {
        let bytes = match self.backend.get(key).await {
            Ok(bytes) => bytes?,
            Err(err) => {
                warn!(pointer = key, error = %err, "failed to read match pointer");
                return None;
            }
        };

        let raw = String::from_utf8_lossy(&bytes);
        match MatchId::parse(raw.trim()) {
            Ok(id) => Some(id),
            Err(err) => {
                debug!(pointer = key, error = %err, "ignoring malformed match pointer");
                None
            }
        }
    }

    /// Keys changed through this storage domain, if the backend can report them.
    pub fn watch_changes(&self) -> Option<broadcast::Receiver<String>> {
        self.backend.changes()
    }
}
