use tracing::debug;

use crate::{
    dao::local_store::LocalStore,
    services::{
        match_writer::MatchWriter,
        pairing::{self, PairingCode, PairingTarget},
        summary,
    },
    state::{MatchId, MatchState, Side},
    sync::SyncChannel,
};

/// The single writer of one match.
///
/// Mutations apply synchronously to the in-memory record. Every effective change
/// queues a persist-then-publish of the full record; no-op actions write nothing.
pub struct KeeperSession {
    id: MatchId,
    state: MatchState,
    writer: MatchWriter,
}

impl KeeperSession {
    /// Resume `id` from `store`, starting blank when nothing is stored locally.
    ///
    /// Nothing is written until the first effective change.
    pub async fn open(id: MatchId, store: LocalStore, channel: SyncChannel) -> Self {
        let state = store.load(&id).await.unwrap_or_default();
        debug!(match_id = %id, "keeper session resumed");
        Self {
            id,
            state,
            writer: MatchWriter::spawn(store, channel),
        }
    }

    /// Start a match under a freshly minted `id` and publish its blank record.
    pub fn create(id: MatchId, store: LocalStore, channel: SyncChannel) -> Self {
        let state = MatchState::default();
        let writer = MatchWriter::spawn(store, channel);
        writer.submit(id.clone(), state.clone());
        debug!(match_id = %id, "keeper session created");
        Self { id, state, writer }
    }

    /// Identifier of the match.
    pub fn id(&self) -> &MatchId {
        &self.id
    }

    /// Current record.
    pub fn state(&self) -> &MatchState {
        &self.state
    }

    /// Rename a side.
    pub fn set_name(&mut self, side: Side, name: &str) {
        self.mutate(|state| state.set_name(side, name));
    }

    /// Credit a rally to `side`.
    pub fn score_point(&mut self, side: Side) {
        self.mutate(|state| state.score_point(side));
    }

    /// Undo a rally of `side`; nothing happens at 0.
    pub fn remove_point(&mut self, side: Side) {
        self.mutate(|state| {
            state.remove_point(side);
        });
    }

    /// Credit a set to `side`.
    pub fn add_set(&mut self, side: Side) {
        self.mutate(|state| state.add_set(side));
    }

    /// Take a set back from `side`; nothing happens at 0.
    pub fn remove_set(&mut self, side: Side) {
        self.mutate(|state| {
            state.remove_set(side);
        });
    }

    /// Choose the opening server; ignored after the first rally.
    pub fn set_server_at_start(&mut self, side: Side) {
        self.mutate(|state| {
            state.set_server_at_start(side);
        });
    }

    /// Force the current server.
    pub fn override_server(&mut self, side: Side) {
        self.mutate(|state| state.override_server(side));
    }

    /// Award the set to `winner` and start the next one.
    pub fn next_set(&mut self, winner: Side) {
        self.mutate(|state| state.next_set(winner));
    }

    /// Code a display scans to follow this match.
    pub fn pairing_code(&self, target: &PairingTarget) -> PairingCode {
        pairing::encode(&self.id, target)
    }

    /// Plain-text summary of the match right now.
    pub fn summary(&self) -> String {
        summary::render(&self.state)
    }

    /// Wait for queued writes to land.
    pub async fn flush(&self) {
        self.writer.flush().await;
    }

    /// Flush pending writes and stop the writer.
    pub async fn close(self) {
        self.writer.close().await;
        debug!(match_id = %self.id, "keeper session closed");
    }

    fn mutate(&mut self, action: impl FnOnce(&mut MatchState)) {
        let before = self.state.clone();
        action(&mut self.state);
        if self.state != before {
            self.writer.submit(self.id.clone(), self.state.clone());
        }
    }
}
