use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};
use tracing::{debug, warn};

use crate::{
    dao::local_store::LocalStore,
    state::{MatchId, MatchState},
    sync::SyncChannel,
};

enum WriterCommand {
    Write(MatchId, MatchState),
    Flush(oneshot::Sender<()>),
}

/// Background persist-then-publish pipeline for keeper snapshots.
///
/// Submitting never blocks. Snapshots queued while a previous write is in
/// flight collapse into the newest one, so a burst of taps costs one store
/// write and one publish.
pub struct MatchWriter {
    tx: mpsc::UnboundedSender<WriterCommand>,
    task: JoinHandle<()>,
}

impl MatchWriter {
    /// Start the writer task.
    pub fn spawn(store: LocalStore, channel: SyncChannel) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run(store, channel, rx));
        Self { tx, task }
    }

    /// Queue a snapshot of `id`.
    pub fn submit(&self, id: MatchId, state: MatchState) {
        if self.tx.send(WriterCommand::Write(id, state)).is_err() {
            warn!("match writer stopped; snapshot dropped");
        }
    }

    /// Wait until every snapshot queued so far is persisted and published.
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(WriterCommand::Flush(done_tx)).is_err() {
            return;
        }
        let _ = done_rx.await;
    }

    /// Flush and stop the task.
    pub async fn close(self) {
        let Self { tx, task } = self;
        drop(tx);
        if let Err(err) = task.await {
            warn!(error = %err, "match writer task failed");
        }
    }
}

async fn run(store: LocalStore, channel: SyncChannel, mut rx: mpsc::UnboundedReceiver<WriterCommand>) {
    while let Some(first) = rx.recv().await {
        let mut batch = vec![first];
        while let Ok(next) = rx.try_recv() {
            batch.push(next);
        }

        let mut latest: Option<(MatchId, MatchState)> = None;
        let mut skipped = 0usize;
        for command in batch {
            match command {
                WriterCommand::Write(id, state) => {
                    match latest.as_ref().map(|(previous, _)| *previous == id) {
                        Some(true) => skipped += 1,
                        Some(false) => {
                            if let Some(pending) = latest.take() {
                                write(&store, &channel, pending).await;
                            }
                        }
                        None => {}
                    }
                    latest = Some((id, state));
                }
                WriterCommand::Flush(done) => {
                    if let Some(pending) = latest.take() {
                        write(&store, &channel, pending).await;
                    }
                    let _ = done.send(());
                }
            }
        }
        if let Some(pending) = latest.take() {
            write(&store, &channel, pending).await;
        }
        if skipped > 0 {
            debug!(skipped, "coalesced keeper snapshots");
        }
    }
}

async fn write(store: &LocalStore, channel: &SyncChannel, (id, state): (MatchId, MatchState)) {
    store.save(&id, &state).await;
    channel.publish(&id, &state).await;
}
