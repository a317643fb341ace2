use std::{sync::Arc, time::Duration};

use futures::future::BoxFuture;
use tokio::{
    sync::broadcast::error::RecvError,
    time::{MissedTickBehavior, interval},
};
use tracing::debug;

use super::{Subscription, SyncResult, SyncTransport, UpdateFn};
use crate::{
    dao::local_store::LocalStore,
    state::{MatchId, MatchState},
};

/// Same-device transport: the keeper's local store write is the publication,
/// displays re-read the store on change notifications and on a fixed interval.
pub struct LocalTransport {
    store: LocalStore,
    poll_interval: Duration,
}

impl LocalTransport {
    /// Follow records in `store`, re-reading every `poll_interval`.
    pub fn new(store: LocalStore, poll_interval: Duration) -> Self {
        Self {
            store,
            poll_interval,
        }
    }
}

impl SyncTransport for LocalTransport {
    fn name(&self) -> &'static str {
        "local"
    }

    fn publish(&self, _id: &MatchId, _state: &MatchState) -> BoxFuture<'static, SyncResult<()>> {
        // The record is already in the local store; readers pick it up from there.
        Box::pin(async { Ok(()) })
    }

    fn subscribe(&self, id: &MatchId, on_update: UpdateFn) -> Subscription {
        Subscription::spawn(
            id.clone(),
            follow_local(
                self.store.clone(),
                id.clone(),
                self.poll_interval,
                on_update,
            ),
        )
    }
}

enum Wake {
    Refresh,
    Skip,
    NotificationsClosed,
}

async fn follow_local(
    store: LocalStore,
    id: MatchId,
    poll_interval: Duration,
    on_update: Arc<dyn Fn(MatchState) + Send + Sync>,
) {
    let key = LocalStore::state_key(&id);
    let mut changes = store.watch_changes();
    let mut ticker = interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last: Option<MatchState> = None;

    loop {
        let wake = if let Some(receiver) = changes.as_mut() {
            tokio::select! {
                _ = ticker.tick() => Wake::Refresh,
                change = receiver.recv() => match change {
                    Ok(changed) if changed == key => Wake::Refresh,
                    Ok(_) => Wake::Skip,
                    Err(RecvError::Lagged(_)) => Wake::Refresh,
                    Err(RecvError::Closed) => Wake::NotificationsClosed,
                },
            }
        } else {
            ticker.tick().await;
            Wake::Refresh
        };

        match wake {
            Wake::Refresh => {}
            Wake::Skip => continue,
            Wake::NotificationsClosed => {
                debug!(match_id = %id, "storage notifications closed; polling only");
                changes = None;
                continue;
            }
        }

        let Some(state) = store.load(&id).await else {
            continue;
        };
        if last.as_ref() != Some(&state) {
            on_update(state.clone());
            last = Some(state);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::json;
    use tokio::{sync::mpsc, time::timeout};

    use super::*;
    use crate::{dao::kv::MemoryKeyValueStore, state::Side};

    fn id() -> MatchId {
        MatchId::parse("abc123").unwrap()
    }

    fn sample_state() -> MatchState {
        crate::state::normalize(&json!({
            "name1": "Ana",
            "score1": 3,
            "score2": 1,
            "currentServer": 1,
        }))
    }

    fn collecting(
        transport: &LocalTransport,
    ) -> (Subscription, mpsc::UnboundedReceiver<MatchState>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let subscription = transport.subscribe(
            &id(),
            Arc::new(move |state| {
                let _ = tx.send(state);
            }),
        );
        (subscription, rx)
    }

    #[tokio::test]
    async fn storage_notification_delivers_keeper_write() {
        let store = LocalStore::new(Arc::new(MemoryKeyValueStore::new()));
        // Long poll period: only the change notification can deliver in time.
        let transport = LocalTransport::new(store.clone(), Duration::from_secs(3600));
        let (_subscription, mut updates) = collecting(&transport);
        tokio::time::sleep(Duration::from_millis(20)).await;

        store.save(&id(), &sample_state()).await;

        let received = timeout(Duration::from_millis(500), updates.recv())
            .await
            .expect("update within the notification window")
            .unwrap();
        assert_eq!(received.name(Side::One), "Ana");
        assert_eq!(received.score(Side::One), 3);
        assert_eq!(received.score(Side::Two), 1);
    }

    #[tokio::test]
    async fn polling_delivers_without_notifications() {
        let backend = MemoryKeyValueStore::without_notifications();
        let store = LocalStore::new(Arc::new(backend));
        let transport = LocalTransport::new(store.clone(), Duration::from_millis(50));
        let (_subscription, mut updates) = collecting(&transport);

        store.save(&id(), &sample_state()).await;

        let received = timeout(Duration::from_secs(1), updates.recv())
            .await
            .expect("update within one poll interval")
            .unwrap();
        assert_eq!(received, sample_state());
    }

    #[tokio::test]
    async fn unchanged_state_is_delivered_once() {
        let store = LocalStore::new(Arc::new(MemoryKeyValueStore::new()));
        store.save(&id(), &sample_state()).await;

        let transport = LocalTransport::new(store.clone(), Duration::from_millis(20));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let subscription = transport.subscribe(
            &id(),
            Arc::new(move |state| sink.lock().unwrap().push(state)),
        );

        tokio::time::sleep(Duration::from_millis(150)).await;
        store.save(&id(), &sample_state()).await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        drop(subscription);

        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unsubscribed_display_stops_receiving() {
        let store = LocalStore::new(Arc::new(MemoryKeyValueStore::new()));
        let transport = LocalTransport::new(store.clone(), Duration::from_millis(20));
        let (subscription, mut updates) = collecting(&transport);

        subscription.unsubscribe();
        store.save(&id(), &sample_state()).await;

        assert!(
            timeout(Duration::from_millis(200), updates.recv())
                .await
                .map(|update| update.is_none())
                .unwrap_or(true)
        );
    }

    #[tokio::test]
    async fn publish_is_a_no_op() {
        let store = LocalStore::new(Arc::new(MemoryKeyValueStore::new()));
        let transport = LocalTransport::new(store.clone(), Duration::from_millis(20));
        transport.publish(&id(), &sample_state()).await.unwrap();
        assert_eq!(store.load(&id()).await, None);
    }
}
