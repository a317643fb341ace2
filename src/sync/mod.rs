//! Propagation of match records from the keeper to its displays.
//!
//! A [`SyncChannel`] wraps one [`SyncTransport`], picked once at startup: the
//! remote relay when one is configured, the local store otherwise. Publishing is
//! fire-and-forget and subscribers only ever see normalized states.

/// Same-device transport.
pub mod local;
/// Relay transport.
#[cfg(feature = "remote-sync")]
pub mod remote;
/// SSE body decoding for the relay transport.
#[cfg(feature = "remote-sync")]
pub mod sse_frame;

use std::{error::Error, future::Future, sync::Arc};

use futures::future::BoxFuture;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::{
    config::AppConfig,
    dao::local_store::LocalStore,
    state::{MatchId, MatchState},
};

use self::local::LocalTransport;

/// Callback receiving every state delivered to a subscription.
pub type UpdateFn = Arc<dyn Fn(MatchState) + Send + Sync>;
/// Result alias for transport operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Transport-level failures. Logged by [`SyncChannel`], never surfaced further.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Building the HTTP client failed.
    #[error("failed to build relay client")]
    Client {
        /// Underlying failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// The request could not be sent or its body could not be read.
    #[error("relay request to `{path}` failed")]
    Request {
        /// Target of the request.
        path: String,
        /// Underlying failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// The relay answered with a non-success status.
    #[error("unexpected relay response status {status} for `{path}`")]
    Status {
        /// Target of the request.
        path: String,
        /// HTTP status code.
        status: u16,
    },
}

/// One way of moving match records between devices.
pub trait SyncTransport: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;
    /// Push the full record of a match.
    fn publish(&self, id: &MatchId, state: &MatchState) -> BoxFuture<'static, SyncResult<()>>;
    /// Start delivering records of a match to `on_update`.
    fn subscribe(&self, id: &MatchId, on_update: UpdateFn) -> Subscription;
}

/// Live subscription; delivery stops when it is unsubscribed or dropped.
#[derive(Debug)]
pub struct Subscription {
    match_id: MatchId,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    /// Run `follow` as the delivery task of a subscription to `match_id`.
    pub fn spawn<F>(match_id: MatchId, follow: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Self {
            match_id,
            task: Some(tokio::spawn(follow)),
        }
    }

    /// Match this subscription follows.
    pub fn match_id(&self) -> &MatchId {
        &self.match_id
    }

    /// Whether the delivery task is still running.
    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Stop delivery now.
    pub fn unsubscribe(mut self) {
        self.cancel();
    }

    fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            debug!(match_id = %self.match_id, "subscription released");
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Fire-and-forget front of the transport selected at startup.
#[derive(Clone)]
pub struct SyncChannel {
    transport: Arc<dyn SyncTransport>,
}

impl SyncChannel {
    /// Use an explicit transport.
    pub fn new(transport: Arc<dyn SyncTransport>) -> Self {
        Self { transport }
    }

    /// Pick the transport from configuration: the relay when a URL is set and
    /// usable, the local store otherwise.
    pub fn from_config(config: &AppConfig, store: LocalStore) -> Self {
        if let Some(url) = config.relay_url.as_deref() {
            match remote_transport(url) {
                Some(transport) => {
                    info!(relay = %url, "using remote sync transport");
                    return Self::new(transport);
                }
                None => warn!(relay = %url, "remote sync unavailable; using local transport"),
            }
        }

        info!(
            poll_ms = config.poll_interval.as_millis() as u64,
            "using local sync transport"
        );
        Self::new(Arc::new(LocalTransport::new(store, config.poll_interval)))
    }

    /// Name of the active transport.
    pub fn transport_name(&self) -> &'static str {
        self.transport.name()
    }

    /// Publish a record; failures are logged and dropped.
    pub async fn publish(&self, id: &MatchId, state: &MatchState) {
        if let Err(err) = self.transport.publish(id, state).await {
            warn!(
                match_id = %id,
                transport = self.transport.name(),
                error = %err,
                "failed to publish match state"
            );
        }
    }

    /// Deliver every record of `id` to `on_update` until the handle is dropped.
    pub fn subscribe<F>(&self, id: &MatchId, on_update: F) -> Subscription
    where
        F: Fn(MatchState) + Send + Sync + 'static,
    {
        debug!(match_id = %id, transport = self.transport.name(), "subscribing");
        self.transport.subscribe(id, Arc::new(on_update))
    }
}

#[cfg(feature = "remote-sync")]
fn remote_transport(url: &str) -> Option<Arc<dyn SyncTransport>> {
    match remote::RemoteTransport::new(url) {
        Ok(transport) => Some(Arc::new(transport)),
        Err(err) => {
            warn!(relay = %url, error = %err, "failed to initialise relay client");
            None
        }
    }
}

#[cfg(not(feature = "remote-sync"))]
fn remote_transport(url: &str) -> Option<Arc<dyn SyncTransport>> {
    warn!(relay = %url, "built without the `remote-sync` feature");
    None
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::dao::kv::MemoryKeyValueStore;

    struct FailingTransport;

    impl SyncTransport for FailingTransport {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn publish(&self, _id: &MatchId, _state: &MatchState) -> BoxFuture<'static, SyncResult<()>> {
            Box::pin(async {
                Err(SyncError::Status {
                    path: "/matches".into(),
                    status: 503,
                })
            })
        }

        fn subscribe(&self, id: &MatchId, _on_update: UpdateFn) -> Subscription {
            Subscription::spawn(id.clone(), futures::future::pending())
        }
    }

    fn id() -> MatchId {
        MatchId::parse("abc123").unwrap()
    }

    #[tokio::test]
    async fn publish_failures_are_swallowed() {
        let channel = SyncChannel::new(Arc::new(FailingTransport));
        channel.publish(&id(), &MatchState::default()).await;
        assert_eq!(channel.transport_name(), "failing");
    }

    #[tokio::test]
    async fn dropping_a_subscription_stops_its_task() {
        let channel = SyncChannel::new(Arc::new(FailingTransport));
        let subscription = channel.subscribe(&id(), |_| {});
        assert!(subscription.is_active());
        assert_eq!(subscription.match_id(), &id());
        subscription.unsubscribe();
    }

    #[tokio::test]
    async fn local_transport_is_selected_without_relay() {
        let store = LocalStore::new(Arc::new(MemoryKeyValueStore::new()));
        let config = AppConfig {
            poll_interval: Duration::from_millis(50),
            ..AppConfig::default()
        };
        let channel = SyncChannel::from_config(&config, store);
        assert_eq!(channel.transport_name(), "local");
    }

    #[cfg(feature = "remote-sync")]
    #[tokio::test]
    async fn remote_transport_is_selected_with_relay() {
        let store = LocalStore::new(Arc::new(MemoryKeyValueStore::new()));
        let config = AppConfig {
            relay_url: Some("http://127.0.0.1:9".into()),
            ..AppConfig::default()
        };
        let channel = SyncChannel::from_config(&config, store);
        assert_eq!(channel.transport_name(), "remote");
    }
}
