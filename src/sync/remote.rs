use std::{sync::Arc, time::Duration};

use futures::{StreamExt, future::BoxFuture};
use reqwest::{Client, StatusCode, header};
use tokio::time::sleep;
use tracing::{debug, info, warn};
use url::Url;

use super::{
    Subscription, SyncError, SyncResult, SyncTransport, UpdateFn,
    sse_frame::SseFrameDecoder,
};
use crate::{
    dto::sse::MATCH_STATE_EVENT,
    state::{MatchId, MatchState},
};

const INITIAL_RETRY_DELAY: Duration = Duration::from_secs(1);
const MAX_RETRY_DELAY: Duration = Duration::from_secs(10);

/// Cross-device transport backed by the relay server.
///
/// Keepers `PUT` the full record, displays hold an SSE stream open and get the
/// current record on connect followed by every later write.
#[derive(Clone)]
pub struct RemoteTransport {
    client: Client,
    base_url: Arc<str>,
}

impl RemoteTransport {
    /// Build a client for the relay at `base_url`.
    pub fn new(base_url: &str) -> SyncResult<Self> {
        let parsed = Url::parse(base_url).map_err(|err| SyncError::Client {
            source: Box::new(err),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(SyncError::Client {
                source: format!("unsupported relay scheme `{}`", parsed.scheme()).into(),
            });
        }

        let client = Client::builder()
            .build()
            .map_err(|err| SyncError::Client {
                source: Box::new(err),
            })?;

        Ok(Self {
            client,
            base_url: Arc::from(base_url.trim_end_matches('/')),
        })
    }

    fn record_path(id: &MatchId) -> String {
        format!("/matches/{id}")
    }

    fn events_path(id: &MatchId) -> String {
        format!("/matches/{id}/events")
    }
}

impl SyncTransport for RemoteTransport {
    fn name(&self) -> &'static str {
        "remote"
    }

    fn publish(&self, id: &MatchId, state: &MatchState) -> BoxFuture<'static, SyncResult<()>> {
        let path = Self::record_path(id);
        let request = self
            .client
            .put(format!("{}{}", self.base_url, path))
            .json(state);

        Box::pin(async move {
            let response = request.send().await.map_err(|err| SyncError::Request {
                path: path.clone(),
                source: Box::new(err),
            })?;

            let status = response.status();
            if status.is_success() {
                Ok(())
            } else {
                Err(SyncError::Status {
                    path,
                    status: status.as_u16(),
                })
            }
        })
    }

    fn subscribe(&self, id: &MatchId, on_update: UpdateFn) -> Subscription {
        Subscription::spawn(id.clone(), follow_events(self.clone(), id.clone(), on_update))
    }
}

/// Keep an event stream open for `id`, reconnecting with exponential backoff.
async fn follow_events(transport: RemoteTransport, id: MatchId, on_update: UpdateFn) {
    let mut delay = INITIAL_RETRY_DELAY;

    loop {
        match stream_once(&transport, &id, &on_update).await {
            Ok(()) => {
                // The relay closed a healthy stream (restart, proxy timeout).
                debug!(match_id = %id, "relay stream ended; reconnecting");
                delay = INITIAL_RETRY_DELAY;
                sleep(delay).await;
            }
            Err(err) => {
                warn!(match_id = %id, error = %err, retry_in_ms = delay.as_millis() as u64, "relay subscription failed");
                sleep(delay).await;
                delay = (delay * 2).min(MAX_RETRY_DELAY);
            }
        }
    }
}

async fn stream_once(
    transport: &RemoteTransport,
    id: &MatchId,
    on_update: &UpdateFn,
) -> SyncResult<()> {
    let path = RemoteTransport::events_path(id);
    let response = transport
        .client
        .get(format!("{}{}", transport.base_url, path))
        .header(header::ACCEPT, "text/event-stream")
        .send()
        .await
        .map_err(|err| SyncError::Request {
            path: path.clone(),
            source: Box::new(err),
        })?;

    match response.status() {
        StatusCode::OK => {}
        other => {
            return Err(SyncError::Status {
                path,
                status: other.as_u16(),
            });
        }
    }
    info!(match_id = %id, "relay stream connected");

    let mut decoder = SseFrameDecoder::new();
    let mut body = response.bytes_stream();
    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|err| SyncError::Request {
            path: path.clone(),
            source: Box::new(err),
        })?;

        for frame in decoder.push(&chunk) {
            if frame.event.as_deref() != Some(MATCH_STATE_EVENT) {
                continue;
            }
            on_update(MatchState::from_json_str(&frame.data));
        }
    }

    Ok(())
}
