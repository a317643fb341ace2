use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::{
    broadcast::{self, error::RecvError},
    mpsc,
};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{info, warn};

use crate::{
    dto::sse::ServerEvent,
    services::relay_service,
    state::{MatchId, MatchState, SharedState},
};

fn to_event(payload: ServerEvent) -> Event {
    let mut event = Event::default().data(payload.data);
    if let Some(name) = payload.event {
        event = event.event(name);
    }
    event
}

/// Convert a topic receiver into an SSE response.
///
/// `initial` is sent before any broadcast event. Once the client disconnects
/// the receiver is dropped and the topic released if it was the last one.
pub fn to_sse_stream(
    state: SharedState,
    id: MatchId,
    mut receiver: broadcast::Receiver<ServerEvent>,
    initial: Option<MatchState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // A slow client stalls only its own forwarder, never the topic.
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);

    tokio::spawn(async move {
        let first = initial.map(|record| relay_service::state_event(&record));
        let connected = match first {
            Some(Ok(payload)) => tx.send(Ok(to_event(payload))).await.is_ok(),
            Some(Err(err)) => {
                warn!(match_id = %id, error = %err, "failed to encode initial match state");
                true
            }
            None => true,
        };

        if connected {
            loop {
                tokio::select! {
                    _ = tx.closed() => break,
                    recv_result = receiver.recv() => {
                        match recv_result {
                            Ok(payload) => {
                                if tx.send(Ok(to_event(payload))).await.is_err() {
                                    break;
                                }
                            }
                            Err(RecvError::Closed) => break,
                            Err(RecvError::Lagged(skipped)) => {
                                // Every event is a full record; the next one catches the client up.
                                warn!(match_id = %id, skipped, "match stream lagged");
                                continue;
                            }
                        }
                    }
                }
            }
        }

        drop(receiver);
        state.release_topic(&id);
        info!(match_id = %id, "match SSE stream disconnected");
    });

    let stream = ReceiverStream::new(rx);
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
