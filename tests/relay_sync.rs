#![cfg(feature = "remote-sync")]

use std::{sync::Arc, time::Duration};

use courtside::{
    dao::{kv::MemoryKeyValueStore, local_store::LocalStore},
    routes,
    services::{
        controller::{Controller, ScanOutcome},
        pairing::PairingTarget,
        scanner::{Camera, CameraError, CameraSession},
    },
    state::{AppState, MatchId, MatchState, Side},
    sync::{SyncChannel, SyncTransport, remote::RemoteTransport},
};
use serde_json::{Value, json};
use tokio::{net::TcpListener, sync::mpsc, time::timeout};

async fn spawn_relay() -> String {
    let state = AppState::new(LocalStore::new(Arc::new(MemoryKeyValueStore::new())));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, routes::router(state).into_make_service())
            .await
            .unwrap();
    });
    format!("http://{addr}")
}

fn remote_channel(base: &str) -> SyncChannel {
    SyncChannel::new(Arc::new(RemoteTransport::new(base).unwrap()))
}

async fn next_matching(
    updates: &mut mpsc::UnboundedReceiver<MatchState>,
    predicate: impl Fn(&MatchState) -> bool,
) -> MatchState {
    timeout(Duration::from_secs(5), async {
        loop {
            let state = updates.recv().await.expect("subscription alive");
            if predicate(&state) {
                return state;
            }
        }
    })
    .await
    .expect("update within timeout")
}

struct AlwaysGranted;

struct NoopSession;

impl CameraSession for NoopSession {
    fn release(&mut self) {}
}

impl Camera for AlwaysGranted {
    fn open(&self) -> Result<Box<dyn CameraSession>, CameraError> {
        Ok(Box::new(NoopSession))
    }
}

#[tokio::test]
async fn relay_routes_validate_and_report() {
    let base = spawn_relay().await;
    let client = reqwest::Client::new();

    let health: Value = client
        .get(format!("{base}/healthcheck"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health, json!({"status": "ok", "matches": 0}));

    let missing = client.get(format!("{base}/matches/abc123")).send().await.unwrap();
    assert_eq!(missing.status(), reqwest::StatusCode::NOT_FOUND);

    let invalid = client.get(format!("{base}/matches/a-b")).send().await.unwrap();
    assert_eq!(invalid.status(), reqwest::StatusCode::BAD_REQUEST);

    let stored: Value = client
        .put(format!("{base}/matches/abc123"))
        .json(&json!({"name1": "Ana", "score1": "3", "score2": 1, "currentServer": 7, "extra": true}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(
        stored,
        json!({
            "name1": "Ana",
            "name2": "",
            "score1": 3,
            "score2": 1,
            "set1": 0,
            "set2": 0,
            "serverAtStart": 1,
            "currentServer": 1,
        })
    );

    let fetched: Value = client
        .get(format!("{base}/matches/abc123"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(fetched, stored);

    let openapi = client
        .get(format!("{base}/api-doc/openapi.json"))
        .send()
        .await
        .unwrap();
    assert!(openapi.status().is_success());
}

#[tokio::test]
async fn subscriber_receives_current_then_live_writes() {
    let base = spawn_relay().await;
    let transport = RemoteTransport::new(&base).unwrap();
    let id = MatchId::parse("abc123").unwrap();

    let mut opening = MatchState::default();
    opening.set_name(Side::One, "Ana");
    transport.publish(&id, &opening).await.unwrap();

    let (tx, mut updates) = mpsc::unbounded_channel();
    let subscription = transport.subscribe(
        &id,
        Arc::new(move |state| {
            let _ = tx.send(state);
        }),
    );

    let first = next_matching(&mut updates, |_| true).await;
    assert_eq!(first, opening);

    let mut rally = opening.clone();
    for _ in 0..3 {
        rally.score_point(Side::One);
    }
    rally.score_point(Side::Two);
    transport.publish(&id, &rally).await.unwrap();

    let received = next_matching(&mut updates, |s| s.score(Side::One) == 3).await;
    assert_eq!(received.name(Side::One), "Ana");
    assert_eq!(received.score(Side::Two), 1);
    assert_eq!(received.current_server(), Side::Two);

    subscription.unsubscribe();
}

#[tokio::test]
async fn display_device_follows_keeper_device_through_relay() {
    let base = spawn_relay().await;
    let target = PairingTarget::DisplayUrl("https://scores.example/".parse().unwrap());

    // Separate stores: the two devices share nothing but the relay.
    let keeper_store = LocalStore::new(Arc::new(MemoryKeyValueStore::new()));
    let mut keeper = Controller::new(keeper_store, remote_channel(&base), target.clone());
    let display_store = LocalStore::new(Arc::new(MemoryKeyValueStore::new()));
    let mut display = Controller::new(display_store, remote_channel(&base), target.clone());

    let payload = {
        let session = keeper.keeper().await.unwrap();
        session.set_server_at_start(Side::Two);
        session.pairing_code(&target).payload().to_string()
    };

    display.start_scanning(&AlwaysGranted).unwrap();
    let id = match display.handle_scan(&payload).await.unwrap() {
        ScanOutcome::Paired(id) => id,
        other => panic!("expected pairing, got {other:?}"),
    };
    assert_eq!(keeper.keeper().await.unwrap().id(), &id);

    let mut updates = display.display_updates();
    {
        let session = keeper.keeper().await.unwrap();
        session.set_name(Side::One, "Ana");
        for _ in 0..3 {
            session.score_point(Side::One);
        }
        session.score_point(Side::Two);
    }

    let received = timeout(
        Duration::from_secs(5),
        updates.wait_for(|state| {
            state
                .as_ref()
                .is_some_and(|s| s.score(Side::One) == 3 && s.score(Side::Two) == 1)
        }),
    )
    .await
    .expect("display update")
    .unwrap()
    .clone()
    .unwrap();
    assert_eq!(received.name(Side::One), "Ana");
    assert_eq!(received.server_at_start(), Side::Two);

    display.leave_display().await.unwrap();
    keeper.shutdown().await;
    display.shutdown().await;
}

#[tokio::test]
async fn former_display_never_overwrites_the_paired_match() {
    let base = spawn_relay().await;
    let target = PairingTarget::Bare;

    let keeper_store = LocalStore::new(Arc::new(MemoryKeyValueStore::new()));
    let mut keeper = Controller::new(keeper_store, remote_channel(&base), target.clone());
    let id = {
        let session = keeper.keeper().await.unwrap();
        for _ in 0..5 {
            session.score_point(Side::One);
        }
        session.flush().await;
        session.id().clone()
    };

    let display_store = LocalStore::new(Arc::new(MemoryKeyValueStore::new()));
    let mut display = Controller::new(display_store, remote_channel(&base), target);
    display.start_scanning(&AlwaysGranted).unwrap();
    display.handle_scan(id.as_str()).await.unwrap();
    display.leave_display().await.unwrap();

    let own = {
        let session = display.keeper().await.unwrap();
        session.flush().await;
        session.id().clone()
    };
    assert_ne!(own, id);

    let relayed: MatchState = reqwest::get(format!("{base}/matches/{id}"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(relayed.score(Side::One), 5);

    keeper.shutdown().await;
    display.shutdown().await;
}
