//! Device-level orchestration of the `keeper | scanning | display` modes.
//!
//! Every resource tied to a mode (camera session, display subscription) is
//! acquired when entering that mode and released when leaving it. Dropping the
//! controller releases whatever is still held.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::{
    config::AppConfig,
    dao::local_store::LocalStore,
    dto::scoreboard::ScoreboardView,
    error::ControllerError,
    services::{
        keeper::KeeperSession,
        pairing::{self, PairingTarget},
        presentation,
        scanner::{Camera, CameraError, ScanSession},
    },
    state::{DeviceMode, DeviceRole, MatchId, MatchState, ModeEvent, ModeMachine},
    sync::{Subscription, SyncChannel},
};

/// What happened to a scanned payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// Not a match code; the camera stays open.
    KeepScanning,
    /// Paired with the match; the device is now displaying it.
    Paired(MatchId),
    /// The device is not scanning; the payload was ignored.
    NotScanning,
}

/// Owns the device mode and everything that depends on it.
pub struct Controller {
    store: LocalStore,
    channel: SyncChannel,
    target: PairingTarget,
    machine: ModeMachine,
    keeper: Option<KeeperSession>,
    scan: Option<ScanSession>,
    subscription: Option<Subscription>,
    last_displayed: Option<MatchId>,
    display_tx: Arc<watch::Sender<Option<MatchState>>>,
}

impl Controller {
    /// Controller in keeper mode over an explicit store, channel and pairing target.
    pub fn new(store: LocalStore, channel: SyncChannel, target: PairingTarget) -> Self {
        let (display_tx, _) = watch::channel(None);
        Self {
            store,
            channel,
            target,
            machine: ModeMachine::new(),
            keeper: None,
            scan: None,
            subscription: None,
            last_displayed: None,
            display_tx: Arc::new(display_tx),
        }
    }

    /// Controller with the transport and pairing shape picked from `config`.
    pub fn from_config(config: &AppConfig, store: LocalStore) -> Self {
        let channel = SyncChannel::from_config(config, store.clone());
        Self::new(store, channel, PairingTarget::from_config(config))
    }

    /// Current mode.
    pub fn mode(&self) -> &DeviceMode {
        self.machine.mode()
    }

    /// Role implied by the current mode.
    pub fn role(&self) -> DeviceRole {
        self.machine.mode().role()
    }

    /// Shape of the codes produced for displays.
    pub fn pairing_target(&self) -> &PairingTarget {
        &self.target
    }

    /// Name of the sync transport in use.
    pub fn transport_name(&self) -> &'static str {
        self.channel.transport_name()
    }

    /// Keeper controls, resuming the remembered match or minting a new one.
    pub async fn keeper(&mut self) -> Result<&mut KeeperSession, ControllerError> {
        if self.machine.mode() != &DeviceMode::Keeper {
            return Err(ControllerError::NotKeeper(self.machine.mode().clone()));
        }

        let session = match self.keeper.take() {
            Some(session) => session,
            None => match self.store.active_match().await {
                Some(id) => {
                    info!(match_id = %id, "resuming remembered match");
                    KeeperSession::open(id, self.store.clone(), self.channel.clone()).await
                }
                None => {
                    let id = pairing::mint();
                    self.store.remember_active_match(&id).await;
                    info!(match_id = %id, "minted new match");
                    KeeperSession::create(id, self.store.clone(), self.channel.clone())
                }
            },
        };
        Ok(self.keeper.insert(session))
    }

    /// Open the camera to pair with a keeper.
    ///
    /// On permission denial the mode does not change and
    /// [`ControllerError::CameraPermissionDenied`] is returned.
    pub fn start_scanning(&mut self, camera: &dyn Camera) -> Result<(), ControllerError> {
        self.machine.check(&ModeEvent::StartScan)?;

        let scan = ScanSession::start(camera).map_err(|err| {
            match &err {
                CameraError::PermissionDenied => warn!("camera permission denied"),
                CameraError::Unavailable(reason) => warn!(%reason, "camera unavailable"),
            }
            ControllerError::from(err)
        })?;

        self.release_display();
        self.machine.apply(ModeEvent::StartScan)?;
        self.scan = Some(scan);
        info!("scanning for a match code");
        Ok(())
    }

    /// Feed one decoded frame. Anything that is not a match code is ignored.
    pub async fn handle_scan(&mut self, scanned: &str) -> Result<ScanOutcome, ControllerError> {
        if self.machine.mode() != &DeviceMode::Scanning {
            return Ok(ScanOutcome::NotScanning);
        }

        let id = match pairing::decode(scanned) {
            Ok(id) => id,
            Err(err) => {
                debug!(error = %err, "ignoring scanned payload");
                return Ok(ScanOutcome::KeepScanning);
            }
        };

        self.machine.apply(ModeEvent::CodeDecoded(id.clone()))?;
        self.release_camera();
        self.store.remember_displayed_match(&id).await;
        self.enter_display(id.clone());
        Ok(ScanOutcome::Paired(id))
    }

    /// Close the camera and return to keeper mode.
    pub fn cancel_scanning(&mut self) -> Result<(), ControllerError> {
        self.machine.apply(ModeEvent::CancelScan)?;
        self.release_camera();
        info!("scanning cancelled");
        Ok(())
    }

    /// Stop following the displayed match and return to keeper mode.
    pub async fn leave_display(&mut self) -> Result<(), ControllerError> {
        self.machine.apply(ModeEvent::GoBack)?;
        self.release_display();
        info!("left display mode");
        Ok(())
    }

    /// Follow the last paired match again without scanning.
    ///
    /// Falls back to this device's own match when it never paired.
    pub async fn resume_display(&mut self) -> Result<MatchId, ControllerError> {
        let id = match self.last_displayed.clone() {
            Some(id) => id,
            None => match self.store.displayed_match().await {
                Some(id) => id,
                None => self
                    .store
                    .active_match()
                    .await
                    .ok_or(ControllerError::NoActiveMatch)?,
            },
        };

        self.machine.apply(ModeEvent::ResumeDisplay(id.clone()))?;
        self.enter_display(id.clone());
        Ok(id)
    }

    /// Latest record of the displayed match; `None` until one arrives.
    pub fn display_updates(&self) -> watch::Receiver<Option<MatchState>> {
        self.display_tx.subscribe()
    }

    /// What the screen should show right now.
    pub fn view(&self, mirrored: bool) -> ScoreboardView {
        let state = match self.machine.mode() {
            DeviceMode::Keeper => self
                .keeper
                .as_ref()
                .map(|session| session.state().clone())
                .unwrap_or_default(),
            DeviceMode::Display(_) => self.display_tx.borrow().clone().unwrap_or_default(),
            DeviceMode::Scanning => MatchState::default(),
        };
        presentation::project(&state, mirrored, self.role())
    }

    /// Drop the current match locally: stored record and remembered id.
    ///
    /// The next [`Controller::keeper`] call mints a fresh identifier.
    pub async fn start_new_match(&mut self) -> Result<(), ControllerError> {
        if self.machine.mode() != &DeviceMode::Keeper {
            return Err(ControllerError::NotKeeper(self.machine.mode().clone()));
        }

        let id = match self.keeper.take() {
            Some(session) => {
                let id = session.id().clone();
                session.close().await;
                Some(id)
            }
            None => self.store.active_match().await,
        };
        if let Some(id) = &id {
            self.store.clear(id).await;
            info!(match_id = %id, "match cleared");
        }
        self.store.forget_active_match().await;
        Ok(())
    }

    /// Release mode resources and wait for pending keeper writes.
    pub async fn shutdown(mut self) {
        self.release_camera();
        self.release_display();
        if let Some(session) = self.keeper.take() {
            session.close().await;
        }
    }

    fn enter_display(&mut self, id: MatchId) {
        self.display_tx.send_replace(None);
        let tx = self.display_tx.clone();
        self.subscription = Some(self.channel.subscribe(&id, move |state| {
            tx.send_replace(Some(state));
        }));
        info!(match_id = %id, transport = self.channel.transport_name(), "displaying match");
        self.last_displayed = Some(id);
    }

    fn release_display(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
        self.display_tx.send_replace(None);
    }

    fn release_camera(&mut self) {
        if let Some(scan) = self.scan.take() {
            scan.release();
        }
    }
}
