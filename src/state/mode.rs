use thiserror::Error;

use crate::state::match_id::MatchId;

/// Coarse role of the device, derived from its current [`DeviceMode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceRole {
    /// Owns and mutates the match.
    Keeper,
    /// Looking for a pairing code through the camera.
    Scanner,
    /// Read-only renderer of a paired match.
    Display,
}

/// Session-scoped mode of a device. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DeviceMode {
    /// Scoring the local match.
    #[default]
    Keeper,
    /// Camera open, waiting for a valid pairing code.
    Scanning,
    /// Following the match identified by the payload.
    Display(MatchId),
}

impl DeviceMode {
    /// Role implied by the mode.
    pub fn role(&self) -> DeviceRole {
        match self {
            DeviceMode::Keeper => DeviceRole::Keeper,
            DeviceMode::Scanning => DeviceRole::Scanner,
            DeviceMode::Display(_) => DeviceRole::Display,
        }
    }

    /// Match followed in display mode.
    pub fn displayed_match(&self) -> Option<&MatchId> {
        match self {
            DeviceMode::Display(id) => Some(id),
            _ => None,
        }
    }
}

/// Events moving a device between modes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModeEvent {
    /// Open the scanner, from keeper mode or to re-pair a display.
    StartScan,
    /// A scanned payload decoded to a match identifier.
    CodeDecoded(MatchId),
    /// The user closed the scanner (or camera access was lost).
    CancelScan,
    /// Follow a previously paired match without scanning again.
    ResumeDisplay(MatchId),
    /// Leave display mode and return to scoring.
    GoBack,
}

/// Error returned when an event does not apply to the current mode.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// Mode the device was in.
    pub from: DeviceMode,
    /// Rejected event.
    pub event: ModeEvent,
}

/// Explicit `keeper | scanning | display` state machine owned by the controller.
#[derive(Debug, Clone, Default)]
pub struct ModeMachine {
    mode: DeviceMode,
}

impl ModeMachine {
    /// Start in keeper mode.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current mode.
    pub fn mode(&self) -> &DeviceMode {
        &self.mode
    }

    /// Check that `event` applies without changing the mode.
    pub fn check(&self, event: &ModeEvent) -> Result<DeviceMode, InvalidTransition> {
        self.compute_transition(event.clone())
    }

    /// Apply `event`, returning the new mode.
    pub fn apply(&mut self, event: ModeEvent) -> Result<DeviceMode, InvalidTransition> {
        let next = self.compute_transition(event)?;
        self.mode = next.clone();
        Ok(next)
    }

    fn compute_transition(&self, event: ModeEvent) -> Result<DeviceMode, InvalidTransition> {
        let next = match (self.mode.clone(), event) {
            (DeviceMode::Keeper | DeviceMode::Display(_), ModeEvent::StartScan) => {
                DeviceMode::Scanning
            }
            (DeviceMode::Scanning, ModeEvent::CodeDecoded(id)) => DeviceMode::Display(id),
            (DeviceMode::Scanning, ModeEvent::CancelScan) => DeviceMode::Keeper,
            (DeviceMode::Keeper, ModeEvent::ResumeDisplay(id)) => DeviceMode::Display(id),
            (DeviceMode::Display(_), ModeEvent::GoBack) => DeviceMode::Keeper,
            (from, event) => return Err(InvalidTransition { from, event }),
        };

        Ok(next)
    }
}
