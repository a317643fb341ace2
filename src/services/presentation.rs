//! Mapping of a match record onto the two halves of a scoreboard.

use crate::{
    dto::scoreboard::{ScoreboardView, ScreenSide},
    state::{DeviceRole, MatchState, Side},
};

/// Shown by displays until the first record arrives.
pub const WAITING_PLACEHOLDER: &str = "Waiting for the keeper...";

/// Name to show for `side`, falling back to "Player 1" / "Player 2".
pub fn display_name(state: &MatchState, side: Side) -> String {
    let name = state.name(side).trim();
    if name.is_empty() {
        format!("Player {}", side.number())
    } else {
        name.to_string()
    }
}

/// Whether anything differs from a freshly created record.
pub fn has_arrived_data(state: &MatchState) -> bool {
    *state != MatchState::default()
}

/// Lay `state` out on screen. Side 1 sits on the left unless `mirrored`.
pub fn project(state: &MatchState, mirrored: bool, role: DeviceRole) -> ScoreboardView {
    let (left, right) = if mirrored {
        (Side::Two, Side::One)
    } else {
        (Side::One, Side::Two)
    };
    let serving_side = if state.current_server() == left {
        ScreenSide::Left
    } else {
        ScreenSide::Right
    };
    let placeholder = (role == DeviceRole::Display && !has_arrived_data(state))
        .then(|| WAITING_PLACEHOLDER.to_string());

    ScoreboardView {
        left_name: display_name(state, left),
        right_name: display_name(state, right),
        left_score: state.score(left),
        right_score: state.score(right),
        left_set: state.sets(left),
        right_set: state.sets(right),
        serving_side,
        placeholder,
    }
}
