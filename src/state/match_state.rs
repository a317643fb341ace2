//! Live state of a single match and the normalization rules applied to every
//! payload that enters the process from storage or the network.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;
use utoipa::ToSchema;

/// Maximum number of characters kept for a player name.
pub const MAX_NAME_CHARS: usize = 20;

/// One of the two sides of the court, serialized as `1` or `2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Side {
    /// Player (or pair) 1.
    #[default]
    One,
    /// Player (or pair) 2.
    Two,
}

/// Raised when a number other than 1 or 2 is converted into a [`Side`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("side must be 1 or 2 (got {0})")]
pub struct InvalidSide(pub u8);

impl Side {
    /// Both sides in court order.
    pub const BOTH: [Side; 2] = [Side::One, Side::Two];

    /// The opposing side.
    pub fn other(self) -> Self {
        match self {
            Side::One => Side::Two,
            Side::Two => Side::One,
        }
    }

    /// Wire number of the side.
    pub fn number(self) -> u8 {
        match self {
            Side::One => 1,
            Side::Two => 2,
        }
    }
}

impl From<Side> for u8 {
    fn from(side: Side) -> Self {
        side.number()
    }
}

impl TryFrom<u8> for Side {
    type Error = InvalidSide;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Side::One),
            2 => Ok(Side::Two),
            other => Err(InvalidSide(other)),
        }
    }
}

/// Full record of a match as persisted locally and pushed to the relay.
///
/// Every inbound payload goes through [`normalize`]; the `Deserialize` impl
/// delegates to it, so a `MatchState` obtained from serde is always well formed.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MatchState {
    pub(super) name1: String,
    pub(super) name2: String,
    pub(super) score1: u32,
    pub(super) score2: u32,
    pub(super) set1: u32,
    pub(super) set2: u32,
    #[schema(value_type = u8, minimum = 1, maximum = 2)]
    pub(super) server_at_start: Side,
    #[schema(value_type = u8, minimum = 1, maximum = 2)]
    pub(super) current_server: Side,
}

impl MatchState {
    /// Decode a stored or received payload. Never fails: unparsable bytes yield the default state.
    pub fn from_json_slice(bytes: &[u8]) -> Self {
        serde_json::from_slice::<Value>(bytes)
            .map(|raw| normalize(&raw))
            .unwrap_or_default()
    }

    /// Same as [`MatchState::from_json_slice`] for text payloads.
    pub fn from_json_str(text: &str) -> Self {
        Self::from_json_slice(text.as_bytes())
    }

    /// Raw name of a side, empty when the keeper never typed one.
    pub fn name(&self, side: Side) -> &str {
        match side {
            Side::One => &self.name1,
            Side::Two => &self.name2,
        }
    }

    /// Points of a side in the current set.
    pub fn score(&self, side: Side) -> u32 {
        match side {
            Side::One => self.score1,
            Side::Two => self.score2,
        }
    }

    /// Sets won by a side.
    pub fn sets(&self, side: Side) -> u32 {
        match side {
            Side::One => self.set1,
            Side::Two => self.set2,
        }
    }

    /// Side that served the first rally of the current set.
    pub fn server_at_start(&self) -> Side {
        self.server_at_start
    }

    /// Side serving the next rally.
    pub fn current_server(&self) -> Side {
        self.current_server
    }

    /// Points played in the current set.
    pub fn total_points(&self) -> u32 {
        self.score1.saturating_add(self.score2)
    }

    /// Replace a side's name, keeping at most [`MAX_NAME_CHARS`] characters.
    pub fn set_name(&mut self, side: Side, name: &str) {
        let name = truncate_name(name);
        match side {
            Side::One => self.name1 = name,
            Side::Two => self.name2 = name,
        }
    }

    /// Credit a set to a side without touching the points.
    pub fn add_set(&mut self, side: Side) {
        let sets = self.sets_mut(side);
        *sets = sets.saturating_add(1);
    }

    /// Take a set back from a side. Returns `false` when it already had none.
    pub fn remove_set(&mut self, side: Side) -> bool {
        let sets = self.sets_mut(side);
        if *sets == 0 {
            return false;
        }
        *sets -= 1;
        true
    }

    pub(super) fn score_mut(&mut self, side: Side) -> &mut u32 {
        match side {
            Side::One => &mut self.score1,
            Side::Two => &mut self.score2,
        }
    }

    pub(super) fn sets_mut(&mut self, side: Side) -> &mut u32 {
        match side {
            Side::One => &mut self.set1,
            Side::Two => &mut self.set2,
        }
    }
}

impl<'de> Deserialize<'de> for MatchState {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Value::deserialize(deserializer)?;
        Ok(normalize(&raw))
    }
}

/// Turn an arbitrary decoded payload into a well-formed [`MatchState`].
///
/// Non-numeric or negative counters become 0, anything but 1 or 2 in the server
/// fields becomes side 1, missing or non-string names become empty. Extra fields
/// are ignored. At 0–0 the current server is pinned to the opening server.
pub fn normalize(raw: &Value) -> MatchState {
    let mut state = MatchState {
        name1: coerce_name(raw.get("name1")),
        name2: coerce_name(raw.get("name2")),
        score1: coerce_count(raw.get("score1")),
        score2: coerce_count(raw.get("score2")),
        set1: coerce_count(raw.get("set1")),
        set2: coerce_count(raw.get("set2")),
        server_at_start: coerce_side(raw.get("serverAtStart")),
        current_server: coerce_side(raw.get("currentServer")),
    };

    if state.total_points() == 0 {
        state.current_server = state.server_at_start;
    }

    state
}

fn truncate_name(name: &str) -> String {
    name.chars().take(MAX_NAME_CHARS).collect()
}

fn coerce_name(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(name)) => truncate_name(name),
        _ => String::new(),
    }
}

fn coerce_count(value: Option<&Value>) -> u32 {
    match value {
        Some(Value::Number(number)) => {
            if let Some(count) = number.as_u64() {
                u32::try_from(count).unwrap_or(u32::MAX)
            } else {
                number
                    .as_f64()
                    .filter(|count| count.is_finite() && *count > 0.0)
                    .map(|count| count.min(f64::from(u32::MAX)) as u32)
                    .unwrap_or(0)
            }
        }
        Some(Value::String(text)) => text.trim().parse::<u32>().unwrap_or(0),
        _ => 0,
    }
}

fn coerce_side(value: Option<&Value>) -> Side {
    let number = match value {
        Some(Value::Number(number)) => number.as_u64(),
        Some(Value::String(text)) => text.trim().parse::<u64>().ok(),
        _ => None,
    };

    match number {
        Some(2) => Side::Two,
        _ => Side::One,
    }
}
