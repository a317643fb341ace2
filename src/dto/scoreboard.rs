use serde::Serialize;

/// Half of the screen as seen by the viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScreenSide {
    /// Left half.
    Left,
    /// Right half.
    Right,
}

impl ScreenSide {
    /// The opposite half.
    pub fn flipped(self) -> Self {
        match self {
            ScreenSide::Left => ScreenSide::Right,
            ScreenSide::Right => ScreenSide::Left,
        }
    }
}

/// What a scoreboard renders for one frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoreboardView {
    /// Name shown on the left half.
    pub left_name: String,
    /// Name shown on the right half.
    pub right_name: String,
    /// Points shown on the left half.
    pub left_score: u32,
    /// Points shown on the right half.
    pub right_score: u32,
    /// Sets shown on the left half.
    pub left_set: u32,
    /// Sets shown on the right half.
    pub right_set: u32,
    /// Half holding the shuttle.
    pub serving_side: ScreenSide,
    /// Text to show instead of the numbers while no data has arrived.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
}

impl ScoreboardView {
    /// Swap the two halves.
    pub fn swapped(&self) -> Self {
        Self {
            left_name: self.right_name.clone(),
            right_name: self.left_name.clone(),
            left_score: self.right_score,
            right_score: self.left_score,
            left_set: self.right_set,
            right_set: self.left_set,
            serving_side: self.serving_side.flipped(),
            placeholder: self.placeholder.clone(),
        }
    }
}
