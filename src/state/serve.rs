//! Serve rotation under rally-point scoring.
//!
//! The server is a two-state machine driven by the keeper's actions:
//! whoever wins a rally serves next, undoing a rally hands the serve back,
//! and at 0–0 the opening server is still open for choice.

use super::match_state::{MatchState, Side};

impl MatchState {
    /// Record a rally won by `side`; the winner serves next.
    pub fn score_point(&mut self, side: Side) {
        let score = self.score_mut(side);
        *score = score.saturating_add(1);
        self.current_server = side;
    }

    /// Undo a rally credited to `side`.
    ///
    /// The serve goes to the other side, except when the set falls back to 0–0
    /// where the opening server takes over again. Returns `false` (and changes
    /// nothing) when `side` has no points.
    pub fn remove_point(&mut self, side: Side) -> bool {
        let score = self.score_mut(side);
        if *score == 0 {
            return false;
        }
        *score -= 1;
        self.current_server = side.other();
        self.settle_serve();
        true
    }

    /// Choose who opens the current set. Ignored once a point has been played.
    pub fn set_server_at_start(&mut self, side: Side) -> bool {
        if self.total_points() > 0 {
            return false;
        }
        self.server_at_start = side;
        self.current_server = side;
        true
    }

    /// Force the current server. At 0–0 this also redefines the opening server;
    /// mid-set the opening server is left as it was.
    pub fn override_server(&mut self, side: Side) {
        self.current_server = side;
        if self.total_points() == 0 {
            self.server_at_start = side;
        }
    }

    /// Close the current set in favour of `winner`: credit the set, reset points
    /// and let the winner open the next set.
    pub fn next_set(&mut self, winner: Side) {
        self.add_set(winner);
        self.score1 = 0;
        self.score2 = 0;
        self.server_at_start = winner;
        self.current_server = winner;
    }

    fn settle_serve(&mut self) {
        if self.total_points() == 0 {
            self.current_server = self.server_at_start;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_serve_invariant(state: &MatchState) {
        if state.total_points() == 0 {
            assert_eq!(state.current_server(), state.server_at_start());
        }
    }

    #[test]
    fn keeper_scenario_follows_rally_point_rules() {
        let mut state = MatchState::default();

        assert!(state.set_server_at_start(Side::Two));
        assert_eq!(state.current_server(), Side::Two);

        state.score_point(Side::One);
        assert_eq!(state.current_server(), Side::One);

        state.score_point(Side::One);
        assert_eq!(state.current_server(), Side::One);

        assert!(state.remove_point(Side::One));
        assert_eq!(state.current_server(), Side::Two);
        assert_eq!(state.score(Side::One), 1);
    }

    #[test]
    fn removing_a_point_at_zero_is_a_no_op() {
        let mut state = MatchState::default();
        state.set_server_at_start(Side::Two);

        assert!(!state.remove_point(Side::One));
        assert_eq!(state, {
            let mut expected = MatchState::default();
            expected.set_server_at_start(Side::Two);
            expected
        });
    }

    #[test]
    fn opening_server_is_locked_after_first_point() {
        let mut state = MatchState::default();
        state.score_point(Side::Two);

        assert!(!state.set_server_at_start(Side::Two));
        assert_eq!(state.server_at_start(), Side::One);
        assert_eq!(state.current_server(), Side::Two);
    }

    #[test]
    fn undo_back_to_love_all_restores_opening_server() {
        let mut state = MatchState::default();
        state.set_server_at_start(Side::One);
        state.score_point(Side::One);
        state.remove_point(Side::One);

        assert_eq!(state.total_points(), 0);
        assert_eq!(state.current_server(), Side::One);
        assert_serve_invariant(&state);
    }

    #[test]
    fn override_mid_set_keeps_opening_server() {
        let mut state = MatchState::default();
        state.score_point(Side::One);
        state.override_server(Side::Two);

        assert_eq!(state.current_server(), Side::Two);
        assert_eq!(state.server_at_start(), Side::One);
    }

    #[test]
    fn override_at_love_all_redefines_opening_server() {
        let mut state = MatchState::default();
        state.override_server(Side::Two);

        assert_eq!(state.server_at_start(), Side::Two);
        assert_eq!(state.current_server(), Side::Two);
    }

    #[test]
    fn next_set_resets_points_and_hands_serve_to_winner() {
        let mut state = MatchState::default();
        for _ in 0..21 {
            state.score_point(Side::Two);
        }
        state.score_point(Side::One);

        state.next_set(Side::Two);

        assert_eq!(state.sets(Side::Two), 1);
        assert_eq!(state.total_points(), 0);
        assert_eq!(state.server_at_start(), Side::Two);
        assert_serve_invariant(&state);
        assert!(state.set_server_at_start(Side::One));
    }

    #[test]
    fn random_walk_keeps_scores_and_serve_consistent() {
        use rand::Rng;

        let mut rng = rand::rng();
        let mut state = MatchState::default();

        for _ in 0..2_000 {
            let side = if rng.random_bool(0.5) {
                Side::One
            } else {
                Side::Two
            };
            match rng.random_range(0..5) {
                0 | 1 => {
                    state.score_point(side);
                    assert_eq!(state.current_server(), side);
                }
                2 => {
                    let before = state.score(side);
                    let applied = state.remove_point(side);
                    assert_eq!(applied, before > 0);
                    if applied && state.total_points() > 0 {
                        assert_eq!(state.current_server(), side.other());
                    }
                }
                3 => {
                    state.set_server_at_start(side);
                }
                _ => state.override_server(side),
            }
            assert_serve_invariant(&state);
        }
    }
}
