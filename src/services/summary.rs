//! Plain-text match summary handed to clipboard or file export.

use time::OffsetDateTime;

use crate::{
    dto::format_timestamp,
    services::presentation::display_name,
    state::{MatchState, Side},
};

/// Side ahead on sets, then on points. `None` when level on both.
pub fn leader(state: &MatchState) -> Option<Side> {
    let sets = state.sets(Side::One).cmp(&state.sets(Side::Two));
    let points = state.score(Side::One).cmp(&state.score(Side::Two));
    match sets.then(points) {
        std::cmp::Ordering::Greater => Some(Side::One),
        std::cmp::Ordering::Less => Some(Side::Two),
        std::cmp::Ordering::Equal => None,
    }
}

/// Summary stamped with the current time.
pub fn render(state: &MatchState) -> String {
    render_at(state, OffsetDateTime::now_utc())
}

/// Summary stamped with `generated_at`.
pub fn render_at(state: &MatchState, generated_at: OffsetDateTime) -> String {
    let one = display_name(state, Side::One);
    let two = display_name(state, Side::Two);
    let leader = match leader(state) {
        Some(side) => display_name(state, side),
        None => "level".to_string(),
    };

    format!(
        "Badminton match summary\n\
         Generated: {generated}\n\
         {one} vs {two}\n\
         Sets: {set1} - {set2}\n\
         Points: {score1} - {score2}\n\
         Serving: {server}\n\
         Leader: {leader}\n",
        generated = format_timestamp(generated_at),
        set1 = state.sets(Side::One),
        set2 = state.sets(Side::Two),
        score1 = state.score(Side::One),
        score2 = state.score(Side::Two),
        server = display_name(state, state.current_server()),
    )
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use time::macros::datetime;

    use super::*;
    use crate::state::normalize;

    #[test]
    fn sets_decide_before_points() {
        let state = normalize(&json!({"set1": 1, "set2": 0, "score1": 2, "score2": 9}));
        assert_eq!(leader(&state), Some(Side::One));

        let state = normalize(&json!({"set1": 1, "set2": 1, "score1": 2, "score2": 9}));
        assert_eq!(leader(&state), Some(Side::Two));

        assert_eq!(leader(&MatchState::default()), None);
    }

    #[test]
    fn renders_every_line() {
        let state = normalize(&json!({
            "name1": "Ana",
            "score1": 3,
            "score2": 1,
            "set2": 1,
            "currentServer": 1,
        }));
        let text = render_at(&state, datetime!(2024-05-01 10:30:00 UTC));
        assert_eq!(
            text,
            "Badminton match summary\n\
             Generated: 2024-05-01T10:30:00Z\n\
             Ana vs Player 2\n\
             Sets: 0 - 1\n\
             Points: 3 - 1\n\
             Serving: Ana\n\
             Leader: Player 2\n"
        );
    }
}
