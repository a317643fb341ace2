use time::{OffsetDateTime, format_description::well_known::Rfc3339};

/// Relay health payload.
pub mod health;
/// Path parameters of match routes.
pub mod matches;
/// Rendered scoreboard shape.
pub mod scoreboard;
/// SSE payloads.
pub mod sse;
/// Validation helpers.
pub mod validation;

pub(crate) fn format_timestamp(time: OffsetDateTime) -> String {
    time.format(&Rfc3339)
        .unwrap_or_else(|_| "invalid-timestamp".into())
}
