use serde::Serialize;
use utoipa::ToSchema;

/// Health response returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Health status, always "ok" while the relay answers.
    pub status: String,
    /// Matches with a live topic on this relay.
    pub matches: usize,
}

impl HealthResponse {
    /// Create a health response indicating the relay is operational.
    pub fn ok(matches: usize) -> Self {
        Self {
            status: "ok".to_string(),
            matches,
        }
    }
}
