use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the Courtside relay.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::matches::put_match,
        crate::routes::matches::get_match,
        crate::routes::sse::match_events,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::state::MatchState,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "matches", description = "Full match records keyed by match id"),
        (name = "sse", description = "Server-sent events streams"),
    )
)]
pub struct ApiDoc;
