/// Device mode orchestration.
pub mod controller;
/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Keeper session: the single writer of a match.
pub mod keeper;
/// Background persist-then-publish of keeper snapshots.
pub mod match_writer;
/// Match identifier minting and pairing codes.
pub mod pairing;
/// Scoreboard projection of a match record.
pub mod presentation;
/// Relay-side record storage and fan-out.
pub mod relay_service;
/// Camera sessions used while scanning.
pub mod scanner;
/// Server-Sent Events streaming service.
pub mod sse_service;
/// Plain-text match summary.
pub mod summary;
