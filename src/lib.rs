//! Library crate for courtside: badminton score keeping shared between a keeper
//! device and any number of display devices, plus the relay that links them.

/// Runtime configuration.
pub mod config;
/// Device-local storage.
pub mod dao;
/// Wire and view shapes.
pub mod dto;
/// Error types of the relay and the device controller.
pub mod error;
/// HTTP routes of the relay.
pub mod routes;
/// Keeper, controller, pairing and relay services.
pub mod services;
/// Match record, identifiers, device modes and relay state.
pub mod state;
/// Keeper-to-display propagation.
pub mod sync;
