//! Core types and engine components for the roost location-intelligence engine.

/// Amenity aggregation across mirror endpoints.
pub mod aggregator;
/// Category filters and the default catalogue.
pub mod category;
/// Heuristic and routed commute estimates.
pub mod commute;
/// Engine configuration.
pub mod config;
/// Versioned snapshot and the single refresh entry point.
pub mod coordinator;
/// Request generations used to discard stale results.
pub mod epoch;
/// Nearest-institution resolution.
pub mod institution;
/// Domain models shared by the engine and its providers.
pub mod model;
/// Traits describing the collaborator interfaces.
pub mod ports;
/// Bundle of collaborator implementations wired into the engine.
pub mod providers;
/// Composite livability scoring.
pub mod scoring;
/// High-level service facade used by clients.
pub mod service;
/// Debounced place-name suggestions and reverse resolution.
pub mod suggest;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use category::*;
pub use config::*;
pub use epoch::*;
pub use model::*;
pub use ports::*;
pub use providers::*;
pub use service::*;
