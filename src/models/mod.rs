// src/models/mod.rs

//! Domain models for the harvester.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod catalog;
mod config;
mod ids;
mod record;

// Re-export all public types
pub use catalog::{CatalogStats, TrackedPlayer};
pub use config::{ApiConfig, Config, HarvestConfig, LoggingConfig, StorageConfig};
pub use ids::{MatchId, PlayerId};
pub use record::{
    MatchSummary, Participant, ParticipantStats, Rating, RatingState, TransformedMatch,
};
