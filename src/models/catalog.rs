// src/models/catalog.rs

//! Catalog of tracked players.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::PlayerId;

/// A player whose match history is periodically re-scanned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackedPlayer {
    pub player: PlayerId,
    pub last_scanned: DateTime<Utc>,
}

/// Row counts reported by `harvester info`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CatalogStats {
    pub tracked_players: u64,
    pub rated_players: u64,
    pub matches: u64,
    pub stats_rows: u64,
    pub oldest: Option<TrackedPlayer>,
}
