//! Persistence gateway.
//!
//! The gateway is the only source of truth for what is stored. Callers must
//! not cache existence answers across processing units.
//!
//! ## Tables
//!
//! ```text
//! players            # catalog: freshness, profile, rating
//! matches            # one row per stored match
//! participant_stats  # one row per (match, player), references both
//! ```

mod encode;
pub mod schema;
pub mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{
    CatalogStats, MatchId, MatchSummary, Participant, ParticipantStats, PlayerId, TrackedPlayer,
};

// Re-export for convenience
pub use sqlite::SqliteStore;

/// Trait for harvest storage backends.
#[async_trait]
pub trait MatchStore: Send + Sync {
    /// Whether the match is already stored.
    async fn record_exists(&self, id: &MatchId) -> Result<bool>;

    /// Whether the player has a catalog row.
    async fn participant_exists(&self, player: &PlayerId) -> Result<bool>;

    /// When the player's rating was last refreshed, if ever.
    async fn rating_refreshed_at(&self, player: &PlayerId) -> Result<Option<DateTime<Utc>>>;

    /// The player's freshness, if tracked.
    async fn last_scan(&self, player: &PlayerId) -> Result<Option<DateTime<Utc>>>;

    /// Freshness the schema assigns to never-scanned players.
    async fn default_scan_timestamp(&self) -> Result<DateTime<Utc>>;

    async fn is_catalog_empty(&self) -> Result<bool>;

    /// Least recently scanned player; ties go to the earliest inserted.
    async fn select_oldest_entity(&self) -> Result<Option<TrackedPlayer>>;

    /// Add a player to the catalog with the default freshness.
    /// Returns `false` if it was already tracked.
    async fn track_entity(&self, player: &PlayerId) -> Result<bool>;

    /// Insert the match if absent. Returns whether a row was created.
    async fn append_record(&self, summary: &MatchSummary) -> Result<bool>;

    /// Insert new players and refresh the profile of known ones. Rating
    /// columns are only written for refreshed participants.
    async fn append_participants(&self, participants: &[Participant]) -> Result<usize>;

    /// Insert stats rows. Their match and players must already be stored.
    async fn append_details(&self, stats: &[ParticipantStats]) -> Result<usize>;

    /// Store a match, its participants and stats in one transaction.
    ///
    /// The conditional match insert gates the rest: if the match already
    /// existed nothing is written and `false` is returned.
    async fn persist_record(
        &self,
        summary: &MatchSummary,
        participants: &[Participant],
        stats: &[ParticipantStats],
    ) -> Result<bool>;

    /// Set the player's freshness. Never moves it backwards.
    async fn update_last_scan(&self, player: &PlayerId, at: DateTime<Utc>) -> Result<()>;

    async fn update_rating_date(&self, player: &PlayerId, at: DateTime<Utc>) -> Result<()>;

    async fn catalog_stats(&self) -> Result<CatalogStats>;

    /// Release the connection. Later calls fail with a fatal error.
    async fn close(&self) -> Result<()>;
}
