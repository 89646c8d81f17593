// src/services/scheduler.rs

//! Oldest-first fairness scheduler over the player catalog.
//!
//! ```text
//! Idle → Selecting → Scanning → Advancing → Idle
//!           │            │
//!           │            └─ listing error → Idle (round aborted)
//!           └─ empty / unreadable catalog → bootstrap seed
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{MatchId, PlayerId, TrackedPlayer};
use crate::services::discovery::SeedDiscovery;
use crate::services::walker::Walker;
use crate::storage::MatchStore;
use crate::storage::schema::default_last_scanned;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Selecting,
    Scanning,
    Advancing,
}

/// The player chosen for a round and the lower bound of its listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub player: PlayerId,
    pub since: DateTime<Utc>,
    /// Came from seed discovery rather than the catalog
    pub bootstrap: bool,
}

/// Owns the freshness timestamps of the catalog.
pub struct Scheduler {
    store: Arc<dyn MatchStore>,
    discovery: Arc<dyn SeedDiscovery>,
    walker: Walker,
    state: SchedulerState,
}

impl Scheduler {
    pub fn new(
        store: Arc<dyn MatchStore>,
        discovery: Arc<dyn SeedDiscovery>,
        walker: Walker,
    ) -> Self {
        Self {
            store,
            discovery,
            walker,
            state: SchedulerState::Idle,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Pick the stalest player, bootstrapping when the catalog is empty or
    /// cannot be read. Only a lost storage connection is an error here,
    /// besides seed discovery itself failing.
    pub async fn select(&mut self) -> Result<Selection> {
        self.state = SchedulerState::Selecting;

        match self.read_catalog().await {
            Ok(Some(tracked)) => {
                return Ok(Selection {
                    player: tracked.player,
                    since: tracked.last_scanned,
                    bootstrap: false,
                });
            }
            Ok(None) => log::info!("Catalog is empty, looking up a seed player"),
            Err(e) if e.is_fatal() => {
                self.state = SchedulerState::Idle;
                return Err(e);
            }
            Err(e) => log::warn!("Catalog read failed ({}), falling back to bootstrap", e),
        }

        match self.bootstrap().await {
            Ok(selection) => Ok(selection),
            Err(e) => {
                self.state = SchedulerState::Idle;
                Err(e)
            }
        }
    }

    async fn read_catalog(&self) -> Result<Option<TrackedPlayer>> {
        if self.store.is_catalog_empty().await? {
            return Ok(None);
        }
        self.store.select_oldest_entity().await
    }

    async fn bootstrap(&self) -> Result<Selection> {
        let player = self.discovery.find_seed_entity().await?;

        let since = match self.store.default_scan_timestamp().await {
            Ok(at) => at,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                log::warn!("Schema default unavailable ({}), using built-in default", e);
                default_last_scanned()
            }
        };

        match self.store.track_entity(&player).await {
            Ok(true) => log::info!("Seeded catalog with {}", player),
            Ok(false) => log::debug!("Seed {} was already tracked", player),
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => log::warn!("Could not track seed {}: {}", player, e),
        }

        Ok(Selection {
            player,
            since,
            bootstrap: true,
        })
    }

    /// List the selected player's match ids since its last scan.
    pub async fn scan(&mut self, selection: &Selection) -> Result<Vec<MatchId>> {
        self.state = SchedulerState::Scanning;
        let result = self
            .walker
            .list_records(&selection.player, selection.since)
            .await;
        if result.is_err() {
            self.state = SchedulerState::Idle;
        }
        result
    }

    /// Record a completed scan.
    pub async fn advance(&mut self, player: &PlayerId, at: DateTime<Utc>) -> Result<()> {
        self.state = SchedulerState::Advancing;
        let result = self.store.update_last_scan(player, at).await;
        self.state = SchedulerState::Idle;
        result
    }

    /// End the round without touching freshness.
    pub fn hold(&mut self) {
        self.state = SchedulerState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::services::{Fetcher, StaticSeed};
    use crate::storage::SqliteStore;
    use crate::testing::{FlakyCatalog, ScriptedTransport, ids_page, ids_path, test_endpoints};
    use crate::utils::RawResponse;
    use chrono::TimeZone;

    fn walker(transport: Arc<ScriptedTransport>) -> Walker {
        Walker::new(Fetcher::new(transport, 1), test_endpoints(), 100)
    }

    fn scheduler(store: Arc<dyn MatchStore>, transport: Arc<ScriptedTransport>) -> Scheduler {
        Scheduler::new(
            store,
            Arc::new(StaticSeed(PlayerId::from("seed"))),
            walker(transport),
        )
    }

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, d, 0, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn selects_the_stalest_player() {
        let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
        store.update_last_scan(&PlayerId::from("fresh"), day(9)).await.unwrap();
        store.update_last_scan(&PlayerId::from("stale"), day(2)).await.unwrap();
        let mut s = scheduler(store, Arc::new(ScriptedTransport::new()));

        let selection = s.select().await.unwrap();
        assert_eq!(selection.player, PlayerId::from("stale"));
        assert_eq!(selection.since, day(2));
        assert!(!selection.bootstrap);
        assert_eq!(s.state(), SchedulerState::Selecting);
    }

    #[tokio::test]
    async fn empty_catalog_bootstraps_with_schema_default() {
        let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
        let mut s = scheduler(store.clone(), Arc::new(ScriptedTransport::new()));

        let selection = s.select().await.unwrap();
        assert!(selection.bootstrap);
        assert_eq!(selection.player, PlayerId::from("seed"));
        assert_eq!(selection.since, store.default_scan_timestamp().await.unwrap());
        assert!(store.participant_exists(&PlayerId::from("seed")).await.unwrap());

        // Tracked now, so the next selection comes from the catalog.
        let next = s.select().await.unwrap();
        assert!(!next.bootstrap);
        assert_eq!(next.player, PlayerId::from("seed"));
    }

    #[tokio::test]
    async fn catalog_read_failure_falls_back_to_bootstrap() {
        let store = Arc::new(FlakyCatalog::new().await);
        store.inner.update_last_scan(&PlayerId::from("p1"), day(3)).await.unwrap();
        store.fail_catalog_reads(true);
        let mut s = scheduler(store, Arc::new(ScriptedTransport::new()));

        let selection = s.select().await.unwrap();
        assert!(selection.bootstrap);
        assert_eq!(selection.player, PlayerId::from("seed"));
        assert_eq!(selection.since, default_last_scanned());
    }

    #[tokio::test]
    async fn lost_connection_is_not_masked_by_bootstrap() {
        let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
        store.close().await.unwrap();
        let mut s = scheduler(store, Arc::new(ScriptedTransport::new()));

        let err = s.select().await.unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(s.state(), SchedulerState::Idle);
    }

    #[tokio::test]
    async fn scan_lists_since_last_scan_and_advance_records_it() {
        let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
        store.update_last_scan(&PlayerId::from("p1"), day(1)).await.unwrap();
        let transport = Arc::new(ScriptedTransport::new());
        transport.push(ids_path("p1"), ids_page("BR1", 0, 3));
        let mut s = scheduler(store.clone(), transport.clone());

        let selection = s.select().await.unwrap();
        let ids = s.scan(&selection).await.unwrap();
        assert_eq!(ids.len(), 3);
        assert_eq!(s.state(), SchedulerState::Scanning);
        let url = &transport.requested_urls(&ids_path("p1"))[0];
        assert!(url.contains(&format!("startTime={}", day(1).timestamp())));

        s.advance(&selection.player, day(5)).await.unwrap();
        assert_eq!(s.state(), SchedulerState::Idle);
        assert_eq!(store.last_scan(&PlayerId::from("p1")).await.unwrap(), Some(day(5)));
    }

    #[tokio::test]
    async fn listing_error_aborts_only_the_scan() {
        let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
        store.update_last_scan(&PlayerId::from("p1"), day(1)).await.unwrap();
        let transport = Arc::new(ScriptedTransport::new());
        transport.push(ids_path("p1"), RawResponse::new(500, ""));
        let mut s = scheduler(store.clone(), transport);

        let selection = s.select().await.unwrap();
        let err = s.scan(&selection).await.unwrap_err();
        assert!(matches!(err, AppError::Listing { .. }));
        assert_eq!(s.state(), SchedulerState::Idle);
        assert_eq!(store.last_scan(&PlayerId::from("p1")).await.unwrap(), Some(day(1)));
    }
}
