// src/services/worker.rs

//! One processing unit: fetch → transform → rating refresh → persist.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Duration, Utc};

use crate::error::Result;
use crate::models::{MatchId, PlayerId, Rating, RatingState, TransformedMatch};
use crate::services::fetcher::Fetcher;
use crate::services::transform::RecordTransform;
use crate::storage::MatchStore;
use crate::utils::Endpoints;

/// How a single unit ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitOutcome {
    /// The match was stored before or by a concurrent unit
    AlreadyStored,
    /// Newly stored
    Persisted { ratings_fetched: usize },
    /// The detail fetch failed; `retryable` follows the fetch error tag
    Unavailable { retryable: bool },
    /// Transform or storage failure
    Failed { fatal: bool },
}

/// Players whose rating lookup was already taken by a unit of the current
/// batch. A player is claimed at most once, whatever the lookup's result.
#[derive(Debug, Default)]
pub struct RatingClaims {
    claimed: Mutex<HashSet<PlayerId>>,
}

impl RatingClaims {
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` if the caller is the first to claim `player`.
    pub fn claim(&self, player: &PlayerId) -> bool {
        self.claimed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(player.clone())
    }
}

/// Processes match ids against the shared fetcher and store.
#[derive(Clone)]
pub struct RecordWorker {
    fetcher: Fetcher,
    endpoints: Endpoints,
    store: Arc<dyn MatchStore>,
    transform: Arc<dyn RecordTransform>,
    rating_ttl: Duration,
}

impl RecordWorker {
    pub fn new(
        fetcher: Fetcher,
        endpoints: Endpoints,
        store: Arc<dyn MatchStore>,
        transform: Arc<dyn RecordTransform>,
        rating_ttl: Duration,
    ) -> Self {
        Self {
            fetcher,
            endpoints,
            store,
            transform,
            rating_ttl,
        }
    }

    /// Run one unit. Never returns an error; failures become outcomes.
    ///
    /// `now` is the instant rating freshness is judged against and recorded.
    /// Units sharing `claims` look up each player's rating at most once.
    pub async fn process(
        &self,
        id: &MatchId,
        now: DateTime<Utc>,
        claims: &RatingClaims,
    ) -> UnitOutcome {
        match self.try_process(id, now, claims).await {
            Ok(outcome) => outcome,
            Err(e) => {
                log::error!("Match {} dropped: {}", id, e);
                UnitOutcome::Failed {
                    fatal: e.is_fatal(),
                }
            }
        }
    }

    async fn try_process(
        &self,
        id: &MatchId,
        now: DateTime<Utc>,
        claims: &RatingClaims,
    ) -> Result<UnitOutcome> {
        if self.store.record_exists(id).await? {
            log::debug!("Match {} already stored", id);
            return Ok(UnitOutcome::AlreadyStored);
        }

        let url = self.endpoints.match_detail(id)?;
        let payload = match self.fetcher.fetch(&url).await {
            Ok(payload) => payload,
            Err(e) => {
                log::warn!("Match {} skipped: {}", id, e);
                return Ok(UnitOutcome::Unavailable {
                    retryable: e.is_retryable(),
                });
            }
        };

        let TransformedMatch {
            summary,
            participants,
            stats,
        } = self.transform.transform(&payload)?;

        let mut to_write = Vec::with_capacity(participants.len());
        let mut refreshed = Vec::new();
        for mut participant in participants {
            let known = self.store.participant_exists(&participant.player).await?;
            if known && !self.rating_due(&participant.player, now).await? {
                continue;
            }
            if !claims.claim(&participant.player) {
                // Another unit of this batch owns the lookup.
                if !known {
                    to_write.push(participant);
                }
                continue;
            }

            if let Some(rating) = self.refresh_rating(&participant.player).await {
                participant.rating = RatingState::Refreshed(rating);
                refreshed.push(participant.player.clone());
            }
            if !known || participant.is_refreshed() {
                to_write.push(participant);
            }
        }

        if !self.store.persist_record(&summary, &to_write, &stats).await? {
            log::debug!("Match {} stored concurrently", id);
            return Ok(UnitOutcome::AlreadyStored);
        }

        for player in &refreshed {
            self.store.update_rating_date(player, now).await?;
        }

        log::info!(
            "Stored match {} ({} participants, {} ratings refreshed)",
            id,
            stats.len(),
            refreshed.len()
        );
        Ok(UnitOutcome::Persisted {
            ratings_fetched: refreshed.len(),
        })
    }

    /// Whether the stored rating is older than the TTL (or missing).
    async fn rating_due(&self, player: &PlayerId, now: DateTime<Utc>) -> Result<bool> {
        Ok(match self.store.rating_refreshed_at(player).await? {
            Some(at) => now - at >= self.rating_ttl,
            None => true,
        })
    }

    /// Fetch and extract a rating. `None` means the lookup failed and the
    /// stored rating must stay as it is; `Some(None)` means unranked.
    async fn refresh_rating(&self, player: &PlayerId) -> Option<Option<Rating>> {
        let url = match self.endpoints.league_entries(player) {
            Ok(url) => url,
            Err(e) => {
                log::warn!("No rating URL for {}: {}", player, e);
                return None;
            }
        };
        let entries = self.fetcher.fetch_optional(&url).await?;
        match self.transform.rating(&entries) {
            Ok(rating) => Some(rating),
            Err(e) => {
                log::warn!("Rating for {} ignored: {}", player, e);
                None
            }
        }
    }
}
