// src/services/pool.rs

//! Bounded concurrent dispatch of a batch of match ids.

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use futures::future;
use futures::stream::{self, StreamExt};
use tokio::sync::watch;

use crate::models::MatchId;
use crate::services::worker::{RatingClaims, RecordWorker, UnitOutcome};

/// Aggregated result of one dispatch batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Ids handed to the pool
    pub total: usize,
    /// Units that actually ran
    pub attempted: usize,
    pub already_stored: usize,
    pub persisted: usize,
    pub ratings_fetched: usize,
    /// Detail fetches that failed for good (not found, rejected, undecodable)
    pub unavailable: usize,
    /// Detail fetches that may succeed on a later visit
    pub retryable: usize,
    /// Transform or storage failures
    pub failed: usize,
    /// Shutdown stopped admission before every id ran
    pub interrupted: bool,
    /// The storage connection was lost
    pub fatal: bool,
}

impl BatchOutcome {
    fn record(&mut self, unit: UnitOutcome) {
        self.attempted += 1;
        match unit {
            UnitOutcome::AlreadyStored => self.already_stored += 1,
            UnitOutcome::Persisted { ratings_fetched } => {
                self.persisted += 1;
                self.ratings_fetched += ratings_fetched;
            }
            UnitOutcome::Unavailable { retryable: true } => self.retryable += 1,
            UnitOutcome::Unavailable { retryable: false } => self.unavailable += 1,
            UnitOutcome::Failed { fatal } => {
                self.failed += 1;
                self.fatal |= fatal;
            }
        }
    }

    /// Whether every id was attempted.
    pub fn is_complete(&self) -> bool {
        self.attempted == self.total && !self.interrupted && !self.fatal
    }
}

/// Runs units with at most `concurrency` in flight.
#[derive(Debug, Clone, Copy)]
pub struct WorkerPool {
    concurrency: usize,
}

impl WorkerPool {
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
        }
    }

    /// Process every id and wait for all admitted units to finish.
    ///
    /// Once `shutdown` reads `true` (or a unit loses the storage connection)
    /// no further units are admitted; units already running complete.
    /// Each participant's rating is looked up at most once per batch.
    pub async fn dispatch(
        &self,
        worker: &RecordWorker,
        ids: Vec<MatchId>,
        shutdown: &watch::Receiver<bool>,
    ) -> BatchOutcome {
        let mut outcome = BatchOutcome {
            total: ids.len(),
            ..BatchOutcome::default()
        };
        let halted = AtomicBool::new(false);
        let claims = RatingClaims::new();

        let admit = || !*shutdown.borrow() && !halted.load(Ordering::Acquire);

        let mut units = stream::iter(ids)
            .take_while(|_| future::ready(admit()))
            .map(|id| {
                let (halted, claims) = (&halted, &claims);
                async move {
                    let unit = worker.process(&id, Utc::now(), claims).await;
                    if matches!(unit, UnitOutcome::Failed { fatal: true }) {
                        halted.store(true, Ordering::Release);
                    }
                    unit
                }
            })
            .buffer_unordered(self.concurrency);

        while let Some(unit) = units.next().await {
            outcome.record(unit);
        }

        outcome.interrupted = outcome.attempted < outcome.total && *shutdown.borrow();
        outcome
    }
}
