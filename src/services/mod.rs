//! Service layer for the harvester.
//!
//! This module contains the ingestion engine parts:
//! - Rate-limited fetching (`Fetcher`, `Cooldown`)
//! - Payload transform (`MatchTransform`)
//! - Pagination (`Walker`)
//! - Seed discovery (`ApexLadderDiscovery`, `StaticSeed`)
//! - Per-match processing (`RecordWorker`) and bounded dispatch (`WorkerPool`)
//! - Fairness scheduling (`Scheduler`)

mod discovery;
mod fetcher;
mod pool;
mod scheduler;
mod transform;
mod walker;
mod worker;

pub use discovery::{ApexLadderDiscovery, SeedDiscovery, StaticSeed};
pub use fetcher::{Cooldown, FetchError, Fetcher};
pub use pool::{BatchOutcome, WorkerPool};
pub use scheduler::{Scheduler, SchedulerState, Selection};
pub use transform::{MatchTransform, RecordTransform};
pub use walker::Walker;
pub use worker::{RatingClaims, RecordWorker, UnitOutcome};
