// src/pipeline/harvest.rs

//! Harvest engine: Select → Scan → Dispatch → Guard → Advance, in a loop.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;

use crate::error::{AppError, Result};
use crate::models::{Config, HarvestConfig, PlayerId};
use crate::pipeline::circuit_breaker::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerResult,
};
use crate::services::{
    ApexLadderDiscovery, BatchOutcome, Fetcher, MatchTransform, RecordTransform, RecordWorker,
    Scheduler, SeedDiscovery, StaticSeed, Walker, WorkerPool,
};
use crate::storage::{MatchStore, SqliteStore};
use crate::utils::{Endpoints, HttpTransport};

/// Summary of one completed round.
#[derive(Debug, Clone)]
pub struct RoundReport {
    pub player: PlayerId,
    pub bootstrap: bool,
    pub listed: usize,
    pub batch: BatchOutcome,
    pub verdict: CircuitBreakerResult,
    pub advanced: bool,
}

impl RoundReport {
    fn log(&self) {
        log::info!(
            "Round for {}: {} listed, {} stored, {} already known, {} unavailable, {} retryable, {} failed, {} ratings{}",
            self.player,
            self.listed,
            self.batch.persisted,
            self.batch.already_stored,
            self.batch.unavailable,
            self.batch.retryable,
            self.batch.failed,
            self.batch.ratings_fetched,
            if self.advanced { "" } else { " (freshness held)" }
        );
    }
}

/// The ingestion engine with all of its collaborators injected.
pub struct Harvester {
    store: Arc<dyn MatchStore>,
    scheduler: Scheduler,
    pool: WorkerPool,
    worker: RecordWorker,
    breaker: CircuitBreaker,
    idle_delay: Duration,
}

impl Harvester {
    pub fn new(
        store: Arc<dyn MatchStore>,
        fetcher: Fetcher,
        endpoints: Endpoints,
        discovery: Arc<dyn SeedDiscovery>,
        transform: Arc<dyn RecordTransform>,
        config: &HarvestConfig,
    ) -> Self {
        let walker = Walker::new(fetcher.clone(), endpoints.clone(), config.page_size);
        let worker = RecordWorker::new(
            fetcher,
            endpoints,
            Arc::clone(&store),
            transform,
            config.rating_ttl(),
        );

        Self {
            scheduler: Scheduler::new(Arc::clone(&store), discovery, walker),
            store,
            pool: WorkerPool::new(config.max_concurrent),
            worker,
            breaker: CircuitBreaker::with_config(CircuitBreakerConfig::from(config)),
            idle_delay: config.idle_delay(),
        }
    }

    /// Wire the production stack: HTTP transport, SQLite store, and the
    /// configured seed source.
    pub async fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;

        let api_key = config.api.resolve_api_key()?;
        let transport = Arc::new(HttpTransport::new(&config.api, &api_key)?);
        let fetcher = Fetcher::new(transport, config.api.max_rate_limit_retries);
        let endpoints = Endpoints::from_config(&config.api)?;

        let store: Arc<dyn MatchStore> =
            Arc::new(SqliteStore::open(&config.storage.database_path).await?);
        log::info!("Opened database {}", config.storage.database_path);

        let discovery: Arc<dyn SeedDiscovery> = match config.harvest.seed_player.as_deref() {
            Some(seed) => Arc::new(StaticSeed(PlayerId::from(seed))),
            None => Arc::new(ApexLadderDiscovery::new(fetcher.clone(), endpoints.clone())),
        };

        Ok(Self::new(
            store,
            fetcher,
            endpoints,
            discovery,
            Arc::new(MatchTransform),
            &config.harvest,
        ))
    }

    /// One round for the stalest player.
    ///
    /// Freshness only advances once every listed id has been processed and
    /// the breaker agrees. A failed listing is charged to the player's hold
    /// budget, so a listing that never succeeds cannot pin the player at
    /// the head of the catalog.
    pub async fn run_round(&mut self, shutdown: &watch::Receiver<bool>) -> Result<RoundReport> {
        let selection = self.scheduler.select().await?;
        log::info!(
            "Scanning {} for matches since {}{}",
            selection.player,
            selection.since,
            if selection.bootstrap { " (bootstrap)" } else { "" }
        );

        let ids = match self.scheduler.scan(&selection).await {
            Ok(ids) => ids,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                if self.breaker.listing_failed(&selection.player).should_advance() {
                    self.scheduler.advance(&selection.player, Utc::now()).await?;
                }
                return Err(e);
            }
        };
        let listed = ids.len();
        log::info!("Listed {} matches for {}", listed, selection.player);

        let batch = self.pool.dispatch(&self.worker, ids, shutdown).await;
        let verdict = self.breaker.evaluate(&selection.player, &batch);

        if batch.fatal {
            self.scheduler.hold();
            return Err(AppError::Database(tokio_rusqlite::Error::ConnectionClosed));
        }

        let advanced = verdict.should_advance();
        if advanced {
            self.scheduler.advance(&selection.player, Utc::now()).await?;
        } else {
            self.scheduler.hold();
        }

        let report = RoundReport {
            player: selection.player,
            bootstrap: selection.bootstrap,
            listed,
            batch,
            verdict,
            advanced,
        };
        report.log();
        Ok(report)
    }

    /// Run rounds until `shutdown` flips or storage is lost, then release
    /// the store. Recoverable round failures wait out the idle delay.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        let result = self.run_loop(&mut shutdown).await;
        self.close().await;
        result
    }

    /// Run exactly one round, then release the store.
    pub async fn run_once(mut self, shutdown: watch::Receiver<bool>) -> Result<RoundReport> {
        let result = self.run_round(&shutdown).await;
        self.close().await;
        result
    }

    async fn run_loop(&mut self, shutdown: &mut watch::Receiver<bool>) -> Result<()> {
        let mut rounds = 0u64;
        loop {
            if *shutdown.borrow() {
                log::info!("Shutdown requested after {} rounds", rounds);
                return Ok(());
            }

            match self.run_round(shutdown).await {
                Ok(_) => rounds += 1,
                Err(e) if e.is_fatal() => {
                    log::error!("Stopping harvest: {}", e);
                    return Err(e);
                }
                Err(e) => {
                    log::warn!(
                        "Round failed: {}. Retrying in {}ms",
                        e,
                        self.idle_delay.as_millis()
                    );
                    self.idle(shutdown).await;
                }
            }
        }
    }

    /// Sleep for the idle delay, waking early on shutdown.
    async fn idle(&self, shutdown: &mut watch::Receiver<bool>) {
        tokio::select! {
            _ = tokio::time::sleep(self.idle_delay) => {}
            changed = shutdown.changed() => {
                // Sender gone: nobody can interrupt the sleep any more.
                if changed.is_err() {
                    tokio::time::sleep(self.idle_delay).await;
                }
            }
        }
    }

    async fn close(&self) {
        match self.store.close().await {
            Ok(()) => log::info!("Database connection closed"),
            Err(e) => log::warn!("Failed to close database: {}", e),
        }
    }
}

/// Build from config and run until shutdown.
pub async fn run_harvest(config: &Config, shutdown: watch::Receiver<bool>) -> Result<()> {
    let harvester = Harvester::from_config(config).await?;
    harvester.run(shutdown).await
}
