// src/services/fetcher.rs

//! Rate-limited fetch client.
//!
//! Every request first waits out the process-wide [`Cooldown`]. A 429 pushes
//! the cooldown forward for all callers, then the same request is retried.
//! Other failures are classified into [`FetchError`] and returned.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde_json::Value;
use thiserror::Error;
use tokio::time::Instant;
use url::Url;

use crate::utils::http::{RawResponse, Transport};

/// Delay assumed when a 429 carries no `Retry-After` header.
const DEFAULT_RETRY_AFTER_SECS: u64 = 1;

/// Longest cooldown a single 429 may impose.
const MAX_RETRY_AFTER_SECS: u64 = 3_600;

/// Classified failure of a single fetch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Still rate limited after the configured number of retries
    #[error("rate limited (retry after {retry_after_secs}s), retries exhausted")]
    RateLimited { retry_after_secs: u64 },

    #[error("not found")]
    NotFound,

    /// Server error or no response at all
    #[error("transient failure: {0}")]
    Transient(String),

    /// Any other non-200 status
    #[error("request rejected with status {status}")]
    Permanent { status: u16 },

    /// 200 with a body that is not JSON
    #[error("undecodable payload: {0}")]
    Decode(String),
}

impl FetchError {
    /// Whether trying again later could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::Transient(_))
    }
}

/// Shared "resume-at" instant imposed by the remote rate limiter.
#[derive(Debug, Default)]
pub struct Cooldown {
    resume_at: Mutex<Option<Instant>>,
}

impl Cooldown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Instant before which no request may be issued, if one is pending.
    pub fn resume_at(&self) -> Option<Instant> {
        let guard = self.resume_at.lock().unwrap_or_else(PoisonError::into_inner);
        (*guard).filter(|at| *at > Instant::now())
    }

    /// Push the cooldown out to `until`. Never shortens an existing window.
    pub fn extend(&self, until: Instant) -> Instant {
        let mut guard = self.resume_at.lock().unwrap_or_else(PoisonError::into_inner);
        let resume = match *guard {
            Some(current) if current >= until => current,
            _ => until,
        };
        *guard = Some(resume);
        resume
    }

    /// Sleep until no cooldown is active.
    ///
    /// Re-checks after waking because another caller may have extended the
    /// window in the meantime.
    pub async fn wait(&self) {
        while let Some(at) = self.resume_at() {
            tokio::time::sleep_until(at).await;
        }
    }
}

/// Fetch client shared by the walker, the workers and discovery.
#[derive(Clone)]
pub struct Fetcher {
    transport: Arc<dyn Transport>,
    cooldown: Arc<Cooldown>,
    max_rate_limit_retries: u32,
}

impl Fetcher {
    pub fn new(transport: Arc<dyn Transport>, max_rate_limit_retries: u32) -> Self {
        Self::with_cooldown(transport, Arc::new(Cooldown::new()), max_rate_limit_retries)
    }

    pub fn with_cooldown(
        transport: Arc<dyn Transport>,
        cooldown: Arc<Cooldown>,
        max_rate_limit_retries: u32,
    ) -> Self {
        Self {
            transport,
            cooldown,
            max_rate_limit_retries,
        }
    }

    pub fn cooldown(&self) -> &Arc<Cooldown> {
        &self.cooldown
    }

    /// GET `url` and decode its JSON body.
    pub async fn fetch(&self, url: &Url) -> Result<Value, FetchError> {
        let mut rate_limited = 0u32;
        loop {
            self.cooldown.wait().await;

            let response = self
                .transport
                .get(url.as_str())
                .await
                .map_err(|e| FetchError::Transient(e.to_string()))?;

            match classify(response) {
                Attempt::Done(result) => return result,
                Attempt::Throttled(retry_after_secs) => {
                    let wait_secs = retry_after_secs.min(MAX_RETRY_AFTER_SECS) + 1;
                    self.cooldown.extend(Instant::now() + Duration::from_secs(wait_secs));

                    rate_limited += 1;
                    if rate_limited > self.max_rate_limit_retries {
                        return Err(FetchError::RateLimited { retry_after_secs });
                    }
                    log::warn!(
                        "Rate limit exceeded on {}. Waiting {}s before retrying",
                        url.path(),
                        wait_secs
                    );
                }
            }
        }
    }

    /// Best-effort variant of [`fetch`](Self::fetch): failures are logged and
    /// surface as `None`.
    pub async fn fetch_optional(&self, url: &Url) -> Option<Value> {
        match self.fetch(url).await {
            Ok(value) => Some(value),
            Err(error) => {
                log::warn!("Skipping {}: {}", url.path(), error);
                None
            }
        }
    }
}

enum Attempt {
    Done(Result<Value, FetchError>),
    Throttled(u64),
}

fn classify(response: RawResponse) -> Attempt {
    let result = match response.status {
        200 => serde_json::from_slice(&response.body)
            .map_err(|e| FetchError::Decode(e.to_string())),
        429 => {
            return Attempt::Throttled(response.retry_after.unwrap_or(DEFAULT_RETRY_AFTER_SECS));
        }
        404 => Err(FetchError::NotFound),
        status @ 500..=599 => Err(FetchError::Transient(format!("server returned {status}"))),
        status => Err(FetchError::Permanent { status }),
    };
    Attempt::Done(result)
}
