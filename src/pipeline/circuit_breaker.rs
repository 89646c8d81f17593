//! Circuit Breaker pattern implementation.
//!
//! Keeps a player's freshness from advancing past a batch in which too many
//! matches failed for reasons that may clear up, so those matches are listed
//! again on the next visit.
//!
//! ## Policy
//!
//! > If more than **20%** of the attempted units failed retryably, the
//! > player's freshness is held. After **3** consecutive holds for the same
//! > player it advances anyway. A scan whose listing failed counts as a
//! > hold with every unit failed.

use std::collections::HashMap;

use crate::models::{HarvestConfig, PlayerId};
use crate::services::BatchOutcome;

/// Circuit breaker configuration.
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Maximum tolerated share of retryable failures (0-100). Default: 20%
    pub max_failure_percent: u8,
    /// Holds in a row before freshness is advanced regardless
    pub max_consecutive_holds: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            max_failure_percent: 20,
            max_consecutive_holds: 3,
        }
    }
}

impl From<&HarvestConfig> for CircuitBreakerConfig {
    fn from(config: &HarvestConfig) -> Self {
        Self {
            max_failure_percent: config.max_failure_percent,
            max_consecutive_holds: config.max_consecutive_holds,
        }
    }
}

/// Result of circuit breaker check.
#[derive(Debug, Clone, PartialEq)]
pub enum CircuitBreakerResult {
    /// Failures within tolerance
    Safe { attempted: usize, retryable: usize },
    /// Nothing was listed for the player
    Empty,
    /// Too many retryable failures; freshness stays put
    Held { failure_percent: f64, holds: u32 },
    /// Too many failures again, but the hold budget is spent
    Forced { failure_percent: f64, holds: u32 },
    /// Shutdown cut the batch short
    Interrupted { attempted: usize, total: usize },
    /// The storage connection was lost
    Fatal,
}

impl CircuitBreakerResult {
    pub fn should_advance(&self) -> bool {
        matches!(self, Self::Safe { .. } | Self::Empty | Self::Forced { .. })
    }
}

/// Per-player hold bookkeeping plus the verdict logic.
#[derive(Debug, Clone, Default)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    holds: HashMap<PlayerId, u32>,
}

impl CircuitBreaker {
    /// Create a new circuit breaker with default configuration.
    pub fn new() -> Self {
        Self::with_config(CircuitBreakerConfig::default())
    }

    /// Create a new circuit breaker with custom configuration.
    pub fn with_config(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            holds: HashMap::new(),
        }
    }

    /// Holds recorded for `player` since its last advance.
    pub fn holds(&self, player: &PlayerId) -> u32 {
        self.holds.get(player).copied().unwrap_or(0)
    }

    /// Judge a finished batch for `player` and update its hold count.
    pub fn check(&mut self, player: &PlayerId, batch: &BatchOutcome) -> CircuitBreakerResult {
        // Case 1: the batch did not run to completion
        if batch.fatal {
            return CircuitBreakerResult::Fatal;
        }
        if batch.interrupted {
            return CircuitBreakerResult::Interrupted {
                attempted: batch.attempted,
                total: batch.total,
            };
        }

        // Case 2: nothing to judge
        if batch.attempted == 0 {
            self.holds.remove(player);
            return CircuitBreakerResult::Empty;
        }

        // Case 3: failure share
        let failure_percent = (batch.retryable as f64 / batch.attempted as f64) * 100.0;
        if failure_percent <= self.config.max_failure_percent as f64 {
            self.holds.remove(player);
            return CircuitBreakerResult::Safe {
                attempted: batch.attempted,
                retryable: batch.retryable,
            };
        }

        self.hold_or_force(player, failure_percent)
    }

    /// Charge a failed listing for `player` against its hold budget.
    pub fn listing_failed(&mut self, player: &PlayerId) -> CircuitBreakerResult {
        let verdict = self.hold_or_force(player, 100.0);
        self.log_verdict(player, &verdict);
        verdict
    }

    fn hold_or_force(&mut self, player: &PlayerId, failure_percent: f64) -> CircuitBreakerResult {
        let holds = self.holds(player);
        if holds >= self.config.max_consecutive_holds {
            self.holds.remove(player);
            return CircuitBreakerResult::Forced {
                failure_percent,
                holds,
            };
        }

        self.holds.insert(player.clone(), holds + 1);
        CircuitBreakerResult::Held {
            failure_percent,
            holds: holds + 1,
        }
    }

    /// [`check`](Self::check) with the verdict logged.
    pub fn evaluate(&mut self, player: &PlayerId, batch: &BatchOutcome) -> CircuitBreakerResult {
        let verdict = self.check(player, batch);
        self.log_verdict(player, &verdict);
        verdict
    }

    fn log_verdict(&self, player: &PlayerId, verdict: &CircuitBreakerResult) {
        match verdict {
            CircuitBreakerResult::Safe {
                attempted,
                retryable,
            } => log::debug!(
                "Circuit breaker: SAFE for {} ({} of {} retryable)",
                player,
                retryable,
                attempted
            ),
            CircuitBreakerResult::Empty => {
                log::debug!("Circuit breaker: EMPTY batch for {}", player)
            }
            CircuitBreakerResult::Held {
                failure_percent,
                holds,
            } => log::warn!(
                "Circuit breaker: HOLD #{} for {} ({:.1}% retryable failures > {}% threshold)",
                holds,
                player,
                failure_percent,
                self.config.max_failure_percent
            ),
            CircuitBreakerResult::Forced {
                failure_percent,
                holds,
            } => log::warn!(
                "Circuit breaker: advancing {} after {} holds despite {:.1}% failures",
                player,
                holds,
                failure_percent
            ),
            CircuitBreakerResult::Interrupted { attempted, total } => log::info!(
                "Circuit breaker: batch for {} interrupted after {}/{} units",
                player,
                attempted,
                total
            ),
            CircuitBreakerResult::Fatal => {
                log::error!("Circuit breaker: storage lost while processing {}", player)
            }
        }
    }
}
