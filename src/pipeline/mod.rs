//! Pipeline entry points for harvest operations.
//!
//! - `Harvester`: the ingestion engine, one round or a continuous loop
//! - `run_harvest`: build from configuration and run until shutdown

pub mod circuit_breaker;
pub mod harvest;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerResult};
pub use harvest::{Harvester, RoundReport, run_harvest};
