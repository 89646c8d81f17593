// src/services/discovery.rs

//! Bootstrap discovery: where the first player comes from.

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::models::PlayerId;
use crate::services::fetcher::Fetcher;
use crate::utils::Endpoints;

/// Supplies a seed player when the catalog is empty.
#[async_trait]
pub trait SeedDiscovery: Send + Sync {
    async fn find_seed_entity(&self) -> Result<PlayerId>;
}

/// Seeds from the top of the solo-queue apex ladder.
pub struct ApexLadderDiscovery {
    fetcher: Fetcher,
    endpoints: Endpoints,
}

impl ApexLadderDiscovery {
    pub fn new(fetcher: Fetcher, endpoints: Endpoints) -> Self {
        Self { fetcher, endpoints }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Ladder {
    #[serde(default)]
    entries: Vec<LadderEntry>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LadderEntry {
    puuid: String,
    league_points: i64,
}

#[async_trait]
impl SeedDiscovery for ApexLadderDiscovery {
    async fn find_seed_entity(&self) -> Result<PlayerId> {
        let url = self.endpoints.apex_ladder()?;
        let payload = self.fetcher.fetch(&url).await?;
        let ladder =
            Ladder::deserialize(&payload).map_err(|e| AppError::discovery(e.to_string()))?;

        ladder
            .entries
            .into_iter()
            .max_by_key(|entry| entry.league_points)
            .map(|entry| PlayerId::new(entry.puuid))
            .ok_or_else(|| AppError::discovery("apex ladder has no entries"))
    }
}

/// Fixed seed taken from configuration.
#[derive(Debug, Clone)]
pub struct StaticSeed(pub PlayerId);

#[async_trait]
impl SeedDiscovery for StaticSeed {
    async fn find_seed_entity(&self) -> Result<PlayerId> {
        Ok(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::FetchError;
    use crate::testing::{LADDER_PATH, ScriptedTransport, apex_ladder, ok_json, test_endpoints};
    use crate::utils::RawResponse;
    use std::sync::Arc;

    fn discovery(transport: Arc<ScriptedTransport>) -> ApexLadderDiscovery {
        ApexLadderDiscovery::new(Fetcher::new(transport, 1), test_endpoints())
    }

    #[tokio::test]
    async fn picks_the_highest_rated_entry() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push(
            LADDER_PATH,
            ok_json(&apex_ladder(&[("low", 900), ("top", 1800), ("mid", 1200)])),
        );

        let seed = discovery(transport).find_seed_entity().await.unwrap();
        assert_eq!(seed, PlayerId::from("top"));
    }

    #[tokio::test]
    async fn empty_ladder_is_a_discovery_error() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push(LADDER_PATH, ok_json(&apex_ladder(&[])));

        let err = discovery(transport).find_seed_entity().await.unwrap_err();
        assert!(matches!(err, AppError::Discovery(_)));
    }

    #[tokio::test]
    async fn fetch_failure_propagates() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push(LADDER_PATH, RawResponse::new(403, ""));

        let err = discovery(transport).find_seed_entity().await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Fetch(FetchError::Permanent { status: 403 })
        ));
    }

    #[tokio::test]
    async fn static_seed_is_returned_as_is() {
        let seed = StaticSeed(PlayerId::from("fixed"));
        assert_eq!(seed.find_seed_entity().await.unwrap(), PlayerId::from("fixed"));
    }
}
