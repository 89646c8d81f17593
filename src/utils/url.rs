// src/utils/url.rs

//! Endpoint construction for the remote API.

use chrono::{DateTime, Utc};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{ApiConfig, MatchId, PlayerId};

/// Queue whose league entry counts as a player's rating.
pub const SOLO_QUEUE: &str = "RANKED_SOLO_5x5";

/// Builds request URLs against the regional and platform hosts.
#[derive(Debug, Clone)]
pub struct Endpoints {
    regional: Url,
    platform: Url,
    queue: Option<u32>,
}

impl Endpoints {
    pub fn new(regional: &str, platform: &str, queue: Option<u32>) -> Result<Self> {
        Ok(Self {
            regional: Url::parse(regional)?,
            platform: Url::parse(platform)?,
            queue,
        })
    }

    pub fn from_config(config: &ApiConfig) -> Result<Self> {
        Self::new(
            &config.regional_base_url,
            &config.platform_base_url,
            config.queue,
        )
    }

    /// One page of a player's match ids started after `since`.
    pub fn match_ids(
        &self,
        player: &PlayerId,
        since: DateTime<Utc>,
        start: usize,
        count: usize,
    ) -> Result<Url> {
        let mut url = with_segments(
            &self.regional,
            &["lol", "match", "v5", "matches", "by-puuid", player.as_str(), "ids"],
        )?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("startTime", &since.timestamp().max(0).to_string());
            if let Some(queue) = self.queue {
                query.append_pair("queue", &queue.to_string());
            }
            query.append_pair("start", &start.to_string());
            query.append_pair("count", &count.to_string());
        }
        Ok(url)
    }

    /// Full payload of a single match.
    pub fn match_detail(&self, id: &MatchId) -> Result<Url> {
        with_segments(&self.regional, &["lol", "match", "v5", "matches", id.as_str()])
    }

    /// League entries of a player, one per ranked queue.
    pub fn league_entries(&self, player: &PlayerId) -> Result<Url> {
        with_segments(
            &self.platform,
            &["lol", "league", "v4", "entries", "by-puuid", player.as_str()],
        )
    }

    /// Apex ladder of the solo queue.
    pub fn apex_ladder(&self) -> Result<Url> {
        with_segments(
            &self.platform,
            &["lol", "league", "v4", "challengerleagues", "by-queue", SOLO_QUEUE],
        )
    }
}

/// Append percent-encoded path segments to a base URL.
fn with_segments(base: &Url, segments: &[&str]) -> Result<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| AppError::config(format!("{base} cannot be used as a base URL")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}
