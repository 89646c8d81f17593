// src/services/walker.rs

//! Pagination walker for a player's match history.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::error::{AppError, Result};
use crate::models::{MatchId, PlayerId};
use crate::services::fetcher::Fetcher;
use crate::utils::Endpoints;

/// Enumerates every match id of a player started after a given instant.
#[derive(Clone)]
pub struct Walker {
    fetcher: Fetcher,
    endpoints: Endpoints,
    page_size: usize,
}

impl Walker {
    pub fn new(fetcher: Fetcher, endpoints: Endpoints, page_size: usize) -> Self {
        Self {
            fetcher,
            endpoints,
            page_size: page_size.max(1),
        }
    }

    /// Walk all pages from offset 0 until a short page and return the ids
    /// in listing order.
    ///
    /// A missing, rejected or malformed page reads as an empty final page.
    /// Errors that could clear up later abort the walk so the round can be
    /// retried.
    pub async fn list_records(
        &self,
        player: &PlayerId,
        since: DateTime<Utc>,
    ) -> Result<Vec<MatchId>> {
        let mut ids = Vec::new();
        let mut seen = HashSet::new();
        let mut start = 0;

        loop {
            let url = self.endpoints.match_ids(player, since, start, self.page_size)?;
            let page: Vec<MatchId> = match self.fetcher.fetch(&url).await {
                Ok(value) => match serde_json::from_value(value) {
                    Ok(page) => page,
                    Err(e) => {
                        log::warn!("Malformed page at offset {} for {}: {}", start, player, e);
                        break;
                    }
                },
                Err(e) if !e.is_retryable() => {
                    log::warn!("Listing for {} ended at offset {}: {}", player, start, e);
                    break;
                }
                Err(e) => return Err(AppError::listing(player.as_str(), e)),
            };

            let len = page.len();
            ids.extend(page.into_iter().filter(|id| seen.insert(id.clone())));
            log::debug!("Page at offset {} for {}: {} ids", start, player, len);

            if len < self.page_size {
                break;
            }
            start += self.page_size;
        }

        Ok(ids)
    }
}
