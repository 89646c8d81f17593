// src/testing.rs

//! Shared test doubles and payload fixtures.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use tokio::time::Instant;

use crate::error::{AppError, Result};
use crate::models::{
    CatalogStats, MatchId, MatchSummary, Participant, ParticipantStats, PlayerId, TrackedPlayer,
};
use crate::storage::{MatchStore, SqliteStore};
use crate::utils::{Endpoints, RawResponse, Transport};

/// Endpoints pointing at hosts nothing listens on.
pub(crate) fn test_endpoints() -> Endpoints {
    Endpoints::new("https://regional.test/", "https://platform.test/", Some(420))
        .expect("static test endpoints")
}

pub(crate) fn ids_path(player: &str) -> String {
    format!("/lol/match/v5/matches/by-puuid/{player}/ids")
}

pub(crate) fn detail_path(id: &str) -> String {
    format!("/lol/match/v5/matches/{id}")
}

pub(crate) fn entries_path(player: &str) -> String {
    format!("/lol/league/v4/entries/by-puuid/{player}")
}

pub(crate) const LADDER_PATH: &str = "/lol/league/v4/challengerleagues/by-queue/RANKED_SOLO_5x5";

/// 200 response carrying `value` as JSON.
pub(crate) fn ok_json(value: &Value) -> RawResponse {
    RawResponse::new(200, value.to_string())
}

/// 200 response listing `count` ids named `{prefix}_{n}`, starting at `from`.
pub(crate) fn ids_page(prefix: &str, from: usize, count: usize) -> RawResponse {
    let ids: Vec<String> = (from..from + count).map(|n| format!("{prefix}_{n}")).collect();
    ok_json(&json!(ids))
}

#[derive(Default)]
struct Script {
    queued: HashMap<String, VecDeque<RawResponse>>,
    sticky: HashMap<String, RawResponse>,
    requests: Vec<(String, String, Instant)>,
}

/// [`Transport`] replaying scripted responses keyed on the URL path.
///
/// Queued responses are consumed in order; a sticky response answers every
/// request once the queue is drained. Unscripted paths fail like a dropped
/// connection.
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    script: Mutex<Script>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&self, path: impl Into<String>, response: RawResponse) {
        let mut script = self.script.lock().unwrap();
        script
            .queued
            .entry(path.into())
            .or_default()
            .push_back(response);
    }

    pub(crate) fn always(&self, path: impl Into<String>, response: RawResponse) {
        self.script.lock().unwrap().sticky.insert(path.into(), response);
    }

    pub(crate) fn request_count(&self, path: &str) -> usize {
        self.request_times(path).len()
    }

    pub(crate) fn request_times(&self, path: &str) -> Vec<Instant> {
        self.script
            .lock()
            .unwrap()
            .requests
            .iter()
            .filter(|(p, _, _)| p == path)
            .map(|(_, _, at)| *at)
            .collect()
    }

    /// Full URLs requested under `path`, in order.
    pub(crate) fn requested_urls(&self, path: &str) -> Vec<String> {
        self.script
            .lock()
            .unwrap()
            .requests
            .iter()
            .filter(|(p, _, _)| p == path)
            .map(|(_, url, _)| url.clone())
            .collect()
    }

    pub(crate) fn total_requests(&self) -> usize {
        self.script.lock().unwrap().requests.len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn get(&self, url: &str) -> Result<RawResponse> {
        let parsed = url::Url::parse(url)?;
        let path = parsed.path().to_string();

        let mut script = self.script.lock().unwrap();
        script
            .requests
            .push((path.clone(), url.to_string(), Instant::now()));

        if let Some(response) = script.queued.get_mut(&path).and_then(VecDeque::pop_front) {
            return Ok(response);
        }
        match script.sticky.get(&path) {
            Some(response) => Ok(response.clone()),
            None => Err(AppError::transport(format!("connection reset on {path}"))),
        }
    }
}

/// A 30 minute blue-side win. Participants alternate blue/red starting blue.
pub(crate) fn match_payload(id: &str, players: &[&str]) -> Value {
    let participants: Vec<Value> = players
        .iter()
        .enumerate()
        .map(|(i, puuid)| {
            json!({
                "puuid": puuid,
                "riotIdGameName": format!("name-{puuid}"),
                "riotIdTagline": "BR1",
                "profileIcon": 7,
                "summonerLevel": 120,
                "gameEndedInSurrender": false,
                "gameEndedInEarlySurrender": false,
                "championId": 86,
                "kills": 5,
                "deaths": 2,
                "assists": 8,
                "goldEarned": 12000,
                "goldSpent": 11000,
                "totalDamageDealtToChampions": 24000,
                "neutralMinionsKilled": 30,
                "totalMinionsKilled": 150,
                "visionScore": 25,
                "wardsPlaced": 10,
                "wardsKilled": 3,
                "individualPosition": "TOP",
                "teamId": if i % 2 == 0 { 100 } else { 200 },
                "challenges": {
                    "kda": 6.5,
                    "goldPerMinute": 400.0,
                    "damagePerMinute": 800.0,
                    "visionScorePerMinute": 0.83,
                    "controlWardsPlaced": 2
                }
            })
        })
        .collect();

    json!({
        "metadata": { "matchId": id },
        "info": {
            "gameCreation": 1_704_067_200_000_i64,
            "gameDuration": 1800,
            "teams": [
                { "teamId": 100, "win": true },
                { "teamId": 200, "win": false }
            ],
            "participants": participants
        }
    })
}

/// League entries with a solo-queue entry in `solo_tier`, or flex only.
pub(crate) fn league_entries(solo_tier: Option<&str>) -> Value {
    let mut entries = vec![json!({
        "queueType": "RANKED_FLEX_SR",
        "tier": "SILVER",
        "rank": "I",
        "leaguePoints": 12,
        "wins": 4,
        "losses": 6
    })];
    if let Some(tier) = solo_tier {
        entries.push(json!({
            "queueType": "RANKED_SOLO_5x5",
            "tier": tier,
            "rank": "II",
            "leaguePoints": 42,
            "wins": 30,
            "losses": 25
        }));
    }
    Value::Array(entries)
}

/// Apex ladder payload from `(puuid, league points)` pairs.
pub(crate) fn apex_ladder(entries: &[(&str, i64)]) -> Value {
    let entries: Vec<Value> = entries
        .iter()
        .map(|(puuid, lp)| json!({ "puuid": puuid, "leaguePoints": lp }))
        .collect();
    json!({ "tier": "CHALLENGER", "queue": "RANKED_SOLO_5x5", "entries": entries })
}

/// In-memory store whose catalog reads can be made to fail.
pub(crate) struct FlakyCatalog {
    pub(crate) inner: SqliteStore,
    failing: AtomicBool,
}

impl FlakyCatalog {
    pub(crate) async fn new() -> Self {
        Self {
            inner: SqliteStore::open_in_memory().await.expect("in-memory store"),
            failing: AtomicBool::new(false),
        }
    }

    pub(crate) fn fail_catalog_reads(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::DateParse("corrupt last_scanned".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl MatchStore for FlakyCatalog {
    async fn record_exists(&self, id: &MatchId) -> Result<bool> {
        self.inner.record_exists(id).await
    }
    async fn participant_exists(&self, player: &PlayerId) -> Result<bool> {
        self.inner.participant_exists(player).await
    }
    async fn rating_refreshed_at(&self, player: &PlayerId) -> Result<Option<DateTime<Utc>>> {
        self.inner.rating_refreshed_at(player).await
    }
    async fn last_scan(&self, player: &PlayerId) -> Result<Option<DateTime<Utc>>> {
        self.inner.last_scan(player).await
    }
    async fn default_scan_timestamp(&self) -> Result<DateTime<Utc>> {
        self.inner.default_scan_timestamp().await
    }
    async fn is_catalog_empty(&self) -> Result<bool> {
        self.check()?;
        self.inner.is_catalog_empty().await
    }
    async fn select_oldest_entity(&self) -> Result<Option<TrackedPlayer>> {
        self.check()?;
        self.inner.select_oldest_entity().await
    }
    async fn track_entity(&self, player: &PlayerId) -> Result<bool> {
        self.inner.track_entity(player).await
    }
    async fn append_record(&self, summary: &MatchSummary) -> Result<bool> {
        self.inner.append_record(summary).await
    }
    async fn append_participants(&self, participants: &[Participant]) -> Result<usize> {
        self.inner.append_participants(participants).await
    }
    async fn append_details(&self, stats: &[ParticipantStats]) -> Result<usize> {
        self.inner.append_details(stats).await
    }
    async fn persist_record(
        &self,
        summary: &MatchSummary,
        participants: &[Participant],
        stats: &[ParticipantStats],
    ) -> Result<bool> {
        self.inner.persist_record(summary, participants, stats).await
    }
    async fn update_last_scan(&self, player: &PlayerId, at: DateTime<Utc>) -> Result<()> {
        self.inner.update_last_scan(player, at).await
    }
    async fn update_rating_date(&self, player: &PlayerId, at: DateTime<Utc>) -> Result<()> {
        self.inner.update_rating_date(player, at).await
    }
    async fn catalog_stats(&self) -> Result<CatalogStats> {
        self.inner.catalog_stats().await
    }
    async fn close(&self) -> Result<()> {
        self.inner.close().await
    }
}
