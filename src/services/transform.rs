// src/services/transform.rs

//! Payload → row transform.
//!
//! Stateless: the same payload always yields the same rows.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::{
    MatchId, MatchSummary, Participant, ParticipantStats, PlayerId, Rating, RatingState,
    TransformedMatch,
};
use crate::utils::url::SOLO_QUEUE;

/// Team id of the red side.
const RED_TEAM_ID: i64 = 200;

/// Maps raw payloads into storage rows.
pub trait RecordTransform: Send + Sync {
    /// Derive the match summary, its participants and their stats rows.
    fn transform(&self, payload: &Value) -> Result<TransformedMatch>;

    /// Extract the solo-queue rating from a player's league entries.
    /// `Ok(None)` means the player is unranked in that queue.
    fn rating(&self, payload: &Value) -> Result<Option<Rating>>;
}

/// Transform for match-v5 / league-v4 payloads.
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchTransform;

impl RecordTransform for MatchTransform {
    fn transform(&self, payload: &Value) -> Result<TransformedMatch> {
        let raw = MatchPayload::deserialize(payload).map_err(AppError::transform)?;
        let match_id = MatchId::new(raw.metadata.match_id);
        let info = raw.info;

        let first = info
            .participants
            .first()
            .ok_or_else(|| AppError::transform(format!("match {match_id} has no participants")))?;
        let blue_win = info
            .teams
            .first()
            .map(|team| team.win)
            .ok_or_else(|| AppError::transform(format!("match {match_id} has no teams")))?;
        let started_at = DateTime::<Utc>::from_timestamp_millis(info.game_creation)
            .ok_or_else(|| {
                AppError::transform(format!("match {match_id} has an invalid start time"))
            })?;

        let summary = MatchSummary {
            match_id: match_id.clone(),
            started_at,
            duration_secs: info.game_duration,
            blue_win,
            surrender: first.game_ended_in_surrender,
            remake: first.game_ended_in_early_surrender,
        };

        let participants = info
            .participants
            .iter()
            .map(|p| Participant {
                player: PlayerId::new(p.puuid.clone()),
                game_name: p.riot_id_game_name.clone(),
                tag_line: p.riot_id_tagline.clone(),
                profile_icon_id: p.profile_icon,
                summoner_level: p.summoner_level,
                rating: RatingState::Unchanged,
            })
            .collect();

        let stats = info
            .participants
            .iter()
            .map(|p| participant_stats(&match_id, info.game_duration, p))
            .collect();

        Ok(TransformedMatch {
            summary,
            participants,
            stats,
        })
    }

    fn rating(&self, payload: &Value) -> Result<Option<Rating>> {
        let entries = Vec::<LeagueEntry>::deserialize(payload).map_err(AppError::transform)?;
        Ok(entries
            .into_iter()
            .find(|entry| entry.queue_type == SOLO_QUEUE)
            .map(|entry| Rating {
                tier: entry.tier,
                division: entry.rank,
                league_points: entry.league_points,
                wins: entry.wins,
                losses: entry.losses,
            }))
    }
}

fn participant_stats(
    match_id: &MatchId,
    duration_secs: i64,
    p: &RawParticipant,
) -> ParticipantStats {
    let total_cs = p.total_minions_killed + p.neutral_minions_killed;
    let cs_per_minute = if duration_secs > 0 {
        total_cs as f64 / (duration_secs as f64 / 60.0)
    } else {
        0.0
    };
    let challenges = p.challenges.clone().unwrap_or_default();

    ParticipantStats {
        match_id: match_id.clone(),
        player: PlayerId::new(p.puuid.clone()),
        champion_id: p.champion_id,
        kills: p.kills,
        deaths: p.deaths,
        assists: p.assists,
        kda: challenges.kda,
        gold_earned: p.gold_earned,
        gold_spent: p.gold_spent,
        gold_per_minute: challenges.gold_per_minute,
        damage_per_minute: challenges.damage_per_minute,
        total_damage_to_champions: p.total_damage_dealt_to_champions,
        neutral_minions_killed: p.neutral_minions_killed,
        total_minions_killed: p.total_minions_killed,
        total_cs,
        cs_per_minute,
        vision_score: p.vision_score,
        vision_score_per_minute: challenges.vision_score_per_minute,
        control_wards_placed: challenges.control_wards_placed,
        wards_placed: p.wards_placed,
        wards_killed: p.wards_killed,
        individual_position: p.individual_position.clone(),
        red_side: p.team_id == RED_TEAM_ID,
    }
}

// --- Wire shapes ---

#[derive(Deserialize)]
struct MatchPayload {
    metadata: Metadata,
    info: Info,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Metadata {
    match_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Info {
    game_creation: i64,
    game_duration: i64,
    #[serde(default)]
    teams: Vec<Team>,
    participants: Vec<RawParticipant>,
}

#[derive(Deserialize)]
struct Team {
    win: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawParticipant {
    puuid: String,
    #[serde(default)]
    riot_id_game_name: String,
    #[serde(default)]
    riot_id_tagline: String,
    #[serde(default)]
    profile_icon: i64,
    #[serde(default)]
    summoner_level: i64,
    #[serde(default)]
    game_ended_in_surrender: bool,
    #[serde(default)]
    game_ended_in_early_surrender: bool,
    champion_id: i64,
    kills: i64,
    deaths: i64,
    assists: i64,
    #[serde(default)]
    gold_earned: i64,
    #[serde(default)]
    gold_spent: i64,
    #[serde(default)]
    total_damage_dealt_to_champions: i64,
    #[serde(default)]
    neutral_minions_killed: i64,
    #[serde(default)]
    total_minions_killed: i64,
    #[serde(default)]
    vision_score: i64,
    #[serde(default)]
    wards_placed: i64,
    #[serde(default)]
    wards_killed: i64,
    #[serde(default)]
    individual_position: String,
    team_id: i64,
    #[serde(default)]
    challenges: Option<Challenges>,
}

#[derive(Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase", default)]
struct Challenges {
    kda: f64,
    gold_per_minute: f64,
    damage_per_minute: f64,
    vision_score_per_minute: f64,
    control_wards_placed: i64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LeagueEntry {
    queue_type: String,
    tier: String,
    rank: String,
    league_points: i64,
    wins: i64,
    losses: i64,
}
