// src/models/record.rs

//! Rows derived from a match payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{MatchId, PlayerId};

/// Match-level summary, one row per stored match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchSummary {
    pub match_id: MatchId,
    pub started_at: DateTime<Utc>,
    /// Game length in seconds
    pub duration_secs: i64,
    /// Whether the first listed team (blue side) won
    pub blue_win: bool,
    pub surrender: bool,
    pub remake: bool,
}

/// Solo-queue standing of a player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rating {
    pub tier: String,
    pub division: String,
    pub league_points: i64,
    pub wins: i64,
    pub losses: i64,
}

/// What the current processing unit knows about a participant's rating.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RatingState {
    /// Not looked up in this unit; stored values stay as they are.
    #[default]
    Unchanged,
    /// Looked up in this unit. `None` means the player is unranked.
    Refreshed(Option<Rating>),
}

/// A player appearing in a match.
#[derive(Debug, Clone, PartialEq)]
pub struct Participant {
    pub player: PlayerId,
    pub game_name: String,
    pub tag_line: String,
    pub profile_icon_id: i64,
    pub summoner_level: i64,
    pub rating: RatingState,
}

impl Participant {
    pub fn is_refreshed(&self) -> bool {
        matches!(self.rating, RatingState::Refreshed(_))
    }
}

/// Per-(match, player) facts. Written together with its match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantStats {
    pub match_id: MatchId,
    pub player: PlayerId,
    pub champion_id: i64,
    pub kills: i64,
    pub deaths: i64,
    pub assists: i64,
    pub kda: f64,
    pub gold_earned: i64,
    pub gold_spent: i64,
    pub gold_per_minute: f64,
    pub damage_per_minute: f64,
    pub total_damage_to_champions: i64,
    pub neutral_minions_killed: i64,
    pub total_minions_killed: i64,
    pub total_cs: i64,
    pub cs_per_minute: f64,
    pub vision_score: i64,
    pub vision_score_per_minute: f64,
    pub control_wards_placed: i64,
    pub wards_placed: i64,
    pub wards_killed: i64,
    pub individual_position: String,
    /// `true` for the red side (team 200)
    pub red_side: bool,
}

/// Everything the transform extracts from one match payload.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformedMatch {
    pub summary: MatchSummary,
    pub participants: Vec<Participant>,
    pub stats: Vec<ParticipantStats>,
}
