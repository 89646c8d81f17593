//! SQL schema for the harvest database.
//!
//! Executed once at connection startup. Timestamps are RFC 3339 UTC text with
//! millisecond precision, so text order equals time order.

use chrono::{DateTime, Utc};

use crate::storage::encode::decode_dt;

/// Freshness assigned to players that have never been scanned.
pub const DEFAULT_LAST_SCANNED: &str = "2024-01-01T00:00:00.000Z";

/// [`DEFAULT_LAST_SCANNED`] as a value, for when the database cannot be asked.
pub fn default_last_scanned() -> DateTime<Utc> {
    decode_dt(DEFAULT_LAST_SCANNED).unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Catalog of tracked players, doubling as participant profile and rating.
CREATE TABLE IF NOT EXISTS players (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,  -- insertion order
    puuid           TEXT NOT NULL UNIQUE,
    game_name       TEXT,
    tag_line        TEXT,
    profile_icon_id INTEGER,
    summoner_level  INTEGER,
    tier            TEXT,
    division        TEXT,
    league_points   INTEGER,
    wins            INTEGER,
    losses          INTEGER,
    rated_at        TEXT,
    last_scanned    TEXT NOT NULL DEFAULT '2024-01-01T00:00:00.000Z'
);

-- Matches are written once and never updated.
CREATE TABLE IF NOT EXISTS matches (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    match_id      TEXT NOT NULL UNIQUE,
    started_at    TEXT NOT NULL,
    duration_secs INTEGER NOT NULL,
    blue_win      INTEGER NOT NULL,
    surrender     INTEGER NOT NULL,
    remake        INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS participant_stats (
    match_id                  TEXT NOT NULL REFERENCES matches(match_id),
    puuid                     TEXT NOT NULL REFERENCES players(puuid),
    champion_id               INTEGER NOT NULL,
    kills                     INTEGER NOT NULL,
    deaths                    INTEGER NOT NULL,
    assists                   INTEGER NOT NULL,
    kda                       REAL NOT NULL,
    gold_earned               INTEGER NOT NULL,
    gold_spent                INTEGER NOT NULL,
    gold_per_minute           REAL NOT NULL,
    damage_per_minute         REAL NOT NULL,
    total_damage_to_champions INTEGER NOT NULL,
    neutral_minions_killed    INTEGER NOT NULL,
    total_minions_killed      INTEGER NOT NULL,
    total_cs                  INTEGER NOT NULL,
    cs_per_minute             REAL NOT NULL,
    vision_score              INTEGER NOT NULL,
    vision_score_per_minute   REAL NOT NULL,
    control_wards_placed      INTEGER NOT NULL,
    wards_placed              INTEGER NOT NULL,
    wards_killed              INTEGER NOT NULL,
    individual_position       TEXT NOT NULL,
    red_side                  INTEGER NOT NULL,
    UNIQUE (match_id, puuid)
);

CREATE INDEX IF NOT EXISTS players_freshness_idx ON players(last_scanned, id);
CREATE INDEX IF NOT EXISTS stats_puuid_idx       ON participant_stats(puuid);

PRAGMA user_version = 1;
";
