// src/storage/sqlite.rs

//! SQLite implementation of [`MatchStore`].
//!
//! Wraps [`tokio_rusqlite`] so every query runs on the connection's own
//! thread. All workers share one connection; each call is atomic by itself.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;

use crate::error::Result;
use crate::models::{
    CatalogStats, MatchId, MatchSummary, Participant, ParticipantStats, PlayerId, RatingState,
    TrackedPlayer,
};
use crate::storage::MatchStore;
use crate::storage::encode::{decode_dt, encode_dt, strip_sql_quotes};
use crate::storage::schema::{DEFAULT_LAST_SCANNED, SCHEMA};

/// A harvest store backed by a single SQLite file.
///
/// Clones share the same connection.
#[derive(Clone)]
pub struct SqliteStore {
    conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
    /// Open (or create) a store at `path` and run schema initialisation.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let conn = tokio_rusqlite::Connection::open(path).await?;
        let store = Self { conn };
        store.init_schema().await?;
        Ok(store)
    }

    /// Open an in-memory store.
    pub async fn open_in_memory() -> Result<Self> {
        let conn = tokio_rusqlite::Connection::open_in_memory().await?;
        let store = Self { conn };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<()> {
        self.conn
            .call(|conn| {
                conn.execute_batch(SCHEMA)?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    async fn count(&self, sql: &'static str) -> Result<u64> {
        let n: i64 = self
            .conn
            .call(move |conn| Ok(conn.query_row(sql, [], |r| r.get(0))?))
            .await?;
        Ok(n.max(0) as u64)
    }
}

// ─── Row writers shared by the single-call and transactional paths ──────────

fn insert_match(conn: &rusqlite::Connection, m: &MatchSummary) -> rusqlite::Result<bool> {
    let changed = conn.execute(
        "INSERT OR IGNORE INTO matches
           (match_id, started_at, duration_secs, blue_win, surrender, remake)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![
            m.match_id.as_str(),
            encode_dt(m.started_at),
            m.duration_secs,
            m.blue_win,
            m.surrender,
            m.remake,
        ],
    )?;
    Ok(changed == 1)
}

fn upsert_participants(
    conn: &rusqlite::Connection,
    participants: &[Participant],
) -> rusqlite::Result<usize> {
    let mut profile = conn.prepare_cached(
        "INSERT INTO players (puuid, game_name, tag_line, profile_icon_id, summoner_level)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(puuid) DO UPDATE SET
           game_name       = excluded.game_name,
           tag_line        = excluded.tag_line,
           profile_icon_id = excluded.profile_icon_id,
           summoner_level  = excluded.summoner_level",
    )?;
    let mut rating = conn.prepare_cached(
        "UPDATE players
            SET tier = ?2, division = ?3, league_points = ?4, wins = ?5, losses = ?6
          WHERE puuid = ?1",
    )?;

    for p in participants {
        profile.execute(rusqlite::params![
            p.player.as_str(),
            p.game_name,
            p.tag_line,
            p.profile_icon_id,
            p.summoner_level,
        ])?;

        if let RatingState::Refreshed(r) = &p.rating {
            rating.execute(rusqlite::params![
                p.player.as_str(),
                r.as_ref().map(|r| r.tier.as_str()),
                r.as_ref().map(|r| r.division.as_str()),
                r.as_ref().map(|r| r.league_points),
                r.as_ref().map(|r| r.wins),
                r.as_ref().map(|r| r.losses),
            ])?;
        }
    }
    Ok(participants.len())
}

fn insert_stats(conn: &rusqlite::Connection, stats: &[ParticipantStats]) -> rusqlite::Result<usize> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO participant_stats (
           match_id, puuid, champion_id, kills, deaths, assists, kda,
           gold_earned, gold_spent, gold_per_minute, damage_per_minute,
           total_damage_to_champions, neutral_minions_killed, total_minions_killed,
           total_cs, cs_per_minute, vision_score, vision_score_per_minute,
           control_wards_placed, wards_placed, wards_killed, individual_position, red_side
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
                   ?17, ?18, ?19, ?20, ?21, ?22, ?23)",
    )?;

    for s in stats {
        stmt.execute(rusqlite::params![
            s.match_id.as_str(),
            s.player.as_str(),
            s.champion_id,
            s.kills,
            s.deaths,
            s.assists,
            s.kda,
            s.gold_earned,
            s.gold_spent,
            s.gold_per_minute,
            s.damage_per_minute,
            s.total_damage_to_champions,
            s.neutral_minions_killed,
            s.total_minions_killed,
            s.total_cs,
            s.cs_per_minute,
            s.vision_score,
            s.vision_score_per_minute,
            s.control_wards_placed,
            s.wards_placed,
            s.wards_killed,
            s.individual_position,
            s.red_side,
        ])?;
    }
    Ok(stats.len())
}

// ─── MatchStore impl ─────────────────────────────────────────────────────────

#[async_trait]
impl MatchStore for SqliteStore {
    async fn record_exists(&self, id: &MatchId) -> Result<bool> {
        let id = id.as_str().to_owned();
        let exists = self
            .conn
            .call(move |conn| {
                Ok(conn
                    .query_row(
                        "SELECT 1 FROM matches WHERE match_id = ?1",
                        [id],
                        |_| Ok(true),
                    )
                    .optional()?
                    .unwrap_or(false))
            })
            .await?;
        Ok(exists)
    }

    async fn participant_exists(&self, player: &PlayerId) -> Result<bool> {
        let puuid = player.as_str().to_owned();
        let exists = self
            .conn
            .call(move |conn| {
                Ok(conn
                    .query_row("SELECT 1 FROM players WHERE puuid = ?1", [puuid], |_| {
                        Ok(true)
                    })
                    .optional()?
                    .unwrap_or(false))
            })
            .await?;
        Ok(exists)
    }

    async fn rating_refreshed_at(&self, player: &PlayerId) -> Result<Option<DateTime<Utc>>> {
        let puuid = player.as_str().to_owned();
        let raw: Option<String> = self
            .conn
            .call(move |conn| {
                Ok(conn
                    .query_row(
                        "SELECT rated_at FROM players WHERE puuid = ?1",
                        [puuid],
                        |r| r.get::<_, Option<String>>(0),
                    )
                    .optional()?
                    .flatten())
            })
            .await?;
        raw.as_deref().map(decode_dt).transpose()
    }

    async fn last_scan(&self, player: &PlayerId) -> Result<Option<DateTime<Utc>>> {
        let puuid = player.as_str().to_owned();
        let raw: Option<String> = self
            .conn
            .call(move |conn| {
                Ok(conn
                    .query_row(
                        "SELECT last_scanned FROM players WHERE puuid = ?1",
                        [puuid],
                        |r| r.get(0),
                    )
                    .optional()?)
            })
            .await?;
        raw.as_deref().map(decode_dt).transpose()
    }

    async fn default_scan_timestamp(&self) -> Result<DateTime<Utc>> {
        let raw: Option<String> = self
            .conn
            .call(|conn| {
                Ok(conn
                    .query_row(
                        "SELECT dflt_value FROM pragma_table_info('players')
                          WHERE name = 'last_scanned'",
                        [],
                        |r| r.get::<_, Option<String>>(0),
                    )
                    .optional()?
                    .flatten())
            })
            .await?;
        let literal = raw.unwrap_or_else(|| DEFAULT_LAST_SCANNED.to_string());
        decode_dt(strip_sql_quotes(&literal))
    }

    async fn is_catalog_empty(&self) -> Result<bool> {
        Ok(self.count("SELECT COUNT(*) FROM players").await? == 0)
    }

    async fn select_oldest_entity(&self) -> Result<Option<TrackedPlayer>> {
        let row: Option<(String, String)> = self
            .conn
            .call(|conn| {
                Ok(conn
                    .query_row(
                        "SELECT puuid, last_scanned FROM players
                          ORDER BY last_scanned ASC, id ASC
                          LIMIT 1",
                        [],
                        |r| Ok((r.get(0)?, r.get(1)?)),
                    )
                    .optional()?)
            })
            .await?;

        row.map(|(puuid, last_scanned)| {
            Ok(TrackedPlayer {
                player: PlayerId::new(puuid),
                last_scanned: decode_dt(&last_scanned)?,
            })
        })
        .transpose()
    }

    async fn track_entity(&self, player: &PlayerId) -> Result<bool> {
        let puuid = player.as_str().to_owned();
        let changed = self
            .conn
            .call(move |conn| {
                Ok(conn.execute(
                    "INSERT OR IGNORE INTO players (puuid) VALUES (?1)",
                    [puuid],
                )?)
            })
            .await?;
        Ok(changed == 1)
    }

    async fn append_record(&self, summary: &MatchSummary) -> Result<bool> {
        let summary = summary.clone();
        let created = self
            .conn
            .call(move |conn| Ok(insert_match(conn, &summary)?))
            .await?;
        Ok(created)
    }

    async fn append_participants(&self, participants: &[Participant]) -> Result<usize> {
        let participants = participants.to_vec();
        let written = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let n = upsert_participants(&tx, &participants)?;
                tx.commit()?;
                Ok(n)
            })
            .await?;
        Ok(written)
    }

    async fn append_details(&self, stats: &[ParticipantStats]) -> Result<usize> {
        let stats = stats.to_vec();
        let written = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let n = insert_stats(&tx, &stats)?;
                tx.commit()?;
                Ok(n)
            })
            .await?;
        Ok(written)
    }

    async fn persist_record(
        &self,
        summary: &MatchSummary,
        participants: &[Participant],
        stats: &[ParticipantStats],
    ) -> Result<bool> {
        let summary = summary.clone();
        let participants = participants.to_vec();
        let stats = stats.to_vec();

        let created = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                if !insert_match(&tx, &summary)? {
                    // Another unit stored it first; dropping `tx` rolls back.
                    return Ok(false);
                }
                upsert_participants(&tx, &participants)?;
                insert_stats(&tx, &stats)?;
                tx.commit()?;
                Ok(true)
            })
            .await?;
        Ok(created)
    }

    async fn update_last_scan(&self, player: &PlayerId, at: DateTime<Utc>) -> Result<()> {
        let puuid = player.as_str().to_owned();
        let at = encode_dt(at);
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO players (puuid, last_scanned) VALUES (?1, ?2)
                     ON CONFLICT(puuid) DO UPDATE SET
                       last_scanned = MAX(players.last_scanned, excluded.last_scanned)",
                    rusqlite::params![puuid, at],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    async fn update_rating_date(&self, player: &PlayerId, at: DateTime<Utc>) -> Result<()> {
        let puuid = player.as_str().to_owned();
        let at = encode_dt(at);
        self.conn
            .call(move |conn| {
                conn.execute(
                    "UPDATE players SET rated_at = ?2 WHERE puuid = ?1",
                    rusqlite::params![puuid, at],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    async fn catalog_stats(&self) -> Result<CatalogStats> {
        Ok(CatalogStats {
            tracked_players: self.count("SELECT COUNT(*) FROM players").await?,
            rated_players: self
                .count("SELECT COUNT(*) FROM players WHERE rated_at IS NOT NULL")
                .await?,
            matches: self.count("SELECT COUNT(*) FROM matches").await?,
            stats_rows: self.count("SELECT COUNT(*) FROM participant_stats").await?,
            oldest: self.select_oldest_entity().await?,
        })
    }

    async fn close(&self) -> Result<()> {
        self.conn.clone().close().await?;
        Ok(())
    }
}
