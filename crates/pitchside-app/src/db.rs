// SQLite persistence layer for the squad session.

use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use pitchside_core::squad::player::{Player, Recommendation};
use pitchside_core::squad::state::SavedLineup;
use rusqlite::{params, Connection};

/// One row of the assessment history: the player's fan ratings as they
/// stood after an edit.
#[derive(Debug, Clone, PartialEq)]
pub struct AssessmentRecord {
    pub player_id: String,
    pub rating: Option<u8>,
    pub value_for_money: Option<i8>,
    pub fan_pulse: Option<u8>,
    pub recommendation: Option<Recommendation>,
    pub comment: Option<String>,
    pub recorded_at: String,
}

impl AssessmentRecord {
    /// Copy the recorded ratings onto `player`.
    pub fn apply_to(&self, player: &mut Player) {
        player.ratings.rating = self.rating;
        player.ratings.value_for_money = self.value_for_money;
        player.ratings.fan_pulse = self.fan_pulse;
        player.status.recommendation = self.recommendation;
        player.comment = self.comment.clone();
    }
}

/// SQLite-backed key/value session state plus assessment history.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) a SQLite database at `path` and ensure all tables
    /// exist. `":memory:"` gives an ephemeral database for tests.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;",
        )
        .context("failed to set database pragmas")?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS session_state (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS assessments (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id      TEXT NOT NULL,
                player_id       TEXT NOT NULL,
                rating          INTEGER,
                value_for_money INTEGER,
                fan_pulse       INTEGER,
                recommendation  TEXT,
                comment         TEXT,
                recorded_at     TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_assessments_session_player
                ON assessments(session_id, player_id);
            ",
        )
        .context("failed to create database schema")?;

        Ok(Database {
            conn: Mutex::new(conn),
        })
    }

    /// Lock the connection. A poisoned lock is recovered since every write
    /// is a single statement or transaction.
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // ------------------------------------------------------------------
    // Key/value state
    // ------------------------------------------------------------------

    /// Persist a JSON value under `key`, replacing any previous value.
    pub fn save_state(&self, key: &str, value: &serde_json::Value) -> Result<()> {
        let conn = self.conn();
        let json_str =
            serde_json::to_string(value).context("failed to serialize state value")?;
        conn.execute(
            "INSERT OR REPLACE INTO session_state (key, value) VALUES (?1, ?2)",
            params![key, json_str],
        )
        .context("failed to save state")?;
        Ok(())
    }

    pub fn load_state(&self, key: &str) -> Result<Option<serde_json::Value>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare("SELECT value FROM session_state WHERE key = ?1")
            .context("failed to prepare load_state query")?;

        let mut rows = stmt
            .query_map(params![key], |row| row.get::<_, String>(0))
            .context("failed to query session state")?;

        match rows.next() {
            Some(row_result) => {
                let json_str = row_result.context("failed to read state row")?;
                let value = serde_json::from_str(&json_str)
                    .context("failed to deserialize state value")?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    const LINEUP_KEY: &'static str = "saved_lineup";
    const SESSION_ID_KEY: &'static str = "current_session_id";

    pub fn save_lineup(&self, lineup: &SavedLineup) -> Result<()> {
        let value = serde_json::to_value(lineup).context("failed to serialize lineup")?;
        self.save_state(Self::LINEUP_KEY, &value)
    }

    /// The stored lineup, or `None` when absent. A stored value that no
    /// longer deserializes is an error, not `None`.
    pub fn load_lineup(&self) -> Result<Option<SavedLineup>> {
        match self.load_state(Self::LINEUP_KEY)? {
            Some(value) => {
                let lineup =
                    serde_json::from_value(value).context("stored lineup is malformed")?;
                Ok(Some(lineup))
            }
            None => Ok(None),
        }
    }

    pub fn get_session_id(&self) -> Result<Option<String>> {
        let value = self.load_state(Self::SESSION_ID_KEY)?;
        Ok(value.and_then(|v| v.as_str().map(|s| s.to_string())))
    }

    pub fn set_session_id(&self, session_id: &str) -> Result<()> {
        self.save_state(
            Self::SESSION_ID_KEY,
            &serde_json::Value::String(session_id.to_string()),
        )
    }

    /// New session id from the current UTC time, e.g.
    /// `session_20260812_143022_123`.
    pub fn generate_session_id() -> String {
        chrono::Utc::now()
            .format("session_%Y%m%d_%H%M%S_%3f")
            .to_string()
    }

    // ------------------------------------------------------------------
    // Assessment history
    // ------------------------------------------------------------------

    /// Append the player's current ratings to the history.
    pub fn record_assessment(&self, session_id: &str, player: &Player) -> Result<()> {
        let conn = self.conn();
        let recorded_at = chrono::Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO assessments
                (session_id, player_id, rating, value_for_money, fan_pulse,
                 recommendation, comment, recorded_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                session_id,
                player.id,
                player.ratings.rating,
                player.ratings.value_for_money,
                player.ratings.fan_pulse,
                player.status.recommendation.map(|r| r.display_str()),
                player.comment,
                recorded_at,
            ],
        )
        .context("failed to record assessment")?;
        Ok(())
    }

    fn query_assessments(
        &self,
        sql: &str,
        args: &[&dyn rusqlite::ToSql],
    ) -> Result<Vec<AssessmentRecord>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(sql)
            .context("failed to prepare assessments query")?;
        let records = stmt
            .query_map(args, |row| {
                let recommendation: Option<String> = row.get(4)?;
                Ok(AssessmentRecord {
                    player_id: row.get(0)?,
                    rating: row.get(1)?,
                    value_for_money: row.get(2)?,
                    fan_pulse: row.get(3)?,
                    recommendation: recommendation
                        .as_deref()
                        .and_then(Recommendation::from_str_tag),
                    comment: row.get(5)?,
                    recorded_at: row.get(6)?,
                })
            })
            .context("failed to query assessments")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map assessment rows")?;
        Ok(records)
    }

    /// One player's history within a session, oldest first.
    pub fn load_assessments(
        &self,
        session_id: &str,
        player_id: &str,
    ) -> Result<Vec<AssessmentRecord>> {
        self.query_assessments(
            "SELECT player_id, rating, value_for_money, fan_pulse, recommendation,
                    comment, recorded_at
             FROM assessments
             WHERE session_id = ?1 AND player_id = ?2
             ORDER BY id",
            &[&session_id, &player_id],
        )
    }

    /// Most recent record per player within a session.
    pub fn latest_assessments(&self, session_id: &str) -> Result<Vec<AssessmentRecord>> {
        self.query_assessments(
            "SELECT player_id, rating, value_for_money, fan_pulse, recommendation,
                    comment, recorded_at
             FROM assessments
             WHERE id IN (
                 SELECT MAX(id) FROM assessments WHERE session_id = ?1 GROUP BY player_id
             )
             ORDER BY player_id",
            &[&session_id],
        )
    }

    /// Drop all session state and history.
    pub fn clear_session(&self) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction().context("failed to begin transaction")?;
        tx.execute("DELETE FROM assessments", [])
            .context("failed to delete assessments")?;
        tx.execute("DELETE FROM session_state", [])
            .context("failed to delete session state")?;
        tx.commit().context("failed to commit clear_session")?;
        Ok(())
    }
}
