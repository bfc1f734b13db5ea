use chrono::{DateTime, Local};
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::context::Identity;
use crate::difficulty::Difficulty;
use crate::error::StoreError;
use crate::session::{SessionConfig, SessionResult};

pub const ANONYMOUS: &str = "Anonymous";

/// A finished result waiting to be written
#[derive(Debug, Clone, PartialEq)]
pub struct PendingResult {
    pub identity: Identity,
    pub result: SessionResult,
    pub config: SessionConfig,
}

/// One persisted session row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub identity_id: String,
    pub wpm: u32,
    pub accuracy: u8,
    pub total_words: usize,
    pub errors: usize,
    pub difficulty: Difficulty,
    pub duration_secs: u32,
    pub created_at: DateTime<Local>,
}

impl ResultRecord {
    pub fn new(identity: &Identity, result: &SessionResult, config: &SessionConfig) -> Self {
        Self {
            identity_id: identity.id.clone(),
            wpm: result.wpm,
            accuracy: result.accuracy.min(100),
            total_words: result.total_words,
            errors: result.errors,
            difficulty: config.difficulty,
            duration_secs: config.duration_secs,
            created_at: result.completed_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardEntry {
    pub display_name: String,
    pub wpm: u32,
    pub accuracy: u8,
}

/// Where finished sessions go and where leaderboard and statistics come from
pub trait ResultsStore {
    /// Create or rename the profile behind `identity`
    fn register_identity(&mut self, identity: &Identity) -> Result<(), StoreError>;

    /// Append one row. A failure leaves previously stored rows untouched.
    fn record_result(
        &mut self,
        identity: &Identity,
        result: &SessionResult,
        config: &SessionConfig,
    ) -> Result<(), StoreError>;

    /// Best results first, ties in insertion order
    fn top_results(&self, limit: usize) -> Result<Vec<LeaderboardEntry>, StoreError>;

    /// Every result recorded for `identity`, oldest first
    fn results_for_identity(&self, identity: &Identity) -> Result<Vec<ResultRecord>, StoreError>;
}

/// Results store backed by a local SQLite database
#[derive(Debug)]
pub struct SqliteResultsStore {
    conn: Connection,
}

impl SqliteResultsStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        log::debug!("opening results database at {}", path.display());
        Self::from_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS profiles (
                id TEXT PRIMARY KEY,
                username TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS test_results (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                wpm INTEGER NOT NULL,
                accuracy INTEGER NOT NULL CHECK (accuracy BETWEEN 0 AND 100),
                total_words INTEGER NOT NULL,
                errors INTEGER NOT NULL,
                difficulty TEXT NOT NULL,
                duration INTEGER NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_test_results_wpm ON test_results(wpm);
            CREATE INDEX IF NOT EXISTS idx_test_results_user ON test_results(user_id);
            "#,
        )?;
        Ok(Self { conn })
    }
}

/// Columns as stored, before the text fields are parsed
struct StoredRecord {
    identity_id: String,
    wpm: u32,
    accuracy: u8,
    total_words: i64,
    errors: i64,
    difficulty: String,
    duration_secs: u32,
    created_at: String,
}

impl StoredRecord {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            identity_id: row.get(0)?,
            wpm: row.get(1)?,
            accuracy: row.get(2)?,
            total_words: row.get(3)?,
            errors: row.get(4)?,
            difficulty: row.get(5)?,
            duration_secs: row.get(6)?,
            created_at: row.get(7)?,
        })
    }
}

impl TryFrom<StoredRecord> for ResultRecord {
    type Error = StoreError;

    fn try_from(stored: StoredRecord) -> Result<Self, Self::Error> {
        let difficulty = stored
            .difficulty
            .parse::<Difficulty>()
            .map_err(|e| StoreError::InvalidRow(e.to_string()))?;
        let created_at = DateTime::parse_from_rfc3339(&stored.created_at)
            .map_err(|e| {
                StoreError::InvalidRow(format!("bad timestamp {:?}: {e}", stored.created_at))
            })?
            .with_timezone(&Local);

        Ok(ResultRecord {
            identity_id: stored.identity_id,
            wpm: stored.wpm,
            accuracy: stored.accuracy,
            total_words: stored.total_words.max(0) as usize,
            errors: stored.errors.max(0) as usize,
            difficulty,
            duration_secs: stored.duration_secs,
            created_at,
        })
    }
}

impl ResultsStore for SqliteResultsStore {
    fn register_identity(&mut self, identity: &Identity) -> Result<(), StoreError> {
        self.conn.execute(
            r#"
            INSERT INTO profiles (id, username) VALUES (?1, ?2)
            ON CONFLICT(id) DO UPDATE SET username = excluded.username
            "#,
            params![identity.id, identity.display_name],
        )?;
        Ok(())
    }

    fn record_result(
        &mut self,
        identity: &Identity,
        result: &SessionResult,
        config: &SessionConfig,
    ) -> Result<(), StoreError> {
        let record = ResultRecord::new(identity, result, config);
        let tx = self.conn.transaction()?;

        tx.execute(
            "INSERT OR IGNORE INTO profiles (id, username) VALUES (?1, ?2)",
            params![identity.id, identity.display_name],
        )?;
        tx.execute(
            r#"
            INSERT INTO test_results
            (user_id, wpm, accuracy, total_words, errors, difficulty, duration, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                record.identity_id,
                record.wpm,
                record.accuracy,
                record.total_words as i64,
                record.errors as i64,
                record.difficulty.as_str(),
                record.duration_secs,
                record.created_at.to_rfc3339(),
            ],
        )?;

        tx.commit()?;
        Ok(())
    }

    fn top_results(&self, limit: usize) -> Result<Vec<LeaderboardEntry>, StoreError> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT COALESCE(p.username, ?2), r.wpm, r.accuracy
            FROM test_results r
            LEFT JOIN profiles p ON p.id = r.user_id
            ORDER BY r.wpm DESC, r.id ASC
            LIMIT ?1
            "#,
        )?;

        let rows = stmt.query_map(params![limit as i64, ANONYMOUS], |row| {
            Ok(LeaderboardEntry {
                display_name: row.get(0)?,
                wpm: row.get(1)?,
                accuracy: row.get(2)?,
            })
        })?;

        let mut entries = Vec::new();
        for entry in rows {
            entries.push(entry?);
        }
        Ok(entries)
    }

    fn results_for_identity(&self, identity: &Identity) -> Result<Vec<ResultRecord>, StoreError> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT user_id, wpm, accuracy, total_words, errors, difficulty, duration, created_at
            FROM test_results
            WHERE user_id = ?1
            ORDER BY id ASC
            "#,
        )?;

        let rows = stmt.query_map([&identity.id], StoredRecord::from_row)?;
        let mut records = Vec::new();
        for stored in rows {
            records.push(ResultRecord::try_from(stored?)?);
        }
        Ok(records)
    }
}
