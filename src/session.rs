use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;

use crate::difficulty::Difficulty;
use crate::error::ConfigError;
use crate::typing_policy::MismatchPolicy;

/// Elapsed time below this is treated as this, so an instant stop cannot divide by zero
pub const MIN_ELAPSED_MS: u64 = 1_000;

pub const DEFAULT_DURATION_SECS: u32 = 60;

/// Fixed for the lifetime of one session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub duration_secs: u32,
    pub difficulty: Difficulty,
    pub policy: MismatchPolicy,
}

impl SessionConfig {
    pub fn new(duration_secs: u32, difficulty: Difficulty) -> Result<Self, ConfigError> {
        let config = Self {
            duration_secs,
            difficulty,
            policy: MismatchPolicy::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_policy(mut self, policy: MismatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.duration_secs == 0 {
            return Err(ConfigError::InvalidDuration(self.duration_secs));
        }
        Ok(())
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            duration_secs: DEFAULT_DURATION_SECS,
            difficulty: Difficulty::default(),
            policy: MismatchPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Running,
    Finished,
}

/// Mutable state of the session in progress. Rebuilt from scratch on every start.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub words: Vec<String>,
    // cursor into `words`, never past `words.len()`
    pub cursor: usize,
    pub errors: usize,
    pub input: String,
    pub started_at: Option<SystemTime>,
    pub seconds_remaining: u32,
}

impl SessionState {
    pub fn expected_word(&self) -> Option<&str> {
        self.words.get(self.cursor).map(String::as_str)
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.words.len()
    }

    /// The next `n` words starting at the cursor
    pub fn upcoming(&self, n: usize) -> &[String] {
        let start = self.cursor.min(self.words.len());
        let end = (start + n).min(self.words.len());
        &self.words[start..end]
    }
}

/// Snapshot taken when a session finishes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionResult {
    pub wpm: u32,
    pub accuracy: u8,
    pub total_words: usize,
    pub errors: usize,
    pub elapsed_ms: u64,
    pub completed_at: DateTime<Local>,
}

impl SessionResult {
    pub fn from_state(state: &SessionState, ended_at: SystemTime) -> Self {
        let elapsed_ms = state
            .started_at
            .map(|start| crate::util::time_diff_ms(start, ended_at))
            .unwrap_or_default();

        Self {
            wpm: words_per_minute(state.cursor, elapsed_ms),
            accuracy: accuracy(state.cursor, state.errors),
            total_words: state.cursor,
            errors: state.errors,
            elapsed_ms,
            completed_at: DateTime::<Local>::from(ended_at),
        }
    }
}

pub fn elapsed_minutes(elapsed_ms: u64) -> f64 {
    elapsed_ms.max(MIN_ELAPSED_MS) as f64 / 60_000.0
}

pub fn words_per_minute(words: usize, elapsed_ms: u64) -> u32 {
    (words as f64 / elapsed_minutes(elapsed_ms)).round() as u32
}

/// Share of completed words not flagged as errors, clamped to 0..=100
pub fn accuracy(total_words: usize, errors: usize) -> u8 {
    if total_words == 0 {
        return 0;
    }
    let clean = total_words.saturating_sub(errors);
    ((clean as f64 / total_words as f64) * 100.0).round() as u8
}
