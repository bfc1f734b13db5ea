use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::ConfigError;
use crate::session::SessionState;

pub const WORD_DELIMITER: char = ' ';

/// What happens to the cursor when a submitted word does not match
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum, strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MismatchPolicy {
    /// Cursor stays on the word until it is typed correctly
    #[default]
    Retype,
    /// Cursor moves on after every delimiter; errors are a subset of completed words
    Advance,
}

impl FromStr for MismatchPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "retype" => Ok(MismatchPolicy::Retype),
            "advance" => Ok(MismatchPolicy::Advance),
            _ => Err(ConfigError::UnknownPolicy(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordOutcome {
    Correct,
    Incorrect,
}

/// Buffer a character, or on the delimiter judge the buffered word.
/// Returns the outcome when a word was submitted.
pub fn apply_char(state: &mut SessionState, policy: MismatchPolicy, c: char) -> Option<WordOutcome> {
    if c != WORD_DELIMITER {
        state.input.push(c);
        return None;
    }

    let typed = state.input.trim();
    let outcome = match state.expected_word() {
        Some(expected) if typed == expected => WordOutcome::Correct,
        _ => WordOutcome::Incorrect,
    };

    match (outcome, policy) {
        (WordOutcome::Correct, _) => advance(state),
        (WordOutcome::Incorrect, MismatchPolicy::Advance) => {
            state.errors += 1;
            advance(state);
        }
        (WordOutcome::Incorrect, MismatchPolicy::Retype) => {
            state.errors += 1;
        }
    }

    state.input.clear();
    Some(outcome)
}

pub fn backspace(state: &mut SessionState) {
    state.input.pop();
}

fn advance(state: &mut SessionState) {
    if state.cursor < state.words.len() {
        state.cursor += 1;
    }
}
