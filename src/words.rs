use include_dir::{include_dir, Dir};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Deserialize;
use serde_json::from_str;
use std::collections::HashMap;
use std::error::Error;

use crate::difficulty::Difficulty;

static WORDLIST_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/src/wordlists");

#[allow(dead_code)]
#[derive(Deserialize, Clone, Debug)]
pub struct WordList {
    pub name: String,
    pub size: u32,
    pub words: Vec<String>,
}

fn read_word_list(file_name: &str) -> Result<WordList, Box<dyn Error>> {
    let file = WORDLIST_DIR
        .get_file(file_name)
        .ok_or_else(|| format!("word list {file_name} not bundled"))?;

    let file_as_str = file
        .contents_utf8()
        .ok_or_else(|| format!("word list {file_name} is not utf-8"))?;

    Ok(from_str(file_as_str)?)
}

/// Fixed word sources, one per difficulty tier. Never mutated once built.
#[derive(Debug, Clone, Default)]
pub struct WordBank {
    tiers: HashMap<Difficulty, Vec<String>>,
}

impl WordBank {
    /// The word lists bundled into the binary
    pub fn builtin() -> Self {
        let mut bank = Self::default();
        for difficulty in Difficulty::ALL {
            let file_name = format!("{}.json", difficulty.as_str());
            match read_word_list(&file_name) {
                Ok(list) => {
                    bank.tiers.insert(difficulty, list.words);
                }
                Err(e) => log::error!("failed to load {file_name}: {e}"),
            }
        }
        bank
    }

    /// Replace one tier's source; mostly useful for tests and custom lists
    pub fn with_tier<I, S>(mut self, difficulty: Difficulty, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tiers
            .insert(difficulty, words.into_iter().map(Into::into).collect());
        self
    }

    pub fn words(&self, difficulty: Difficulty) -> &[String] {
        self.tiers
            .get(&difficulty)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

/// Uniform random permutation of `words` (Fisher-Yates via `SliceRandom`)
pub fn shuffled<R: Rng + ?Sized>(words: &[String], rng: &mut R) -> Vec<String> {
    let mut out = words.to_vec();
    out.shuffle(rng);
    out
}
