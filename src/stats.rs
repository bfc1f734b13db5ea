use std::time::Duration;
use time_humanize::{Accuracy, HumanTime, Tense};

use crate::store::ResultRecord;
use crate::util::mean;

/// Aggregate of one identity's recorded sessions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserStats {
    pub total_tests: usize,
    pub average_wpm: u32,
    pub average_accuracy: u8,
    pub best_wpm: u32,
    /// Sum of configured session durations
    pub total_time_secs: u64,
}

impl UserStats {
    /// None when there is nothing to aggregate
    pub fn from_records(records: &[ResultRecord]) -> Option<Self> {
        let wpms: Vec<f64> = records.iter().map(|r| r.wpm as f64).collect();
        let accuracies: Vec<f64> = records.iter().map(|r| r.accuracy as f64).collect();

        let average_wpm = mean(&wpms)?.round() as u32;
        let average_accuracy = mean(&accuracies)?.round().min(100.0) as u8;

        Some(Self {
            total_tests: records.len(),
            average_wpm,
            average_accuracy,
            best_wpm: records.iter().map(|r| r.wpm).max().unwrap_or_default(),
            total_time_secs: records.iter().map(|r| u64::from(r.duration_secs)).sum(),
        })
    }

    pub fn total_time_text(&self) -> String {
        HumanTime::from(Duration::from_secs(self.total_time_secs))
            .to_text_en(Accuracy::Precise, Tense::Present)
    }
}

/// Highest WPM among `records`, used to detect a new personal best
pub fn personal_best(records: &[ResultRecord]) -> Option<u32> {
    records.iter().map(|r| r.wpm).max()
}
