use thiserror::Error;

/// Rejected session or file configuration
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("duration must be a positive number of seconds, got {0}")]
    InvalidDuration(u32),
    #[error("unknown difficulty {0:?} (expected easy, medium or hard)")]
    UnknownDifficulty(String),
    #[error("unknown mismatch policy {0:?} (expected retype or advance)")]
    UnknownPolicy(String),
}

/// Failure talking to the results store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed row: {0}")]
    InvalidRow(String),
    #[error("results store worker is no longer running")]
    WorkerGone,
}
