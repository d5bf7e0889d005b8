use std::path::PathBuf;

/// Errors from an `EntryStore` backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("Tag column encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
    #[error("Blocking task failed: {0}")]
    Task(String),
    #[error("Store unavailable: {0}")]
    Unavailable(String),
    #[error("Refusing to store {date} {hour:02}:00 with no tags")]
    EmptyTags { date: chrono::NaiveDate, hour: u8 },
}

/// Errors raised when opening a session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("No authenticated user")]
    NotAuthenticated,
}

/// Errors from loading the config file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config at {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}
