use std::{
    fs,
    net::SocketAddr,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::error::ConfigError;

pub const CONFIG_ENV_VAR: &str = "HOUR_TRACKER_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "hour-tracker.toml";
/// `database_path` value that selects the in-memory store.
pub const MEMORY_DATABASE: &str = ":memory:";

pub const DEFAULT_TAGS: [&str; 12] = [
    "Sleep",
    "Daily Task",
    "Study",
    "Phone Scrolling",
    "With Friends",
    "Fun",
    "Work",
    "Exercise",
    "Meals",
    "Travel",
    "Entertainment",
    "Other",
];

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    /// SQLite file holding `hour_entries`, or `:memory:`.
    pub database_path: PathBuf,
    /// Tag palette offered by the editor before any custom tags.
    pub predefined_tags: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    bind_addr: Option<SocketAddr>,
    database_path: Option<PathBuf>,
    predefined_tags: Option<Vec<String>>,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_file_config(FileConfig::default())
    }
}

impl Config {
    /// Reads `$HOUR_TRACKER_CONFIG`, or `hour-tracker.toml` in the working
    /// directory. A missing file yields the defaults; a malformed one is an error.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var_os(CONFIG_ENV_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let s = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let file_config = Self::parse_file(&s).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::from_file_config(file_config))
    }

    pub fn uses_memory_store(&self) -> bool {
        self.database_path.as_os_str() == MEMORY_DATABASE
    }

    fn parse_file(s: &str) -> Result<FileConfig, toml::de::Error> {
        toml::from_str::<FileConfig>(s)
    }

    fn from_file_config(file_config: FileConfig) -> Self {
        let predefined_tags = file_config
            .predefined_tags
            .filter(|tags| !tags.is_empty())
            .unwrap_or_else(|| DEFAULT_TAGS.iter().map(|t| t.to_string()).collect());

        Self {
            bind_addr: file_config
                .bind_addr
                .unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 8080))),
            database_path: file_config
                .database_path
                .unwrap_or_else(|| PathBuf::from("hour_entries.db")),
            predefined_tags,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_missing_file_gives_defaults() {
        let config = Config::load_from(Path::new("/nonexistent/hour-tracker.toml")).unwrap();
        assert_eq!(config.bind_addr, SocketAddr::from(([127, 0, 0, 1], 8080)));
        assert_eq!(config.database_path, PathBuf::from("hour_entries.db"));
        assert_eq!(config.predefined_tags.len(), 12);
        assert_eq!(config.predefined_tags[0], "Sleep");
        assert!(!config.uses_memory_store());
    }

    #[test]
    fn test_file_values_override_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            bind_addr = "0.0.0.0:9000"
            database_path = ":memory:"
            predefined_tags = ["Deep Work", "Walk"]
            "#
        )
        .unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.bind_addr.port(), 9000);
        assert!(config.uses_memory_store());
        assert_eq!(config.predefined_tags, vec!["Deep Work", "Walk"]);
    }

    #[test]
    fn test_empty_tag_list_falls_back_to_defaults() {
        let fc = Config::parse_file("predefined_tags = []").unwrap();
        let config = Config::from_file_config(fc);
        assert_eq!(config.predefined_tags.len(), DEFAULT_TAGS.len());
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "bind_addr = 42").unwrap();

        let err = Config::load_from(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
