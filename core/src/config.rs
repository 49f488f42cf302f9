use crate::error::Result;
use crate::runner::Schedule;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Tunables for a [`crate::SearchEngine`]. Every field has a default, so a
/// config file only needs the keys it wants to override.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Directory of the on-disk store.
    pub store_path: PathBuf,
    /// Drop stop words during document/query normalization. Off by default;
    /// flipping it changes index size and ranking.
    pub remove_stop_words: bool,
    /// Optional stop-word list, one word per line. Falls back to the built-in English list.
    pub stop_words_path: Option<PathBuf>,
    pub index_concurrency: usize,
    pub token_concurrency: usize,
    pub document_concurrency: usize,
    pub max_results: usize,
    pub suggestions: usize,
    pub completion_steps: usize,
    pub schedule: Schedule,
    pub index_interval_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from("./index"),
            remove_stop_words: false,
            stop_words_path: None,
            index_concurrency: 50,
            token_concurrency: 2,
            document_concurrency: 50,
            max_results: 50,
            suggestions: 5,
            completion_steps: 6,
            schedule: Schedule::Barrier,
            index_interval_secs: 3600,
        }
    }
}

impl EngineConfig {
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let f = File::open(path.as_ref())?;
        let config = serde_json::from_reader(BufReader::new(f))?;
        Ok(config)
    }

    /// Load `path` if given, otherwise start from defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::from_json_file(p),
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quarry.json");
        std::fs::write(&path, r#"{ "max_results": 10, "schedule": "pool" }"#).unwrap();

        let config = EngineConfig::from_json_file(&path).unwrap();
        assert_eq!(config.max_results, 10);
        assert_eq!(config.schedule, Schedule::Pool);
        assert_eq!(config.index_concurrency, 50);
        assert!(!config.remove_stop_words);
    }

    #[test]
    fn chunked_schedule_is_the_default() {
        assert_eq!(Schedule::default(), Schedule::Barrier);
        assert_eq!(EngineConfig::default().schedule, Schedule::Barrier);
        let config: EngineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.schedule, Schedule::Barrier);
    }
}
