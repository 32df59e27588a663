// Ambient configuration: operational tunables only (thread count, wall-clock
// cap, cancellation batch size). Domain constants (positional weights, rate
// epsilon) are not configurable - see weights.rs/rates.rs.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::search::{BATCH_SIZE, HARD_WALL_CLOCK_CAP_MS};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    Validation { field: String, message: String },
}

/// Raw deserialization target for `optimizer.toml`'s `[search]` table.
#[derive(Debug, Clone, Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    search: SearchSection,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct SearchSection {
    worker_threads: Option<usize>,
    wall_clock_cap_ms: Option<u64>,
    cancellation_batch_size: Option<u64>,
}

/// Assembled ambient configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// `None` lets rayon pick its default (number of logical CPUs).
    pub worker_threads: Option<usize>,
    /// Upper bound on any single search's wall-clock budget, regardless of
    /// what a request asks for. Never exceeds the built-in hard cap.
    pub wall_clock_cap_ms: u64,
    /// How many permutations a worker visits between cancellation/deadline
    /// checks.
    pub cancellation_batch_size: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            worker_threads: None,
            wall_clock_cap_ms: HARD_WALL_CLOCK_CAP_MS,
            cancellation_batch_size: BATCH_SIZE,
        }
    }
}

/// Load configuration from `path`. Returns the default configuration if
/// `path` does not exist; an optional config file is not an error.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Ok(Config::default());
    }

    let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    let file: ConfigFile = toml::from_str(&text).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        source: e,
    })?;

    let config = Config {
        worker_threads: file.search.worker_threads,
        wall_clock_cap_ms: file
            .search
            .wall_clock_cap_ms
            .map(|ms| ms.min(HARD_WALL_CLOCK_CAP_MS))
            .unwrap_or(HARD_WALL_CLOCK_CAP_MS),
        cancellation_batch_size: file.search.cancellation_batch_size.unwrap_or(BATCH_SIZE),
    };

    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<(), ConfigError> {
    if let Some(n) = config.worker_threads {
        if n == 0 {
            return Err(ConfigError::Validation {
                field: "search.worker_threads".to_string(),
                message: "must be > 0 when set".to_string(),
            });
        }
    }
    if config.cancellation_batch_size == 0 {
        return Err(ConfigError::Validation {
            field: "search.cancellation_batch_size".to_string(),
            message: "must be > 0".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn missing_file_returns_defaults() {
        let path = std::env::temp_dir().join("bdnrp_config_test_missing.toml");
        let _ = fs::remove_file(&path);
        let config = load_config(&path).unwrap();
        assert_eq!(config.worker_threads, None);
        assert_eq!(config.wall_clock_cap_ms, HARD_WALL_CLOCK_CAP_MS);
        assert_eq!(config.cancellation_batch_size, BATCH_SIZE);
    }

    #[test]
    fn parses_overrides() {
        let path = std::env::temp_dir().join("bdnrp_config_test_overrides.toml");
        fs::write(
            &path,
            "[search]\nworker_threads = 4\nwall_clock_cap_ms = 1000\ncancellation_batch_size = 2048\n",
        )
        .unwrap();
        let config = load_config(&path).unwrap();
        assert_eq!(config.worker_threads, Some(4));
        assert_eq!(config.wall_clock_cap_ms, 1000);
        assert_eq!(config.cancellation_batch_size, 2048);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn wall_clock_override_cannot_exceed_hard_cap() {
        let path = std::env::temp_dir().join("bdnrp_config_test_cap.toml");
        fs::write(&path, "[search]\nwall_clock_cap_ms = 999999\n").unwrap();
        let config = load_config(&path).unwrap();
        assert_eq!(config.wall_clock_cap_ms, HARD_WALL_CLOCK_CAP_MS);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn zero_worker_threads_is_invalid() {
        let path = std::env::temp_dir().join("bdnrp_config_test_zero_threads.toml");
        fs::write(&path, "[search]\nworker_threads = 0\n").unwrap();
        let err = load_config(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { .. }));
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let path = std::env::temp_dir().join("bdnrp_config_test_malformed.toml");
        fs::write(&path, "this is not [[[ valid toml").unwrap();
        let err = load_config(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        let _ = fs::remove_file(&path);
    }
}
