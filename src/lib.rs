//! NBA box-score statistics pipeline
//!
//! Scrapes Basketball Reference box scores, joins them with player metadata,
//! aggregates per-game team statistics, builds a rolling-window training set
//! and fits a baseline home-win classifier. Every stage reads the previous
//! stage's artifact from disk and writes its own.

pub mod data;
pub mod features;
pub mod logging;
pub mod training;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Basketball Reference game identifier, e.g. `201910220TOR`
///
/// The first eight characters are the game date and the last three the
/// home team abbreviation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GameId(pub String);

impl GameId {
    pub fn new(id: impl Into<String>) -> Self {
        GameId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Date encoded in the id
    pub fn date(&self) -> Option<NaiveDate> {
        let digits = self.0.get(..8)?;
        NaiveDate::parse_from_str(digits, "%Y%m%d").ok()
    }

    /// Two-digit day of month, as it appears in the id
    pub fn day(&self) -> Option<&str> {
        self.0.get(6..8)
    }

    /// Home team abbreviation encoded in the id
    pub fn home_abbrev(&self) -> Option<&str> {
        if self.0.len() < 12 {
            return None;
        }
        self.0.get(self.0.len() - 3..)
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Pipeline stage, used for error and log context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Scrape,
    ScrapeTeams,
    Combine,
    Master,
    WeightedStats,
    TrainingSet,
    Model,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Scrape => write!(f, "scrape"),
            Stage::ScrapeTeams => write!(f, "scrape-teams"),
            Stage::Combine => write!(f, "combine-boxscores"),
            Stage::Master => write!(f, "build-master"),
            Stage::WeightedStats => write!(f, "weighted-stats"),
            Stage::TrainingSet => write!(f, "make-training"),
            Stage::Model => write!(f, "train-baseline"),
        }
    }
}

/// Application-wide errors
#[derive(Debug, Error)]
pub enum StatsError {
    #[error("Scraper failed for {url}: {message}")]
    Scraper { url: String, message: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid artifact {}: {source}", .path.display())]
    Artifact {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Missing input: {}", .0.display())]
    MissingInput(PathBuf),

    #[error("No usable input for {stage}: {message}")]
    EmptyInput { stage: Stage, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Model error: {0}")]
    Model(String),
}

pub type Result<T> = std::result::Result<T, StatsError>;

/// Application configuration loaded from config.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub paths: PathsConfig,
    pub scrape: ScrapeConfig,
    pub weighted: WeightedConfig,
    pub training_set: TrainingSetConfig,
    pub model: ModelConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Base directory for the scrape stage (games index + boxscores/)
    pub data_dir: String,
    pub boxscores_dir: String,
    pub teams_index: String,
    pub all_years: String,
    pub player_data: String,
    pub master_dir: String,
    pub weighted_dir: String,
    pub training_data: String,
    pub output_dir: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        PathsConfig {
            data_dir: "data".to_string(),
            boxscores_dir: "data/boxscores".to_string(),
            teams_index: "data/teamsByYear.json".to_string(),
            all_years: "data/AllYears.json".to_string(),
            player_data: "data/playerData.json".to_string(),
            master_dir: "data/master_by_year".to_string(),
            weighted_dir: "data/weighted_stats_by_year".to_string(),
            training_data: "data/trainingData.json".to_string(),
            output_dir: "outputs".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapeConfig {
    pub start_year: u16,
    /// Exclusive when building the games index, inclusive when selecting seasons
    pub end_year: u16,
    /// Fixed delay between requests, in seconds
    pub delay_secs: f64,
    pub timeout_secs: u64,
    pub user_agent: String,
    /// Schedule months to visit per season
    pub months: Vec<String>,
    /// Optional directory for cached HTML pages
    pub cache_dir: Option<String>,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        ScrapeConfig {
            start_year: 1992,
            end_year: 2022,
            delay_secs: 0.5,
            timeout_secs: 30,
            user_agent: "nbastats/0.1".to_string(),
            months: [
                "october", "november", "december", "january", "february", "march", "april",
                "may", "june",
            ]
            .iter()
            .map(|m| m.to_string())
            .collect(),
            cache_dir: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightedConfig {
    pub start_year: u16,
    pub end_year: u16,
}

impl Default for WeightedConfig {
    fn default() -> Self {
        WeightedConfig {
            start_year: 2008,
            end_year: 2019,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingSetConfig {
    pub start_year: u16,
    pub end_year: u16,
    /// Number of trailing games averaged per team
    pub window: usize,
    /// Minimum prior games (per team, per season) for a game to be emitted
    pub min_history: usize,
}

impl Default for TrainingSetConfig {
    fn default() -> Self {
        TrainingSetConfig {
            start_year: 1992,
            end_year: 2019,
            window: 20,
            min_history: 20,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub test_frac: f64,
    pub seed: u64,
    pub learning_rate: f64,
    pub max_iter: usize,
    /// Stop once the loss improves by less than this between iterations
    pub tol: f64,
    /// Inverse L2 regularization strength
    pub c: f64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        ModelConfig {
            test_frac: 0.2,
            seed: 0,
            learning_rate: 0.5,
            max_iter: 2000,
            tol: 1e-7,
            c: 1.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "INFO".to_string(),
            file: None,
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            StatsError::Config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        toml::from_str(&content)
            .map_err(|e| StatsError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Load the config if the file exists, otherwise fall back to defaults
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Config::default())
        }
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| StatsError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_game_id_parts() {
        let id = GameId::new("201910220TOR");
        assert_eq!(id.date(), NaiveDate::from_ymd_opt(2019, 10, 22));
        assert_eq!(id.day(), Some("22"));
        assert_eq!(id.home_abbrev(), Some("TOR"));

        let short = GameId::new("2019");
        assert_eq!(short.date(), None);
        assert_eq!(short.home_abbrev(), None);
    }

    #[test]
    fn test_config_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.training_set.window = 10;
        config.scrape.cache_dir = Some("cache".to_string());
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.training_set.window, 10);
        assert_eq!(loaded.scrape.cache_dir.as_deref(), Some("cache"));
        assert_eq!(loaded.scrape.months.len(), 9);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = toml::from_str("[model]\nseed = 7\n").unwrap();
        assert_eq!(config.model.seed, 7);
        assert_eq!(config.model.test_frac, 0.2);
        assert_eq!(config.weighted.start_year, 2008);
        assert_eq!(config.paths.master_dir, "data/master_by_year");
    }

    #[test]
    fn test_missing_config_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_default(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.training_set.window, 20);
    }
}
