//! Rolling-window training set
//!
//! Each game becomes one row: the difference between the home team's and
//! the away team's average stats over their trailing window of games in the
//! same season, labeled with the final score difference.

use super::team_stats::{WeightedStatRow, WeightedStatsTable, FEATURE_NAMES};
use crate::data::artifact;
use crate::{GameId, Result, Stage, StatsError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::path::{Path, PathBuf};

type FeatureRow = [Option<f64>; FEATURE_NAMES.len()];

/// Trailing own-side stat rows per team
#[derive(Debug, Clone)]
pub struct RollingWindow {
    /// Window size (number of recent games)
    window: usize,
    recent: BTreeMap<String, VecDeque<FeatureRow>>,
    games_played: BTreeMap<String, usize>,
}

impl RollingWindow {
    pub fn new(window: usize) -> Self {
        RollingWindow {
            window,
            recent: BTreeMap::new(),
            games_played: BTreeMap::new(),
        }
    }

    /// Record one game for a team
    pub fn push(&mut self, team: &str, features: FeatureRow) {
        let recent = self.recent.entry(team.to_string()).or_default();
        recent.push_back(features);
        if recent.len() > self.window {
            recent.pop_front();
        }
        *self.games_played.entry(team.to_string()).or_default() += 1;
    }

    /// Games recorded for a team, including those already out of the window
    pub fn games_played(&self, team: &str) -> usize {
        self.games_played.get(team).copied().unwrap_or(0)
    }

    /// Per-feature mean over the window, skipping absent values
    pub fn mean(&self, team: &str) -> Vec<Option<f64>> {
        let recent = self.recent.get(team);
        (0..FEATURE_NAMES.len())
            .map(|i| {
                let values: Vec<f64> = recent
                    .into_iter()
                    .flatten()
                    .filter_map(|row| row[i])
                    .collect();
                if values.is_empty() {
                    None
                } else {
                    Some(values.iter().sum::<f64>() / values.len() as f64)
                }
            })
            .collect()
    }
}

/// One eligible game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingRow {
    pub year: u16,
    pub game_idx: usize,
    pub game_id: GameId,
    pub home_team: String,
    pub away_team: String,
    /// Home minus away window means, in `feature_names` order
    pub features: Vec<Option<f64>>,
    /// Home points minus away points
    pub score_diff: f64,
}

/// Artifact written by the training-set stage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingSet {
    pub feature_names: Vec<String>,
    pub window: usize,
    pub min_history: usize,
    pub rows: Vec<TrainingRow>,
}

/// Weighted-stats file for a season, preferring the legacy name when present
pub fn weighted_stats_path(dir: &Path, year: u16) -> PathBuf {
    let legacy = dir.join(format!("{}_sumStatsByGame.json", year));
    if legacy.exists() {
        legacy
    } else {
        dir.join(format!("{}_weightedStatsByGame.json", year))
    }
}

/// Training rows for one season; history starts empty
pub fn season_rows(
    table: &WeightedStatsTable,
    year: u16,
    window: usize,
    min_history: usize,
) -> Vec<TrainingRow> {
    let mut games: BTreeMap<usize, Vec<&WeightedStatRow>> = BTreeMap::new();
    for row in &table.rows {
        games.entry(row.game_idx).or_default().push(row);
    }

    let mut rolling = RollingWindow::new(window);
    let mut rows = Vec::new();

    for (game_idx, sides) in games {
        let home = sides.iter().find(|r| r.home);
        let away = sides.iter().find(|r| !r.home);

        if let (Some(home), Some(away)) = (home, away) {
            let home_team = home.team();
            let away_team = away.team();
            if rolling.games_played(home_team) >= min_history
                && rolling.games_played(away_team) >= min_history
            {
                let features = rolling
                    .mean(home_team)
                    .into_iter()
                    .zip(rolling.mean(away_team))
                    .map(|(h, a)| Some(h? - a?))
                    .collect();
                rows.push(TrainingRow {
                    year,
                    game_idx,
                    game_id: home.game_id.clone(),
                    home_team: home_team.to_string(),
                    away_team: away_team.to_string(),
                    features,
                    score_diff: home.stats.pts - away.stats.pts,
                });
            }
        }

        for side in &sides {
            rolling.push(side.team(), side.stats.features());
        }
    }

    rows
}

/// Build the training set from weighted stats of seasons `start..=end`
pub fn build_training_set<P: AsRef<Path>, Q: AsRef<Path>>(
    weighted_dir: P,
    out_path: Q,
    start: u16,
    end: u16,
    window: usize,
    min_history: usize,
) -> Result<TrainingSet> {
    if window == 0 {
        return Err(StatsError::Config("window must be at least 1".to_string()));
    }
    let weighted_dir = weighted_dir.as_ref();

    let mut set = TrainingSet {
        feature_names: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
        window,
        min_history,
        rows: Vec::new(),
    };
    let mut seasons_read = 0;

    for year in start..=end {
        let in_path = weighted_stats_path(weighted_dir, year);
        if !in_path.exists() {
            log::warn!("Missing weighted stats: {}", in_path.display());
            continue;
        }

        log::info!("Building training rows for {} from {}", year, in_path.display());
        let table: WeightedStatsTable = artifact::read_json(&in_path)?;
        let rows = season_rows(&table, year, window, min_history);
        log::debug!("{}: {} rows", year, rows.len());
        set.rows.extend(rows);
        seasons_read += 1;
    }

    if seasons_read == 0 {
        return Err(StatsError::EmptyInput {
            stage: Stage::TrainingSet,
            message: format!(
                "no weighted stats for {}..={} in {}",
                start,
                end,
                weighted_dir.display()
            ),
        });
    }

    if set.rows.is_empty() {
        return Err(StatsError::EmptyInput {
            stage: Stage::TrainingSet,
            message: format!(
                "no game in {}..={} has {} prior games for both teams ({})",
                start,
                end,
                min_history,
                weighted_dir.display()
            ),
        });
    }

    artifact::write_json(out_path.as_ref(), &set)?;
    log::info!(
        "Wrote training set: {} (rows={}, features={})",
        out_path.as_ref().display(),
        set.rows.len(),
        set.feature_names.len()
    );
    Ok(set)
}
