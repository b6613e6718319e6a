//! Feature construction
//!
//! Turns master tables into per-game team statistics, and those into the
//! rolling-window training set.

pub mod team_stats;
pub mod training_set;

pub use team_stats::{
    build_weighted_stats_by_year, game_stats_sum, TeamGameStats, WeightedStatRow,
    WeightedStatsTable, FEATURE_NAMES,
};
pub use training_set::{build_training_set, RollingWindow, TrainingRow, TrainingSet};
