//! Data ingestion and on-disk artifacts
//!
//! Box-score scraping, per-season artifacts, combining and the master join.

pub mod artifact;
pub mod boxscore;
pub mod combine;
pub mod master;
pub mod scrapers;

pub use boxscore::{CombinedBoxScores, GameBoxScore, SeasonBoxScores, TeamBoxScore};
pub use combine::combine_boxscores;
pub use master::{build_master_by_year, MasterTable, PlayerDirectory};
