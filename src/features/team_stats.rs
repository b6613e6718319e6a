//! Team statistics per game
//!
//! Minute-weighted and summed team metrics computed from a master table,
//! one row per (game, team).

use crate::data::artifact;
use crate::data::master::{MasterRow, MasterTable};
use crate::{GameId, Result, Stage, StatsError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Seconds in a regulation game (48 minutes)
const GAME_SECONDS: f64 = 2880.0;

/// Players on court per side
const ON_COURT: f64 = 5.0;

/// Column names of [`TeamGameStats::features`], in order
pub const FEATURE_NAMES: [&str; 14] = [
    "eFG%", "DRtg", "ORtg", "TOV%", "BLK%", "ORB%", "DRB%", "TRB%", "AST%", "STL%", "FTr", "3PAr",
    "TS%", "FT%",
];

/// Weighted team metrics for one team in one game
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamGameStats {
    pub efg_pct: f64,
    pub drtg: f64,
    pub ortg: f64,
    pub tov_pct: f64,
    pub blk_pct: f64,
    pub orb_pct: f64,
    pub drb_pct: f64,
    pub trb_pct: f64,
    pub ast_pct: f64,
    pub stl_pct: f64,
    pub ftr: f64,
    pub fg3a_rate: f64,
    pub ts_pct: f64,
    /// Absent when the team attempted no free throws
    pub ft_pct: Option<f64>,
    pub pts: f64,
}

impl TeamGameStats {
    /// Compute metrics from the player rows of one side
    pub fn from_rows(rows: &[&MasterRow]) -> Self {
        let total = |stat: fn(&MasterRow) -> Option<f64>| -> f64 {
            rows.iter().filter_map(|r| stat(r)).sum()
        };
        // sum of stat * minutes share, skipping players without the stat
        let weighted = |stat: fn(&MasterRow) -> Option<f64>| -> f64 {
            rows.iter()
                .filter_map(|r| stat(r).map(|v| v * r.basic.mp / GAME_SECONDS))
                .sum()
        };

        let fg = total(|r| r.basic.fg);
        let fga = total(|r| r.basic.fga);
        let fg3 = total(|r| r.basic.fg3);
        let fg3a = total(|r| r.basic.fg3a);
        let ft = total(|r| r.basic.ft);
        let fta = total(|r| r.basic.fta);
        let pts = total(|r| r.basic.pts);

        TeamGameStats {
            efg_pct: (fg + fg3 / 2.0) / fga.max(1.0),
            drtg: weighted(|r| r.advanced.as_ref()?.drtg) / ON_COURT,
            ortg: weighted(|r| r.advanced.as_ref()?.ortg) / ON_COURT,
            tov_pct: weighted(|r| r.advanced.as_ref()?.tov_pct) / ON_COURT,
            blk_pct: weighted(|r| r.advanced.as_ref()?.blk_pct),
            orb_pct: weighted(|r| r.advanced.as_ref()?.orb_pct),
            drb_pct: weighted(|r| r.advanced.as_ref()?.drb_pct),
            trb_pct: weighted(|r| r.advanced.as_ref()?.trb_pct),
            ast_pct: weighted(|r| r.advanced.as_ref()?.ast_pct),
            stl_pct: weighted(|r| r.advanced.as_ref()?.stl_pct),
            ftr: fta / fga.max(1.0),
            fg3a_rate: fg3a / fga.max(1.0),
            ts_pct: pts / (2.0 * (fga + 0.44 * fta)).max(1.0),
            ft_pct: if fta > 0.0 { Some(ft / fta) } else { None },
            pts,
        }
    }

    /// Feature values in [`FEATURE_NAMES`] order (PTS excluded)
    pub fn features(&self) -> [Option<f64>; 14] {
        [
            Some(self.efg_pct),
            Some(self.drtg),
            Some(self.ortg),
            Some(self.tov_pct),
            Some(self.blk_pct),
            Some(self.orb_pct),
            Some(self.drb_pct),
            Some(self.trb_pct),
            Some(self.ast_pct),
            Some(self.stl_pct),
            Some(self.ftr),
            Some(self.fg3a_rate),
            Some(self.ts_pct),
            self.ft_pct,
        ]
    }
}

/// One (game, team) row of the weighted-stats artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedStatRow {
    pub game_idx: usize,
    pub game_id: GameId,
    pub home_team: String,
    pub away_team: String,
    /// Which side `stats` describes
    pub home: bool,
    pub stats: TeamGameStats,
}

impl WeightedStatRow {
    /// Team the stats belong to
    pub fn team(&self) -> &str {
        if self.home {
            &self.home_team
        } else {
            &self.away_team
        }
    }
}

/// Per-season artifact written by the aggregation stage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeightedStatsTable {
    pub season: u16,
    pub rows: Vec<WeightedStatRow>,
}

/// Summary of an aggregation run
#[derive(Debug, Clone, Default)]
pub struct WeightedReport {
    pub seasons_written: Vec<u16>,
    pub seasons_skipped: Vec<u16>,
    pub seasons_missing: Vec<u16>,
    pub rows: usize,
}

/// Home and away stat rows for the master rows of a single game
///
/// Emits one row per side present, home first.
pub fn game_stats_sum(rows: &[&MasterRow]) -> Vec<WeightedStatRow> {
    let Some(first) = rows.first() else {
        return Vec::new();
    };
    let (home_team, away_team) = if first.home {
        (first.team.clone(), first.opponent.clone())
    } else {
        (first.opponent.clone(), first.team.clone())
    };

    [true, false]
        .into_iter()
        .filter_map(|home| {
            let side: Vec<&MasterRow> = rows.iter().copied().filter(|r| r.home == home).collect();
            if side.is_empty() {
                return None;
            }
            Some(WeightedStatRow {
                game_idx: first.game_idx,
                game_id: first.game_id.clone(),
                home_team: home_team.clone(),
                away_team: away_team.clone(),
                home,
                stats: TeamGameStats::from_rows(&side),
            })
        })
        .collect()
}

/// Aggregate a whole master table, games in index order
pub fn weighted_stats_table(master: &MasterTable) -> WeightedStatsTable {
    let rows = master
        .game_indices()
        .into_iter()
        .flat_map(|idx| game_stats_sum(&master.game_rows(idx)))
        .collect();
    WeightedStatsTable {
        season: master.season,
        rows,
    }
}

/// Build `{out_dir}/{YEAR}_weightedStatsByGame.json` for seasons `start..=end`
pub fn build_weighted_stats_by_year<P: AsRef<Path>, Q: AsRef<Path>>(
    master_dir: P,
    out_dir: Q,
    start: u16,
    end: u16,
    overwrite: bool,
) -> Result<WeightedReport> {
    let master_dir = master_dir.as_ref();
    let out_dir = out_dir.as_ref();
    std::fs::create_dir_all(out_dir)?;

    let mut report = WeightedReport::default();

    for year in start..=end {
        let in_path = master_dir.join(format!("{}_master.json", year));
        if !in_path.exists() {
            log::warn!("Missing master file: {}", in_path.display());
            report.seasons_missing.push(year);
            continue;
        }

        let out_path = out_dir.join(format!("{}_weightedStatsByGame.json", year));
        if out_path.exists() && !overwrite {
            log::info!("Skipping existing: {}", out_path.display());
            report.seasons_skipped.push(year);
            continue;
        }

        log::info!("Building weighted stats for {}", year);
        let master: MasterTable = artifact::read_json(&in_path)?;
        let table = weighted_stats_table(&master);
        if table.rows.is_empty() {
            return Err(StatsError::EmptyInput {
                stage: Stage::WeightedStats,
                message: format!("{}: no team rows in {}", year, in_path.display()),
            });
        }

        artifact::write_json(&out_path, &table)?;
        log::info!("Wrote: {} (rows={})", out_path.display(), table.rows.len());
        report.rows += table.rows.len();
        report.seasons_written.push(year);
    }

    Ok(report)
}
