//! Master tables: box-score rows joined with player metadata, per season

use super::artifact;
use super::boxscore::{AdvancedLine, BasicLine, CombinedBoxScores, GameBoxScore, TeamBoxScore};
use crate::{GameId, Result, Stage, StatsError};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// Names that come out of the scrape mis-decoded, mapped to the metadata spelling
const NAME_FIXUPS: &[(&str, &str)] = &[("Peja StojakoviÄ", "Peja Stojaković")];

/// Apply known name fix-ups before metadata lookup
pub fn fix_name(name: &str) -> &str {
    NAME_FIXUPS
        .iter()
        .find(|(bad, _)| *bad == name)
        .map(|(_, good)| *good)
        .unwrap_or(name)
}

/// One row of the player metadata file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerInfo {
    /// Season; accepts whole-number floats such as `1992.0`
    #[serde(deserialize_with = "deserialize_year")]
    pub year: u16,
    pub team: String,
    pub name: String,
    #[serde(default)]
    pub player_id: Option<String>,
    #[serde(default)]
    pub position: Option<String>,
    /// Height as listed, e.g. "6-10"
    #[serde(default)]
    pub height: Option<String>,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

fn deserialize_year<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<u16, D::Error> {
    let year = f64::deserialize(deserializer)?;
    if year.fract() != 0.0 || !(0.0..=f64::from(u16::MAX)).contains(&year) {
        return Err(serde::de::Error::custom(format!("invalid year: {}", year)));
    }
    Ok(year as u16)
}

/// Player metadata for one season, looked up by (team, name) then by name
#[derive(Debug, Clone, Default)]
pub struct PlayerDirectory {
    players: Vec<PlayerInfo>,
    by_team_name: HashMap<(String, String), usize>,
    by_name: HashMap<String, usize>,
}

impl PlayerDirectory {
    /// Index the rows of `players` belonging to `season`; the first row wins
    /// on duplicate keys
    pub fn for_season(players: &[PlayerInfo], season: u16) -> Self {
        let mut directory = PlayerDirectory::default();
        for info in players.iter().filter(|p| p.year == season) {
            let idx = directory.players.len();
            directory
                .by_team_name
                .entry((info.team.clone(), info.name.clone()))
                .or_insert(idx);
            directory.by_name.entry(info.name.clone()).or_insert(idx);
            directory.players.push(info.clone());
        }
        directory
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn lookup(&self, team: &str, name: &str) -> Option<&PlayerInfo> {
        let name = fix_name(name);
        self.by_team_name
            .get(&(team.to_string(), name.to_string()))
            .or_else(|| self.by_name.get(name))
            .map(|&idx| &self.players[idx])
    }
}

/// One played box-score row with its metadata, keyed by (player, game)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasterRow {
    /// Position of the game within the season
    pub game_idx: usize,
    pub game_id: GameId,
    pub player: String,
    /// Player id when known, otherwise the name
    pub player_key: String,
    pub home: bool,
    pub team: String,
    pub opponent: String,
    pub team_roster: Vec<String>,
    pub opponent_roster: Vec<String>,
    pub info: Option<PlayerInfo>,
    pub basic: BasicLine,
    pub advanced: Option<AdvancedLine>,
}

/// A box-score row with no matching metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnmatchedPlayer {
    pub season: u16,
    pub game_id: GameId,
    pub team: String,
    pub name: String,
}

/// Per-season artifact written by the master stage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MasterTable {
    pub season: u16,
    pub rows: Vec<MasterRow>,
    pub unmatched: Vec<UnmatchedPlayer>,
    /// Games without box-score tables
    pub skipped_games: Vec<GameId>,
}

impl MasterTable {
    /// Distinct game indices, ascending
    pub fn game_indices(&self) -> Vec<usize> {
        let mut indices: Vec<usize> = self.rows.iter().map(|r| r.game_idx).collect();
        indices.sort_unstable();
        indices.dedup();
        indices
    }

    pub fn game_rows(&self, game_idx: usize) -> Vec<&MasterRow> {
        self.rows.iter().filter(|r| r.game_idx == game_idx).collect()
    }
}

/// Summary of a master build
#[derive(Debug, Clone, Default)]
pub struct MasterReport {
    pub seasons_written: Vec<u16>,
    pub seasons_skipped: Vec<u16>,
    pub rows: usize,
    pub unmatched: usize,
}

struct SidePlayer<'a> {
    basic: &'a BasicLine,
    advanced: Option<&'a AdvancedLine>,
    info: Option<&'a PlayerInfo>,
    key: String,
}

fn side_players<'a>(box_score: &'a TeamBoxScore, directory: &'a PlayerDirectory) -> Vec<SidePlayer<'a>> {
    box_score
        .basic
        .iter()
        .filter(|line| line.played())
        .map(|basic| {
            let info = directory.lookup(&box_score.team, &basic.player);
            let key = info
                .and_then(|i| i.player_id.clone())
                .or_else(|| basic.player_id.clone())
                .unwrap_or_else(|| fix_name(&basic.player).to_string());
            SidePlayer {
                basic,
                advanced: box_score.advanced_for(&basic.player),
                info,
                key,
            }
        })
        .collect()
}

/// Join one season's games with its player metadata
pub fn build_master_table(season: u16, games: &[&GameBoxScore], directory: &PlayerDirectory) -> MasterTable {
    let mut table = MasterTable {
        season,
        ..Default::default()
    };
    let n_games = games.len();

    for (game_idx, game) in games.iter().enumerate() {
        let (Some(home_box), Some(away_box)) = (&game.home_box, &game.away_box) else {
            log::warn!("{} {}: no box-score tables, skipping", season, game.game_id);
            table.skipped_games.push(game.game_id.clone());
            continue;
        };

        let home = side_players(home_box, directory);
        let away = side_players(away_box, directory);
        let home_roster: Vec<String> = home.iter().map(|p| p.key.clone()).collect();
        let away_roster: Vec<String> = away.iter().map(|p| p.key.clone()).collect();

        for (is_home, players, own, other, roster, opp_roster) in [
            (true, &home, home_box, away_box, &home_roster, &away_roster),
            (false, &away, away_box, home_box, &away_roster, &home_roster),
        ] {
            for player in players.iter() {
                if player.info.is_none() {
                    log::warn!(
                        "Could not match player info for name={} year={} team={}",
                        player.basic.player,
                        season,
                        own.team
                    );
                    table.unmatched.push(UnmatchedPlayer {
                        season,
                        game_id: game.game_id.clone(),
                        team: own.team.clone(),
                        name: player.basic.player.clone(),
                    });
                }
                table.rows.push(MasterRow {
                    game_idx,
                    game_id: game.game_id.clone(),
                    player: player.basic.player.clone(),
                    player_key: player.key.clone(),
                    home: is_home,
                    team: own.team.clone(),
                    opponent: other.team.clone(),
                    team_roster: roster.clone(),
                    opponent_roster: opp_roster.clone(),
                    info: player.info.cloned(),
                    basic: player.basic.clone(),
                    advanced: player.advanced.cloned(),
                });
            }
        }

        if game_idx % 100 == 0 {
            log::info!("...game {} / {}", game_idx, n_games);
        }
    }

    table
}

/// Build `{out_dir}/{YEAR}_master.json` for every season in the combined table
pub fn build_master_by_year<P, Q, R>(
    all_years: P,
    player_data: Q,
    out_dir: R,
    overwrite: bool,
) -> Result<MasterReport>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
    R: AsRef<Path>,
{
    let out_dir = out_dir.as_ref();
    std::fs::create_dir_all(out_dir)?;

    log::info!("Loading boxscores: {}", all_years.as_ref().display());
    let combined: CombinedBoxScores = artifact::read_json(all_years.as_ref())?;

    log::info!("Loading player metadata: {}", player_data.as_ref().display());
    let players: Vec<PlayerInfo> = artifact::read_json(player_data.as_ref())?;

    let seasons = combined.seasons();
    if seasons.is_empty() {
        return Err(StatsError::EmptyInput {
            stage: Stage::Master,
            message: format!("no games in {}", all_years.as_ref().display()),
        });
    }
    log::info!("Found {} seasons: {:?}", seasons.len(), seasons);

    let mut report = MasterReport::default();

    for season in seasons {
        let out_path = out_dir.join(format!("{}_master.json", season));
        if out_path.exists() && !overwrite {
            log::info!("Skipping existing: {}", out_path.display());
            report.seasons_skipped.push(season);
            continue;
        }

        log::info!("Building master for {}", season);
        let directory = PlayerDirectory::for_season(&players, season);
        if directory.is_empty() {
            log::warn!("No player metadata found for year={}", season);
        }

        let games = combined.season_games(season);
        let table = build_master_table(season, &games, &directory);
        if table.rows.is_empty() {
            return Err(StatsError::EmptyInput {
                stage: Stage::Master,
                message: format!(
                    "{}: no played rows in {} ({} games skipped)",
                    season,
                    all_years.as_ref().display(),
                    table.skipped_games.len()
                ),
            });
        }
        if !table.unmatched.is_empty() {
            log::warn!(
                "{}: {} player rows without metadata",
                season,
                table.unmatched.len()
            );
        }

        artifact::write_json(&out_path, &table)?;
        log::info!("Wrote: {} (rows={})", out_path.display(), table.rows.len());

        report.rows += table.rows.len();
        report.unmatched += table.unmatched.len();
        report.seasons_written.push(season);
    }

    Ok(report)
}
