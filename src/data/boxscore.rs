//! Box-score tables and the season / combined artifacts built from them

use crate::GameId;
use serde::{Deserialize, Serialize};

/// Basic box-score line for one player in one game
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BasicLine {
    pub player: String,
    /// Basketball Reference player id, when the name is linked
    pub player_id: Option<String>,
    /// Minutes played, in seconds
    pub mp: f64,
    pub fg: Option<f64>,
    pub fga: Option<f64>,
    pub fg_pct: Option<f64>,
    pub fg3: Option<f64>,
    pub fg3a: Option<f64>,
    pub fg3_pct: Option<f64>,
    pub ft: Option<f64>,
    pub fta: Option<f64>,
    pub ft_pct: Option<f64>,
    pub orb: Option<f64>,
    pub drb: Option<f64>,
    pub trb: Option<f64>,
    pub ast: Option<f64>,
    pub stl: Option<f64>,
    pub blk: Option<f64>,
    pub tov: Option<f64>,
    pub pf: Option<f64>,
    pub pts: Option<f64>,
}

impl BasicLine {
    /// Players who did not play have no field-goal value
    pub fn played(&self) -> bool {
        self.fg.is_some()
    }
}

/// Advanced box-score line for one player in one game
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdvancedLine {
    pub player: String,
    pub player_id: Option<String>,
    /// Minutes played, in seconds
    pub mp: f64,
    pub ts_pct: Option<f64>,
    pub efg_pct: Option<f64>,
    /// 3PAr
    pub fg3a_rate: Option<f64>,
    /// FTr
    pub fta_rate: Option<f64>,
    pub orb_pct: Option<f64>,
    pub drb_pct: Option<f64>,
    pub trb_pct: Option<f64>,
    pub ast_pct: Option<f64>,
    pub stl_pct: Option<f64>,
    pub blk_pct: Option<f64>,
    pub tov_pct: Option<f64>,
    pub usg_pct: Option<f64>,
    pub ortg: Option<f64>,
    pub drtg: Option<f64>,
}

/// Both box-score tables for one team in one game
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamBoxScore {
    pub team: String,
    pub basic: Vec<BasicLine>,
    pub advanced: Vec<AdvancedLine>,
}

impl TeamBoxScore {
    /// Advanced line for a player, matched by name as it appears in the table
    pub fn advanced_for(&self, player: &str) -> Option<&AdvancedLine> {
        self.advanced.iter().find(|a| a.player == player)
    }

    /// Team points: sum of player points
    pub fn points(&self) -> f64 {
        self.basic.iter().filter_map(|b| b.pts).sum()
    }
}

/// One scraped game. A failed scrape keeps the row with no tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameBoxScore {
    pub game_id: GameId,
    pub season: u16,
    pub month: String,
    pub day: String,
    pub home: String,
    pub away: Option<String>,
    pub home_box: Option<TeamBoxScore>,
    pub away_box: Option<TeamBoxScore>,
}

impl GameBoxScore {
    /// Placeholder row for a game whose page could not be scraped
    pub fn failed(game_id: GameId, season: u16, month: &str) -> Self {
        GameBoxScore {
            day: game_id.day().unwrap_or_default().to_string(),
            home: game_id.home_abbrev().unwrap_or_default().to_string(),
            game_id,
            season,
            month: month.to_string(),
            away: None,
            home_box: None,
            away_box: None,
        }
    }

    /// True when both teams' tables were scraped
    pub fn is_complete(&self) -> bool {
        self.away.is_some() && self.home_box.is_some() && self.away_box.is_some()
    }

    /// Final score as (home, away)
    pub fn final_score(&self) -> Option<(f64, f64)> {
        match (&self.home_box, &self.away_box) {
            (Some(home), Some(away)) => Some((home.points(), away.points())),
            _ => None,
        }
    }
}

/// Per-season artifact written by the scrape stage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeasonBoxScores {
    pub season: u16,
    pub games: Vec<GameBoxScore>,
}

/// All seasons concatenated
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CombinedBoxScores {
    pub games: Vec<GameBoxScore>,
}

impl CombinedBoxScores {
    /// Distinct seasons, ascending
    pub fn seasons(&self) -> Vec<u16> {
        let mut seasons: Vec<u16> = self.games.iter().map(|g| g.season).collect();
        seasons.sort_unstable();
        seasons.dedup();
        seasons
    }

    /// Games of one season, in artifact order
    pub fn season_games(&self, season: u16) -> Vec<&GameBoxScore> {
        self.games.iter().filter(|g| g.season == season).collect()
    }
}

/// Box-score links found on one monthly schedule page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleMonth {
    pub year: u16,
    pub month: String,
    pub games: Vec<GameId>,
}

/// Index of games per season and month
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GamesIndex {
    pub entries: Vec<ScheduleMonth>,
}

impl GamesIndex {
    pub fn seasons(&self) -> Vec<u16> {
        let mut seasons: Vec<u16> = self.entries.iter().map(|e| e.year).collect();
        seasons.sort_unstable();
        seasons.dedup();
        seasons
    }

    pub fn months_for(&self, year: u16) -> impl Iterator<Item = &ScheduleMonth> {
        self.entries.iter().filter(move |e| e.year == year)
    }
}

/// Team abbreviations per season
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamsIndex {
    pub seasons: Vec<SeasonTeams>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonTeams {
    pub year: u16,
    pub teams: Vec<String>,
}

/// Convert a "MM:SS" minutes cell to seconds; anything else counts as zero
pub fn parse_minutes(mp: &str) -> f64 {
    let mut parts = mp.trim().split(':');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(mins), Some(secs), None) => match (mins.parse::<u32>(), secs.parse::<u32>()) {
            (Ok(m), Ok(s)) => f64::from(m * 60 + s),
            _ => 0.0,
        },
        _ => 0.0,
    }
}

/// Parse a numeric stat cell. Blank or non-numeric cells are absent.
///
/// Percentages on Basketball Reference are written as ".456".
pub fn parse_stat(cell: &str) -> Option<f64> {
    let cell = cell.trim();
    if cell.is_empty() {
        return None;
    }
    cell.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minutes() {
        assert_eq!(parse_minutes("34:12"), 2052.0);
        assert_eq!(parse_minutes("0:05"), 5.0);
        assert_eq!(parse_minutes("Did Not Play"), 0.0);
        assert_eq!(parse_minutes(""), 0.0);
        assert_eq!(parse_minutes("1:2:3"), 0.0);
    }

    #[test]
    fn test_parse_stat() {
        assert_eq!(parse_stat("12"), Some(12.0));
        assert_eq!(parse_stat(".456"), Some(0.456));
        assert_eq!(parse_stat("-3"), Some(-3.0));
        assert_eq!(parse_stat(""), None);
        assert_eq!(parse_stat("Inactive"), None);
    }

    #[test]
    fn test_failed_game_keeps_identity() {
        let game = GameBoxScore::failed(GameId::new("201911050LAL"), 2020, "november");
        assert_eq!(game.home, "LAL");
        assert_eq!(game.day, "05");
        assert!(!game.is_complete());
        assert_eq!(game.final_score(), None);
    }

    #[test]
    fn test_final_score_sums_points() {
        let line = |pts| BasicLine {
            player: "x".to_string(),
            pts: Some(pts),
            fg: Some(1.0),
            ..Default::default()
        };
        let game = GameBoxScore {
            game_id: GameId::new("201911050LAL"),
            season: 2020,
            month: "november".to_string(),
            day: "05".to_string(),
            home: "LAL".to_string(),
            away: Some("CHI".to_string()),
            home_box: Some(TeamBoxScore {
                team: "LAL".to_string(),
                basic: vec![line(20.0), line(15.0)],
                advanced: vec![],
            }),
            away_box: Some(TeamBoxScore {
                team: "CHI".to_string(),
                basic: vec![line(30.0)],
                advanced: vec![],
            }),
        };
        assert!(game.is_complete());
        assert_eq!(game.final_score(), Some((35.0, 30.0)));
    }
}
