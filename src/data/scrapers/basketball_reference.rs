//! Basketball Reference scraper
//!
//! Builds the games index from monthly schedule pages and parses the basic
//! and advanced box-score tables of every game page.

use super::PageSource;
use crate::data::artifact;
use crate::data::boxscore::{
    parse_minutes, parse_stat, AdvancedLine, BasicLine, GameBoxScore, GamesIndex, ScheduleMonth,
    SeasonBoxScores, SeasonTeams, TeamBoxScore, TeamsIndex,
};
use crate::{GameId, Result, StatsError};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;
use std::path::Path;

pub const BASE_URL: &str = "https://www.basketball-reference.com";

/// Scraper for basketball-reference.com
pub struct BasketballReference<S: PageSource> {
    source: S,
    /// Schedule months visited per season
    months: Vec<String>,
}

/// Summary of a scrape run
#[derive(Debug, Clone, Default)]
pub struct ScrapeReport {
    pub seasons_written: Vec<u16>,
    pub seasons_skipped: Vec<u16>,
    pub games: usize,
    pub failed: usize,
}

/// Both teams' tables from one box-score page
#[derive(Debug, Clone)]
pub struct ParsedGame {
    pub away: TeamBoxScore,
    pub home: TeamBoxScore,
}

impl<S: PageSource> BasketballReference<S> {
    pub fn new(source: S, months: Vec<String>) -> Self {
        BasketballReference { source, months }
    }

    pub fn schedule_url(year: u16, month: &str) -> String {
        format!("{}/leagues/NBA_{}_games-{}.html", BASE_URL, year, month)
    }

    pub fn season_url(year: u16) -> String {
        format!("{}/leagues/NBA_{}.html", BASE_URL, year)
    }

    pub fn boxscore_url(game: &GameId) -> String {
        format!("{}/boxscores/{}.html", BASE_URL, game)
    }

    /// Collect box-score ids for seasons `start..end` (end exclusive)
    ///
    /// Months without a schedule page (HTTP 404) are skipped.
    pub fn fetch_games_index(&self, start: u16, end: u16) -> Result<GamesIndex> {
        let mut entries = Vec::new();

        for year in start..end {
            for month in &self.months {
                let url = Self::schedule_url(year, month);
                let Some(html) = self.source.fetch(&url)? else {
                    log::debug!("No schedule for {} {}", year, month);
                    continue;
                };
                let games = parse_schedule(&html)?;
                log::info!("{} {}: {} games", year, month, games.len());
                entries.push(ScheduleMonth {
                    year,
                    month: month.clone(),
                    games,
                });
            }
        }

        Ok(GamesIndex { entries })
    }

    /// Team abbreviations for seasons `start..=end`
    pub fn fetch_team_index(&self, start: u16, end: u16) -> Result<TeamsIndex> {
        let mut seasons = Vec::new();

        for year in start..=end {
            let url = Self::season_url(year);
            let teams = match self.source.fetch(&url)? {
                Some(html) => parse_season_teams(&html, year)?,
                None => {
                    log::warn!("No season page for {}", year);
                    Vec::new()
                }
            };
            log::info!("{}: {} teams", year, teams.len());
            seasons.push(SeasonTeams { year, teams });
        }

        Ok(TeamsIndex { seasons })
    }

    /// Fetch and write the team abbreviation index
    pub fn scrape_team_index<P: AsRef<Path>>(
        &self,
        out_path: P,
        start: u16,
        end: u16,
    ) -> Result<TeamsIndex> {
        let index = self.fetch_team_index(start, end)?;
        artifact::write_json_pretty(out_path.as_ref(), &index)?;
        log::info!("Wrote team abbrevs: {}", out_path.as_ref().display());
        Ok(index)
    }

    /// Fetch and parse a single game
    pub fn fetch_game(&self, game: &GameId, season: u16, month: &str) -> Result<GameBoxScore> {
        let url = Self::boxscore_url(game);
        let html = self.source.fetch(&url)?.ok_or_else(|| StatsError::Scraper {
            url: url.clone(),
            message: "page not found".to_string(),
        })?;

        let parsed = parse_box_score(&html).map_err(|e| StatsError::Scraper {
            url,
            message: e.to_string(),
        })?;

        match game.date() {
            Some(date) => log::info!("{} | home={} away={}", date, parsed.home.team, parsed.away.team),
            None => log::info!("{} | home={} away={}", game, parsed.home.team, parsed.away.team),
        }

        Ok(GameBoxScore {
            game_id: game.clone(),
            season,
            month: month.to_string(),
            day: game.day().unwrap_or_default().to_string(),
            home: parsed.home.team.clone(),
            away: Some(parsed.away.team.clone()),
            home_box: Some(parsed.home),
            away_box: Some(parsed.away),
        })
    }

    /// Scrape box scores into `{data_dir}/boxscores/{YEAR}.json`
    ///
    /// The games index at `{data_dir}/gamesByYear.json` is reused when present,
    /// otherwise built for `start..end`. Seasons in `start..=end` whose artifact
    /// already exists are skipped unless `overwrite` is set. A game that fails
    /// to scrape is kept as a row without tables.
    pub fn scrape_boxscores<P: AsRef<Path>>(
        &self,
        data_dir: P,
        start: u16,
        end: u16,
        overwrite: bool,
    ) -> Result<ScrapeReport> {
        let data_dir = data_dir.as_ref();
        let games_path = data_dir.join("gamesByYear.json");
        let boxscores_dir = data_dir.join("boxscores");
        std::fs::create_dir_all(&boxscores_dir)?;

        let index: GamesIndex = if games_path.exists() {
            log::info!("Loaded games index: {}", games_path.display());
            artifact::read_json(&games_path)?
        } else {
            log::info!("No games index found; scraping schedules to build it.");
            let index = self.fetch_games_index(start, end)?;
            artifact::write_json(&games_path, &index)?;
            log::info!("Wrote games-by-year: {}", games_path.display());
            index
        };

        let mut report = ScrapeReport::default();

        for year in index
            .seasons()
            .into_iter()
            .filter(|y| (start..=end).contains(y))
        {
            let out_path = boxscores_dir.join(format!("{}.json", year));
            if out_path.exists() && !overwrite {
                log::info!("Skipping existing: {}", out_path.display());
                report.seasons_skipped.push(year);
                continue;
            }

            let mut games = Vec::new();
            for entry in index.months_for(year) {
                for game in &entry.games {
                    match self.fetch_game(game, year, &entry.month) {
                        Ok(scraped) => {
                            log::info!(
                                "{} {} {} | home={} away={}",
                                year,
                                entry.month,
                                scraped.day,
                                scraped.home,
                                scraped.away.as_deref().unwrap_or("?")
                            );
                            games.push(scraped);
                        }
                        Err(e) => {
                            log::warn!("Failed scrape for {}: {}", game, e);
                            report.failed += 1;
                            games.push(GameBoxScore::failed(game.clone(), year, &entry.month));
                        }
                    }
                }
            }

            report.games += games.len();
            let n_games = games.len();
            artifact::write_json(&out_path, &SeasonBoxScores { season: year, games })?;
            log::info!("Wrote: {} ({} games)", out_path.display(), n_games);
            report.seasons_written.push(year);
        }

        Ok(report)
    }
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| StatsError::Parse(format!("Invalid selector {}: {:?}", css, e)))
}

fn pattern(re: &str) -> Result<Regex> {
    Regex::new(re).map_err(|e| StatsError::Parse(e.to_string()))
}

/// Box-score ids linked from a schedule page, in page order
pub fn parse_schedule(html: &str) -> Result<Vec<GameId>> {
    let document = Html::parse_document(html);
    let link_selector = selector("a[href]")?;
    let boxscore_link = pattern(r"^/boxscores/([0-9A-Z]+)\.html$")?;

    let mut games: Vec<GameId> = Vec::new();
    for link in document.select(&link_selector) {
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        if let Some(caps) = boxscore_link.captures(href) {
            let id = GameId::new(&caps[1]);
            if !games.contains(&id) {
                games.push(id);
            }
        }
    }
    Ok(games)
}

/// Team abbreviations linked for a given season, first-seen order
pub fn parse_season_teams(html: &str, year: u16) -> Result<Vec<String>> {
    let document = Html::parse_document(html);
    let link_selector = selector("a[href]")?;
    let team_link = pattern(r"^/teams/([A-Z0-9]{3})/(\d{4})\.html$")?;

    let mut teams: Vec<String> = Vec::new();
    for link in document.select(&link_selector) {
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        if let Some(caps) = team_link.captures(href) {
            if caps[2].parse::<u16>().ok() == Some(year) && !teams.iter().any(|t| t == &caps[1]) {
                teams.push(caps[1].to_string());
            }
        }
    }
    Ok(teams)
}

/// The two teams of a box-score page as (away, home)
///
/// The scorebox lists the away team first. Falls back to the first two team
/// links in the document when there is no scorebox.
fn parse_game_teams(document: &Html) -> Result<(String, String)> {
    let team_link = pattern(r"^/teams/([A-Z0-9]{3})/\d{4}\.html$")?;

    let collect = |css: &str| -> Result<Vec<String>> {
        let sel = selector(css)?;
        let mut teams: Vec<String> = Vec::new();
        for link in document.select(&sel) {
            let Some(href) = link.value().attr("href") else {
                continue;
            };
            if let Some(caps) = team_link.captures(href) {
                if !teams.iter().any(|t| t == &caps[1]) {
                    teams.push(caps[1].to_string());
                }
            }
            if teams.len() == 2 {
                break;
            }
        }
        Ok(teams)
    };

    let mut teams = collect("div.scorebox a[href]")?;
    if teams.len() < 2 {
        teams = collect("a[href]")?;
    }

    match teams.as_slice() {
        [away, home, ..] => Ok((away.clone(), home.clone())),
        _ => Err(StatsError::Parse("could not find both teams".to_string())),
    }
}

/// One player row of a box-score table
struct TableRow {
    player: String,
    player_id: Option<String>,
    cells: HashMap<String, String>,
}

impl TableRow {
    fn stat(&self, name: &str) -> Option<f64> {
        self.cells.get(name).and_then(|c| parse_stat(c))
    }

    fn minutes(&self) -> f64 {
        self.cells.get("mp").map(|c| parse_minutes(c)).unwrap_or(0.0)
    }
}

/// Player rows of a table, skipping header rows such as "Reserves".
/// Totals live in the footer and are never selected.
fn parse_table_rows(document: &Html, table_id: &str) -> Result<Option<Vec<TableRow>>> {
    let table_selector = selector(&format!("table#{}", table_id))?;
    let row_selector = selector("tbody tr")?;
    let player_selector = selector("th[data-stat='player']")?;
    let link_selector = selector("a[href]")?;
    let cell_selector = selector("td[data-stat]")?;
    let player_link = pattern(r"/players/[a-z]/([a-z0-9]+)\.html$")?;

    let Some(table) = document.select(&table_selector).next() else {
        return Ok(None);
    };

    let mut rows = Vec::new();
    for row in table.select(&row_selector) {
        if is_header_row(&row) {
            continue;
        }
        let Some(player_cell) = row.select(&player_selector).next() else {
            continue;
        };

        let player = player_cell.text().collect::<String>().trim().to_string();
        if player.is_empty() {
            continue;
        }
        let player_id = player_cell
            .select(&link_selector)
            .next()
            .and_then(|a| a.value().attr("href"))
            .and_then(|href| player_link.captures(href))
            .map(|caps| caps[1].to_string());

        let cells = row
            .select(&cell_selector)
            .filter_map(|td| {
                let stat = td.value().attr("data-stat")?;
                Some((stat.to_string(), td.text().collect::<String>().trim().to_string()))
            })
            .collect();

        rows.push(TableRow {
            player,
            player_id,
            cells,
        });
    }

    Ok(Some(rows))
}

fn is_header_row(row: &ElementRef) -> bool {
    row.value()
        .attr("class")
        .map(|c| c.split_whitespace().any(|c| c == "thead"))
        .unwrap_or(false)
}

fn basic_line(row: &TableRow) -> BasicLine {
    BasicLine {
        player: row.player.clone(),
        player_id: row.player_id.clone(),
        mp: row.minutes(),
        fg: row.stat("fg"),
        fga: row.stat("fga"),
        fg_pct: row.stat("fg_pct"),
        fg3: row.stat("fg3"),
        fg3a: row.stat("fg3a"),
        fg3_pct: row.stat("fg3_pct"),
        ft: row.stat("ft"),
        fta: row.stat("fta"),
        ft_pct: row.stat("ft_pct"),
        orb: row.stat("orb"),
        drb: row.stat("drb"),
        trb: row.stat("trb"),
        ast: row.stat("ast"),
        stl: row.stat("stl"),
        blk: row.stat("blk"),
        tov: row.stat("tov"),
        pf: row.stat("pf"),
        pts: row.stat("pts"),
    }
}

fn advanced_line(row: &TableRow) -> AdvancedLine {
    AdvancedLine {
        player: row.player.clone(),
        player_id: row.player_id.clone(),
        mp: row.minutes(),
        ts_pct: row.stat("ts_pct"),
        efg_pct: row.stat("efg_pct"),
        fg3a_rate: row.stat("fg3a_per_fga_pct"),
        fta_rate: row.stat("fta_per_fga_pct"),
        orb_pct: row.stat("orb_pct"),
        drb_pct: row.stat("drb_pct"),
        trb_pct: row.stat("trb_pct"),
        ast_pct: row.stat("ast_pct"),
        stl_pct: row.stat("stl_pct"),
        blk_pct: row.stat("blk_pct"),
        tov_pct: row.stat("tov_pct"),
        usg_pct: row.stat("usg_pct"),
        ortg: row.stat("off_rtg"),
        drtg: row.stat("def_rtg"),
    }
}

fn parse_team_box(document: &Html, team: &str) -> Result<TeamBoxScore> {
    let basic = parse_table_rows(document, &format!("box-{}-game-basic", team))?
        .ok_or_else(|| StatsError::Parse(format!("missing basic table for {}", team)))?;
    let advanced = parse_table_rows(document, &format!("box-{}-game-advanced", team))?
        .ok_or_else(|| StatsError::Parse(format!("missing advanced table for {}", team)))?;

    Ok(TeamBoxScore {
        team: team.to_string(),
        basic: basic.iter().map(basic_line).collect(),
        advanced: advanced.iter().map(advanced_line).collect(),
    })
}

/// Parse a box-score page into both teams' tables
pub fn parse_box_score(html: &str) -> Result<ParsedGame> {
    let document = Html::parse_document(html);
    let (away, home) = parse_game_teams(&document)?;

    Ok(ParsedGame {
        away: parse_team_box(&document, &away)?,
        home: parse_team_box(&document, &home)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn basic_row(id: &str, name: &str, mp: &str, fg: u32, fga: u32, fg3: u32, ft: u32, pts: u32) -> String {
        format!(
            r#"<tr><th data-stat="player"><a href="/players/{}/{}.html">{}</a></th>
            <td data-stat="mp">{}</td><td data-stat="fg">{}</td><td data-stat="fga">{}</td>
            <td data-stat="fg_pct">.500</td><td data-stat="fg3">{}</td><td data-stat="fg3a">4</td>
            <td data-stat="fg3_pct"></td><td data-stat="ft">{}</td><td data-stat="fta">4</td>
            <td data-stat="ft_pct">.750</td><td data-stat="orb">1</td><td data-stat="drb">5</td>
            <td data-stat="trb">6</td><td data-stat="ast">3</td><td data-stat="stl">1</td>
            <td data-stat="blk">0</td><td data-stat="tov">2</td><td data-stat="pf">3</td>
            <td data-stat="pts">{}</td></tr>"#,
            &id[..1], id, name, mp, fg, fga, fg3, ft, pts
        )
    }

    fn advanced_row(id: &str, name: &str, mp: &str) -> String {
        format!(
            r#"<tr><th data-stat="player"><a href="/players/{}/{}.html">{}</a></th>
            <td data-stat="mp">{}</td><td data-stat="ts_pct">.601</td><td data-stat="efg_pct">.550</td>
            <td data-stat="fg3a_per_fga_pct">.333</td><td data-stat="fta_per_fga_pct">.250</td>
            <td data-stat="orb_pct">4.1</td><td data-stat="drb_pct">15.0</td><td data-stat="trb_pct">9.5</td>
            <td data-stat="ast_pct">20.0</td><td data-stat="stl_pct">1.5</td><td data-stat="blk_pct">0.0</td>
            <td data-stat="tov_pct">12.0</td><td data-stat="usg_pct">25.0</td>
            <td data-stat="off_rtg">115</td><td data-stat="def_rtg">108</td></tr>"#,
            &id[..1], id, name, mp
        )
    }

    fn team_tables(team: &str, players: &[(&str, &str)]) -> String {
        let mut basic = String::new();
        let mut advanced = String::new();
        for (i, (id, name)) in players.iter().enumerate() {
            if i == 1 {
                basic.push_str(r#"<tr class="thead"><th>Reserves</th><td>MP</td></tr>"#);
            }
            basic.push_str(&basic_row(id, name, "30:00", 5, 10, 1, 3, 14));
            advanced.push_str(&advanced_row(id, name, "30:00"));
        }
        basic.push_str(
            r#"<tr><th data-stat="player"><a href="/players/z/zzbench01.html">Bench Guy</a></th>
            <td data-stat="reason">Did Not Play</td></tr>"#,
        );
        format!(
            r#"<table id="box-{team}-game-basic"><tbody>{basic}</tbody>
            <tfoot><tr><th>Team Totals</th><td data-stat="pts">999</td></tr></tfoot></table>
            <table id="box-{team}-game-advanced"><tbody>{advanced}</tbody></table>"#
        )
    }

    fn game_page() -> String {
        format!(
            r#"<html><body>
            <div id="nav"><a href="/teams/">Teams</a></div>
            <div class="scorebox">
              <div><strong><a href="/teams/NOP/2020.html">New Orleans Pelicans</a></strong></div>
              <div><strong><a href="/teams/TOR/2020.html">Toronto Raptors</a></strong></div>
            </div>
            {}{}
            </body></html>"#,
            team_tables("NOP", &[("holidjr01", "Jrue Holiday"), ("ingrabr01", "Brandon Ingram")]),
            team_tables("TOR", &[("lowryky01", "Kyle Lowry"), ("siakapa01", "Pascal Siakam")]),
        )
    }

    fn schedule_page() -> String {
        r#"<html><body>
        <a href="/boxscores/">Box Scores</a>
        <a href="/boxscores/201910220TOR.html">Box Score</a>
        <a href="/boxscores/201910220LAC.html">Box Score</a>
        <a href="/boxscores/201910220TOR.html">Box Score</a>
        <a href="/teams/TOR/2020.html">Raptors</a>
        </body></html>"#
            .to_string()
    }

    /// In-memory page source; unknown URLs are 404s
    struct StubSource {
        pages: HashMap<String, String>,
        calls: Cell<usize>,
    }

    impl PageSource for StubSource {
        fn fetch(&self, url: &str) -> Result<Option<String>> {
            self.calls.set(self.calls.get() + 1);
            Ok(self.pages.get(url).cloned())
        }
    }

    fn stub_scraper() -> BasketballReference<StubSource> {
        let mut pages = HashMap::new();
        pages.insert(
            BasketballReference::<StubSource>::schedule_url(2020, "october"),
            schedule_page(),
        );
        pages.insert(
            BasketballReference::<StubSource>::boxscore_url(&GameId::new("201910220TOR")),
            game_page(),
        );
        BasketballReference::new(
            StubSource {
                pages,
                calls: Cell::new(0),
            },
            vec!["october".to_string(), "november".to_string()],
        )
    }

    #[test]
    fn test_parse_schedule() {
        let games = parse_schedule(&schedule_page()).unwrap();
        assert_eq!(
            games,
            vec![GameId::new("201910220TOR"), GameId::new("201910220LAC")]
        );
    }

    #[test]
    fn test_parse_season_teams() {
        let html = r#"<a href="/teams/BOS/1992.html">x</a><a href="/teams/CHI/1992.html">y</a>
            <a href="/teams/BOS/1992.html">z</a><a href="/teams/LAL/1993.html">w</a>"#;
        assert_eq!(parse_season_teams(html, 1992).unwrap(), vec!["BOS", "CHI"]);
    }

    #[test]
    fn test_parse_box_score() {
        let parsed = parse_box_score(&game_page()).unwrap();
        assert_eq!(parsed.away.team, "NOP");
        assert_eq!(parsed.home.team, "TOR");

        // two players plus the DNP row; the Reserves header and totals are skipped
        let home = &parsed.home;
        assert_eq!(home.basic.len(), 3);
        assert_eq!(home.advanced.len(), 2);

        let lowry = &home.basic[0];
        assert_eq!(lowry.player, "Kyle Lowry");
        assert_eq!(lowry.player_id.as_deref(), Some("lowryky01"));
        assert_eq!(lowry.mp, 1800.0);
        assert_eq!(lowry.fg, Some(5.0));
        assert_eq!(lowry.fg3_pct, None);
        assert_eq!(lowry.ft_pct, Some(0.75));

        let bench = &home.basic[2];
        assert!(!bench.played());
        assert_eq!(bench.mp, 0.0);

        let adv = home.advanced_for("Pascal Siakam").unwrap();
        assert_eq!(adv.ortg, Some(115.0));
        assert_eq!(adv.fg3a_rate, Some(0.333));
        assert_eq!(home.points(), 28.0);
    }

    #[test]
    fn test_parse_box_score_missing_tables() {
        let html = r#"<div class="scorebox"><a href="/teams/NOP/2020.html">a</a>
            <a href="/teams/TOR/2020.html">b</a></div>"#;
        assert!(parse_box_score(html).is_err());
        assert!(parse_box_score("<html></html>").is_err());
    }

    #[test]
    fn test_games_index_skips_missing_months() {
        let scraper = stub_scraper();
        let index = scraper.fetch_games_index(2020, 2021).unwrap();
        assert_eq!(index.entries.len(), 1);
        assert_eq!(index.entries[0].month, "october");
        assert_eq!(index.entries[0].games.len(), 2);
    }

    #[test]
    fn test_offline_games_index_with_cached_404_month() {
        use crate::data::scrapers::HttpSource;
        use std::time::Duration;

        let dir = tempfile::tempdir().unwrap();
        let october = BasketballReference::<HttpSource>::schedule_url(2020, "october");
        let november = BasketballReference::<HttpSource>::schedule_url(2020, "november");
        let source = HttpSource::new("test", Duration::from_secs(1), 0.0)
            .unwrap()
            .with_cache(dir.path())
            .offline_only(true);
        source.save_to_cache(&october, &schedule_page()).unwrap();
        source.save_missing_marker(&november).unwrap();

        let scraper = BasketballReference::new(
            source,
            vec!["october".to_string(), "november".to_string()],
        );
        let index = scraper.fetch_games_index(2020, 2021).unwrap();
        assert_eq!(index.entries.len(), 1);
        assert_eq!(index.entries[0].month, "october");
        assert_eq!(index.entries[0].games.len(), 2);
    }

    #[test]
    fn test_scrape_boxscores_records_failures_and_skips() {
        let dir = tempfile::tempdir().unwrap();
        let scraper = stub_scraper();

        let report = scraper.scrape_boxscores(dir.path(), 2020, 2021, false).unwrap();
        assert_eq!(report.seasons_written, vec![2020]);
        assert_eq!(report.games, 2);
        assert_eq!(report.failed, 1);

        let season: SeasonBoxScores =
            artifact::read_json(dir.path().join("boxscores/2020.json")).unwrap();
        assert_eq!(season.games.len(), 2);
        assert!(season.games[0].is_complete());
        assert_eq!(season.games[0].home, "TOR");
        assert_eq!(season.games[0].away.as_deref(), Some("NOP"));
        assert!(!season.games[1].is_complete());
        assert_eq!(season.games[1].home, "LAC");

        let calls = scraper.source.calls.get();
        let again = scraper.scrape_boxscores(dir.path(), 2020, 2021, false).unwrap();
        assert_eq!(again.seasons_skipped, vec![2020]);
        assert!(again.seasons_written.is_empty());
        // index reused and season skipped: no further requests
        assert_eq!(scraper.source.calls.get(), calls);
    }
}
