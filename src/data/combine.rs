//! Concatenate per-season box-score artifacts into one table

use super::artifact;
use super::boxscore::{CombinedBoxScores, SeasonBoxScores};
use crate::{Result, Stage, StatsError};
use std::path::{Path, PathBuf};

/// Summary of a combine run
#[derive(Debug, Clone)]
pub struct CombineReport {
    pub files: Vec<PathBuf>,
    pub games: usize,
}

/// Read every season artifact in `boxscores_dir` (sorted by file name) and
/// write the concatenation to `out_path`
pub fn combine_boxscores<P: AsRef<Path>, Q: AsRef<Path>>(
    boxscores_dir: P,
    out_path: Q,
) -> Result<CombineReport> {
    let boxscores_dir = boxscores_dir.as_ref();
    let files = artifact::list_json(boxscores_dir)?;
    if files.is_empty() {
        return Err(StatsError::EmptyInput {
            stage: Stage::Combine,
            message: format!("no season files found in {}", boxscores_dir.display()),
        });
    }

    let mut combined = CombinedBoxScores::default();
    for file in &files {
        let season: SeasonBoxScores = artifact::read_json(file)?;
        log::debug!("{}: {} games", file.display(), season.games.len());
        combined.games.extend(season.games);
    }

    artifact::write_json(out_path.as_ref(), &combined)?;
    log::info!(
        "Wrote combined boxscores: {} ({} games from {} files)",
        out_path.as_ref().display(),
        combined.games.len(),
        files.len()
    );

    Ok(CombineReport {
        games: combined.games.len(),
        files,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::boxscore::GameBoxScore;
    use crate::GameId;

    fn season(year: u16, ids: &[&str]) -> SeasonBoxScores {
        SeasonBoxScores {
            season: year,
            games: ids
                .iter()
                .map(|id| GameBoxScore::failed(GameId::new(*id), year, "october"))
                .collect(),
        }
    }

    #[test]
    fn test_combine_counts_and_order() {
        let dir = tempfile::tempdir().unwrap();
        let box_dir = dir.path().join("boxscores");
        artifact::write_json(box_dir.join("2001.json"), &season(2001, &["200010310BOS"])).unwrap();
        artifact::write_json(
            box_dir.join("2000.json"),
            &season(2000, &["199911020CHI", "199911030LAL"]),
        )
        .unwrap();

        let out = dir.path().join("AllYears.json");
        let report = combine_boxscores(&box_dir, &out).unwrap();
        assert_eq!(report.games, 3);

        let combined: CombinedBoxScores = artifact::read_json(&out).unwrap();
        assert_eq!(combined.games.len(), 3);
        assert_eq!(combined.seasons(), vec![2000, 2001]);
        assert_eq!(combined.games[0].game_id, GameId::new("199911020CHI"));
        assert_eq!(combined.games[2].season, 2001);
    }

    #[test]
    fn test_combine_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let box_dir = dir.path().join("boxscores");
        artifact::write_json(box_dir.join("2000.json"), &season(2000, &["199911020CHI"])).unwrap();

        let first = dir.path().join("a.json");
        let second = dir.path().join("b.json");
        combine_boxscores(&box_dir, &first).unwrap();
        combine_boxscores(&box_dir, &second).unwrap();
        assert_eq!(std::fs::read(first).unwrap(), std::fs::read(second).unwrap());
    }

    #[test]
    fn test_combine_empty_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = combine_boxscores(dir.path(), dir.path().join("out.json")).unwrap_err();
        assert!(matches!(err, StatsError::EmptyInput { stage: Stage::Combine, .. }));
    }
}
