//! Feature matrix and labels for the baseline classifier

use crate::features::TrainingSet;
use crate::{Result, Stage, StatsError};

/// Model inputs built from the training set
///
/// Identifying columns (year, game, teams) and the score difference itself
/// are not features; the label is `score_diff > 0`.
#[derive(Debug, Clone)]
pub struct TrainingMatrix {
    pub feature_names: Vec<String>,
    pub features: Vec<Vec<Option<f64>>>,
    pub labels: Vec<bool>,
}

impl TrainingMatrix {
    pub fn from_training_set(set: &TrainingSet) -> Result<Self> {
        if set.rows.is_empty() {
            return Err(StatsError::EmptyInput {
                stage: Stage::Model,
                message: "training set has no rows".to_string(),
            });
        }

        let width = set.feature_names.len();
        if let Some(bad) = set.rows.iter().find(|r| r.features.len() != width) {
            return Err(StatsError::Model(format!(
                "row {} {} has {} features, expected {}",
                bad.year,
                bad.game_idx,
                bad.features.len(),
                width
            )));
        }

        Ok(TrainingMatrix {
            feature_names: set.feature_names.clone(),
            features: set.rows.iter().map(|r| r.features.clone()).collect(),
            labels: set.rows.iter().map(|r| r.score_diff > 0.0).collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Rows and labels at the given indices
    pub fn select(&self, indices: &[usize]) -> (Vec<Vec<Option<f64>>>, Vec<bool>) {
        indices
            .iter()
            .map(|&i| (self.features[i].clone(), self.labels[i]))
            .unzip()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::TrainingRow;
    use crate::GameId;

    fn row(score_diff: f64, features: Vec<Option<f64>>) -> TrainingRow {
        TrainingRow {
            year: 2010,
            game_idx: 30,
            game_id: GameId::new("201001010BOS"),
            home_team: "BOS".to_string(),
            away_team: "NYK".to_string(),
            features,
            score_diff,
        }
    }

    #[test]
    fn test_labels_from_score_diff() {
        let set = TrainingSet {
            feature_names: vec!["a".to_string(), "b".to_string()],
            window: 20,
            min_history: 20,
            rows: vec![
                row(5.0, vec![Some(1.0), None]),
                row(-3.0, vec![Some(0.5), Some(2.0)]),
                row(0.0, vec![None, None]),
            ],
        };
        let matrix = TrainingMatrix::from_training_set(&set).unwrap();
        assert_eq!(matrix.labels, vec![true, false, false]);
        assert_eq!(matrix.len(), 3);

        let (x, y) = matrix.select(&[1]);
        assert_eq!(x, vec![vec![Some(0.5), Some(2.0)]]);
        assert_eq!(y, vec![false]);
    }

    #[test]
    fn test_rejects_empty_and_ragged() {
        let mut set = TrainingSet {
            feature_names: vec!["a".to_string()],
            ..Default::default()
        };
        assert!(matches!(
            TrainingMatrix::from_training_set(&set),
            Err(StatsError::EmptyInput { .. })
        ));

        set.rows.push(row(1.0, vec![Some(1.0), Some(2.0)]));
        assert!(TrainingMatrix::from_training_set(&set).is_err());
    }
}
