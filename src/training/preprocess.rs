//! Median imputation and standard scaling, fitted on training rows only

use crate::{Result, StatsError};
use serde::{Deserialize, Serialize};

/// Fitted preprocessing parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preprocessor {
    /// Input columns kept (columns never observed in training are dropped)
    pub kept_columns: Vec<usize>,
    pub medians: Vec<f64>,
    pub means: Vec<f64>,
    pub stds: Vec<f64>,
}

fn median(values: &mut [f64]) -> f64 {
    values.sort_by(|a, b| a.total_cmp(b));
    let n = values.len();
    if n % 2 == 1 {
        values[n / 2]
    } else {
        (values[n / 2 - 1] + values[n / 2]) / 2.0
    }
}

impl Preprocessor {
    pub fn fit(rows: &[Vec<Option<f64>>]) -> Result<Self> {
        let width = rows.first().map(|r| r.len()).unwrap_or(0);

        let mut kept_columns = Vec::new();
        let mut medians = Vec::new();
        for col in 0..width {
            let mut observed: Vec<f64> = rows.iter().filter_map(|r| r[col]).collect();
            if observed.is_empty() {
                log::warn!("Dropping column {}: no observed values", col);
                continue;
            }
            kept_columns.push(col);
            medians.push(median(&mut observed));
        }

        if kept_columns.is_empty() {
            return Err(StatsError::Model(
                "no feature column has an observed value".to_string(),
            ));
        }

        let mut pre = Preprocessor {
            kept_columns,
            medians,
            means: Vec::new(),
            stds: Vec::new(),
        };

        let imputed = pre.impute(rows);
        let n = imputed.len() as f64;
        for j in 0..pre.kept_columns.len() {
            let mean = imputed.iter().map(|r| r[j]).sum::<f64>() / n;
            let var = imputed.iter().map(|r| (r[j] - mean).powi(2)).sum::<f64>() / n;
            let std = var.sqrt();
            pre.means.push(mean);
            pre.stds.push(if std > 0.0 { std } else { 1.0 });
        }

        Ok(pre)
    }

    /// Number of output features
    pub fn n_features(&self) -> usize {
        self.kept_columns.len()
    }

    fn impute(&self, rows: &[Vec<Option<f64>>]) -> Vec<Vec<f64>> {
        rows.iter()
            .map(|row| {
                self.kept_columns
                    .iter()
                    .zip(&self.medians)
                    .map(|(&col, &med)| row.get(col).copied().flatten().unwrap_or(med))
                    .collect()
            })
            .collect()
    }

    /// Impute then standardize
    pub fn transform(&self, rows: &[Vec<Option<f64>>]) -> Vec<Vec<f32>> {
        self.impute(rows)
            .into_iter()
            .map(|row| {
                row.iter()
                    .zip(self.means.iter().zip(&self.stds))
                    .map(|(v, (mean, std))| ((v - mean) / std) as f32)
                    .collect()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_median() {
        assert_eq!(median(&mut [3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&mut [4.0, 1.0, 3.0, 2.0]), 2.5);
    }

    #[test]
    fn test_fit_transform() {
        let rows = vec![
            vec![Some(1.0), None, Some(5.0)],
            vec![Some(3.0), None, Some(5.0)],
            vec![None, None, Some(5.0)],
        ];
        let pre = Preprocessor::fit(&rows).unwrap();

        // middle column never observed
        assert_eq!(pre.kept_columns, vec![0, 2]);
        assert_eq!(pre.medians, vec![2.0, 5.0]);
        // imputed column 0 = [1, 3, 2]
        assert!((pre.means[0] - 2.0).abs() < 1e-12);
        assert!((pre.stds[0] - (2.0f64 / 3.0).sqrt()).abs() < 1e-12);
        // constant column keeps unit scale
        assert_eq!(pre.stds[1], 1.0);

        let x = pre.transform(&rows);
        assert_eq!(x[2], vec![0.0, 0.0]);
        assert!(x[0][0] < 0.0 && x[1][0] > 0.0);
    }

    #[test]
    fn test_fit_without_observations() {
        assert!(Preprocessor::fit(&[vec![None], vec![None]]).is_err());
    }
}
