//! Evaluation metrics and training history

use serde::{Deserialize, Serialize};
use std::fmt;

/// Held-out evaluation of the baseline classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub accuracy: f64,
    /// Absent when the test set holds a single class
    pub roc_auc: Option<f64>,
    pub n_train: usize,
    pub n_test: usize,
    pub n_features: usize,
}

impl Metrics {
    pub fn evaluate(probs: &[f32], labels: &[bool], n_train: usize, n_features: usize) -> Self {
        Metrics {
            accuracy: accuracy(probs, labels),
            roc_auc: roc_auc(probs, labels),
            n_train,
            n_test: labels.len(),
            n_features,
        }
    }
}

impl fmt::Display for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Acc: {:.2}% | ROC-AUC: ", self.accuracy * 100.0)?;
        match self.roc_auc {
            Some(auc) => write!(f, "{:.4}", auc)?,
            None => write!(f, "n/a")?,
        }
        write!(
            f,
            " | n_train={} n_test={} n_features={}",
            self.n_train, self.n_test, self.n_features
        )
    }
}

/// Fraction of rows where `prob >= 0.5` agrees with the label
pub fn accuracy(probs: &[f32], labels: &[bool]) -> f64 {
    if labels.is_empty() {
        return 0.0;
    }
    let correct = probs
        .iter()
        .zip(labels)
        .filter(|&(p, &t)| (*p >= 0.5) == t)
        .count();
    correct as f64 / labels.len() as f64
}

/// Area under the ROC curve via the rank-sum statistic, ties averaged
pub fn roc_auc(scores: &[f32], labels: &[bool]) -> Option<f64> {
    let n_pos = labels.iter().filter(|&&l| l).count();
    let n_neg = labels.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    // 1-based ranks, tied scores share their average rank
    let mut ranks = vec![0.0; scores.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && scores[order[j + 1]] == scores[order[i]] {
            j += 1;
        }
        let avg = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            ranks[idx] = avg;
        }
        i = j + 1;
    }

    let pos_rank_sum: f64 = ranks
        .iter()
        .zip(labels)
        .filter(|&(_, &l)| l)
        .map(|(r, _)| r)
        .sum();
    let n_pos = n_pos as f64;
    Some((pos_rank_sum - n_pos * (n_pos + 1.0) / 2.0) / (n_pos * n_neg as f64))
}

/// Loss per iteration of a fit
#[derive(Debug, Clone)]
pub struct TrainingHistory {
    pub losses: Vec<f64>,
    pub best_loss: f64,
    pub best_iter: usize,
}

impl Default for TrainingHistory {
    fn default() -> Self {
        TrainingHistory {
            losses: Vec::new(),
            best_loss: f64::INFINITY,
            best_iter: 0,
        }
    }
}

impl TrainingHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, iter: usize, loss: f64) {
        self.losses.push(loss);
        if loss < self.best_loss {
            self.best_loss = loss;
            self.best_iter = iter;
        }
    }

    /// Get improvement from last iteration
    pub fn last_improvement(&self) -> Option<f64> {
        if self.losses.len() < 2 {
            return None;
        }
        let n = self.losses.len();
        Some(self.losses[n - 2] - self.losses[n - 1])
    }

    /// True once the loss improved by less than `tol`
    pub fn converged(&self, tol: f64) -> bool {
        self.last_improvement().map(|d| d < tol).unwrap_or(false)
    }

    pub fn final_loss(&self) -> Option<f64> {
        self.losses.last().copied()
    }
}
