//! Seeded stratified train/test split

use crate::{Result, StatsError};
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Row indices of each partition, ascending
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Split rows so that each class keeps its proportion in the test set
///
/// Each class contributes `round(test_frac * n_class)` test rows, at least
/// one and never all of them. The same seed always gives the same split.
pub fn stratified_split(labels: &[bool], test_frac: f64, seed: u64) -> Result<SplitIndices> {
    if !(test_frac > 0.0 && test_frac < 1.0) {
        return Err(StatsError::Config(format!(
            "test fraction must be in (0, 1), got {}",
            test_frac
        )));
    }

    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    let mut train = Vec::new();
    let mut test = Vec::new();

    for class in [false, true] {
        let mut members: Vec<usize> = labels
            .iter()
            .enumerate()
            .filter(|&(_, &label)| label == class)
            .map(|(i, _)| i)
            .collect();

        if members.len() < 2 {
            return Err(StatsError::Model(format!(
                "class {} has {} rows; need at least 2 to stratify",
                class as u8,
                members.len()
            )));
        }

        members.shuffle(&mut rng);
        let n_test = ((test_frac * members.len() as f64).round() as usize).clamp(1, members.len() - 1);
        test.extend_from_slice(&members[..n_test]);
        train.extend_from_slice(&members[n_test..]);
    }

    train.sort_unstable();
    test.sort_unstable();

    log::info!(
        "Split {} rows: train={}, test={}",
        labels.len(),
        train.len(),
        test.len()
    );

    Ok(SplitIndices { train, test })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(n_true: usize, n_false: usize) -> Vec<bool> {
        let mut labels = vec![true; n_true];
        labels.extend(vec![false; n_false]);
        labels
    }

    #[test]
    fn test_class_proportions() {
        let y = labels(60, 40);
        let split = stratified_split(&y, 0.2, 0).unwrap();

        assert_eq!(split.test.len(), 20);
        assert_eq!(split.train.len(), 80);
        assert_eq!(split.test.iter().filter(|&&i| y[i]).count(), 12);
        assert_eq!(split.test.iter().filter(|&&i| !y[i]).count(), 8);

        let mut all: Vec<usize> = split.train.iter().chain(&split.test).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn test_seed_reproducible() {
        let y = labels(30, 25);
        assert_eq!(
            stratified_split(&y, 0.3, 7).unwrap(),
            stratified_split(&y, 0.3, 7).unwrap()
        );
        assert_ne!(
            stratified_split(&y, 0.3, 7).unwrap().test,
            stratified_split(&y, 0.3, 8).unwrap().test
        );
    }

    #[test]
    fn test_small_classes_keep_one_each_side() {
        let y = labels(2, 3);
        let split = stratified_split(&y, 0.1, 0).unwrap();
        assert_eq!(split.test.len(), 2);
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(stratified_split(&labels(5, 5), 0.0, 0).is_err());
        assert!(stratified_split(&labels(5, 5), 1.0, 0).is_err());
        assert!(stratified_split(&labels(5, 1), 0.2, 0).is_err());
    }
}
