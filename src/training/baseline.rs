//! Baseline home-win classifier: split, preprocess, fit, evaluate, persist

use burn::backend::{Autodiff, NdArray};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::dataset::TrainingMatrix;
use super::logistic::BaselineModel;
use super::metrics::Metrics;
use super::preprocess::Preprocessor;
use super::split::stratified_split;
use super::trainer::BaselineTrainer;
use crate::data::artifact;
use crate::features::TrainingSet;
use crate::{ModelConfig, Result, StatsError};

type TrainBackend = Autodiff<NdArray<f32>>;
type InferBackend = NdArray<f32>;

/// File stem of the persisted model
pub const MODEL_NAME: &str = "baseline_logreg";

/// Everything besides the weights needed to score new rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineSidecar {
    /// All input feature names, in training-set order
    pub input_features: Vec<String>,
    /// Names of the columns the model actually uses
    pub model_features: Vec<String>,
    pub preprocessor: Preprocessor,
    pub metrics: Metrics,
    pub iterations: usize,
    pub final_loss: Option<f64>,
}

/// A fitted model with its preprocessing
pub struct SavedBaseline {
    pub model: BaselineModel<InferBackend>,
    pub sidecar: BaselineSidecar,
}

impl SavedBaseline {
    /// Load `{dir}/baseline_logreg.mpk` and its JSON sidecar
    pub fn load<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let stem = dir.as_ref().join(MODEL_NAME);
        let weights = stem.with_extension("mpk");
        if !weights.exists() {
            return Err(StatsError::MissingInput(weights));
        }
        let sidecar: BaselineSidecar = artifact::read_json(stem.with_extension("json"))?;

        let model = BaselineModel::<InferBackend>::load(
            &Default::default(),
            &stem,
            sidecar.preprocessor.n_features(),
        )?;
        Ok(SavedBaseline { model, sidecar })
    }

    /// P(home win) for raw feature rows in `input_features` order
    pub fn predict_proba(&self, rows: &[Vec<Option<f64>>]) -> Result<Vec<f32>> {
        let width = self.sidecar.input_features.len();
        if rows.iter().any(|r| r.len() != width) {
            return Err(StatsError::Model(format!("expected {} features per row", width)));
        }
        let x = self.sidecar.preprocessor.transform(rows);
        self.model.probabilities(&x, &Default::default())
    }
}

/// Split, preprocess and fit; nothing is written
pub fn fit_baseline(
    matrix: &TrainingMatrix,
    config: &ModelConfig,
) -> Result<(BaselineModel<InferBackend>, BaselineSidecar)> {
    let split = stratified_split(&matrix.labels, config.test_frac, config.seed)?;
    let (train_rows, y_train) = matrix.select(&split.train);
    let (test_rows, y_test) = matrix.select(&split.test);

    let preprocessor = Preprocessor::fit(&train_rows)?;
    let x_train = preprocessor.transform(&train_rows);
    let x_test = preprocessor.transform(&test_rows);

    let trainer = BaselineTrainer::<TrainBackend>::new(Default::default(), preprocessor.n_features(), config);
    let (model, history) = trainer.fit(&x_train, &y_train)?;

    let probs = model.probabilities(&x_test, &Default::default())?;
    let metrics = Metrics::evaluate(&probs, &y_test, x_train.len(), preprocessor.n_features());

    let sidecar = BaselineSidecar {
        input_features: matrix.feature_names.clone(),
        model_features: preprocessor
            .kept_columns
            .iter()
            .map(|&c| matrix.feature_names[c].clone())
            .collect(),
        preprocessor,
        metrics,
        iterations: history.losses.len(),
        final_loss: history.final_loss(),
    };
    Ok((model, sidecar))
}

/// Train on the training-set artifact and write the model to `out_dir`
///
/// Returns the weights path and the held-out metrics.
pub fn train_baseline_classifier<P: AsRef<Path>, Q: AsRef<Path>>(
    training_path: P,
    out_dir: Q,
    config: &ModelConfig,
) -> Result<(PathBuf, Metrics)> {
    let set: TrainingSet = artifact::read_json(training_path.as_ref())?;
    log::info!(
        "Loaded training set: {} ({} rows)",
        training_path.as_ref().display(),
        set.rows.len()
    );

    let matrix = TrainingMatrix::from_training_set(&set)?;
    let (model, sidecar) = fit_baseline(&matrix, config)?;
    log::info!("Baseline metrics: {}", sidecar.metrics);

    std::fs::create_dir_all(out_dir.as_ref())?;
    let stem = out_dir.as_ref().join(MODEL_NAME);
    model.save(&stem)?;
    artifact::write_json_pretty(stem.with_extension("json"), &sidecar)?;

    let weights = stem.with_extension("mpk");
    log::info!("Saved model: {}", weights.display());
    Ok((weights, sidecar.metrics))
}
