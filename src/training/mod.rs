//! Baseline model training
//!
//! Stratified split, preprocessing, logistic regression fit and metrics.

pub mod baseline;
pub mod dataset;
pub mod logistic;
pub mod metrics;
pub mod preprocess;
pub mod split;
pub mod trainer;

pub use baseline::{fit_baseline, train_baseline_classifier, BaselineSidecar, SavedBaseline};
pub use dataset::TrainingMatrix;
pub use logistic::BaselineModel;
pub use metrics::{Metrics, TrainingHistory};
pub use preprocess::Preprocessor;
pub use split::{stratified_split, SplitIndices};
pub use trainer::BaselineTrainer;
