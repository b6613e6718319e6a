//! Full-batch gradient descent for the baseline classifier

use burn::module::AutodiffModule;
use burn::optim::adaptor::OptimizerAdaptor;
use burn::optim::{GradientsParams, Optimizer, Sgd, SgdConfig};
use burn::tensor::activation::sigmoid;
use burn::tensor::backend::AutodiffBackend;
use burn::tensor::{ElementConversion, Tensor};

use super::logistic::{to_tensor, BaselineModel};
use super::metrics::TrainingHistory;
use crate::{ModelConfig, Result, StatsError};

/// Fits [`BaselineModel`] on mean binary cross-entropy plus an L2 penalty
pub struct BaselineTrainer<B: AutodiffBackend> {
    model: BaselineModel<B>,
    optimizer: OptimizerAdaptor<Sgd<B::InnerBackend>, BaselineModel<B>, B>,
    learning_rate: f64,
    max_iter: usize,
    tol: f64,
    /// Inverse regularization strength
    c: f64,
    device: B::Device,
}

impl<B: AutodiffBackend> BaselineTrainer<B> {
    pub fn new(device: B::Device, n_features: usize, config: &ModelConfig) -> Self {
        BaselineTrainer {
            model: BaselineModel::new(&device, n_features),
            optimizer: SgdConfig::new().init(),
            learning_rate: config.learning_rate,
            max_iter: config.max_iter,
            tol: config.tol,
            c: config.c,
            device,
        }
    }

    /// Train on standardized rows; returns the inference model and the loss history
    pub fn fit(
        mut self,
        x: &[Vec<f32>],
        y: &[bool],
    ) -> Result<(BaselineModel<B::InnerBackend>, TrainingHistory)> {
        if x.is_empty() || x.len() != y.len() {
            return Err(StatsError::Model(format!(
                "cannot fit on {} rows with {} labels",
                x.len(),
                y.len()
            )));
        }
        if self.c <= 0.0 {
            return Err(StatsError::Config("C must be positive".to_string()));
        }

        let n = x.len();
        let x_train = to_tensor::<B>(x, &self.device);
        let targets: Vec<f32> = y.iter().map(|&t| if t { 1.0 } else { 0.0 }).collect();
        let y_train = Tensor::<B, 1>::from_floats(targets.as_slice(), &self.device).unsqueeze_dim(1);
        let penalty_scale = 1.0 / (2.0 * self.c * n as f64);

        let mut history = TrainingHistory::new();

        log::info!(
            "Fitting logistic regression: {} rows, max_iter={}, lr={}",
            n,
            self.max_iter,
            self.learning_rate
        );

        for iter in 0..self.max_iter {
            let probs = sigmoid(self.model.forward(x_train.clone()));
            let loss = binary_cross_entropy(probs, y_train.clone())
                + self.model.weight_norm_sq().mul_scalar(penalty_scale);
            let loss_val: f32 = loss.clone().into_scalar().elem();

            history.record(iter, loss_val as f64);
            if history.converged(self.tol) {
                log::info!("Converged after {} iterations: loss={:.6}", iter, loss_val);
                break;
            }

            let grads = loss.backward();
            let grads_params = GradientsParams::from_grads(grads, &self.model);
            self.model = self.optimizer.step(self.learning_rate, self.model, grads_params);

            if iter % 100 == 0 || iter + 1 == self.max_iter {
                log::debug!("Iter {}/{}: loss={:.6}", iter + 1, self.max_iter, loss_val);
            }
        }

        if let Some(loss) = history.final_loss() {
            log::info!(
                "Final loss: {:.6} ({} iterations, best {:.6} at iteration {})",
                loss,
                history.losses.len(),
                history.best_loss,
                history.best_iter
            );
        }

        Ok((self.model.valid(), history))
    }
}

fn binary_cross_entropy<B: AutodiffBackend>(probs: Tensor<B, 2>, targets: Tensor<B, 2>) -> Tensor<B, 1> {
    let eps = 1e-7;
    let probs_clamped = probs.clamp(eps, 1.0 - eps);
    let loss = targets.clone().neg() * probs_clamped.clone().log()
        - (targets.neg() + 1.0) * (probs_clamped.neg() + 1.0).log();
    loss.mean()
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};

    type TestBackend = Autodiff<NdArray<f32>>;

    #[test]
    fn test_fit_separates_data() {
        let x: Vec<Vec<f32>> = (0..40)
            .map(|i| {
                let sign = if i % 2 == 0 { 1.0 } else { -1.0 };
                vec![sign * (1.0 + (i % 5) as f32 * 0.2), ((i % 3) as f32 - 1.0) * 0.1]
            })
            .collect();
        let y: Vec<bool> = (0..40).map(|i| i % 2 == 0).collect();

        let config = ModelConfig {
            max_iter: 200,
            ..Default::default()
        };
        let trainer = BaselineTrainer::<TestBackend>::new(Default::default(), 2, &config);
        let (model, history) = trainer.fit(&x, &y).unwrap();

        // loss starts at ln 2 and decreases
        assert!((history.losses[0] - std::f64::consts::LN_2).abs() < 1e-4);
        assert!(history.final_loss().unwrap() < history.losses[0]);

        let probs = model.probabilities(&x, &Default::default()).unwrap();
        for (p, t) in probs.iter().zip(&y) {
            assert_eq!(*p >= 0.5, *t);
        }
    }

    #[test]
    fn test_fit_rejects_mismatched_rows() {
        let trainer = BaselineTrainer::<TestBackend>::new(Default::default(), 1, &ModelConfig::default());
        assert!(trainer.fit(&[vec![1.0]], &[true, false]).is_err());
    }
}
