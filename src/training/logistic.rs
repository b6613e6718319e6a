//! Logistic regression as a single linear unit
//!
//! Architecture: Input(d) → Linear(1) → sigmoid = P(home wins)

use burn::module::{Module, Param, ParamId};
use burn::nn::{Initializer, Linear, LinearConfig};
use burn::record::{FullPrecisionSettings, Recorder};
use burn::tensor::activation::sigmoid;
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use std::path::Path;

use crate::{Result, StatsError};

#[derive(Module, Debug)]
pub struct BaselineModel<B: Backend> {
    linear: Linear<B>,
}

impl<B: Backend> BaselineModel<B> {
    /// New model with all weights and the intercept at zero
    pub fn new(device: &B::Device, n_features: usize) -> Self {
        BaselineModel {
            linear: LinearConfig::new(n_features, 1)
                .with_initializer(Initializer::Zeros)
                .init(device),
        }
    }

    /// Logits [batch, 1]
    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        self.linear.forward(x)
    }

    /// P(label = 1) [batch, 1]
    pub fn predict_proba(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        sigmoid(self.forward(x))
    }

    /// Squared L2 norm of the weights; the intercept is not included
    pub fn weight_norm_sq(&self) -> Tensor<B, 1> {
        let w = self.linear.weight.val();
        (w.clone() * w).sum()
    }

    /// Probabilities for plain rows
    pub fn probabilities(&self, rows: &[Vec<f32>], device: &B::Device) -> Result<Vec<f32>> {
        let probs = self.predict_proba(to_tensor::<B>(rows, device));
        let data = probs.into_data();
        let slice: &[f32] = data
            .as_slice()
            .map_err(|e| StatsError::Model(format!("{:?}", e)))?;
        Ok(slice.to_vec())
    }

    /// Same weights under fixed parameter ids, so saved records are reproducible
    fn with_fixed_param_ids(&self) -> Self {
        let mut linear = self.linear.clone();
        linear.weight = Param::initialized(ParamId::from(0), linear.weight.val());
        linear.bias = linear
            .bias
            .map(|bias| Param::initialized(ParamId::from(1), bias.val()));
        BaselineModel { linear }
    }

    /// Save weights to `{path}.mpk`
    pub fn save(&self, path: &Path) -> Result<()>
    where
        B::FloatElem: serde::Serialize + serde::de::DeserializeOwned,
        B::IntElem: serde::Serialize + serde::de::DeserializeOwned,
    {
        let recorder = burn::record::NamedMpkFileRecorder::<FullPrecisionSettings>::new();
        recorder
            .record(self.with_fixed_param_ids().into_record(), path.to_path_buf())
            .map_err(|e| StatsError::Model(format!("Failed to save {}: {}", path.display(), e)))
    }

    /// Load weights saved by [`BaselineModel::save`]
    pub fn load(device: &B::Device, path: &Path, n_features: usize) -> Result<Self>
    where
        B::FloatElem: serde::Serialize + serde::de::DeserializeOwned,
        B::IntElem: serde::Serialize + serde::de::DeserializeOwned,
    {
        let recorder = burn::record::NamedMpkFileRecorder::<FullPrecisionSettings>::new();
        let record = recorder
            .load(path.to_path_buf(), device)
            .map_err(|e| StatsError::Model(format!("Failed to load {}: {}", path.display(), e)))?;

        Ok(Self::new(device, n_features).load_record(record))
    }
}

/// Stack rows into a [n, d] tensor
pub fn to_tensor<B: Backend>(rows: &[Vec<f32>], device: &B::Device) -> Tensor<B, 2> {
    let n = rows.len();
    let d = rows.first().map(|r| r.len()).unwrap_or(0);
    let flat: Vec<f32> = rows.iter().flatten().copied().collect();
    Tensor::<B, 1>::from_floats(flat.as_slice(), device).reshape([n, d])
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::tensor::ElementConversion;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_zero_init_predicts_half() {
        let device = Default::default();
        let model = BaselineModel::<TestBackend>::new(&device, 3);
        let probs = model
            .probabilities(&[vec![1.0, -2.0, 3.0], vec![0.0, 0.0, 0.0]], &device)
            .unwrap();
        assert_eq!(probs, vec![0.5, 0.5]);

        let norm: f32 = model.weight_norm_sq().into_scalar().elem();
        assert_eq!(norm, 0.0);
    }

    #[test]
    fn test_save_is_reproducible() {
        let dir = tempfile::tempdir().unwrap();
        let device = Default::default();
        let first = dir.path().join("first");
        let second = dir.path().join("second");

        // separately built models carry different random parameter ids
        BaselineModel::<TestBackend>::new(&device, 4).save(&first).unwrap();
        BaselineModel::<TestBackend>::new(&device, 4).save(&second).unwrap();

        let a = std::fs::read(first.with_extension("mpk")).unwrap();
        let b = std::fs::read(second.with_extension("mpk")).unwrap();
        assert_eq!(a, b);

        let loaded = BaselineModel::<TestBackend>::load(&device, &first, 4).unwrap();
        let probs = loaded.probabilities(&[vec![1.0, 2.0, 3.0, 4.0]], &device).unwrap();
        assert_eq!(probs, vec![0.5]);
    }

    #[test]
    fn test_to_tensor_shape() {
        let device = Default::default();
        let x = to_tensor::<TestBackend>(&[vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]], &device);
        assert_eq!(x.dims(), [3, 2]);
    }
}
