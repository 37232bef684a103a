//! Feed-forward network used by both pipelines
//!
//! Architecture: Input(n) → Hidden(128) → ReLU → Dropout
//!                        → Hidden(64)  → ReLU → Dropout
//!                        → Hidden(32)  → ReLU
//!                        → output(1)
//!
//! The classifier reads the output as a logit, the regressor as points.

use burn::module::Module;
use burn::nn::{Dropout, DropoutConfig, Linear, LinearConfig};
use burn::record::{FullPrecisionSettings, NamedMpkFileRecorder};
use burn::tensor::activation::relu;
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

use super::Model;
use crate::{NbaError, Result};

/// Configuration for the feed-forward model
#[derive(Debug, Clone, PartialEq)]
pub struct FeedForwardConfig {
    pub input_dim: usize,
    pub hidden_dims: Vec<usize>,
    pub dropout: f64,
}

impl FeedForwardConfig {
    pub fn new(input_dim: usize, hidden_dims: Vec<usize>, dropout: f64) -> Self {
        FeedForwardConfig {
            input_dim,
            hidden_dims,
            dropout,
        }
    }

    /// Build from the application config for a given input width
    pub fn from_config(config: &crate::Config, input_dim: usize) -> Self {
        Self::new(input_dim, config.model.hidden_dims.clone(), config.training.dropout)
    }
}

/// A single hidden layer block: Linear → ReLU → optional Dropout
#[derive(Module, Debug)]
pub struct HiddenBlock<B: Backend> {
    linear: Linear<B>,
    dropout: Option<Dropout>,
}

impl<B: Backend> HiddenBlock<B> {
    pub fn new(device: &B::Device, in_dim: usize, out_dim: usize, dropout: Option<f64>) -> Self {
        HiddenBlock {
            linear: LinearConfig::new(in_dim, out_dim).init(device),
            dropout: dropout.map(|p| DropoutConfig::new(p).init()),
        }
    }

    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = relu(self.linear.forward(x));
        match &self.dropout {
            Some(dropout) => dropout.forward(x),
            None => x,
        }
    }
}

/// Multi-layer perceptron with a single output unit
#[derive(Module, Debug)]
pub struct FeedForward<B: Backend> {
    hidden: Vec<HiddenBlock<B>>,
    output: Linear<B>,
}

impl<B: Backend> FeedForward<B> {
    pub fn new(device: &B::Device, config: &FeedForwardConfig) -> Self {
        let mut hidden = Vec::with_capacity(config.hidden_dims.len());
        let mut in_dim = config.input_dim;
        let last = config.hidden_dims.len().saturating_sub(1);

        for (i, &out_dim) in config.hidden_dims.iter().enumerate() {
            // No dropout right before the output layer
            let dropout = (i < last && config.dropout > 0.0).then_some(config.dropout);
            hidden.push(HiddenBlock::new(device, in_dim, out_dim, dropout));
            in_dim = out_dim;
        }

        FeedForward {
            hidden,
            output: LinearConfig::new(in_dim, 1).init(device),
        }
    }

    /// Raw output [batch, 1]
    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = self
            .hidden
            .iter()
            .fold(x, |acc, block| block.forward(acc));
        self.output.forward(x)
    }
}

impl<B: Backend> Model<B> for FeedForward<B> {
    type Config = FeedForwardConfig;

    fn forward(&self, features: Tensor<B, 2>) -> Tensor<B, 2> {
        FeedForward::forward(self, features)
    }

    fn save(&self, path: &str) -> Result<()> {
        if let Some(parent) = std::path::Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
        self.clone()
            .save_file(path, &recorder)
            .map_err(|e| NbaError::Model(format!("Failed to save model: {}", e)))
    }

    fn load(device: &B::Device, path: &str, config: &FeedForwardConfig) -> Result<Self> {
        if !super::artifact_exists(path) {
            return Err(NbaError::ModelNotFound {
                path: super::artifact_path(path),
            });
        }
        let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
        FeedForward::new(device, config)
            .load_file(path, &recorder, device)
            .map_err(|e| NbaError::Model(format!("Failed to load model: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    fn config() -> FeedForwardConfig {
        FeedForwardConfig::new(12, vec![128, 64, 32], 0.3)
    }

    #[test]
    fn test_output_shape() {
        let device = Default::default();
        let model = FeedForward::<TestBackend>::new(&device, &config());

        let x = Tensor::random([4, 12], burn::tensor::Distribution::Normal(0.0, 1.0), &device);
        assert_eq!(model.forward(x).dims(), [4, 1]);
    }

    #[test]
    fn test_dropout_placement() {
        let device = Default::default();
        let model = FeedForward::<TestBackend>::new(&device, &config());
        assert_eq!(model.hidden.len(), 3);
        assert!(model.hidden[0].dropout.is_some());
        assert!(model.hidden[1].dropout.is_some());
        assert!(model.hidden[2].dropout.is_none());
    }

    #[test]
    fn test_no_hidden_layers() {
        let device = Default::default();
        let model = FeedForward::<TestBackend>::new(&device, &FeedForwardConfig::new(3, vec![], 0.0));
        let x = Tensor::zeros([2, 3], &device);
        assert_eq!(model.forward(x).dims(), [2, 1]);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let device = Default::default();
        let model = FeedForward::<TestBackend>::new(&device, &config());
        let path = std::env::temp_dir()
            .join(format!("nba_ff_{}", std::process::id()))
            .display()
            .to_string();

        Model::save(&model, &path).unwrap();
        assert!(crate::model::artifact_exists(&path));

        let loaded = <FeedForward<TestBackend> as Model<TestBackend>>::load(&device, &path, &config()).unwrap();
        let x = Tensor::<TestBackend, 2>::ones([1, 12], &device);
        let a = model.forward(x.clone()).into_data().to_vec::<f32>().unwrap();
        let b = loaded.forward(x).into_data().to_vec::<f32>().unwrap();
        assert!((a[0] - b[0]).abs() < 1e-6);

        std::fs::remove_file(crate::model::artifact_path(&path)).unwrap();
    }

    #[test]
    fn test_load_missing_model() {
        let device = Default::default();
        let result = <FeedForward<TestBackend> as Model<TestBackend>>::load(
            &device,
            "no/such/nba_prediction_model",
            &config(),
        );
        assert!(matches!(result, Err(NbaError::ModelNotFound { .. })));
    }
}
