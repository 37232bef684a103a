//! Neural network models
//!
//! The pipelines and predictors only rely on the [`Model`] capability, so
//! another architecture can be dropped in without touching them.

pub mod feedforward;

pub use feedforward::{FeedForward, FeedForwardConfig};

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

use crate::Result;

/// A trainable model that can be persisted and restored
pub trait Model<B: Backend>: Sized {
    type Config;

    /// Raw model output [batch, 1]
    fn forward(&self, features: Tensor<B, 2>) -> Tensor<B, 2>;

    /// Save weights under `path` (the recorder appends `.mpk`)
    fn save(&self, path: &str) -> Result<()>;

    /// Restore a model saved with [`Model::save`]; fails with
    /// `ModelNotFound` when there is no artifact at `path`
    fn load(device: &B::Device, path: &str, config: &Self::Config) -> Result<Self>;
}

/// File written by the recorder for a model path
pub fn artifact_path(model_path: &str) -> String {
    format!("{}.mpk", model_path)
}

pub fn artifact_exists(model_path: &str) -> bool {
    std::path::Path::new(&artifact_path(model_path)).exists()
}
