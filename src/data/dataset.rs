//! Burn Dataset implementation for normalized game samples

use burn::data::dataloader::batcher::Batcher;
use burn::data::dataset::Dataset;
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// A single normalized model input with its target
#[derive(Debug, Clone, PartialEq)]
pub struct GameSample {
    pub features: Vec<f32>,
    /// 0/1 home win for the classifier, points for the regressor
    pub target: f32,
}

/// In-memory dataset of game samples
#[derive(Debug, Clone, Default)]
pub struct GameDataset {
    samples: Vec<GameSample>,
}

impl GameDataset {
    /// Build from normalized feature rows and targets
    pub fn new(features: Vec<Vec<f32>>, targets: Vec<f32>) -> Self {
        let samples = features
            .into_iter()
            .zip(targets)
            .map(|(features, target)| GameSample { features, target })
            .collect();
        GameDataset { samples }
    }

    pub fn from_samples(samples: Vec<GameSample>) -> Self {
        GameDataset { samples }
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[GameSample] {
        &self.samples
    }

    /// Hold out the last `fraction` of samples, keeping order. The training
    /// part keeps `floor(n * (1 - fraction))` rows, the rest is validation.
    pub fn split_tail(self, fraction: f64) -> (GameDataset, GameDataset) {
        let n = self.samples.len();
        let n_train = (((n as f64) * (1.0 - fraction)).floor() as usize).min(n);
        let mut train = self.samples;
        let val = train.split_off(n_train);
        (
            GameDataset::from_samples(train),
            GameDataset::from_samples(val),
        )
    }

    /// Shuffle with a fixed seed, then hold out `fraction` for testing
    pub fn split_shuffled(self, fraction: f64, seed: u64) -> (GameDataset, GameDataset) {
        let mut samples = self.samples;
        let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
        samples.shuffle(&mut rng);

        let n_test = ((samples.len() as f64) * fraction).ceil() as usize;
        let test = samples.split_off(samples.len() - n_test.min(samples.len()));
        (
            GameDataset::from_samples(samples),
            GameDataset::from_samples(test),
        )
    }
}

impl Dataset<GameSample> for GameDataset {
    fn get(&self, index: usize) -> Option<GameSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

/// Batch of game samples
#[derive(Debug, Clone)]
pub struct GameBatch<B: Backend> {
    /// Normalized features: [batch, dim]
    pub features: Tensor<B, 2>,
    /// Targets: [batch]
    pub targets: Tensor<B, 1>,
}

/// Batcher for creating training batches
#[derive(Debug, Clone, Default)]
pub struct GameBatcher;

impl<B: Backend> Batcher<B, GameSample, GameBatch<B>> for GameBatcher {
    fn batch(&self, items: Vec<GameSample>, device: &B::Device) -> GameBatch<B> {
        samples_to_batch(&items, device)
    }
}

/// Stack samples into tensors on `device`
pub fn samples_to_batch<B: Backend>(items: &[GameSample], device: &B::Device) -> GameBatch<B> {
    let batch_size = items.len();
    let dim = items.first().map(|s| s.features.len()).unwrap_or(0);

    let mut feature_data = Vec::with_capacity(batch_size * dim);
    let mut target_data = Vec::with_capacity(batch_size);
    for sample in items {
        feature_data.extend_from_slice(&sample.features);
        target_data.push(sample.target);
    }

    let features =
        Tensor::<B, 1>::from_floats(feature_data.as_slice(), device).reshape([batch_size, dim]);
    let targets = Tensor::<B, 1>::from_floats(target_data.as_slice(), device);

    GameBatch { features, targets }
}
