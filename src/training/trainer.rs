//! Training loop and loss computation

use burn::data::dataloader::DataLoaderBuilder;
use burn::data::dataset::Dataset;
use burn::module::AutodiffModule;
use burn::optim::adaptor::OptimizerAdaptor;
use burn::optim::{Adam, AdamConfig, GradientsParams, Optimizer};
use burn::tensor::activation::sigmoid;
use burn::tensor::backend::{AutodiffBackend, Backend};
use burn::tensor::{ElementConversion, Tensor};

use crate::data::dataset::{samples_to_batch, GameBatcher, GameDataset};
use crate::model::Model;
use crate::training::metrics::{Metrics, TrainingHistory};
use crate::{NbaError, Result, TrainingConfig};

/// What the single model output is trained to predict
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Objective {
    /// Output is a logit for P(home win)
    BinaryCrossEntropy,
    /// Output is a value (points)
    MeanSquaredError,
}

impl Objective {
    /// Mean loss over the batch
    pub fn loss<B: Backend>(&self, output: Tensor<B, 2>, targets: Tensor<B, 2>) -> Tensor<B, 1> {
        match self {
            Objective::BinaryCrossEntropy => binary_cross_entropy(sigmoid(output), targets),
            Objective::MeanSquaredError => (output - targets).powf_scalar(2.0).mean(),
        }
    }

    /// Map raw output to a prediction (probability or value)
    pub fn activate<B: Backend>(&self, output: Tensor<B, 2>) -> Tensor<B, 2> {
        match self {
            Objective::BinaryCrossEntropy => sigmoid(output),
            Objective::MeanSquaredError => output,
        }
    }
}

/// Binary cross-entropy on probabilities, clamped away from 0 and 1
pub fn binary_cross_entropy<B: Backend>(probs: Tensor<B, 2>, targets: Tensor<B, 2>) -> Tensor<B, 1> {
    let eps = 1e-7;
    let probs_clamped = probs.clamp(eps, 1.0 - eps);
    let loss = targets.clone().neg() * probs_clamped.clone().log()
        - (targets.neg() + 1.0) * (probs_clamped.neg() + 1.0).log();
    loss.mean()
}

pub(crate) fn tensor_values<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> Result<Vec<f32>> {
    tensor
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| NbaError::Model(format!("Failed to read tensor data: {:?}", e)))
}

/// Run a model over a whole dataset and return activated predictions
pub fn predict_dataset<B: Backend, M: Model<B>>(
    model: &M,
    dataset: &GameDataset,
    objective: Objective,
    device: &B::Device,
) -> Result<Vec<f32>> {
    if dataset.is_empty() {
        return Ok(Vec::new());
    }
    let batch = samples_to_batch::<B>(dataset.samples(), device);
    tensor_values(objective.activate(model.forward(batch.features)))
}

/// Trainer for any [`Model`] with an Adam optimizer
pub struct Trainer<B: AutodiffBackend> {
    config: TrainingConfig,
    objective: Objective,
    device: B::Device,
}

impl<B: AutodiffBackend> Trainer<B> {
    pub fn new(config: TrainingConfig, objective: Objective, device: B::Device) -> Self {
        Trainer {
            config,
            objective,
            device,
        }
    }

    /// Train the model, returning the model with the best validation loss
    /// and the history
    pub fn train<M>(
        &self,
        mut model: M,
        train_dataset: GameDataset,
        val_dataset: GameDataset,
    ) -> Result<(M, TrainingHistory)>
    where
        M: Model<B> + AutodiffModule<B> + Clone,
        M::InnerModule: Model<B::InnerBackend>,
    {
        if train_dataset.is_empty() {
            return Err(NbaError::EmptyDataset("no training samples".to_string()));
        }

        let epochs = self.config.epochs;
        let train_len = train_dataset.len();
        let batch_size = self.config.batch_size.min(train_len).max(1);

        let train_loader = DataLoaderBuilder::new(GameBatcher)
            .batch_size(batch_size)
            .shuffle(self.config.seed)
            .set_device(self.device.clone())
            .build(train_dataset);

        let mut optimizer: OptimizerAdaptor<Adam, M, B> = AdamConfig::new().init();
        let mut history = TrainingHistory::new();
        let has_validation = !val_dataset.is_empty();
        let mut best_model = model.clone();

        log::info!(
            "Starting training for {} epochs ({} train / {} validation samples, batch size {})",
            epochs,
            train_len,
            val_dataset.len(),
            batch_size
        );

        for epoch in 0..epochs {
            let mut train_metrics = Metrics::new(self.objective);

            for batch in train_loader.iter() {
                let targets = batch.targets.unsqueeze_dim::<2>(1);
                let output = model.forward(batch.features);
                let loss = self.objective.loss(output.clone(), targets.clone());

                // Read values before the backward pass consumes the graph
                let loss_val: f32 = loss.clone().into_scalar().elem();
                let predictions = tensor_values(self.objective.activate(output).detach())?;
                let target_vals = tensor_values(targets)?;

                let grads = loss.backward();
                let grads = GradientsParams::from_grads(grads, &model);
                model = optimizer.step(self.config.learning_rate, model, grads);

                train_metrics.update(loss_val, &predictions, &target_vals);
            }

            let val_metrics = if has_validation {
                Some(self.evaluate(&model.valid(), &val_dataset)?)
            } else {
                None
            };

            let improved = history.record_epoch(epoch, &train_metrics, val_metrics.as_ref());
            if improved && has_validation {
                best_model = model.clone();
            }

            match &val_metrics {
                Some(val) => log::info!(
                    "Epoch {}/{}: Train: {} | Val: {}",
                    epoch + 1,
                    epochs,
                    train_metrics,
                    val
                ),
                None => log::info!("Epoch {}/{}: Train: {}", epoch + 1, epochs, train_metrics),
            }

            if history.should_early_stop(self.config.early_stopping_patience) {
                log::info!(
                    "Early stopping at epoch {} (best was epoch {})",
                    epoch + 1,
                    history.best_epoch + 1
                );
                break;
            }
        }

        log::info!(
            "Training complete: best epoch {} (loss {:.4})",
            history.best_epoch + 1,
            history.best_loss
        );

        // Without a validation set the final weights are kept
        if has_validation {
            Ok((best_model, history))
        } else {
            Ok((model, history))
        }
    }

    /// Evaluate an inference module (dropout disabled) on a dataset
    pub fn evaluate<M>(&self, model: &M, dataset: &GameDataset) -> Result<Metrics>
    where
        M: Model<B::InnerBackend>,
    {
        let mut metrics = Metrics::new(self.objective);
        let batch = samples_to_batch::<B::InnerBackend>(dataset.samples(), &self.device);
        let targets = batch.targets.unsqueeze_dim::<2>(1);
        let output = model.forward(batch.features);

        let loss: f32 = self
            .objective
            .loss(output.clone(), targets.clone())
            .into_scalar()
            .elem();
        let predictions = tensor_values(self.objective.activate(output))?;
        let target_vals = tensor_values(targets)?;
        metrics.update(loss, &predictions, &target_vals);

        Ok(metrics)
    }
}
