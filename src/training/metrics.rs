//! Training metrics and evaluation

use std::fmt;

use super::trainer::Objective;

/// Metrics accumulated during training/evaluation
#[derive(Debug, Clone)]
pub struct Metrics {
    pub objective: Objective,
    /// Sum of per-batch mean losses
    pub total_loss: f64,
    /// Correct win calls (classifier only)
    pub correct: usize,
    /// Sum of absolute errors (regressor only)
    pub abs_error_sum: f64,
    pub total_predictions: usize,
    pub batch_count: usize,
}

impl Metrics {
    pub fn new(objective: Objective) -> Self {
        Metrics {
            objective,
            total_loss: 0.0,
            correct: 0,
            abs_error_sum: 0.0,
            total_predictions: 0,
            batch_count: 0,
        }
    }

    /// Update metrics with a batch result
    pub fn update(&mut self, loss: f32, predictions: &[f32], targets: &[f32]) {
        self.total_loss += loss as f64;
        self.batch_count += 1;
        self.total_predictions += predictions.len();

        for (p, t) in predictions.iter().zip(targets) {
            match self.objective {
                Objective::BinaryCrossEntropy => {
                    if (*p > 0.5) == (*t > 0.5) {
                        self.correct += 1;
                    }
                }
                Objective::MeanSquaredError => {
                    self.abs_error_sum += (p - t).abs() as f64;
                }
            }
        }
    }

    pub fn avg_loss(&self) -> f64 {
        if self.batch_count == 0 {
            0.0
        } else {
            self.total_loss / self.batch_count as f64
        }
    }

    pub fn accuracy(&self) -> f64 {
        if self.total_predictions == 0 {
            0.0
        } else {
            self.correct as f64 / self.total_predictions as f64
        }
    }

    pub fn mae(&self) -> f64 {
        if self.total_predictions == 0 {
            0.0
        } else {
            self.abs_error_sum / self.total_predictions as f64
        }
    }
}

impl fmt::Display for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.objective {
            Objective::BinaryCrossEntropy => write!(
                f,
                "Loss: {:.4} | Acc: {:.2}%",
                self.avg_loss(),
                self.accuracy() * 100.0
            ),
            Objective::MeanSquaredError => {
                write!(f, "Loss: {:.4} | MAE: {:.2}", self.avg_loss(), self.mae())
            }
        }
    }
}

/// Training history for tracking progress
#[derive(Debug, Clone, Default)]
pub struct TrainingHistory {
    pub train_losses: Vec<f64>,
    pub val_losses: Vec<f64>,
    pub train_accuracies: Vec<f64>,
    pub val_accuracies: Vec<f64>,
    /// Best monitored loss: validation loss, or training loss without a
    /// validation set
    pub best_loss: f64,
    pub best_epoch: usize,
}

impl TrainingHistory {
    pub fn new() -> Self {
        Self {
            best_loss: f64::INFINITY,
            ..Default::default()
        }
    }

    /// Loss used for model selection
    pub fn monitored(train: &Metrics, val: Option<&Metrics>) -> f64 {
        val.unwrap_or(train).avg_loss()
    }

    /// Record an epoch; returns true if it is the new best
    pub fn record_epoch(&mut self, epoch: usize, train: &Metrics, val: Option<&Metrics>) -> bool {
        self.train_losses.push(train.avg_loss());
        self.train_accuracies.push(train.accuracy());
        if let Some(val) = val {
            self.val_losses.push(val.avg_loss());
            self.val_accuracies.push(val.accuracy());
        }

        let monitored = Self::monitored(train, val);
        if monitored < self.best_loss {
            self.best_loss = monitored;
            self.best_epoch = epoch;
            true
        } else {
            false
        }
    }

    pub fn epochs(&self) -> usize {
        self.train_losses.len()
    }

    /// Check if we should early stop; patience 0 never stops
    pub fn should_early_stop(&self, patience: usize) -> bool {
        if patience == 0 || self.epochs() == 0 {
            return false;
        }
        let current_epoch = self.epochs() - 1;
        current_epoch - self.best_epoch >= patience
    }

    pub fn final_val_accuracy(&self) -> Option<f64> {
        self.val_accuracies.last().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(loss: f32) -> Metrics {
        let mut m = Metrics::new(Objective::BinaryCrossEntropy);
        m.update(loss, &[0.9, 0.2, 0.6], &[1.0, 0.0, 0.0]);
        m
    }

    #[test]
    fn test_accuracy_thresholds_at_half() {
        let m = metrics(0.5);
        assert_eq!(m.correct, 2);
        assert!((m.accuracy() - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_mae() {
        let mut m = Metrics::new(Objective::MeanSquaredError);
        m.update(4.0, &[100.0, 110.0], &[102.0, 106.0]);
        assert!((m.mae() - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_best_epoch_tracking() {
        let mut history = TrainingHistory::new();
        assert!(history.record_epoch(0, &metrics(1.0), Some(&metrics(0.8))));
        assert!(history.record_epoch(1, &metrics(0.9), Some(&metrics(0.6))));
        assert!(!history.record_epoch(2, &metrics(0.8), Some(&metrics(0.7))));
        assert_eq!(history.best_epoch, 1);
        assert!((history.best_loss - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_early_stopping() {
        let mut history = TrainingHistory::new();
        history.record_epoch(0, &metrics(1.0), Some(&metrics(0.5)));
        history.record_epoch(1, &metrics(1.0), Some(&metrics(0.7)));
        history.record_epoch(2, &metrics(1.0), Some(&metrics(0.7)));
        assert!(history.should_early_stop(2));
        assert!(!history.should_early_stop(3));
        assert!(!history.should_early_stop(0));
    }

    #[test]
    fn test_train_loss_monitored_without_validation() {
        let mut history = TrainingHistory::new();
        history.record_epoch(0, &metrics(0.4), None);
        assert!(history.val_losses.is_empty());
        assert!((history.best_loss - 0.4).abs() < 1e-6);
    }
}
