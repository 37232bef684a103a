//! Model training
//!
//! Training loop, loss functions, metrics tracking and the end-to-end
//! pipelines that produce the persisted artifacts.

pub mod metrics;
pub mod pipeline;
pub mod trainer;

pub use metrics::{Metrics, TrainingHistory};
pub use pipeline::{
    train_points_model, train_win_model, PointsReport, TrainReport,
};
pub use trainer::{Objective, Trainer};
