//! Prediction and inference
//!
//! Load trained models and their preprocessing state to score new games.

pub mod inference;

pub use inference::{format_prediction, GamePrediction, PointsPredictor, Predictor};
