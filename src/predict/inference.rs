//! Model inference for predictions

use std::collections::HashMap;
use std::marker::PhantomData;

use burn::tensor::activation::sigmoid;
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

use crate::features::points;
use crate::features::{LabelEncoder, NormalizationStats};
use crate::model::{FeedForward, FeedForwardConfig, Model};
use crate::{Config, NbaError, Result, Side};

/// Win probability for the home team
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GamePrediction {
    pub home_win_prob: f32,
}

impl GamePrediction {
    pub fn away_win_prob(&self) -> f32 {
        1.0 - self.home_win_prob
    }

    /// Home wins only when strictly more likely than not
    pub fn winner(&self) -> Side {
        if self.home_win_prob > 0.5 {
            Side::Home
        } else {
            Side::Away
        }
    }
}

/// Human-readable summary of a prediction
pub fn format_prediction(prediction: &GamePrediction) -> String {
    format!(
        "Home team win probability: {:.2}%\nAway team win probability: {:.2}%\nPredicted winner: {}",
        prediction.home_win_prob * 100.0,
        prediction.away_win_prob() * 100.0,
        prediction.winner()
    )
}

fn single_output<B: Backend>(output: Tensor<B, 2>) -> Result<f32> {
    output
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| NbaError::Model(format!("Failed to read model output: {:?}", e)))?
        .first()
        .copied()
        .ok_or_else(|| NbaError::Model("Model returned no output".to_string()))
}

/// Predictor for home-win probabilities
pub struct Predictor<B: Backend, M: Model<B> = FeedForward<B>> {
    model: M,
    stats: NormalizationStats,
    features: Vec<String>,
    device: B::Device,
    _backend: PhantomData<B>,
}

impl<B: Backend> Predictor<B, FeedForward<B>> {
    /// Load the persisted model and normalization stats named in `config`
    pub fn load(config: &Config, device: B::Device) -> Result<Self> {
        config.validate()?;
        let model_config = FeedForwardConfig::from_config(config, config.features.names.len());
        Self::load_with(config, &model_config, device)
    }
}

impl<B: Backend, M: Model<B>> Predictor<B, M> {
    pub fn new(
        model: M,
        stats: NormalizationStats,
        features: Vec<String>,
        device: B::Device,
    ) -> Self {
        Predictor {
            model,
            stats,
            features,
            device,
            _backend: PhantomData,
        }
    }

    /// Load any [`Model`]; a missing model is reported before missing stats
    pub fn load_with(config: &Config, model_config: &M::Config, device: B::Device) -> Result<Self> {
        let model = M::load(&device, &config.data.model_path, model_config)?;
        let stats = NormalizationStats::load(&config.data.norm_path)?;
        log::debug!("Loaded model from '{}'", config.data.model_path);
        Ok(Self::new(model, stats, config.features.names.clone(), device))
    }

    pub fn features(&self) -> &[String] {
        &self.features
    }

    /// Predict from a record holding every configured feature
    pub fn predict(&self, record: &HashMap<String, f64>) -> Result<GamePrediction> {
        let normalized = self.stats.normalize_record(&self.features, record)?;
        let input = Tensor::<B, 1>::from_floats(normalized.as_slice(), &self.device)
            .reshape([1, self.features.len()]);

        let prob = single_output(sigmoid(self.model.forward(input)))?;
        Ok(GamePrediction {
            home_win_prob: prob.clamp(0.0, 1.0),
        })
    }
}

/// Predictor for points scored by one team against an opponent
pub struct PointsPredictor<B: Backend> {
    model: FeedForward<B>,
    scaler: NormalizationStats,
    teams: LabelEncoder,
    opponents: LabelEncoder,
    device: B::Device,
}

impl<B: Backend> PointsPredictor<B> {
    pub fn load(config: &Config, device: B::Device) -> Result<Self> {
        config.validate()?;
        let names = points::feature_names();
        let model_config = FeedForwardConfig::from_config(config, names.len());
        let model = <FeedForward<B> as Model<B>>::load(
            &device,
            &config.data.points_model_path,
            &model_config,
        )?;
        let scaler = NormalizationStats::load(&config.data.points_norm_path)?;
        let teams = LabelEncoder::load(&config.data.team_encoder_path)?;
        let opponents = LabelEncoder::load(&config.data.opponent_encoder_path)?;

        Ok(PointsPredictor {
            model,
            scaler,
            teams,
            opponents,
            device,
        })
    }

    /// Predict points; `stats` must hold FG_PCT, FT_PCT, FG3_PCT, AST and REB
    pub fn predict(&self, team: &str, opponent: &str, stats: &HashMap<String, f64>) -> Result<f32> {
        let mut record = stats.clone();
        record.insert("TEAM_ENC".to_string(), self.teams.transform(team)? as f64);
        record.insert(
            "OPPONENT_ENC".to_string(),
            self.opponents.transform(opponent)? as f64,
        );

        let names = points::feature_names();
        let normalized = self.scaler.normalize_record(&names, &record)?;
        let input = Tensor::<B, 1>::from_floats(normalized.as_slice(), &self.device)
            .reshape([1, names.len()]);

        single_output(Model::forward(&self.model, input))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use std::collections::BTreeMap;

    type TestBackend = NdArray<f32>;

    fn temp_config(tag: &str) -> Config {
        let dir = std::env::temp_dir().join(format!("nba_predict_{}_{}", tag, std::process::id()));
        let mut config = Config::default();
        config.model.hidden_dims = vec![16, 8];
        config.data.model_path = dir.join("model").display().to_string();
        config.data.norm_path = dir.join("stats.json").display().to_string();
        config
    }

    fn unit_stats(names: &[String]) -> NormalizationStats {
        NormalizationStats {
            mean: names.iter().map(|n| (n.clone(), 0.0)).collect::<BTreeMap<_, _>>(),
            std: names.iter().map(|n| (n.clone(), 1.0)).collect::<BTreeMap<_, _>>(),
        }
    }

    fn sample_record(names: &[String]) -> HashMap<String, f64> {
        names.iter().map(|n| (n.clone(), 0.5)).collect()
    }

    fn write_artifacts(config: &Config) {
        let device = Default::default();
        let model_config = FeedForwardConfig::from_config(config, config.features.names.len());
        let model = FeedForward::<TestBackend>::new(&device, &model_config);
        Model::save(&model, &config.data.model_path).unwrap();
        unit_stats(&config.features.names)
            .save(&config.data.norm_path)
            .unwrap();
    }

    fn cleanup(config: &Config) {
        let _ = std::fs::remove_dir_all(
            std::path::Path::new(&config.data.model_path).parent().unwrap(),
        );
    }

    #[test]
    fn test_winner_threshold() {
        assert_eq!(GamePrediction { home_win_prob: 0.51 }.winner(), Side::Home);
        assert_eq!(GamePrediction { home_win_prob: 0.5 }.winner(), Side::Away);
        assert_eq!(GamePrediction { home_win_prob: 0.2 }.winner(), Side::Away);
    }

    #[test]
    fn test_format_prediction() {
        let text = format_prediction(&GamePrediction { home_win_prob: 0.75 });
        assert!(text.contains("75.00%"));
        assert!(text.contains("25.00%"));
        assert!(text.ends_with("Predicted winner: Home Team"));
    }

    #[test]
    fn test_load_without_model() {
        let config = temp_config("no_model");
        let result = Predictor::<TestBackend>::load(&config, Default::default());
        match result {
            Err(e @ NbaError::ModelNotFound { .. }) => {
                assert!(e.is_recoverable());
                assert!(e.hint().unwrap().contains("train"));
            }
            _ => panic!("expected ModelNotFound"),
        }
    }

    #[test]
    fn test_load_rejects_invalid_dropout() {
        let mut config = temp_config("bad_dropout");
        write_artifacts(&config);
        config.training.dropout = -0.5;

        let result = Predictor::<TestBackend>::load(&config, Default::default());
        assert!(matches!(result, Err(NbaError::Config(_))));
        cleanup(&config);
    }

    #[test]
    fn test_load_without_stats() {
        let config = temp_config("no_stats");
        write_artifacts(&config);
        std::fs::remove_file(&config.data.norm_path).unwrap();

        let result = Predictor::<TestBackend>::load(&config, Default::default());
        assert!(matches!(result, Err(NbaError::NotTrained { .. })));
        cleanup(&config);
    }

    #[test]
    fn test_predict_probability() {
        let config = temp_config("predict");
        write_artifacts(&config);

        let predictor = Predictor::<TestBackend>::load(&config, Default::default()).unwrap();
        let record = sample_record(&config.features.names);
        let first = predictor.predict(&record).unwrap();
        assert!((0.0..=1.0).contains(&first.home_win_prob));

        // Inference is deterministic
        let second = predictor.predict(&record).unwrap();
        assert_eq!(first, second);
        cleanup(&config);
    }

    #[test]
    fn test_predict_missing_feature() {
        let config = temp_config("missing");
        write_artifacts(&config);

        let predictor = Predictor::<TestBackend>::load(&config, Default::default()).unwrap();
        let mut record = sample_record(&config.features.names);
        record.remove("REB_avg_away");

        match predictor.predict(&record) {
            Err(NbaError::MissingFeature(name)) => assert_eq!(name, "REB_avg_away"),
            other => panic!("expected MissingFeature, got {:?}", other),
        }
        cleanup(&config);
    }

    #[test]
    fn test_points_predictor_unknown_team() {
        let dir = std::env::temp_dir().join(format!("nba_points_{}", std::process::id()));
        let mut config = Config::default();
        config.model.hidden_dims = vec![4];
        config.data.points_model_path = dir.join("points").display().to_string();
        config.data.points_norm_path = dir.join("scaler.json").display().to_string();
        config.data.team_encoder_path = dir.join("teams.json").display().to_string();
        config.data.opponent_encoder_path = dir.join("opponents.json").display().to_string();

        let device = Default::default();
        let names = points::feature_names();
        let model = FeedForward::<TestBackend>::new(
            &device,
            &FeedForwardConfig::from_config(&config, names.len()),
        );
        Model::save(&model, &config.data.points_model_path).unwrap();
        unit_stats(&names).save(&config.data.points_norm_path).unwrap();
        let encoder = LabelEncoder::fit(["Celtics", "Lakers"]);
        encoder.save(&config.data.team_encoder_path).unwrap();
        encoder.save(&config.data.opponent_encoder_path).unwrap();

        let predictor = PointsPredictor::<TestBackend>::load(&config, device).unwrap();
        let stats: HashMap<String, f64> = [
            ("FG_PCT", 0.47),
            ("FT_PCT", 0.78),
            ("FG3_PCT", 0.36),
            ("AST", 25.0),
            ("REB", 44.0),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), *v))
        .collect();

        assert!(predictor.predict("Lakers", "Celtics", &stats).unwrap().is_finite());
        assert!(matches!(
            predictor.predict("Bulls", "Celtics", &stats),
            Err(NbaError::UnknownTeam(_))
        ));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
