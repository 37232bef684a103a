//! End-to-end training pipelines
//!
//! Each pipeline reads the raw CSVs named in the config, fits and persists
//! its preprocessing state, trains a model and saves it next to that state.

use burn::module::AutodiffModule;
use burn::tensor::backend::AutodiffBackend;

use crate::data::{loader, GameDataset, RawData, TeamInfo};
use crate::features::normalize::StdKind;
use crate::features::points::{self, build_points_rows};
use crate::features::{
    AssemblyReport, DatasetAssembler, FeatureEngineer, FeatureName, LabelEncoder,
    NormalizationStats, TrainingRow,
};
use crate::model::{FeedForward, FeedForwardConfig, Model};
use crate::training::metrics::TrainingHistory;
use crate::training::trainer::{predict_dataset, Objective, Trainer};
use crate::{Config, GameRecord, NbaError, Result};

/// Fraction of points rows held out for the R² report
const POINTS_TEST_FRACTION: f64 = 0.2;

/// Outcome of training the win-probability model
#[derive(Debug, Clone)]
pub struct TrainReport {
    pub assembly: AssemblyReport,
    pub train_samples: usize,
    pub val_samples: usize,
    pub history: TrainingHistory,
}

/// Outcome of training the points regressor
#[derive(Debug, Clone)]
pub struct PointsReport {
    pub rows: usize,
    pub train_samples: usize,
    pub test_samples: usize,
    pub history: TrainingHistory,
    pub r_squared: f64,
}

/// Rolling-average rows for every eligible game
pub fn build_training_rows(config: &Config, raw: &RawData) -> (Vec<TrainingRow>, AssemblyReport) {
    let engineer = FeatureEngineer::new(&config.features);
    let histories = engineer.team_histories(&raw.games, &raw.details);
    DatasetAssembler::new().assemble(&raw.games, engineer.scan(&histories))
}

/// Train the win-probability classifier from the configured CSVs
pub fn train_win_model<B: AutodiffBackend>(config: &Config, device: B::Device) -> Result<TrainReport> {
    let raw = RawData::load(&config.data)?;
    train_win_model_from::<B>(config, &raw, device)
}

/// Train the win-probability classifier on already-loaded data
pub fn train_win_model_from<B: AutodiffBackend>(
    config: &Config,
    raw: &RawData,
    device: B::Device,
) -> Result<TrainReport> {
    config.validate()?;
    let names = &config.features.names;
    let features = FeatureName::parse_all(names)?;

    let (rows, assembly) = build_training_rows(config, raw);
    if rows.is_empty() {
        return Err(NbaError::EmptyDataset(
            "no game has rolling history for both teams".to_string(),
        ));
    }

    let matrix: Vec<Vec<f64>> = rows.iter().map(|r| r.select(&features)).collect();
    let stats = NormalizationStats::fit(names, &matrix)?;
    stats.save(&config.data.norm_path)?;

    let normalized = stats.normalize_rows(names, &matrix)?;
    let targets = rows.iter().map(TrainingRow::label).collect();
    let (train, val) =
        GameDataset::new(normalized, targets).split_tail(config.training.validation_split);
    let (train_samples, val_samples) = (train.samples().len(), val.samples().len());

    let model = FeedForward::<B>::new(&device, &FeedForwardConfig::from_config(config, names.len()));
    let trainer = Trainer::<B>::new(config.training.clone(), Objective::BinaryCrossEntropy, device);
    let (model, history) = trainer.train(model, train, val)?;

    Model::save(&model, &config.data.model_path)?;
    log::info!("Model saved to '{}'", config.data.model_path);

    Ok(TrainReport {
        assembly,
        train_samples,
        val_samples,
        history,
    })
}

/// Train the points regressor from games.csv and teams.csv
pub fn train_points_model<B: AutodiffBackend>(
    config: &Config,
    device: B::Device,
) -> Result<PointsReport> {
    let games = loader::load_games(&config.data.games_path)?;
    let teams = loader::load_teams(&config.data.teams_path)?;
    train_points_model_from::<B>(config, &games, &teams, device)
}

/// Train the points regressor on already-loaded games and teams
pub fn train_points_model_from<B: AutodiffBackend>(
    config: &Config,
    games: &[GameRecord],
    teams: &[TeamInfo],
    device: B::Device,
) -> Result<PointsReport> {
    config.validate()?;
    let rows = build_points_rows(games, teams);
    if rows.is_empty() {
        return Err(NbaError::EmptyDataset(
            "no game has point totals for known teams".to_string(),
        ));
    }
    log::info!("Built {} team-game rows for points training", rows.len());

    let team_encoder = LabelEncoder::fit(rows.iter().map(|r| r.team.as_str()));
    let opponent_encoder = LabelEncoder::fit(rows.iter().map(|r| r.opponent.as_str()));
    team_encoder.save(&config.data.team_encoder_path)?;
    opponent_encoder.save(&config.data.opponent_encoder_path)?;

    let matrix = rows
        .iter()
        .map(|r| r.encode(&team_encoder, &opponent_encoder))
        .collect::<Result<Vec<_>>>()?;
    let names = points::feature_names();
    let scaler = NormalizationStats::fit_with(&names, &matrix, StdKind::Population)?;
    scaler.save(&config.data.points_norm_path)?;

    let normalized = scaler.normalize_rows(&names, &matrix)?;
    let targets = rows.iter().map(|r| r.points as f32).collect();
    let (train, test) = GameDataset::new(normalized, targets)
        .split_shuffled(POINTS_TEST_FRACTION, config.training.seed);
    let (train_samples, test_samples) = (train.samples().len(), test.samples().len());

    let model =
        FeedForward::<B>::new(&device, &FeedForwardConfig::from_config(config, names.len()));
    let trainer =
        Trainer::<B>::new(config.training.clone(), Objective::MeanSquaredError, device.clone());
    let (model, history) = trainer.train(model, train, GameDataset::default())?;

    let predicted = predict_dataset(&model.valid(), &test, Objective::MeanSquaredError, &device)?;
    let predicted: Vec<f64> = predicted.into_iter().map(f64::from).collect();
    let actual: Vec<f64> = test.samples().iter().map(|s| s.target as f64).collect();
    let r_squared = points::r_squared(&predicted, &actual);
    log::info!("Points model test R²: {:.4}", r_squared);

    Model::save(&model, &config.data.points_model_path)?;
    log::info!("Points model saved to '{}'", config.data.points_model_path);

    Ok(PointsReport {
        rows: rows.len(),
        train_samples,
        test_samples,
        history,
        r_squared,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::PlayerLine;
    use crate::{BoxScore, GameId, TeamId};
    use burn::backend::{Autodiff, NdArray};
    use chrono::NaiveDate;

    type TestAutodiffBackend = Autodiff<NdArray<f32>>;

    fn temp_config(tag: &str) -> Config {
        let dir = std::env::temp_dir().join(format!("nba_pipeline_{}_{}", tag, std::process::id()));
        let path = |name: &str| dir.join(name).display().to_string();

        let mut config = Config::default();
        config.training.epochs = 2;
        config.training.batch_size = 4;
        config.model.hidden_dims = vec![8];
        config.data.model_path = path("model");
        config.data.norm_path = path("stats.json");
        config.data.points_model_path = path("points_model");
        config.data.points_norm_path = path("points_scaler.json");
        config.data.team_encoder_path = path("team_encoder.json");
        config.data.opponent_encoder_path = path("opponent_encoder.json");
        config
    }

    fn box_score(pts: f64) -> BoxScore {
        BoxScore {
            pts: Some(pts),
            fg_pct: Some(0.45),
            ft_pct: Some(0.75),
            fg3_pct: Some(0.35),
            ast: Some(24.0),
            reb: Some(44.0),
        }
    }

    /// Three teams playing a round robin on consecutive days
    fn season(games: i64) -> RawData {
        let mut records = Vec::new();
        let mut details = Vec::new();
        let start = NaiveDate::from_ymd_opt(2022, 10, 18).unwrap();

        for i in 0..games {
            let (home, away) = match i % 3 {
                0 => (1, 2),
                1 => (2, 3),
                _ => (3, 1),
            };
            let home_pts = 100.0 + (i % 7) as f64;
            let away_pts = 98.0 + (i % 5) as f64;
            records.push(GameRecord {
                game_id: GameId(i),
                date: start + chrono::Duration::days(i),
                season: Some(2022),
                home_team: TeamId(home),
                away_team: TeamId(away),
                home_team_wins: Some(home_pts > away_pts),
                home: box_score(home_pts),
                away: box_score(away_pts),
            });
            for (team, pts) in [(home, home_pts), (away, away_pts)] {
                details.push(PlayerLine {
                    game_id: i,
                    team_id: team,
                    pts: Some(pts),
                    fg_pct: Some(0.4 + (i % 3) as f64 * 0.02),
                    ft_pct: Some(0.8),
                    fg3_pct: Some(0.3 + (i % 4) as f64 * 0.01),
                    ast: Some(20.0 + (i % 6) as f64),
                    reb: Some(40.0 + (i % 5) as f64),
                });
            }
        }

        RawData {
            games: records,
            details,
        }
    }

    #[test]
    fn test_training_rows_skip_first_games() {
        let config = temp_config("rows");
        let (rows, report) = build_training_rows(&config, &season(12));
        assert_eq!(report.games, 12);
        // Games 0 and 1 each include a team's debut
        assert_eq!(rows.len(), 10);
        assert!(rows.iter().all(|r| r.game_id.0 >= 2));
    }

    #[test]
    fn test_train_win_model_persists_artifacts() {
        let config = temp_config("win");
        let report =
            train_win_model_from::<TestAutodiffBackend>(&config, &season(30), Default::default())
                .unwrap();

        assert_eq!(report.train_samples + report.val_samples, report.assembly.rows);
        // 28 rows: floor(28 * 0.8) = 22 train, 6 validation
        assert_eq!(report.assembly.rows, 28);
        assert_eq!(report.train_samples, 22);
        assert_eq!(report.val_samples, 6);
        assert_eq!(report.history.epochs(), 2);
        assert!(crate::model::artifact_exists(&config.data.model_path));

        let stats = NormalizationStats::load(&config.data.norm_path).unwrap();
        assert_eq!(stats.mean.len(), 12);

        let _ = std::fs::remove_dir_all(
            std::path::Path::new(&config.data.model_path).parent().unwrap(),
        );
    }

    #[test]
    fn test_invalid_dropout_is_a_config_error() {
        let mut config = temp_config("dropout");
        config.training.dropout = 1.5;
        let result =
            train_win_model_from::<TestAutodiffBackend>(&config, &season(12), Default::default());
        assert!(matches!(result, Err(NbaError::Config(_))));
    }

    #[test]
    fn test_empty_history_is_an_error() {
        let config = temp_config("empty");
        let result =
            train_win_model_from::<TestAutodiffBackend>(&config, &season(1), Default::default());
        assert!(matches!(result, Err(NbaError::EmptyDataset(_))));
    }

    #[test]
    fn test_train_points_model() {
        let config = temp_config("points");
        let teams: Vec<TeamInfo> = [(1, "Hawks"), (2, "Celtics"), (3, "Nets")]
            .iter()
            .map(|(id, name)| TeamInfo {
                team_id: *id,
                abbreviation: String::new(),
                nickname: name.to_string(),
                city: String::new(),
            })
            .collect();
        let raw = season(20);

        let report =
            train_points_model_from::<TestAutodiffBackend>(&config, &raw.games, &teams, Default::default())
                .unwrap();
        assert_eq!(report.rows, 40);
        assert_eq!(report.test_samples, 8);
        assert_eq!(report.train_samples, 32);
        assert!(report.r_squared.is_finite());

        let encoder = LabelEncoder::load(&config.data.team_encoder_path).unwrap();
        assert_eq!(encoder.classes(), ["Celtics", "Hawks", "Nets"]);
        assert!(crate::model::artifact_exists(&config.data.points_model_path));

        let _ = std::fs::remove_dir_all(
            std::path::Path::new(&config.data.points_model_path).parent().unwrap(),
        );
    }
}
