//! NBA game outcome prediction
//!
//! Rolling team-form features over historical box scores, a feed-forward
//! win-probability classifier, and a single-game prediction entry point.

pub mod data;
pub mod features;
pub mod model;
pub mod predict;
pub mod training;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// NBA game identifier (`GAME_ID`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GameId(pub i64);

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Game({})", self.0)
    }
}

/// NBA team identifier (`TEAM_ID`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TeamId(pub i64);

impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Team({})", self.0)
    }
}

/// Which side of a game a team played on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Home,
    Away,
}

impl Side {
    pub const ALL: [Side; 2] = [Side::Home, Side::Away];

    /// Suffix used in feature names (`PTS_avg_home`)
    pub fn suffix(&self) -> &'static str {
        match self {
            Side::Home => "home",
            Side::Away => "away",
        }
    }

    pub fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "home" => Some(Side::Home),
            "away" => Some(Side::Away),
            _ => None,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Home => write!(f, "Home Team"),
            Side::Away => write!(f, "Away Team"),
        }
    }
}

/// How player lines are combined into a team-game value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregation {
    Sum,
    Mean,
}

/// Box-score statistics tracked per team and game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Stat {
    Pts,
    FgPct,
    FtPct,
    Fg3Pct,
    Ast,
    Reb,
}

impl Stat {
    pub const COUNT: usize = 6;

    pub const ALL: [Stat; Stat::COUNT] = [
        Stat::Pts,
        Stat::FgPct,
        Stat::FtPct,
        Stat::Fg3Pct,
        Stat::Ast,
        Stat::Reb,
    ];

    /// Column name in the source CSVs
    pub fn column(&self) -> &'static str {
        match self {
            Stat::Pts => "PTS",
            Stat::FgPct => "FG_PCT",
            Stat::FtPct => "FT_PCT",
            Stat::Fg3Pct => "FG3_PCT",
            Stat::Ast => "AST",
            Stat::Reb => "REB",
        }
    }

    pub fn from_column(column: &str) -> Option<Self> {
        Stat::ALL.into_iter().find(|s| s.column() == column)
    }

    /// Counting stats are summed over players, percentages are averaged
    pub fn aggregation(&self) -> Aggregation {
        match self {
            Stat::Pts | Stat::Ast | Stat::Reb => Aggregation::Sum,
            Stat::FgPct | Stat::FtPct | Stat::Fg3Pct => Aggregation::Mean,
        }
    }

    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for Stat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// Team box score for one side of a game, as reported in `games.csv`
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BoxScore {
    pub pts: Option<f64>,
    pub fg_pct: Option<f64>,
    pub ft_pct: Option<f64>,
    pub fg3_pct: Option<f64>,
    pub ast: Option<f64>,
    pub reb: Option<f64>,
}

impl BoxScore {
    pub fn get(&self, stat: Stat) -> Option<f64> {
        match stat {
            Stat::Pts => self.pts,
            Stat::FgPct => self.fg_pct,
            Stat::FtPct => self.ft_pct,
            Stat::Fg3Pct => self.fg3_pct,
            Stat::Ast => self.ast,
            Stat::Reb => self.reb,
        }
    }
}

/// A single game from `games.csv`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    pub game_id: GameId,
    pub date: NaiveDate,
    pub season: Option<i32>,
    pub home_team: TeamId,
    pub away_team: TeamId,
    pub home_team_wins: Option<bool>,
    pub home: BoxScore,
    pub away: BoxScore,
}

impl GameRecord {
    /// Team that played on the given side
    pub fn team(&self, side: Side) -> TeamId {
        match side {
            Side::Home => self.home_team,
            Side::Away => self.away_team,
        }
    }

    pub fn box_score(&self, side: Side) -> &BoxScore {
        match side {
            Side::Home => &self.home,
            Side::Away => &self.away,
        }
    }
}

/// Application-wide errors
#[derive(Debug, Error)]
pub enum NbaError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("Model file not found at '{path}'")]
    ModelNotFound { path: String },

    #[error("Normalization stats not found at '{path}'")]
    NotTrained { path: String },

    #[error("Missing feature in game data: {0}")]
    MissingFeature(String),

    #[error("Unknown feature: {0}")]
    UnknownFeature(String),

    #[error("Unknown team: {0}")]
    UnknownTeam(String),

    #[error("Empty dataset: {0}")]
    EmptyDataset(String),
}

impl NbaError {
    /// Remediation hint shown next to the error message
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            NbaError::ModelNotFound { .. } | NbaError::NotTrained { .. } => {
                Some("Please train the model first by running 'nba train'")
            }
            NbaError::MissingFeature(_) => {
                Some("The input must provide every feature listed in [features].names")
            }
            NbaError::EmptyDataset(_) => Some("Check the CSV paths in the [data] section"),
            _ => None,
        }
    }

    /// Conditions reported to the user without failing the process
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            NbaError::ModelNotFound { .. } | NbaError::NotTrained { .. } | NbaError::MissingFeature(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, NbaError>;

/// Application configuration loaded from config.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub training: TrainingConfig,
    pub model: ModelConfig,
    pub features: FeatureConfig,
    pub data: DataConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub learning_rate: f64,
    pub epochs: usize,
    pub batch_size: usize,
    pub validation_split: f64,
    pub dropout: f64,
    pub seed: u64,
    /// Epochs without validation improvement before stopping, 0 disables
    pub early_stopping_patience: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub hidden_dims: Vec<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureConfig {
    /// Rolling window length in games
    pub window: usize,
    /// Model inputs, in column order
    pub names: Vec<String>,
    pub target: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    pub games_path: String,
    pub details_path: String,
    pub teams_path: String,
    pub ranking_path: String,
    pub model_path: String,
    pub norm_path: String,
    pub points_model_path: String,
    pub points_norm_path: String,
    pub team_encoder_path: String,
    pub opponent_encoder_path: String,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        let names = Side::ALL
            .iter()
            .flat_map(|side| {
                Stat::ALL
                    .iter()
                    .map(move |stat| features::FeatureName::new(*stat, *side).to_string())
            })
            .collect();

        FeatureConfig {
            window: 10,
            names,
            target: "HOME_TEAM_WINS".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            training: TrainingConfig {
                learning_rate: 0.001,
                epochs: 50,
                batch_size: 32,
                validation_split: 0.2,
                dropout: 0.3,
                seed: 42,
                early_stopping_patience: 0,
            },
            model: ModelConfig {
                hidden_dims: vec![128, 64, 32],
            },
            features: FeatureConfig::default(),
            data: DataConfig {
                games_path: "data/games.csv".to_string(),
                details_path: "data/games_details.csv".to_string(),
                teams_path: "data/teams.csv".to_string(),
                ranking_path: "data/ranking.csv".to_string(),
                model_path: "model/nba_prediction_model".to_string(),
                norm_path: "model/normalization_stats.json".to_string(),
                points_model_path: "model/nba_score_model".to_string(),
                points_norm_path: "model/score_scaler.json".to_string(),
                team_encoder_path: "model/team_encoder.json".to_string(),
                opponent_encoder_path: "model/opponent_encoder.json".to_string(),
            },
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            NbaError::Config(format!("Failed to read config file {}: {}", path, e))
        })?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| NbaError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| NbaError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.features.window == 0 {
            return Err(NbaError::Config("features.window must be at least 1".to_string()));
        }
        if self.features.names.is_empty() {
            return Err(NbaError::Config("features.names is empty".to_string()));
        }
        for name in &self.features.names {
            name.parse::<features::FeatureName>()?;
        }
        if self.features.target != "HOME_TEAM_WINS" {
            return Err(NbaError::Config(format!(
                "Unsupported target '{}', only HOME_TEAM_WINS is available",
                self.features.target
            )));
        }
        if !(0.0..1.0).contains(&self.training.validation_split) {
            return Err(NbaError::Config(
                "training.validation_split must be in [0, 1)".to_string(),
            ));
        }
        if self.training.batch_size == 0 || self.training.epochs == 0 {
            return Err(NbaError::Config(
                "training.batch_size and training.epochs must be positive".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&self.training.dropout) {
            return Err(NbaError::Config(
                "training.dropout must be in [0, 1)".to_string(),
            ));
        }
        if !(self.training.learning_rate.is_finite() && self.training.learning_rate > 0.0) {
            return Err(NbaError::Config(
                "training.learning_rate must be a positive number".to_string(),
            ));
        }
        if self.model.hidden_dims.contains(&0) {
            return Err(NbaError::Config(
                "model.hidden_dims must not contain 0".to_string(),
            ));
        }
        Ok(())
    }
}
