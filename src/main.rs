//! NBA Game Prediction CLI
//!
//! Trains a feed-forward win-probability model on rolling team form and
//! scores single games from a JSON feature record.

use clap::{Parser, Subcommand};
use nba::{Config, Result};

#[derive(Parser)]
#[command(name = "nba")]
#[command(about = "NBA game outcome prediction from rolling team form", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Data management commands
    Data {
        #[command(subcommand)]
        action: DataCommands,
    },
    /// Train the win-probability model
    Train {
        /// Override number of epochs
        #[arg(long)]
        epochs: Option<usize>,
    },
    /// Train the points regressor
    TrainPoints {
        /// Override number of epochs
        #[arg(long)]
        epochs: Option<usize>,
    },
    /// Predict the winner of a game from its rolling-average features
    Predict {
        /// JSON file mapping feature names to values
        #[arg(long)]
        input: String,
        /// Output format
        #[arg(long, default_value = "table")]
        format: OutputFormat,
    },
    /// Predict points scored by a team against an opponent
    PredictPoints {
        /// Team nickname, e.g. "Lakers"
        #[arg(long)]
        team: String,
        /// Opponent nickname
        #[arg(long)]
        opponent: String,
        /// JSON file with FG_PCT, FT_PCT, FG3_PCT, AST and REB
        #[arg(long)]
        input: String,
    },
    /// Model management commands
    Model {
        #[command(subcommand)]
        action: ModelCommands,
    },
    /// Initialize a new project with default config
    Init,
}

#[derive(Subcommand)]
enum DataCommands {
    /// Show what the configured CSV files contain
    Status,
}

#[derive(Subcommand)]
enum ModelCommands {
    /// Show model information
    Info,
}

#[derive(Clone, Debug)]
enum OutputFormat {
    Table,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown format: {}. Use table or json.", s)),
        }
    }
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Load or create config
    let config = if std::path::Path::new(&cli.config).exists() {
        match Config::load(&cli.config) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading config: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        Config::default()
    };

    // Run command
    let result = match cli.command {
        Commands::Data { action } => match action {
            DataCommands::Status => commands::data_status(&config),
        },
        Commands::Train { epochs } => commands::train(&config, epochs),
        Commands::TrainPoints { epochs } => commands::train_points(&config, epochs),
        Commands::Predict { input, format } => commands::predict(&config, &input, format),
        Commands::PredictPoints {
            team,
            opponent,
            input,
        } => commands::predict_points(&config, &team, &opponent, &input),
        Commands::Model { action } => match action {
            ModelCommands::Info => commands::model_info(&config),
        },
        Commands::Init => commands::init(&cli.config),
    };

    if let Err(e) = result {
        if e.is_recoverable() {
            // Missing artifacts or inputs are reported, not treated as failures
            println!("{}", e);
            if let Some(hint) = e.hint() {
                println!("{}", hint);
            }
        } else {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

mod commands {
    use super::*;
    use std::collections::HashMap;

    use burn::backend::ndarray::NdArrayDevice;
    use burn::backend::{Autodiff, NdArray};
    use nba::data::loader;
    use nba::predict::{format_prediction, PointsPredictor, Predictor};
    use nba::NbaError;

    type InferenceBackend = NdArray<f32>;
    type TrainingBackend = Autodiff<InferenceBackend>;

    pub fn init(config_path: &str) -> Result<()> {
        let config = Config::default();
        config.save(config_path)?;
        println!("Created default config at {}", config_path);

        std::fs::create_dir_all("data")?;
        std::fs::create_dir_all("model")?;
        println!("Created data/ and model/ directories");

        println!("\nNext steps:");
        println!("  1. Copy games.csv, games_details.csv, teams.csv and ranking.csv into data/");
        println!("  2. Run 'nba train' to train the model");
        println!("  3. Run 'nba predict --input game.json' to make a prediction");

        Ok(())
    }

    fn load_if_present<T>(
        path: &str,
        load: impl FnOnce(&str) -> Result<Vec<T>>,
    ) -> Result<Option<Vec<T>>> {
        if std::path::Path::new(path).exists() {
            load(path).map(Some)
        } else {
            Ok(None)
        }
    }

    fn row_count<T>(rows: &Option<Vec<T>>) -> String {
        match rows {
            Some(rows) => format!("{} rows", rows.len()),
            None => "not found".to_string(),
        }
    }

    pub fn data_status(config: &Config) -> Result<()> {
        let data = &config.data;
        let games = load_if_present(&data.games_path, |p| loader::load_games(p))?;
        let details = load_if_present(&data.details_path, |p| loader::load_player_lines(p))?;
        let teams = load_if_present(&data.teams_path, |p| loader::load_teams(p))?;
        let rankings = load_if_present(&data.ranking_path, |p| loader::load_rankings(p))?;

        println!("Data Status");
        println!("───────────────────────────────");
        println!("  Games:    {} ({})", row_count(&games), data.games_path);
        println!("  Details:  {} ({})", row_count(&details), data.details_path);
        println!("  Teams:    {} ({})", row_count(&teams), data.teams_path);
        println!("  Rankings: {} ({})", row_count(&rankings), data.ranking_path);

        if let Some(games) = &games {
            let earliest = games.iter().map(|g| g.date).min();
            let latest = games.iter().map(|g| g.date).max();
            if let (Some(earliest), Some(latest)) = (earliest, latest) {
                println!("  Range:    {} to {}", earliest, latest);
            }
            let seasons: std::collections::BTreeSet<i32> =
                games.iter().filter_map(|g| g.season).collect();
            if let (Some(first), Some(last)) = (seasons.first(), seasons.last()) {
                println!("  Seasons:  {} ({} to {})", seasons.len(), first, last);
            }
        }

        Ok(())
    }

    pub fn train(config: &Config, epochs: Option<usize>) -> Result<()> {
        let mut config = config.clone();
        if let Some(e) = epochs {
            config.training.epochs = e;
        }

        println!("Training win-probability model");
        println!("  Window:        {} games", config.features.window);
        println!("  Features:      {}", config.features.names.len());
        println!("  Hidden layers: {:?}", config.model.hidden_dims);
        println!("  Epochs:        {}", config.training.epochs);
        println!("  Learning rate: {}", config.training.learning_rate);
        println!();

        let report =
            nba::training::train_win_model::<TrainingBackend>(&config, NdArrayDevice::default())?;

        println!("\nTraining complete!");
        println!(
            "  Samples:       {} ({} train / {} validation)",
            report.assembly.rows, report.train_samples, report.val_samples
        );
        println!(
            "  Dropped games: {} without history, {} incomplete",
            report.assembly.missing_side, report.assembly.incomplete
        );
        println!(
            "  Best epoch:    {} (loss {:.4})",
            report.history.best_epoch + 1,
            report.history.best_loss
        );
        if let Some(acc) = report.history.final_val_accuracy() {
            println!("  Val accuracy:  {:.2}%", acc * 100.0);
        }
        println!("  Model saved:   {}", config.data.model_path);
        println!("  Stats saved:   {}", config.data.norm_path);

        Ok(())
    }

    pub fn train_points(config: &Config, epochs: Option<usize>) -> Result<()> {
        let mut config = config.clone();
        if let Some(e) = epochs {
            config.training.epochs = e;
        }

        println!("Training points regressor ({} epochs)", config.training.epochs);

        let report = nba::training::train_points_model::<TrainingBackend>(
            &config,
            NdArrayDevice::default(),
        )?;

        println!("\nTraining complete!");
        println!(
            "  Rows:        {} ({} train / {} test)",
            report.rows, report.train_samples, report.test_samples
        );
        println!("  Test R²:     {:.4}", report.r_squared);
        println!("  Model saved: {}", config.data.points_model_path);

        Ok(())
    }

    fn read_record(path: &str) -> Result<HashMap<String, f64>> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| NbaError::Parse(format!("Failed to read input {}: {}", path, e)))?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn predict(config: &Config, input: &str, format: OutputFormat) -> Result<()> {
        let predictor = Predictor::<InferenceBackend>::load(config, NdArrayDevice::default())?;
        let record = read_record(input)?;
        let prediction = predictor.predict(&record)?;

        match format {
            OutputFormat::Table => println!("{}", format_prediction(&prediction)),
            OutputFormat::Json => {
                let json = serde_json::json!({
                    "home_win_prob": prediction.home_win_prob,
                    "away_win_prob": prediction.away_win_prob(),
                    "winner": prediction.winner().to_string(),
                });
                println!("{}", serde_json::to_string_pretty(&json)?);
            }
        }

        Ok(())
    }

    pub fn predict_points(config: &Config, team: &str, opponent: &str, input: &str) -> Result<()> {
        let predictor =
            PointsPredictor::<InferenceBackend>::load(config, NdArrayDevice::default())?;
        let record = read_record(input)?;
        let points = predictor.predict(team, opponent, &record)?;

        println!("Predicted points for {} vs {}: {:.1}", team, opponent, points);

        Ok(())
    }

    pub fn model_info(config: &Config) -> Result<()> {
        if !nba::model::artifact_exists(&config.data.model_path) {
            return Err(NbaError::ModelNotFound {
                path: nba::model::artifact_path(&config.data.model_path),
            });
        }

        let stats_status = if std::path::Path::new(&config.data.norm_path).exists() {
            "present"
        } else {
            "missing"
        };

        println!("Model Information");
        println!("───────────────────────────────");
        println!("  Path:           {}", nba::model::artifact_path(&config.data.model_path));
        println!("  Inputs:         {}", config.features.names.len());
        println!("  Hidden layers:  {:?}", config.model.hidden_dims);
        println!("  Dropout:        {}", config.training.dropout);
        println!("  Window:         {} games", config.features.window);
        println!("  Norm stats:     {} ({})", stats_status, config.data.norm_path);
        println!(
            "  Points model:   {}",
            if nba::model::artifact_exists(&config.data.points_model_path) {
                "present"
            } else {
                "not trained"
            }
        );

        Ok(())
    }
}
