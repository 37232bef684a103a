//! Data ingestion
//!
//! CSV loaders for the raw tables and the burn dataset used for training.

pub mod dataset;
pub mod loader;

pub use dataset::{GameBatch, GameBatcher, GameDataset, GameSample};
pub use loader::{PlayerLine, RankingRecord, TeamInfo};

use crate::{DataConfig, GameRecord, Result};

/// Raw tables needed by the rolling-feature pipeline
#[derive(Debug, Clone)]
pub struct RawData {
    pub games: Vec<GameRecord>,
    pub details: Vec<PlayerLine>,
}

impl RawData {
    /// Load games and player lines from the configured paths
    pub fn load(config: &DataConfig) -> Result<Self> {
        log::info!("Loading datasets...");
        let games = loader::load_games(&config.games_path)?;
        let details = loader::load_player_lines(&config.details_path)?;
        log::info!(
            "Loaded {} games and {} player lines",
            games.len(),
            details.len()
        );
        Ok(RawData { games, details })
    }
}
