//! Training-set assembly
//!
//! Joins each team's rolling features back onto the game list once for the
//! home side and once for the away side.

use std::collections::HashMap;

use chrono::NaiveDate;

use super::rolling::RollingRow;
use super::team_stats::StatLine;
use super::FeatureName;
use crate::{GameId, GameRecord, Side, Stat, TeamId};

/// One fully-populated game: home and away rolling averages plus the label
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingRow {
    pub game_id: GameId,
    pub date: NaiveDate,
    pub home_team: TeamId,
    pub away_team: TeamId,
    pub home: [f64; Stat::COUNT],
    pub away: [f64; Stat::COUNT],
    pub home_team_wins: bool,
}

impl TrainingRow {
    pub fn feature(&self, name: &FeatureName) -> f64 {
        let side = match name.side {
            Side::Home => &self.home,
            Side::Away => &self.away,
        };
        side[name.stat.index()]
    }

    /// Feature values in the given order
    pub fn select(&self, names: &[FeatureName]) -> Vec<f64> {
        names.iter().map(|n| self.feature(n)).collect()
    }

    pub fn label(&self) -> f32 {
        if self.home_team_wins {
            1.0
        } else {
            0.0
        }
    }
}

/// Counts of what the assembler kept and dropped
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssemblyReport {
    pub games: usize,
    /// Games where the home or away side had no rolling row at all
    pub missing_side: usize,
    /// Games with a missing average or label
    pub incomplete: usize,
    pub rows: usize,
}

/// Builds one training row per eligible game
#[derive(Debug, Clone, Default)]
pub struct DatasetAssembler;

impl DatasetAssembler {
    pub fn new() -> Self {
        DatasetAssembler
    }

    pub fn assemble<I>(&self, games: &[GameRecord], rolling: I) -> (Vec<TrainingRow>, AssemblyReport)
    where
        I: IntoIterator<Item = (TeamId, RollingRow)>,
    {
        let index: HashMap<(GameId, TeamId), StatLine> = rolling
            .into_iter()
            .map(|(team, row)| ((row.game_id, team), row.averages))
            .collect();

        let mut report = AssemblyReport {
            games: games.len(),
            ..Default::default()
        };
        let mut rows = Vec::new();

        for game in games {
            let home = index.get(&(game.game_id, game.home_team));
            let away = index.get(&(game.game_id, game.away_team));

            let (home, away) = match (home, away) {
                (Some(h), Some(a)) => (h, a),
                _ => {
                    report.missing_side += 1;
                    continue;
                }
            };

            match (home.to_array(), away.to_array(), game.home_team_wins) {
                (Some(home), Some(away), Some(home_team_wins)) => rows.push(TrainingRow {
                    game_id: game.game_id,
                    date: game.date,
                    home_team: game.home_team,
                    away_team: game.away_team,
                    home,
                    away,
                    home_team_wins,
                }),
                _ => report.incomplete += 1,
            }
        }

        report.rows = rows.len();
        log::info!(
            "Processed data with new features has {} samples ({} games lacked a side, {} incomplete)",
            report.rows,
            report.missing_side,
            report.incomplete
        );

        (rows, report)
    }
}
