//! Points-scored rows for the regression pipeline
//!
//! One row per team per game, keyed by team nickname, with the team's own
//! shooting, assist and rebound totals and the points it scored.

use std::collections::HashMap;

use crate::data::TeamInfo;
use crate::features::LabelEncoder;
use crate::{GameRecord, Result, Side, Stat, TeamId};

/// Regressor inputs, in column order
pub const POINTS_FEATURES: [&str; 7] = [
    "TEAM_ENC",
    "OPPONENT_ENC",
    "FG_PCT",
    "FT_PCT",
    "FG3_PCT",
    "AST",
    "REB",
];

const BOX_STATS: [Stat; 5] = [Stat::FgPct, Stat::FtPct, Stat::Fg3Pct, Stat::Ast, Stat::Reb];

pub fn feature_names() -> Vec<String> {
    POINTS_FEATURES.iter().map(|s| s.to_string()).collect()
}

/// One team's appearance in a game
#[derive(Debug, Clone, PartialEq)]
pub struct PointsRow {
    pub team: String,
    pub opponent: String,
    /// FG_PCT, FT_PCT, FG3_PCT, AST, REB; missing values are 0
    pub stats: [f64; 5],
    pub points: f64,
}

impl PointsRow {
    /// Encoded feature vector in `POINTS_FEATURES` order
    pub fn encode(&self, teams: &LabelEncoder, opponents: &LabelEncoder) -> Result<Vec<f64>> {
        let mut out = Vec::with_capacity(POINTS_FEATURES.len());
        out.push(teams.transform(&self.team)? as f64);
        out.push(opponents.transform(&self.opponent)? as f64);
        out.extend_from_slice(&self.stats);
        Ok(out)
    }
}

/// Build home and away rows for every game with both point totals
pub fn build_points_rows(games: &[GameRecord], teams: &[TeamInfo]) -> Vec<PointsRow> {
    let names: HashMap<TeamId, &str> = teams
        .iter()
        .map(|t| (t.id(), t.nickname.as_str()))
        .collect();

    let mut rows = Vec::with_capacity(games.len() * 2);
    let mut unknown = 0usize;

    for game in games {
        if game.home.pts.is_none() || game.away.pts.is_none() {
            continue;
        }
        let (Some(home_name), Some(away_name)) =
            (names.get(&game.home_team), names.get(&game.away_team))
        else {
            unknown += 1;
            continue;
        };

        for side in Side::ALL {
            let (team, opponent) = match side {
                Side::Home => (home_name, away_name),
                Side::Away => (away_name, home_name),
            };
            let box_score = game.box_score(side);
            let stats = BOX_STATS.map(|s| box_score.get(s).unwrap_or(0.0));
            rows.push(PointsRow {
                team: team.to_string(),
                opponent: opponent.to_string(),
                stats,
                points: box_score.pts.unwrap_or(0.0),
            });
        }
    }

    if unknown > 0 {
        log::warn!("Skipped {} games with teams missing from teams.csv", unknown);
    }

    rows
}

/// Coefficient of determination
pub fn r_squared(predicted: &[f64], actual: &[f64]) -> f64 {
    let n = actual.len() as f64;
    if n == 0.0 {
        return 0.0;
    }
    let mean = actual.iter().sum::<f64>() / n;
    let ss_tot: f64 = actual.iter().map(|y| (y - mean).powi(2)).sum();
    let ss_res: f64 = predicted
        .iter()
        .zip(actual)
        .map(|(p, y)| (y - p).powi(2))
        .sum();
    if ss_tot == 0.0 {
        return 0.0;
    }
    1.0 - ss_res / ss_tot
}
