//! Team-game statistics
//!
//! Aggregates per-player lines into one row per team and game.

use crate::data::PlayerLine;
use crate::{Aggregation, GameId, GameRecord, Stat, TeamId};
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};

/// One value per tracked stat; `None` means missing
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StatLine {
    values: [Option<f64>; Stat::COUNT],
}

impl StatLine {
    pub fn new(values: [Option<f64>; Stat::COUNT]) -> Self {
        StatLine { values }
    }

    /// Line with every stat present
    pub fn complete(values: [f64; Stat::COUNT]) -> Self {
        StatLine {
            values: values.map(Some),
        }
    }

    pub fn get(&self, stat: Stat) -> Option<f64> {
        self.values[stat.index()]
    }

    pub fn set(&mut self, stat: Stat, value: Option<f64>) {
        self.values[stat.index()] = value;
    }

    pub fn is_complete(&self) -> bool {
        self.values.iter().all(|v| v.is_some())
    }

    /// All values, or `None` if any stat is missing
    pub fn to_array(&self) -> Option<[f64; Stat::COUNT]> {
        let mut out = [0.0; Stat::COUNT];
        for (slot, value) in out.iter_mut().zip(self.values.iter()) {
            *slot = (*value)?;
        }
        Some(out)
    }
}

/// Aggregated stats for one team in one game
#[derive(Debug, Clone, PartialEq)]
pub struct TeamGameStats {
    pub game_id: GameId,
    pub team_id: TeamId,
    pub date: NaiveDate,
    pub stats: StatLine,
}

#[derive(Debug, Clone, Default)]
struct Accumulator {
    sum: [f64; Stat::COUNT],
    count: [usize; Stat::COUNT],
}

impl Accumulator {
    fn add(&mut self, line: &PlayerLine) {
        for stat in Stat::ALL {
            if let Some(v) = line.get(stat).filter(|v| v.is_finite()) {
                self.sum[stat.index()] += v;
                self.count[stat.index()] += 1;
            }
        }
    }

    fn finish(&self) -> StatLine {
        let mut line = StatLine::default();
        for stat in Stat::ALL {
            let i = stat.index();
            let value = match stat.aggregation() {
                // A team with no recorded values still sums to zero
                Aggregation::Sum => Some(self.sum[i]),
                Aggregation::Mean if self.count[i] == 0 => None,
                Aggregation::Mean => Some(self.sum[i] / self.count[i] as f64),
            };
            line.set(stat, value);
        }
        line
    }
}

/// Sum counting stats and average percentages, grouped by (game, team)
pub fn aggregate_player_lines(lines: &[PlayerLine]) -> BTreeMap<(GameId, TeamId), StatLine> {
    let mut groups: BTreeMap<(GameId, TeamId), Accumulator> = BTreeMap::new();
    for line in lines {
        groups.entry((line.game(), line.team())).or_default().add(line);
    }

    groups
        .into_iter()
        .map(|(key, acc)| (key, acc.finish()))
        .collect()
}

/// Attach game dates; team-game rows for unknown games are dropped
pub fn attach_dates(
    games: &[GameRecord],
    aggregated: BTreeMap<(GameId, TeamId), StatLine>,
) -> Vec<TeamGameStats> {
    let dates: HashMap<GameId, NaiveDate> = games.iter().map(|g| (g.game_id, g.date)).collect();

    let mut dropped = 0usize;
    let rows: Vec<TeamGameStats> = aggregated
        .into_iter()
        .filter_map(|((game_id, team_id), stats)| match dates.get(&game_id) {
            Some(&date) => Some(TeamGameStats {
                game_id,
                team_id,
                date,
                stats,
            }),
            None => {
                dropped += 1;
                None
            }
        })
        .collect();

    if dropped > 0 {
        log::debug!("Dropped {} team-game rows without a matching game", dropped);
    }

    rows
}

/// Team-game rows for every (game, team) pair in the detail lines
pub fn team_game_stats(games: &[GameRecord], lines: &[PlayerLine]) -> Vec<TeamGameStats> {
    attach_dates(games, aggregate_player_lines(lines))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BoxScore;

    fn line(game: i64, team: i64, pts: Option<f64>, fg_pct: Option<f64>) -> PlayerLine {
        PlayerLine {
            game_id: game,
            team_id: team,
            pts,
            fg_pct,
            ft_pct: None,
            fg3_pct: None,
            ast: Some(2.0),
            reb: Some(3.0),
        }
    }

    fn game(id: i64) -> GameRecord {
        GameRecord {
            game_id: GameId(id),
            date: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            season: Some(2022),
            home_team: TeamId(1),
            away_team: TeamId(2),
            home_team_wins: Some(true),
            home: BoxScore::default(),
            away: BoxScore::default(),
        }
    }

    #[test]
    fn test_sums_and_means() {
        let lines = vec![
            line(10, 1, Some(20.0), Some(0.5)),
            line(10, 1, Some(10.0), Some(0.3)),
            line(10, 1, None, None), // did not play
            line(10, 2, Some(5.0), Some(1.0)),
        ];
        let agg = aggregate_player_lines(&lines);
        assert_eq!(agg.len(), 2);

        let team1 = agg[&(GameId(10), TeamId(1))];
        assert_eq!(team1.get(Stat::Pts), Some(30.0));
        assert!((team1.get(Stat::FgPct).unwrap() - 0.4).abs() < 1e-12);
        assert_eq!(team1.get(Stat::Ast), Some(6.0));
        assert_eq!(team1.get(Stat::Reb), Some(9.0));
        // No player had a free-throw percentage
        assert_eq!(team1.get(Stat::FtPct), None);
        assert!(!team1.is_complete());
    }

    #[test]
    fn test_all_missing_sum_is_zero() {
        let agg = aggregate_player_lines(&[line(10, 1, None, None)]);
        assert_eq!(agg[&(GameId(10), TeamId(1))].get(Stat::Pts), Some(0.0));
    }

    #[test]
    fn test_attach_dates_inner_join() {
        let lines = vec![line(10, 1, Some(1.0), None), line(99, 1, Some(1.0), None)];
        let rows = team_game_stats(&[game(10)], &lines);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].game_id, GameId(10));
        assert_eq!(rows[0].date, NaiveDate::from_ymd_opt(2023, 1, 1).unwrap());
    }

    #[test]
    fn test_stat_line_to_array() {
        let full = StatLine::complete([1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(full.to_array(), Some([1.0, 2.0, 3.0, 4.0, 5.0, 6.0]));

        let mut partial = full;
        partial.set(Stat::Reb, None);
        assert_eq!(partial.to_array(), None);
    }
}
