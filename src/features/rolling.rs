//! Rolling team-form features
//!
//! Groups team-game rows by team, orders them by date and scans each team's
//! history with a trailing window. The window only ever holds games played
//! before the current one, so a game's features never include its own stats.

use std::collections::{btree_map, BTreeMap, VecDeque};

use chrono::NaiveDate;

use super::team_stats::{team_game_stats, StatLine, TeamGameStats};
use crate::data::PlayerLine;
use crate::{FeatureConfig, GameId, GameRecord, Stat, TeamId};

/// Shifted rolling averages for one team-game appearance
#[derive(Debug, Clone, PartialEq)]
pub struct RollingRow {
    pub game_id: GameId,
    pub date: NaiveDate,
    /// Averages over up to `window` previous games; all `None` for a
    /// team's first game
    pub averages: StatLine,
}

/// Team-game rows grouped by team, each group in chronological order
#[derive(Debug, Clone, Default)]
pub struct TeamHistories {
    teams: BTreeMap<TeamId, Vec<TeamGameStats>>,
}

impl TeamHistories {
    /// Group and sort rows; ties on date are ordered by game id
    pub fn from_rows(rows: Vec<TeamGameStats>) -> Self {
        let mut teams: BTreeMap<TeamId, Vec<TeamGameStats>> = BTreeMap::new();
        for row in rows {
            teams.entry(row.team_id).or_default().push(row);
        }
        for history in teams.values_mut() {
            history.sort_by_key(|r| (r.date, r.game_id));
        }
        TeamHistories { teams }
    }

    pub fn team_count(&self) -> usize {
        self.teams.len()
    }

    /// Lazily scan every team's history. Each call starts a fresh scan.
    pub fn scan(&self, window: usize) -> RollingScan<'_> {
        RollingScan {
            teams: self.teams.iter(),
            current: None,
            position: 0,
            window: VecDeque::with_capacity(window),
            size: window.max(1),
        }
    }
}

/// Iterator of `(team, rolling row)` pairs, team by team
#[derive(Debug, Clone)]
pub struct RollingScan<'a> {
    teams: btree_map::Iter<'a, TeamId, Vec<TeamGameStats>>,
    current: Option<(TeamId, &'a [TeamGameStats])>,
    position: usize,
    window: VecDeque<StatLine>,
    size: usize,
}

impl<'a> Iterator for RollingScan<'a> {
    type Item = (TeamId, RollingRow);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((team, rows)) = self.current {
                if let Some(row) = rows.get(self.position) {
                    // Averages first, then the current game joins the window
                    let averages = window_mean(&self.window);
                    self.window.push_back(row.stats);
                    if self.window.len() > self.size {
                        self.window.pop_front();
                    }
                    self.position += 1;

                    return Some((
                        team,
                        RollingRow {
                            game_id: row.game_id,
                            date: row.date,
                            averages,
                        },
                    ));
                }
            }

            let (team, rows) = self.teams.next()?;
            self.current = Some((*team, rows.as_slice()));
            self.position = 0;
            self.window.clear();
        }
    }
}

/// Per-stat mean over the non-missing values in the window
fn window_mean(window: &VecDeque<StatLine>) -> StatLine {
    let mut out = StatLine::default();
    for stat in Stat::ALL {
        let (sum, count) = window
            .iter()
            .filter_map(|line| line.get(stat))
            .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
        if count > 0 {
            out.set(stat, Some(sum / count as f64));
        }
    }
    out
}

/// Builds team histories and rolling scans from raw tables
#[derive(Debug, Clone)]
pub struct FeatureEngineer {
    window: usize,
}

impl FeatureEngineer {
    pub fn new(config: &FeatureConfig) -> Self {
        FeatureEngineer {
            window: config.window,
        }
    }

    /// Aggregate player lines and group them by team
    pub fn team_histories(&self, games: &[GameRecord], lines: &[PlayerLine]) -> TeamHistories {
        let rows = team_game_stats(games, lines);
        log::debug!("Aggregated {} team-game rows", rows.len());
        let histories = TeamHistories::from_rows(rows);
        log::info!(
            "Engineering rolling average features ({}-game window, {} teams)...",
            self.window,
            histories.team_count()
        );
        histories
    }

    pub fn scan<'a>(&self, histories: &'a TeamHistories) -> RollingScan<'a> {
        histories.scan(self.window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(game: i64, team: i64, day: u32, pts: f64) -> TeamGameStats {
        TeamGameStats {
            game_id: GameId(game),
            team_id: TeamId(team),
            date: NaiveDate::from_ymd_opt(2023, 1, day).unwrap(),
            stats: StatLine::complete([pts, 0.5, 0.75, 0.35, 25.0, 44.0]),
        }
    }

    #[test]
    fn test_first_game_has_no_features() {
        let histories = TeamHistories::from_rows(vec![row(1, 7, 1, 100.0), row(2, 7, 2, 110.0)]);
        let rows: Vec<_> = histories.scan(10).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].1.averages, StatLine::default());
        assert_eq!(rows[1].1.averages.get(Stat::Pts), Some(100.0));
    }

    #[test]
    fn test_shifted_mean_of_prior_games() {
        // Inserted out of order to exercise the chronological sort
        let histories = TeamHistories::from_rows(vec![
            row(4, 7, 4, 130.0),
            row(2, 7, 2, 110.0),
            row(1, 7, 1, 100.0),
            row(3, 7, 3, 90.0),
        ]);
        let rows: Vec<_> = histories.scan(10).collect();
        let game4 = rows.iter().find(|(_, r)| r.game_id == GameId(4)).unwrap();
        assert!((game4.1.averages.get(Stat::Pts).unwrap() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_never_uses_current_game() {
        let rows: Vec<TeamGameStats> = (1..=15).map(|d| row(d as i64, 3, d, d as f64 * 10.0)).collect();
        let histories = TeamHistories::from_rows(rows.clone());
        for (k, (_, rolled)) in histories.scan(10).enumerate() {
            let prior = &rows[k.saturating_sub(10)..k];
            match rolled.averages.get(Stat::Pts) {
                None => assert!(prior.is_empty()),
                Some(avg) => {
                    let expected = prior.iter().map(|r| r.stats.get(Stat::Pts).unwrap()).sum::<f64>()
                        / prior.len() as f64;
                    assert!((avg - expected).abs() < 1e-9, "game {}", k + 1);
                }
            }
        }
    }

    #[test]
    fn test_window_limits_history() {
        let rows: Vec<TeamGameStats> = (1..=4).map(|d| row(d as i64, 3, d, d as f64)).collect();
        let histories = TeamHistories::from_rows(rows);
        let last = histories.scan(2).last().unwrap().1;
        // Window of 2 before game 4: games 2 and 3
        assert_eq!(last.averages.get(Stat::Pts), Some(2.5));
    }

    #[test]
    fn test_window_resets_between_teams() {
        let histories = TeamHistories::from_rows(vec![
            row(1, 1, 1, 100.0),
            row(2, 1, 2, 100.0),
            row(1, 2, 1, 50.0),
        ]);
        let rows: Vec<_> = histories.scan(10).collect();
        let team2 = rows.iter().find(|(t, _)| *t == TeamId(2)).unwrap();
        assert_eq!(team2.1.averages, StatLine::default());
    }

    #[test]
    fn test_scan_is_restartable() {
        let histories = TeamHistories::from_rows(vec![row(1, 1, 1, 1.0), row(2, 1, 2, 2.0)]);
        let scan = histories.scan(10);
        let first: Vec<_> = scan.clone().collect();
        let second: Vec<_> = scan.collect();
        let third: Vec<_> = histories.scan(10).collect();
        assert_eq!(first, second);
        assert_eq!(first, third);
    }

    #[test]
    fn test_missing_values_skipped_in_mean() {
        let mut first = row(1, 1, 1, 100.0);
        first.stats.set(Stat::Fg3Pct, None);
        let histories =
            TeamHistories::from_rows(vec![first, row(2, 1, 2, 100.0), row(3, 1, 3, 100.0)]);
        let rows: Vec<_> = histories.scan(10).collect();
        assert_eq!(rows[1].1.averages.get(Stat::Fg3Pct), None);
        assert_eq!(rows[2].1.averages.get(Stat::Fg3Pct), Some(0.35));
    }
}
