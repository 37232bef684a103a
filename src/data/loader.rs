//! CSV ingestion for the NBA games dataset
//!
//! Reads `games.csv`, `games_details.csv`, `teams.csv` and `ranking.csv`
//! wholesale into memory. Extra columns are ignored.

use crate::{BoxScore, GameId, GameRecord, NbaError, Result, Stat, TeamId};
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

/// One player's line for a single game (`games_details.csv`)
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PlayerLine {
    #[serde(rename = "GAME_ID")]
    pub game_id: i64,
    #[serde(rename = "TEAM_ID")]
    pub team_id: i64,
    #[serde(rename = "PTS", default, deserialize_with = "csv::invalid_option")]
    pub pts: Option<f64>,
    #[serde(rename = "FG_PCT", default, deserialize_with = "csv::invalid_option")]
    pub fg_pct: Option<f64>,
    #[serde(rename = "FT_PCT", default, deserialize_with = "csv::invalid_option")]
    pub ft_pct: Option<f64>,
    #[serde(rename = "FG3_PCT", default, deserialize_with = "csv::invalid_option")]
    pub fg3_pct: Option<f64>,
    #[serde(rename = "AST", default, deserialize_with = "csv::invalid_option")]
    pub ast: Option<f64>,
    #[serde(rename = "REB", default, deserialize_with = "csv::invalid_option")]
    pub reb: Option<f64>,
}

impl PlayerLine {
    pub fn game(&self) -> GameId {
        GameId(self.game_id)
    }

    pub fn team(&self) -> TeamId {
        TeamId(self.team_id)
    }

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

/// A franchise from `teams.csv`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TeamInfo {
    #[serde(rename = "TEAM_ID")]
    pub team_id: i64,
    #[serde(rename = "ABBREVIATION", default)]
    pub abbreviation: String,
    #[serde(rename = "NICKNAME")]
    pub nickname: String,
    #[serde(rename = "CITY", default)]
    pub city: String,
}

impl TeamInfo {
    pub fn id(&self) -> TeamId {
        TeamId(self.team_id)
    }
}

/// A standings snapshot row from `ranking.csv`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RankingRecord {
    #[serde(rename = "TEAM_ID")]
    pub team_id: i64,
    #[serde(rename = "SEASON_ID")]
    pub season_id: i64,
    #[serde(rename = "STANDINGSDATE")]
    pub standings_date: String,
    #[serde(rename = "CONFERENCE", default)]
    pub conference: String,
    #[serde(rename = "TEAM", default)]
    pub team: String,
    #[serde(rename = "G", default, deserialize_with = "csv::invalid_option")]
    pub games: Option<u32>,
    #[serde(rename = "W", default, deserialize_with = "csv::invalid_option")]
    pub wins: Option<u32>,
    #[serde(rename = "L", default, deserialize_with = "csv::invalid_option")]
    pub losses: Option<u32>,
    #[serde(rename = "W_PCT", default, deserialize_with = "csv::invalid_option")]
    pub win_pct: Option<f64>,
}

/// Raw `games.csv` row before date parsing and validation
#[derive(Debug, Deserialize)]
struct RawGame {
    #[serde(rename = "GAME_DATE_EST")]
    game_date: String,
    #[serde(rename = "GAME_ID")]
    game_id: i64,
    #[serde(rename = "HOME_TEAM_ID")]
    home_team_id: i64,
    #[serde(rename = "VISITOR_TEAM_ID")]
    visitor_team_id: i64,
    #[serde(rename = "SEASON", default, deserialize_with = "csv::invalid_option")]
    season: Option<i32>,
    #[serde(rename = "PTS_home", default, deserialize_with = "csv::invalid_option")]
    pts_home: Option<f64>,
    #[serde(rename = "FG_PCT_home", default, deserialize_with = "csv::invalid_option")]
    fg_pct_home: Option<f64>,
    #[serde(rename = "FT_PCT_home", default, deserialize_with = "csv::invalid_option")]
    ft_pct_home: Option<f64>,
    #[serde(rename = "FG3_PCT_home", default, deserialize_with = "csv::invalid_option")]
    fg3_pct_home: Option<f64>,
    #[serde(rename = "AST_home", default, deserialize_with = "csv::invalid_option")]
    ast_home: Option<f64>,
    #[serde(rename = "REB_home", default, deserialize_with = "csv::invalid_option")]
    reb_home: Option<f64>,
    #[serde(rename = "PTS_away", default, deserialize_with = "csv::invalid_option")]
    pts_away: Option<f64>,
    #[serde(rename = "FG_PCT_away", default, deserialize_with = "csv::invalid_option")]
    fg_pct_away: Option<f64>,
    #[serde(rename = "FT_PCT_away", default, deserialize_with = "csv::invalid_option")]
    ft_pct_away: Option<f64>,
    #[serde(rename = "FG3_PCT_away", default, deserialize_with = "csv::invalid_option")]
    fg3_pct_away: Option<f64>,
    #[serde(rename = "AST_away", default, deserialize_with = "csv::invalid_option")]
    ast_away: Option<f64>,
    #[serde(rename = "REB_away", default, deserialize_with = "csv::invalid_option")]
    reb_away: Option<f64>,
    #[serde(rename = "HOME_TEAM_WINS", default, deserialize_with = "csv::invalid_option")]
    home_team_wins: Option<u8>,
}

impl RawGame {
    fn into_record(self) -> Result<GameRecord> {
        let date = parse_game_date(&self.game_date)?;
        Ok(GameRecord {
            game_id: GameId(self.game_id),
            date,
            season: self.season,
            home_team: TeamId(self.home_team_id),
            away_team: TeamId(self.visitor_team_id),
            home_team_wins: self.home_team_wins.map(|w| w != 0),
            home: BoxScore {
                pts: self.pts_home,
                fg_pct: self.fg_pct_home,
                ft_pct: self.ft_pct_home,
                fg3_pct: self.fg3_pct_home,
                ast: self.ast_home,
                reb: self.reb_home,
            },
            away: BoxScore {
                pts: self.pts_away,
                fg_pct: self.fg_pct_away,
                ft_pct: self.ft_pct_away,
                fg3_pct: self.fg3_pct_away,
                ast: self.ast_away,
                reb: self.reb_away,
            },
        })
    }
}

/// Parse `GAME_DATE_EST`, accepting a trailing time component
pub fn parse_game_date(raw: &str) -> Result<NaiveDate> {
    let raw = raw.trim();
    let date_part = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .map_err(|e| NbaError::Parse(format!("Invalid game date '{}': {}", raw, e)))
}

/// Read games from any reader; duplicate game ids keep their first row
pub fn read_games<R: Read>(reader: R) -> Result<Vec<GameRecord>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut seen = HashSet::new();
    let mut games = Vec::new();
    let mut duplicates = 0usize;

    for row in rdr.deserialize::<RawGame>() {
        let record = row?.into_record()?;
        if seen.insert(record.game_id) {
            games.push(record);
        } else {
            duplicates += 1;
        }
    }

    if duplicates > 0 {
        log::warn!("Skipped {} duplicate game rows", duplicates);
    }

    Ok(games)
}

pub fn read_player_lines<R: Read>(reader: R) -> Result<Vec<PlayerLine>> {
    read_rows(reader)
}

pub fn read_teams<R: Read>(reader: R) -> Result<Vec<TeamInfo>> {
    read_rows(reader)
}

pub fn read_rankings<R: Read>(reader: R) -> Result<Vec<RankingRecord>> {
    read_rows(reader)
}

fn read_rows<R: Read, T: serde::de::DeserializeOwned>(reader: R) -> Result<Vec<T>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let rows = rdr.deserialize().collect::<std::result::Result<Vec<T>, _>>()?;
    Ok(rows)
}

fn open(path: &Path) -> Result<std::fs::File> {
    std::fs::File::open(path).map_err(|e| {
        NbaError::Io(std::io::Error::new(
            e.kind(),
            format!("Failed to open {}: {}", path.display(), e),
        ))
    })
}

pub fn load_games<P: AsRef<Path>>(path: P) -> Result<Vec<GameRecord>> {
    let games = read_games(open(path.as_ref())?)?;
    log::debug!("Loaded {} games from {}", games.len(), path.as_ref().display());
    Ok(games)
}

pub fn load_player_lines<P: AsRef<Path>>(path: P) -> Result<Vec<PlayerLine>> {
    let lines = read_player_lines(open(path.as_ref())?)?;
    log::debug!(
        "Loaded {} player lines from {}",
        lines.len(),
        path.as_ref().display()
    );
    Ok(lines)
}

pub fn load_teams<P: AsRef<Path>>(path: P) -> Result<Vec<TeamInfo>> {
    read_teams(open(path.as_ref())?)
}

pub fn load_rankings<P: AsRef<Path>>(path: P) -> Result<Vec<RankingRecord>> {
    read_rankings(open(path.as_ref())?)
}
