//! Feature extraction
//!
//! Converts raw box scores into leakage-free rolling team-form features
//! and model-ready, normalized rows.

pub mod assembler;
pub mod encoding;
pub mod normalize;
pub mod points;
pub mod rolling;
pub mod team_stats;

pub use assembler::{AssemblyReport, DatasetAssembler, TrainingRow};
pub use encoding::LabelEncoder;
pub use normalize::{NormalizationStats, StdKind};
pub use rolling::{FeatureEngineer, RollingRow, RollingScan, TeamHistories};
pub use team_stats::{StatLine, TeamGameStats};

use crate::{NbaError, Side, Stat};
use std::fmt;
use std::str::FromStr;

/// A rolling-average model input, e.g. `FG3_PCT_avg_away`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FeatureName {
    pub stat: Stat,
    pub side: Side,
}

impl FeatureName {
    pub fn new(stat: Stat, side: Side) -> Self {
        FeatureName { stat, side }
    }

    /// Parse a list of configured names
    pub fn parse_all(names: &[String]) -> crate::Result<Vec<FeatureName>> {
        names.iter().map(|n| n.parse()).collect()
    }
}

impl fmt::Display for FeatureName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_avg_{}", self.stat.column(), self.side.suffix())
    }
}

impl FromStr for FeatureName {
    type Err = NbaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unknown = || NbaError::UnknownFeature(s.to_string());
        let (head, suffix) = s.rsplit_once('_').ok_or_else(unknown)?;
        let side = Side::from_suffix(suffix).ok_or_else(unknown)?;
        let column = head.strip_suffix("_avg").ok_or_else(unknown)?;
        let stat = Stat::from_column(column).ok_or_else(unknown)?;
        Ok(FeatureName { stat, side })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_name_roundtrip() {
        for side in Side::ALL {
            for stat in Stat::ALL {
                let name = FeatureName::new(stat, side);
                let parsed: FeatureName = name.to_string().parse().unwrap();
                assert_eq!(parsed, name);
            }
        }
    }

    #[test]
    fn test_feature_name_parse() {
        let name: FeatureName = "FG3_PCT_avg_away".parse().unwrap();
        assert_eq!(name.stat, Stat::Fg3Pct);
        assert_eq!(name.side, Side::Away);

        assert!("PTS_home".parse::<FeatureName>().is_err());
        assert!("PTS_avg_neutral".parse::<FeatureName>().is_err());
        assert!("STL_avg_home".parse::<FeatureName>().is_err());
    }
}
