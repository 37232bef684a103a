//! Feature normalization
//!
//! Per-feature z-score statistics fit once on training data and reused
//! unchanged at inference time.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{NbaError, Result};

/// Divisor used for the variance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StdKind {
    /// `n - 1`, matches a dataframe `.std()`
    Sample,
    /// `n`, matches a standard scaler
    Population,
}

/// Mean and standard deviation per feature name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizationStats {
    pub mean: BTreeMap<String, f64>,
    pub std: BTreeMap<String, f64>,
}

impl NormalizationStats {
    /// Fit with the sample standard deviation
    pub fn fit(names: &[String], rows: &[Vec<f64>]) -> Result<Self> {
        Self::fit_with(names, rows, StdKind::Sample)
    }

    /// Fit mean and std for each named column of `rows`
    pub fn fit_with(names: &[String], rows: &[Vec<f64>], kind: StdKind) -> Result<Self> {
        if rows.is_empty() {
            return Err(NbaError::EmptyDataset(
                "cannot fit normalization on zero rows".to_string(),
            ));
        }
        if let Some(bad) = rows.iter().find(|r| r.len() != names.len()) {
            return Err(NbaError::Parse(format!(
                "row has {} values, expected {}",
                bad.len(),
                names.len()
            )));
        }

        let n = rows.len() as f64;
        let mut mean = BTreeMap::new();
        let mut std = BTreeMap::new();

        for (j, name) in names.iter().enumerate() {
            let m = rows.iter().map(|r| r[j]).sum::<f64>() / n;
            let ss = rows.iter().map(|r| (r[j] - m).powi(2)).sum::<f64>();
            let divisor = match kind {
                StdKind::Sample => n - 1.0,
                StdKind::Population => n,
            };
            let s = (ss / divisor).sqrt();

            mean.insert(name.clone(), m);
            // Constant or single-row columns would divide by zero
            std.insert(name.clone(), if s.is_finite() && s > 0.0 { s } else { 1.0 });
        }

        Ok(NormalizationStats { mean, std })
    }

    /// `(value - mean) / std` for one feature
    pub fn normalize_value(&self, name: &str, value: f64) -> Result<f64> {
        let (mean, std) = self.params(name)?;
        Ok((value - mean) / std)
    }

    /// Normalize a row whose values follow `names`
    pub fn normalize_row(&self, names: &[String], row: &[f64]) -> Result<Vec<f32>> {
        names
            .iter()
            .zip(row)
            .map(|(name, &value)| self.normalize_value(name, value).map(|v| v as f32))
            .collect()
    }

    pub fn normalize_rows(&self, names: &[String], rows: &[Vec<f64>]) -> Result<Vec<Vec<f32>>> {
        rows.iter().map(|row| self.normalize_row(names, row)).collect()
    }

    /// Select `names` from a flat record and normalize them in that order
    pub fn normalize_record(
        &self,
        names: &[String],
        record: &HashMap<String, f64>,
    ) -> Result<Vec<f32>> {
        let values = names
            .iter()
            .map(|name| {
                record
                    .get(name)
                    .copied()
                    .ok_or_else(|| NbaError::MissingFeature(name.clone()))
            })
            .collect::<Result<Vec<f64>>>()?;
        self.normalize_row(names, &values)
    }

    fn params(&self, name: &str) -> Result<(f64, f64)> {
        match (self.mean.get(name), self.std.get(name)) {
            (Some(&m), Some(&s)) => Ok((m, s)),
            _ => Err(NbaError::Config(format!(
                "normalization stats have no entry for '{}'; retrain the model",
                name
            ))),
        }
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        log::info!("Normalization stats saved to '{}'", path.display());
        Ok(())
    }

    /// Load persisted stats; a missing file means no model was trained
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(NbaError::NotTrained {
                path: path.display().to_string(),
            });
        }
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}
