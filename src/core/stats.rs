use indexmap::IndexMap;
use serde::Serialize;

use super::pairs::PairMap;
use crate::error::{Error, Result};

/// Summary statistics of a non-empty collection of values
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Summary {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    /// Population standard deviation (no degrees-of-freedom correction)
    pub stdev: f64,
}

impl Summary {
    pub fn from_values<I, T>(values: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<f64>,
    {
        let values: Vec<f64> = values.into_iter().map(Into::into).collect();
        if values.is_empty() {
            return Err(Error::EmptyStatistics);
        }
        if values.iter().any(|v| v.is_nan()) {
            return Err(Error::NanStatistics);
        }

        let n = values.len() as f64;
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

        Ok(Self {
            min,
            max,
            // Rounding can push the mean of near-identical values just outside [min, max]
            mean: mean.clamp(min, max),
            stdev: variance.sqrt(),
        })
    }
}

/// Distance summaries within each group and between each pair of groups
#[derive(Debug, Clone, Default)]
pub struct Model {
    pub within: IndexMap<String, Summary>,
    pub between: PairMap<Summary>,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_within_values<I, T>(&mut self, group: &str, values: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: Into<f64>,
    {
        let summary = Summary::from_values(values)?;
        self.within.insert(group.to_string(), summary);
        Ok(())
    }

    pub fn add_between_values<I, T>(&mut self, group1: &str, group2: &str, values: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: Into<f64>,
    {
        let summary = Summary::from_values(values)?;
        self.between.insert(group1, group2, summary);
        Ok(())
    }
}
