use std::fs::File;
use std::io::{self, BufWriter, Write};

use anyhow::{Context, Result};
use camino::Utf8Path;
use indexmap::IndexMap;
use serde::Serialize;

use crate::compare::GroupDistances;
use crate::core::population::Population;
use crate::core::stats::{Model, Summary};
use crate::predict::Labels;

/// Joins the two parts of a pair label
const PAIR_SEPARATOR: &str = "/";

#[derive(Debug, Serialize)]
struct DistanceRecord<'a> {
    group1: &'a str,
    group2: &'a str,
    values: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryKind {
    Within,
    Between,
    Test,
}

#[derive(Debug, Serialize)]
struct SummaryRecord {
    kind: SummaryKind,
    label: String,
    min: f64,
    max: f64,
    mean: f64,
    stdev: f64,
}

impl SummaryRecord {
    fn new(kind: SummaryKind, label: String, summary: &Summary) -> Self {
        Self {
            kind,
            label,
            min: summary.min,
            max: summary.max,
            mean: summary.mean,
            stdev: summary.stdev,
        }
    }
}

#[derive(Debug, Serialize)]
struct PredictionRecord<'a> {
    individual: &'a str,
    predicted: String,
    expected: Option<&'a str>,
}

/// Tab separated report written to a file, or to stdout without a path
pub struct ReportWriter {
    writer: csv::Writer<Box<dyn Write>>,
}

impl ReportWriter {
    pub fn create(output: Option<&Utf8Path>) -> Result<Self> {
        let sink: Box<dyn Write> = match output {
            Some(path) => {
                let file = File::create(path)
                    .with_context(|| format!("Failed to create output file: {}", path))?;
                Box::new(BufWriter::new(file))
            }
            None => Box::new(io::stdout().lock()),
        };
        Ok(Self::from_writer(sink))
    }

    pub fn from_writer(sink: Box<dyn Write>) -> Self {
        Self {
            writer: csv::WriterBuilder::new().delimiter(b'\t').from_writer(sink),
        }
    }

    pub fn write_distances(&mut self, distances: &[GroupDistances]) -> Result<()> {
        for distance in distances {
            let values = distance
                .values
                .iter()
                .map(u64::to_string)
                .collect::<Vec<_>>()
                .join(",");
            self.writer.serialize(DistanceRecord {
                group1: &distance.group1,
                group2: &distance.group2,
                values,
            })?;
        }
        Ok(())
    }

    pub fn write_model(&mut self, model: &Model) -> Result<()> {
        for (group, summary) in &model.within {
            self.writer
                .serialize(SummaryRecord::new(SummaryKind::Within, group.clone(), summary))?;
        }
        for (pair, summary) in model.between.iter() {
            let label = format!("{}{}{}", pair.first(), PAIR_SEPARATOR, pair.second());
            self.writer
                .serialize(SummaryRecord::new(SummaryKind::Between, label, summary))?;
        }
        Ok(())
    }

    pub fn write_test_summaries(
        &mut self,
        summaries: &IndexMap<String, IndexMap<String, Summary>>,
    ) -> Result<()> {
        for (individual, per_group) in summaries {
            for (group, summary) in per_group {
                let label = format!("{}{}{}", individual, PAIR_SEPARATOR, group);
                self.writer
                    .serialize(SummaryRecord::new(SummaryKind::Test, label, summary))?;
            }
        }
        Ok(())
    }

    /// One row per classified individual, with its group in `expected` if any
    pub fn write_predictions(&mut self, labels: &Labels, expected: &Population) -> Result<()> {
        for (individual, label) in labels.iter() {
            self.writer.serialize(PredictionRecord {
                individual,
                predicted: label.to_string(),
                expected: expected.group_of(individual),
            })?;
        }
        Ok(())
    }

    pub fn finish(mut self) -> Result<()> {
        self.writer.flush().context("Failed to flush report")?;
        Ok(())
    }
}
