use std::io::BufRead;

use indexmap::IndexSet;
use log::{debug, info, trace};

use super::Compare;
use crate::core::pairs::PairMap;
use crate::error::{Error, Result};
use crate::vcf::dispatch::{DataRow, Dispatcher, Flow, Header, RecordHandler};
use crate::vcf::genotype::alternate_set;

/// Counts, for every pair of target individuals, the variant rows where their
/// non-reference alleles differ.
///
/// The targets are fixed at construction. Per-pair state is created when the
/// header is read and turned into [`Differences`] once the stream is consumed.
#[derive(Debug)]
pub struct DifferenceCounter {
    targets: IndexSet<String>,
    // Header column of each target, same order as `targets`
    columns: Vec<usize>,
    // (i, j) indices into `targets`, i < j
    pairs: Vec<(usize, usize)>,
    counts: Vec<u64>,
}

impl DifferenceCounter {
    pub fn new<I, S>(targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            targets: targets.into_iter().map(Into::into).collect(),
            columns: Vec::new(),
            pairs: Vec::new(),
            counts: Vec::new(),
        }
    }

    pub fn targets(&self) -> impl Iterator<Item = &str> {
        self.targets.iter().map(String::as_str)
    }

    /// Consume a whole record stream
    pub fn consume<R: BufRead>(self, reader: R) -> Result<Differences> {
        self.consume_with(Dispatcher::new(reader))
    }

    pub fn consume_with<R: BufRead>(mut self, dispatcher: Dispatcher<R>) -> Result<Differences> {
        let summary = dispatcher.run(&mut self)?;
        debug!("Compared {} pairs over {} rows", self.pairs.len(), summary.data_rows);
        Ok(self.finish())
    }

    fn finish(self) -> Differences {
        let mut values = PairMap::with_capacity(self.pairs.len());
        for (&(i, j), count) in self.pairs.iter().zip(self.counts) {
            values.insert(&self.targets[i], &self.targets[j], count);
        }
        Differences { values }
    }
}

impl RecordHandler for DifferenceCounter {
    fn process_meta(&mut self, line: &str) -> Result<()> {
        trace!("Ignoring metadata: {}", line);
        Ok(())
    }

    fn process_individuals(&mut self, header: &Header) -> Result<()> {
        self.columns = header.resolve(self.targets.iter().map(String::as_str))?;

        let n = self.targets.len();
        self.pairs = (0..n)
            .flat_map(|i| (i + 1..n).map(move |j| (i, j)))
            .collect();
        self.counts = vec![0; self.pairs.len()];

        info!(
            "Comparing {} individuals ({} pairs)",
            self.targets.len(),
            self.pairs.len()
        );
        Ok(())
    }

    fn process_data(&mut self, row: &DataRow<'_>) -> Result<Flow> {
        // Each target's alleles are extracted once per row, not once per pair
        let alleles: Vec<Vec<&str>> = self
            .columns
            .iter()
            .map(|&column| alternate_set(row.sample(column)))
            .collect();

        for (count, &(i, j)) in self.counts.iter_mut().zip(&self.pairs) {
            if alleles[i] != alleles[j] {
                *count += 1;
            }
        }

        Ok(Flow::Continue)
    }
}

/// Per-pair difference counts of a consumed stream
#[derive(Debug, Clone, Default)]
pub struct Differences {
    values: PairMap<u64>,
}

impl Differences {
    pub fn values(&self) -> &PairMap<u64> {
        &self.values
    }
}

impl Compare for Differences {
    fn compare(&self, id1: &str, id2: &str) -> Result<u64> {
        self.values
            .get(id1, id2)
            .copied()
            .ok_or_else(|| Error::Lookup(format!("pair ({}, {})", id1, id2)))
    }
}
