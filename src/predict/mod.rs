pub mod frequency;
pub mod strategy;
pub mod tally;

use std::fmt;
use std::io::BufRead;

use fnv::{FnvHashMap, FnvHashSet};
use indexmap::{IndexMap, IndexSet};
use log::{debug, info, trace, warn};

use crate::core::population::Population;
use crate::error::{Error, Result};
use crate::vcf::dispatch::{DataRow, Dispatcher, Flow, Header, RecordHandler};
use crate::vcf::genotype::Genotype;

pub use frequency::FrequencyEstimator;
pub use strategy::Strategy;
pub use tally::VoteTally;

/// Printed in place of a group for individuals that could not be resolved
pub const UNRESOLVED_LABEL: &str = "---";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassifierConfig {
    pub strategy: Strategy,
    /// Distance margin a group must win by to receive a vote (t1)
    pub margin: f64,
    /// Vote gap the top group must win by to be assigned (t2)
    pub resolution: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::NearestMargin,
            margin: 0.0,
            resolution: 0.0,
        }
    }
}

/// Outcome of classifying one individual
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Label {
    Group(String),
    Unresolved,
}

impl Label {
    pub fn group(&self) -> Option<&str> {
        match self {
            Label::Group(group) => Some(group),
            Label::Unresolved => None,
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Group(group) => write!(f, "{}", group),
            Label::Unresolved => write!(f, "{}", UNRESOLVED_LABEL),
        }
    }
}

/// Labels of every classified individual, in classification order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Labels {
    labels: IndexMap<String, Label>,
}

impl Labels {
    pub fn label_of(&self, individual: &str) -> Result<&Label> {
        self.labels
            .get(individual)
            .ok_or_else(|| Error::Lookup(format!("label of {}", individual)))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Label)> {
        self.labels.iter().map(|(id, label)| (id.as_str(), label))
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Assigns individuals to the group whose per-variant allele frequencies
/// their own dosage ratios match best.
///
/// Known individuals (with their groups) and the individuals to classify are
/// fixed before consumption. Votes accumulate per individual while rows are
/// read and are resolved to [`Labels`] once the stream ends.
#[derive(Debug)]
pub struct Classifier {
    config: ClassifierConfig,
    known: Population,
    // `None` classifies every individual of the header
    requested: Option<IndexSet<String>>,
    polymorphisms: Option<FnvHashSet<String>>,
    seen: FnvHashSet<String>,

    estimator: Option<FrequencyEstimator>,
    // (individual, column) of each individual being classified
    targets: Vec<(String, usize)>,
    tallies: Vec<VoteTally>,
    ratios: Vec<f64>,
    labels: IndexMap<String, Label>,
}

impl Classifier {
    pub fn new(config: ClassifierConfig, known: Population) -> Self {
        Self {
            config,
            known,
            requested: None,
            polymorphisms: None,
            seen: FnvHashSet::default(),
            estimator: None,
            targets: Vec::new(),
            tallies: Vec::new(),
            ratios: Vec::new(),
            labels: IndexMap::new(),
        }
    }

    /// Classify only these individuals
    pub fn with_individuals<I, S>(mut self, individuals: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.requested = Some(individuals.into_iter().map(Into::into).collect());
        self
    }

    /// Only use rows whose identifier is in `ids`, and stop reading once all
    /// of them have been seen
    pub fn with_variant_filter<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.polymorphisms = Some(ids.into_iter().map(Into::into).collect());
        self
    }

    pub fn consume<R: BufRead>(self, reader: R) -> Result<Labels> {
        self.consume_with(Dispatcher::new(reader))
    }

    pub fn consume_with<R: BufRead>(mut self, dispatcher: Dispatcher<R>) -> Result<Labels> {
        let summary = dispatcher.run(&mut self)?;
        debug!(
            "Classified {} individuals over {} rows ({} used)",
            self.labels.len(),
            summary.data_rows,
            self.seen.len()
        );
        Ok(Labels {
            labels: self.labels,
        })
    }

    fn keeps(&mut self, id: &str) -> bool {
        match self.polymorphisms {
            Some(ref polymorphisms) => {
                if !polymorphisms.contains(id) {
                    return false;
                }
                if !self.seen.contains(id) {
                    self.seen.insert(id.to_string());
                }
                true
            }
            None => true,
        }
    }

    fn all_polymorphisms_seen(&self) -> bool {
        match self.polymorphisms {
            Some(ref polymorphisms) => {
                !polymorphisms.is_empty() && self.seen.len() == polymorphisms.len()
            }
            None => false,
        }
    }
}

impl RecordHandler for Classifier {
    fn process_meta(&mut self, line: &str) -> Result<()> {
        trace!("Ignoring metadata: {}", line);
        Ok(())
    }

    fn process_individuals(&mut self, header: &Header) -> Result<()> {
        let requested: Vec<&str> = match self.requested {
            Some(ref requested) => requested.iter().map(String::as_str).collect(),
            None => header.individuals().iter().map(String::as_str).collect(),
        };
        let columns = header.resolve(requested.iter().copied())?;
        let known_columns = header.resolve(self.known.individuals())?;

        if self.requested.is_some() {
            for individual in requested.iter().filter(|id| self.known.has_individual(id)) {
                warn!(
                    "Individual {} is both known and classified; its genotypes count towards {}",
                    individual,
                    self.known.group_of(individual).unwrap_or_default()
                );
            }
        }

        let groups: IndexSet<String> = self.known.groups().map(str::to_string).collect();
        let members: Vec<(usize, usize)> = self
            .known
            .individuals()
            .zip(known_columns)
            .filter_map(|(individual, column)| {
                let group = self.known.group_of(individual)?;
                Some((column, groups.get_index_of(group)?))
            })
            .collect();

        self.targets = requested
            .iter()
            .map(|id| id.to_string())
            .zip(columns)
            .collect();
        self.tallies = vec![VoteTally::new(); self.targets.len()];
        self.estimator = Some(FrequencyEstimator::new(groups, members));

        if matches!(self.polymorphisms, Some(ref p) if p.is_empty()) {
            warn!("Polymorphism filter is empty; no rows will be used");
        }

        info!(
            "Classifying {} individuals against {} known individuals in {} groups",
            self.targets.len(),
            self.known.len(),
            self.known.num_groups()
        );
        Ok(())
    }

    fn process_data(&mut self, row: &DataRow<'_>) -> Result<Flow> {
        if !self.keeps(row.id()) {
            trace!("Skipping variant {} on line {}", row.id(), row.line_number());
            return Ok(Flow::Continue);
        }

        let Some(ref mut estimator) = self.estimator else {
            return Ok(Flow::Continue);
        };

        self.ratios.clear();
        self.ratios
            .extend(row.samples().iter().map(|s| Genotype::parse(s).dosage_ratio()));

        let frequencies = estimator.frequencies(row.info(), &self.ratios, row.line_number());
        if frequencies.is_empty() {
            trace!("No group frequencies on line {}", row.line_number());
        } else {
            // Votes depend only on the ratio, so equal ratios share them
            let mut cache: FnvHashMap<u64, Vec<usize>> = FnvHashMap::default();
            let ClassifierConfig {
                strategy, margin, ..
            } = self.config;

            for ((_, column), tally) in self.targets.iter().zip(self.tallies.iter_mut()) {
                let ratio = self.ratios[*column];
                let votes = cache
                    .entry(ratio.to_bits())
                    .or_insert_with(|| strategy.votes(&frequencies, ratio, margin));
                tally.extend(votes);
            }
        }

        if self.all_polymorphisms_seen() {
            debug!("All {} polymorphisms seen", self.seen.len());
            return Ok(Flow::Stop);
        }
        Ok(Flow::Continue)
    }

    fn terminate(&mut self) -> Result<()> {
        let groups = match self.estimator {
            Some(ref estimator) => estimator.groups(),
            None => return Ok(()),
        };

        for ((individual, _), tally) in self.targets.iter().zip(&self.tallies) {
            let label = tally
                .finalize(self.config.resolution)
                .and_then(|idx| groups.get_index(idx))
                .map_or(Label::Unresolved, |group| Label::Group(group.clone()));
            trace!("{}: {} from {} votes", individual, label, tally.total());
            self.labels.insert(individual.clone(), label);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Cursor;

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn population(entries: &[(&str, &str)]) -> Population {
        let mut population = Population::new();
        for (id, group) in entries {
            population.add_individual(id, group).unwrap();
        }
        population
    }

    /// Header with individuals a1 a2 (group A), b1 b2 (group B) and u1 u2
    fn vcf(rows: &[(&str, &str, &str)]) -> Cursor<String> {
        let mut data = String::from("##fileformat=VCFv4.1\n");
        data.push_str(
            "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\ta1\ta2\tb1\tb2\tu1\tu2\n",
        );
        for (pos, (id, info, samples)) in rows.iter().enumerate() {
            data.push_str(&format!(
                "1\t{}\t{}\tA\tG\t.\tPASS\t{}\tGT\t{}\n",
                pos + 1,
                id,
                info,
                samples
            ));
        }
        Cursor::new(data)
    }

    fn known() -> Population {
        population(&[("a1", "A"), ("a2", "A"), ("b1", "B"), ("b2", "B")])
    }

    // A is mostly reference, B mostly alternate. u1 follows A, u2 follows B.
    const ROWS: [(&str, &str, &str); 3] = [
        ("rs1", ".", "0|0\t0|0\t1|1\t1|1\t0|0\t1|1"),
        ("rs2", ".", "0|0\t0|1\t1|1\t0|1\t0|0\t1|1"),
        ("rs3", ".", "0|1\t0|0\t1|1\t1|1\t0|0\t1|0"),
    ];

    fn classify(config: ClassifierConfig) -> Labels {
        Classifier::new(config, known())
            .with_individuals(["u1", "u2"])
            .consume(vcf(&ROWS))
            .unwrap()
    }

    #[rstest]
    #[case(Strategy::NearestMargin)]
    #[case(Strategy::PairwiseMargin)]
    fn test_classify(#[case] strategy: Strategy) {
        init_logger();
        let labels = classify(ClassifierConfig {
            strategy,
            ..Default::default()
        });

        assert_eq!(labels.len(), 2);
        assert_eq!(labels.label_of("u1").unwrap(), &Label::Group("A".to_string()));
        assert_eq!(labels.label_of("u2").unwrap(), &Label::Group("B".to_string()));
    }

    #[test]
    fn test_margin_suppresses_votes() {
        // Distance gaps never exceed 1
        let labels = classify(ClassifierConfig {
            margin: 1.5,
            ..Default::default()
        });
        assert_eq!(labels.label_of("u1").unwrap(), &Label::Unresolved);
        assert_eq!(labels.label_of("u1").unwrap().to_string(), UNRESOLVED_LABEL);
    }

    #[test]
    fn test_resolution_suppresses_labels() {
        // u1 wins 3 votes to 0, u2 only 2 to 1
        let labels = classify(ClassifierConfig {
            resolution: 3.0,
            ..Default::default()
        });
        assert_eq!(labels.label_of("u1").unwrap().group(), Some("A"));
        assert_eq!(labels.label_of("u2").unwrap(), &Label::Unresolved);
    }

    #[test]
    fn test_single_row_scenario() {
        // Ten haploid individuals per group give frequencies of 0.1 and 0.9
        let mut data = String::from("#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO");
        let mut samples = Vec::new();
        let mut known = Population::new();
        for i in 0..10 {
            data.push_str(&format!("\ta{}", i));
            known.add_individual(&format!("a{}", i), "A").unwrap();
            samples.push(if i == 0 { "1" } else { "0" });
        }
        for i in 0..10 {
            data.push_str(&format!("\tb{}", i));
            known.add_individual(&format!("b{}", i), "B").unwrap();
            samples.push(if i == 0 { "0" } else { "1" });
        }
        data.push_str("\tu\n");
        samples.push("0/0/0/0/0/0/0/0/0/0/0/0/0/0/0/0/0/0/0/1");
        data.push_str(&format!("1\t1\trs1\tA\tG\t.\tPASS\t.\t{}\n", samples.join("\t")));

        let config = |margin| ClassifierConfig {
            margin,
            ..Default::default()
        };

        let labels = Classifier::new(config(0.3), known.clone())
            .with_individuals(["u"])
            .consume(Cursor::new(data.clone()))
            .unwrap();
        assert_eq!(labels.label_of("u").unwrap().group(), Some("A"));

        let labels = Classifier::new(config(0.9), known)
            .with_individuals(["u"])
            .consume(Cursor::new(data))
            .unwrap();
        assert_eq!(labels.label_of("u").unwrap(), &Label::Unresolved);
    }

    #[test]
    fn test_deterministic() {
        let config = ClassifierConfig {
            strategy: Strategy::PairwiseMargin,
            margin: 0.1,
            resolution: 0.5,
        };
        assert_eq!(classify(config), classify(config));
    }

    #[test]
    fn test_all_header_individuals_by_default() {
        let labels = Classifier::new(ClassifierConfig::default(), known())
            .consume(vcf(&ROWS))
            .unwrap();

        let ids: Vec<&str> = labels.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["a1", "a2", "b1", "b2", "u1", "u2"]);
        assert_eq!(labels.label_of("b1").unwrap().group(), Some("B"));
    }

    #[test]
    fn test_missing_individuals() {
        let err = Classifier::new(ClassifierConfig::default(), known())
            .with_individuals(["u1", "x1"])
            .consume(vcf(&ROWS))
            .unwrap_err();
        assert!(matches!(err, Error::MissingIndividual(id) if id == "x1"));

        let mut known = known();
        known.add_individual("y1", "B").unwrap();
        let err = Classifier::new(ClassifierConfig::default(), known)
            .with_individuals(["u1"])
            .consume(vcf(&ROWS))
            .unwrap_err();
        assert!(matches!(err, Error::MissingIndividual(id) if id == "y1"));
    }

    #[test]
    fn test_unclassified_lookup_fails() {
        let labels = classify(ClassifierConfig::default());
        assert!(matches!(labels.label_of("a1"), Err(Error::Lookup(_))));
    }

    #[test]
    fn test_variant_filter_stops_early() {
        // The last row is malformed and must only be read when rs4 is wanted
        let mut rows = ROWS.to_vec();
        rows.push(("rs4", ".", "0|0"));

        let labels = Classifier::new(ClassifierConfig::default(), known())
            .with_individuals(["u1", "u2"])
            .with_variant_filter(["rs1", "rs2"])
            .consume(vcf(&rows))
            .unwrap();
        assert_eq!(labels.label_of("u2").unwrap().group(), Some("B"));

        let err = Classifier::new(ClassifierConfig::default(), known())
            .with_individuals(["u1", "u2"])
            .with_variant_filter(["rs1", "rs4"])
            .consume(vcf(&rows))
            .unwrap_err();
        assert!(matches!(err, Error::MalformedRecord { line: 6, .. }));
    }

    #[test]
    fn test_variant_filter_skips_rows() {
        // Only rs3 counts, where u2 is closer to A
        let labels = Classifier::new(ClassifierConfig::default(), known())
            .with_individuals(["u2"])
            .with_variant_filter(["rs3", "absent"])
            .consume(vcf(&ROWS))
            .unwrap();
        assert_eq!(labels.label_of("u2").unwrap().group(), Some("A"));
    }

    #[test]
    fn test_info_frequencies() {
        let known = population(&[
            ("a1", "AFR"),
            ("a2", "AMR"),
            ("b1", "EAS"),
            ("b2", "EUR"),
            ("u2", "SAS"),
        ]);
        let info = "AFR_AF=0.9;AMR_AF=0.1;EAS_AF=0.1;EUR_AF=0.1;SAS_AF=0.1";
        // Genotypes alone would put u1 in AMR, the INFO field says AFR
        let rows = [("rs1", info, "0|0\t1|1\t1|1\t1|1\t1|1\t0|0")];

        let labels = Classifier::new(ClassifierConfig::default(), known)
            .with_individuals(["u1"])
            .consume(vcf(&rows))
            .unwrap();
        assert_eq!(labels.label_of("u1").unwrap().group(), Some("AFR"));
    }
}
