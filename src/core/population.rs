use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{bail, Context};
use indexmap::IndexMap;

use crate::error::{Error, Result};

/// Prefix on a group label that marks an individual whose group is to be predicted
pub const UNKNOWN_MARKER: char = '?';

/// A population: every individual belongs to exactly one group
///
/// Both directions are kept in sync: `individual -> group` and
/// `group -> [individuals]`, each in insertion order.
#[derive(Debug, Clone, Default)]
pub struct Population {
    individual_to_group: IndexMap<String, String>,
    group_to_individuals: IndexMap<String, Vec<String>>,
}

impl Population {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a new individual to `group`. Identifiers are unique across groups;
    /// moving an individual requires removing it first.
    pub fn add_individual(&mut self, identifier: &str, group: &str) -> Result<()> {
        if self.individual_to_group.contains_key(identifier) {
            return Err(Error::DuplicateIndividual(identifier.to_string()));
        }

        self.individual_to_group
            .insert(identifier.to_string(), group.to_string());
        self.group_to_individuals
            .entry(group.to_string())
            .or_default()
            .push(identifier.to_string());

        Ok(())
    }

    /// Remove an individual from both directions of the mapping, returning the
    /// group it belonged to. Groups left without members are dropped.
    pub fn remove_individual(&mut self, identifier: &str) -> Option<String> {
        let group = self.individual_to_group.shift_remove(identifier)?;

        if let Some(members) = self.group_to_individuals.get_mut(&group) {
            members.retain(|member| member != identifier);
            if members.is_empty() {
                self.group_to_individuals.shift_remove(&group);
            }
        }

        Some(group)
    }

    pub fn has_individual(&self, identifier: &str) -> bool {
        self.individual_to_group.contains_key(identifier)
    }

    pub fn group_of(&self, identifier: &str) -> Option<&str> {
        self.individual_to_group.get(identifier).map(String::as_str)
    }

    /// Individuals in the order they were added
    pub fn individuals(&self) -> impl Iterator<Item = &str> {
        self.individual_to_group.keys().map(String::as_str)
    }

    /// Groups in the order they were first seen
    pub fn groups(&self) -> impl Iterator<Item = &str> {
        self.group_to_individuals.keys().map(String::as_str)
    }

    /// (group, members) pairs in group order
    pub fn items(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.group_to_individuals
            .iter()
            .map(|(group, members)| (group.as_str(), members.as_slice()))
    }

    pub fn individuals_in(&self, group: &str) -> &[String] {
        self.group_to_individuals
            .get(group)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn num_groups(&self) -> usize {
        self.group_to_individuals.len()
    }

    pub fn len(&self) -> usize {
        self.individual_to_group.len()
    }

    pub fn is_empty(&self) -> bool {
        self.individual_to_group.is_empty()
    }

    /// Split off the individuals whose group label starts with [`UNKNOWN_MARKER`].
    ///
    /// They are removed from `self` and returned in a new population where the
    /// marker has been stripped, so the remaining label can still be reported
    /// as the expected group.
    pub fn take_unknown(&mut self) -> Population {
        let unknown: IndexMap<String, String> = self
            .individual_to_group
            .iter()
            .filter(|(_, group)| group.starts_with(UNKNOWN_MARKER))
            .map(|(identifier, group)| {
                let group = group.trim_start_matches(UNKNOWN_MARKER).to_string();
                (identifier.clone(), group)
            })
            .collect();

        for identifier in unknown.keys() {
            self.remove_individual(identifier);
        }

        Population::from_assignments(unknown)
    }

    /// Build from an `individual -> group` map, whose keys are unique already
    fn from_assignments(individual_to_group: IndexMap<String, String>) -> Self {
        let mut group_to_individuals: IndexMap<String, Vec<String>> = IndexMap::new();
        for (identifier, group) in &individual_to_group {
            group_to_individuals
                .entry(group.clone())
                .or_default()
                .push(identifier.clone());
        }

        Self {
            individual_to_group,
            group_to_individuals,
        }
    }
}

impl fmt::Display for Population {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} individuals in {} groups",
            self.len(),
            self.num_groups()
        )
    }
}

/// Read a population file: one `identifier group` pair per line, separated by
/// whitespace. Anything after `#` is a comment and blank lines are skipped.
pub fn parse_population<R: BufRead>(reader: R) -> anyhow::Result<Population> {
    let mut population = Population::new();

    for (line_num, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read line {}", line_num + 1))?;
        let content = match line.find('#') {
            Some(comment_start) => &line[..comment_start],
            None => line.as_str(),
        };

        let fields: Vec<&str> = content.split_whitespace().collect();
        match fields.as_slice() {
            [] => continue,
            [identifier, group] => population
                .add_individual(identifier, group)
                .with_context(|| format!("Invalid population entry on line {}", line_num + 1))?,
            _ => bail!(
                "Line {} ({:?}) is invalid: needs 2 fields, found {}",
                line_num + 1,
                line,
                fields.len()
            ),
        }
    }

    Ok(population)
}

pub fn read_population_file(path: impl AsRef<Path>) -> anyhow::Result<Population> {
    let file = File::open(path.as_ref()).with_context(|| {
        format!(
            "Failed to open population file: {}",
            path.as_ref().display()
        )
    })?;

    parse_population(BufReader::new(file))
        .with_context(|| format!("Failed to parse population file: {}", path.as_ref().display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Cursor;

    fn population(entries: &[(&str, &str)]) -> Population {
        let mut result = Population::new();
        for (identifier, group) in entries {
            result.add_individual(identifier, group).unwrap();
        }
        result
    }

    #[test]
    fn test_add_keeps_both_directions() {
        let pop = population(&[("HG1", "EUR"), ("HG2", "AFR"), ("HG3", "EUR")]);

        assert_eq!(pop.len(), 3);
        assert_eq!(pop.groups().collect::<Vec<_>>(), vec!["EUR", "AFR"]);
        assert_eq!(pop.individuals_in("EUR"), &["HG1", "HG3"]);
        assert_eq!(pop.group_of("HG2"), Some("AFR"));
    }

    #[test]
    fn test_duplicate_individual_is_rejected() {
        let mut pop = population(&[("HG1", "EUR")]);

        let err = pop.add_individual("HG1", "AFR").unwrap_err();
        assert!(matches!(err, Error::DuplicateIndividual(id) if id == "HG1"));
        assert_eq!(pop.individuals_in("EUR"), &["HG1"]);
        assert!(pop.individuals_in("AFR").is_empty());
    }

    #[test]
    fn test_remove_individual() {
        let mut pop = population(&[("HG1", "EUR"), ("HG2", "AFR"), ("HG3", "EUR")]);

        assert_eq!(pop.remove_individual("HG1"), Some("EUR".to_string()));
        assert!(!pop.has_individual("HG1"));
        for (_, members) in pop.items() {
            assert!(!members.iter().any(|m| m == "HG1"));
        }

        assert_eq!(pop.remove_individual("HG1"), None);
    }

    #[test]
    fn test_remove_last_member_drops_group() {
        let mut pop = population(&[("HG1", "EUR"), ("HG2", "AFR")]);
        pop.remove_individual("HG2");

        assert_eq!(pop.groups().collect::<Vec<_>>(), vec!["EUR"]);
        assert_eq!(pop.num_groups(), 1);
    }

    #[test]
    fn test_readd_changes_group() {
        let mut pop = population(&[("HG1", "EUR")]);
        pop.remove_individual("HG1");
        pop.add_individual("HG1", "SAS").unwrap();

        assert_eq!(pop.group_of("HG1"), Some("SAS"));
        assert_eq!(pop.individuals_in("SAS"), &["HG1"]);
    }

    #[test]
    fn test_take_unknown() {
        let mut pop = population(&[("HG1", "EUR"), ("HG2", "?AFR"), ("HG3", "?")]);
        let unknown = pop.take_unknown();

        assert_eq!(pop.individuals().collect::<Vec<_>>(), vec!["HG1"]);
        assert_eq!(unknown.individuals().collect::<Vec<_>>(), vec!["HG2", "HG3"]);
        assert_eq!(unknown.group_of("HG2"), Some("AFR"));
        assert_eq!(unknown.group_of("HG3"), Some(""));
    }

    #[test]
    fn test_take_unknown_keeps_both_directions() {
        let mut pop = population(&[
            ("HG1", "?EUR"),
            ("HG2", "AFR"),
            ("HG3", "?AFR"),
            ("HG4", "?EUR"),
        ]);
        let mut unknown = pop.take_unknown();

        assert_eq!(pop.groups().collect::<Vec<_>>(), vec!["AFR"]);
        assert_eq!(unknown.groups().collect::<Vec<_>>(), vec!["EUR", "AFR"]);
        assert_eq!(unknown.individuals_in("EUR"), &["HG1", "HG4"]);
        assert_eq!(unknown.individuals_in("AFR"), &["HG3"]);

        assert!(unknown.add_individual("HG4", "SAS").is_err());
        assert_eq!(unknown.remove_individual("HG3"), Some("AFR".to_string()));
        assert_eq!(unknown.num_groups(), 1);
    }

    #[test]
    fn test_parse_population() {
        let data = concat!(
            "# training individuals\n",
            "HG00096 EUR\n",
            "\n",
            "HG00097\tEUR   # trailing comment\n",
            "NA18486  AFR\n",
        );

        let pop = parse_population(Cursor::new(data)).unwrap();
        assert_eq!(pop.len(), 3);
        assert_eq!(pop.individuals_in("EUR"), &["HG00096", "HG00097"]);
        assert_eq!(pop.group_of("NA18486"), Some("AFR"));
    }

    #[rstest]
    #[case("HG00096\n")]
    #[case("HG00096 EUR extra\n")]
    #[case("HG00096 EUR\nHG00096 AFR\n")]
    fn test_parse_population_invalid(#[case] data: &str) {
        assert!(parse_population(Cursor::new(data)).is_err());
    }
}
