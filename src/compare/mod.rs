pub mod difference;
pub mod random;

use indexmap::IndexMap;
use log::warn;

use crate::core::population::Population;
use crate::core::stats::{Model, Summary};
use crate::error::Result;

pub use difference::{DifferenceCounter, Differences};
pub use random::RandomComparer;

/// Something that yields a comparison value for two individuals
pub trait Compare {
    fn compare(&self, id1: &str, id2: &str) -> Result<u64>;
}

/// The comparers available to the command line
#[derive(Debug, Clone)]
pub enum Comparer {
    Difference(Differences),
    Random(RandomComparer),
}

impl Compare for Comparer {
    fn compare(&self, id1: &str, id2: &str) -> Result<u64> {
        match self {
            Comparer::Difference(differences) => differences.compare(id1, id2),
            Comparer::Random(random) => random.compare(id1, id2),
        }
    }
}

/// Comparison values between the members of every pair of groups, the
/// pair of a group with itself included
#[derive(Debug, Clone, PartialEq)]
pub struct GroupDistances {
    pub group1: String,
    pub group2: String,
    pub values: Vec<u64>,
}

/// Compare the members of every pair of groups (with replacement, in group
/// order). Within a group, individuals are never compared with themselves.
pub fn distances_by_group<C: Compare + ?Sized>(
    population: &Population,
    comparer: &C,
) -> Result<Vec<GroupDistances>> {
    let groups: Vec<(&str, &[String])> = population.items().collect();
    let mut result = Vec::with_capacity(groups.len() * (groups.len() + 1) / 2);

    for (i, &(group1, members1)) in groups.iter().enumerate() {
        for &(group2, members2) in &groups[i..] {
            let mut values = Vec::with_capacity(members1.len() * members2.len());
            for id1 in members1 {
                for id2 in members2 {
                    if group1 != group2 || id1 != id2 {
                        values.push(comparer.compare(id1, id2)?);
                    }
                }
            }

            result.push(GroupDistances {
                group1: group1.to_string(),
                group2: group2.to_string(),
                values,
            });
        }
    }

    Ok(result)
}

/// Summarise distances within each group and between each pair of groups
pub fn build_model<C: Compare + ?Sized>(population: &Population, comparer: &C) -> Result<Model> {
    let mut model = Model::new();

    for (group, members) in population.items() {
        if members.len() < 2 {
            warn!(
                "Group {} has {} member(s); no within-group distances to summarise",
                group,
                members.len()
            );
            continue;
        }

        let mut values = Vec::with_capacity(members.len() * (members.len() - 1) / 2);
        for (i, id1) in members.iter().enumerate() {
            for id2 in &members[i + 1..] {
                values.push(comparer.compare(id1, id2)? as f64);
            }
        }
        model.add_within_values(group, values)?;
    }

    let groups: Vec<(&str, &[String])> = population.items().collect();
    for (i, &(group1, members1)) in groups.iter().enumerate() {
        for &(group2, members2) in &groups[i + 1..] {
            let mut values = Vec::with_capacity(members1.len() * members2.len());
            for id1 in members1 {
                for id2 in members2 {
                    values.push(comparer.compare(id1, id2)? as f64);
                }
            }
            model.add_between_values(group1, group2, values)?;
        }
    }

    Ok(model)
}

/// For each test individual, summarise its comparison values against the
/// members of every training group
pub fn compare_test_individuals<C: Compare + ?Sized>(
    test: &Population,
    train: &Population,
    comparer: &C,
) -> Result<IndexMap<String, IndexMap<String, Summary>>> {
    let mut result = IndexMap::with_capacity(test.len());

    for individual in test.individuals() {
        let mut per_group = IndexMap::with_capacity(train.num_groups());
        for (group, members) in train.items() {
            let values = members
                .iter()
                .map(|member| comparer.compare(individual, member).map(|v| v as f64))
                .collect::<Result<Vec<_>>>()?;
            per_group.insert(group.to_string(), Summary::from_values(values)?);
        }
        result.insert(individual.to_string(), per_group);
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::pairs::PairMap;
    use crate::error::Error;

    /// Comparer backed by a fixed table of values
    struct Table(PairMap<u64>);

    impl Compare for Table {
        fn compare(&self, id1: &str, id2: &str) -> Result<u64> {
            self.0
                .get(id1, id2)
                .copied()
                .ok_or_else(|| Error::Lookup(format!("{}/{}", id1, id2)))
        }
    }

    fn fixture() -> (Population, Table) {
        let mut population = Population::new();
        for (id, group) in [("a1", "A"), ("a2", "A"), ("a3", "A"), ("b1", "B"), ("b2", "B")] {
            population.add_individual(id, group).unwrap();
        }

        let mut values = PairMap::new();
        values.insert("a1", "a2", 1);
        values.insert("a1", "a3", 2);
        values.insert("a2", "a3", 3);
        values.insert("b1", "b2", 4);
        values.insert("a1", "b1", 10);
        values.insert("a1", "b2", 12);
        values.insert("a2", "b1", 14);
        values.insert("a2", "b2", 16);
        values.insert("a3", "b1", 18);
        values.insert("a3", "b2", 20);

        (population, Table(values))
    }

    #[test]
    fn test_distances_by_group() {
        let (population, table) = fixture();
        let distances = distances_by_group(&population, &table).unwrap();

        let pairs: Vec<(&str, &str)> = distances
            .iter()
            .map(|d| (d.group1.as_str(), d.group2.as_str()))
            .collect();
        assert_eq!(pairs, vec![("A", "A"), ("A", "B"), ("B", "B")]);

        // Ordered pairs within a group, self-pairs excluded
        assert_eq!(distances[0].values, vec![1, 2, 1, 3, 2, 3]);
        assert_eq!(distances[1].values, vec![10, 12, 14, 16, 18, 20]);
        assert_eq!(distances[2].values, vec![4, 4]);
    }

    #[test]
    fn test_build_model() {
        let (population, table) = fixture();
        let model = build_model(&population, &table).unwrap();

        assert_eq!(model.within["A"].mean, 2.0);
        assert_eq!(model.within["B"].min, 4.0);
        let between = model.between.get("B", "A").unwrap();
        assert_eq!(between.min, 10.0);
        assert_eq!(between.max, 20.0);
        assert_eq!(between.mean, 15.0);
    }

    #[test]
    fn test_build_model_skips_singleton_groups() {
        let (mut population, table) = fixture();
        population.remove_individual("b2");

        let model = build_model(&population, &table).unwrap();
        assert!(!model.within.contains_key("B"));
        assert_eq!(model.between.get("A", "B").unwrap().mean, 14.0);
    }

    #[test]
    fn test_compare_test_individuals() {
        let (mut train, table) = fixture();
        train.remove_individual("a3");
        let mut test = Population::new();
        test.add_individual("a3", "A").unwrap();

        let result = compare_test_individuals(&test, &train, &table).unwrap();
        assert_eq!(result["a3"]["A"].mean, 2.5);
        assert_eq!(result["a3"]["B"].mean, 19.0);
    }

    #[test]
    fn test_lookup_errors_propagate() {
        let (mut population, table) = fixture();
        population.add_individual("c1", "A").unwrap();

        assert!(matches!(
            build_model(&population, &table),
            Err(Error::Lookup(_))
        ));
    }
}
