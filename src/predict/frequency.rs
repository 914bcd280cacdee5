use indexmap::IndexSet;
use log::{debug, info};

/// Groups whose allele frequencies the 1000 Genomes releases carry in the
/// INFO field, as `<GROUP>_AF=<value>[,<value>...]`
pub const SUPERPOPULATIONS: [&str; 5] = ["AFR", "AMR", "EAS", "EUR", "SAS"];
pub const FREQUENCY_SUFFIX: &str = "_AF";

const INFO_DELIMITER: char = ';';
const INFO_ASSIGNMENT: char = '=';
const VALUE_DELIMITER: char = ',';

/// True when `groups` is exactly the superpopulation set, in any order
pub fn is_superpopulation_set(groups: &IndexSet<String>) -> bool {
    groups.len() == SUPERPOPULATIONS.len()
        && SUPERPOPULATIONS.iter().all(|pop| groups.contains(*pop))
}

/// Per-group frequencies read from an INFO field, in the order of `groups`.
///
/// The frequencies of multiple alternate alleles are summed. Returns `None`
/// as soon as one group has no parsable entry.
pub fn info_frequencies(info: &str, groups: &IndexSet<String>) -> Option<Vec<(usize, f64)>> {
    let entries: Vec<(&str, &str)> = info
        .split(INFO_DELIMITER)
        .filter_map(|entry| entry.split_once(INFO_ASSIGNMENT))
        .collect();

    groups
        .iter()
        .enumerate()
        .map(|(idx, group)| {
            let (_, value) = entries.iter().rev().find(|(key, _)| {
                key.strip_suffix(FREQUENCY_SUFFIX) == Some(group.as_str())
            })?;
            let frequency = value
                .split(VALUE_DELIMITER)
                .map(|v| v.trim().parse::<f64>().ok())
                .sum::<Option<f64>>()?;
            Some((idx, frequency))
        })
        .collect()
}

/// Mean dosage ratio of each group's known individuals.
///
/// `members` holds `(column, group index)` for every known individual and
/// `ratios` the dosage ratio of every individual column of the row. Groups
/// without members are left out of the table.
pub fn mean_dosage(
    ratios: &[f64],
    members: &[(usize, usize)],
    num_groups: usize,
) -> Vec<(usize, f64)> {
    let mut sums = vec![0.0; num_groups];
    let mut totals = vec![0u32; num_groups];
    for &(column, group) in members {
        sums[group] += ratios[column];
        totals[group] += 1;
    }

    sums.into_iter()
        .zip(totals)
        .enumerate()
        .filter(|(_, (_, total))| *total > 0)
        .map(|(group, (sum, total))| (group, sum / total as f64))
        .collect()
}

/// Produces the per-group frequency table of each variant row.
///
/// Starts from the INFO field when the groups are the superpopulations and
/// switches to computed means for good the first time a row lacks them.
/// Rows already processed are not revisited.
#[derive(Debug, Clone)]
pub struct FrequencyEstimator {
    groups: IndexSet<String>,
    members: Vec<(usize, usize)>,
    from_info: bool,
}

impl FrequencyEstimator {
    pub fn new(groups: IndexSet<String>, members: Vec<(usize, usize)>) -> Self {
        let from_info = is_superpopulation_set(&groups);
        if from_info {
            info!("Reading superpopulation frequencies from the INFO field");
        }

        Self {
            groups,
            members,
            from_info,
        }
    }

    pub fn groups(&self) -> &IndexSet<String> {
        &self.groups
    }

    pub fn uses_info(&self) -> bool {
        self.from_info
    }

    pub fn frequencies(
        &mut self,
        info: &str,
        ratios: &[f64],
        line_number: usize,
    ) -> Vec<(usize, f64)> {
        if self.from_info {
            match info_frequencies(info, &self.groups) {
                Some(frequencies) => return frequencies,
                None => {
                    debug!(
                        "Line {} lacks superpopulation frequencies; computing them from now on",
                        line_number
                    );
                    self.from_info = false;
                }
            }
        }

        mean_dosage(ratios, &self.members, self.groups.len())
    }
}
