/// How an individual's dosage ratio turns into votes at one variant.
///
/// A frequency table is a list of `(group index, frequency)` entries in group
/// order; groups without a frequency at that variant are simply absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Strategy {
    /// One vote for the closest group, if it beats the runner-up by the margin
    #[default]
    NearestMargin,
    /// One vote per pair of groups whose distances differ by the margin
    PairwiseMargin,
}

impl Strategy {
    pub fn votes(self, frequencies: &[(usize, f64)], ratio: f64, margin: f64) -> Vec<usize> {
        match self {
            Strategy::NearestMargin => nearest_margin(frequencies, ratio, margin),
            Strategy::PairwiseMargin => pairwise_margin(frequencies, ratio, margin),
        }
    }
}

fn nearest_margin(frequencies: &[(usize, f64)], ratio: f64, margin: f64) -> Vec<usize> {
    if frequencies.len() < 2 {
        return Vec::new();
    }

    let mut distances: Vec<(usize, f64)> = frequencies
        .iter()
        .map(|&(group, frequency)| (group, (ratio - frequency).abs()))
        .collect();
    distances.sort_by(|a, b| a.1.total_cmp(&b.1));

    let (best, best_distance) = distances[0];
    if distances[1].1 - best_distance >= margin {
        vec![best]
    } else {
        Vec::new()
    }
}

fn pairwise_margin(frequencies: &[(usize, f64)], ratio: f64, margin: f64) -> Vec<usize> {
    let mut votes = Vec::new();
    for (i, &(group1, frequency1)) in frequencies.iter().enumerate() {
        for &(group2, frequency2) in &frequencies[i + 1..] {
            let d = (ratio - frequency1).abs() - (ratio - frequency2).abs();
            if d.abs() >= margin {
                votes.push(if d < 0.0 { group1 } else { group2 });
            }
        }
    }
    votes
}
