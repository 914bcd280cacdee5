use indexmap::IndexMap;

/// Votes cast for one individual, keyed by group index.
///
/// Groups keep the order of their first vote, which breaks ties when ranking.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoteTally {
    counts: IndexMap<usize, u64>,
}

impl VoteTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one vote for `group`
    #[inline]
    pub fn combine(&mut self, group: usize) {
        *self.counts.entry(group).or_insert(0) += 1;
    }

    pub fn extend(&mut self, votes: &[usize]) {
        for &group in votes {
            self.combine(group);
        }
    }

    pub fn count(&self, group: usize) -> u64 {
        self.counts.get(&group).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Groups with their vote counts, most voted first
    pub fn ranked(&self) -> Vec<(usize, u64)> {
        let mut ranked: Vec<(usize, u64)> = self.counts.iter().map(|(&g, &c)| (g, c)).collect();
        // Stable, so equal counts stay in first-vote order
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked
    }

    /// Resolve the tally to a group.
    ///
    /// The gap between the two highest counts must reach `resolution`. When
    /// `resolution` lies strictly between 0 and 1 the gap is taken relative to
    /// the top count. A tally without votes never resolves.
    pub fn finalize(&self, resolution: f64) -> Option<usize> {
        let ranked = self.ranked();
        let &(top_group, top_count) = ranked.first()?;
        let runner_up = ranked.get(1).map_or(0, |&(_, count)| count);

        let mut gap = (top_count - runner_up) as f64;
        if resolution > 0.0 && resolution < 1.0 {
            gap /= top_count as f64;
        }

        (gap >= resolution).then_some(top_group)
    }
}
