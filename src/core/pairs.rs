use fnv::FnvBuildHasher;
use indexmap::map::Entry;
use indexmap::IndexMap;

/// Unordered pair of identifiers, stored with the smaller one first
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PairKey {
    first: String,
    second: String,
}

impl PairKey {
    pub fn new(a: &str, b: &str) -> Self {
        let (first, second) = if a <= b { (a, b) } else { (b, a) };
        Self {
            first: first.to_string(),
            second: second.to_string(),
        }
    }

    pub fn first(&self) -> &str {
        &self.first
    }

    pub fn second(&self) -> &str {
        &self.second
    }
}

/// Map keyed by unordered pairs: `(a, b)` and `(b, a)` address the same entry
#[derive(Debug, Clone)]
pub struct PairMap<V> {
    inner: IndexMap<PairKey, V, FnvBuildHasher>,
}

impl<V> Default for PairMap<V> {
    fn default() -> Self {
        Self {
            inner: IndexMap::default(),
        }
    }
}

impl<V> PairMap<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: IndexMap::with_capacity_and_hasher(capacity, FnvBuildHasher::default()),
        }
    }

    /// Insert a value for the pair, returning the one it replaces
    pub fn insert(&mut self, a: &str, b: &str, value: V) -> Option<V> {
        self.inner.insert(PairKey::new(a, b), value)
    }

    pub fn get(&self, a: &str, b: &str) -> Option<&V> {
        self.inner.get(&PairKey::new(a, b))
    }

    pub fn get_mut(&mut self, a: &str, b: &str) -> Option<&mut V> {
        self.inner.get_mut(&PairKey::new(a, b))
    }

    pub fn entry(&mut self, a: &str, b: &str) -> Entry<'_, PairKey, V> {
        self.inner.entry(PairKey::new(a, b))
    }

    pub fn contains(&self, a: &str, b: &str) -> bool {
        self.inner.contains_key(&PairKey::new(a, b))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PairKey, &V)> {
        self.inner.iter()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl<V> FromIterator<(PairKey, V)> for PairMap<V> {
    fn from_iter<I: IntoIterator<Item = (PairKey, V)>>(iter: I) -> Self {
        Self {
            inner: iter.into_iter().collect(),
        }
    }
}
