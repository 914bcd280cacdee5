use std::hash::Hasher;

use fnv::FnvHasher;

use super::Compare;
use crate::error::Result;

/// Baseline comparer that ignores genotypes entirely.
///
/// The value for a pair is derived from a salted hash of each identifier, so
/// it is stable for a given salt and carries no genetic signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RandomComparer {
    salt: u64,
}

impl RandomComparer {
    pub fn new(salt: u64) -> Self {
        Self { salt }
    }

    pub fn salt(&self) -> u64 {
        self.salt
    }

    fn digest(&self, identifier: &str) -> String {
        let mut hasher = FnvHasher::default();
        hasher.write_u64(self.salt);
        hasher.write(identifier.as_bytes());
        format!("{:#x}", hasher.finish())
    }
}

impl Compare for RandomComparer {
    fn compare(&self, id1: &str, id2: &str) -> Result<u64> {
        let digest1 = self.digest(id1);
        let digest2 = self.digest(id2);

        Ok(digest1
            .bytes()
            .zip(digest2.bytes())
            .map(|(a, b)| u64::from(a.abs_diff(b)))
            .sum())
    }
}
