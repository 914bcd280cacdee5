/// Allele code of the reference allele
pub const REFERENCE_ALLELE: &str = "0";

/// The genotype call of a sample field: its first `:`-delimited token
#[inline]
pub fn genotype_call(field: &str) -> &str {
    match field.split_once(':') {
        Some((call, _)) => call,
        None => field,
    }
}

/// Alleles of a sample field. Phased (`|`) and unphased (`/`) separators are
/// both accepted; a call without separators is a single haploid allele.
pub fn alleles(field: &str) -> impl Iterator<Item = &str> {
    genotype_call(field)
        .split(|c: char| c == '/' || c == '|')
        .map(str::trim)
}

/// The distinct non-reference alleles of a sample field, sorted.
///
/// Two fields compare equal here when they carry the same alternate alleles,
/// regardless of phasing, allele order or zygosity.
pub fn alternate_set(field: &str) -> Vec<&str> {
    let mut set: Vec<&str> = alleles(field)
        .filter(|allele| *allele != REFERENCE_ALLELE)
        .collect();
    set.sort_unstable();
    set.dedup();
    set
}

/// Reference / non-reference allele counts of one sample field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Genotype {
    pub refs: u32,
    pub alts: u32,
}

impl Genotype {
    /// Count alleles in a sample field. Anything other than the reference code
    /// (including the missing allele `.`) counts as non-reference.
    pub fn parse(field: &str) -> Self {
        let mut refs = 0;
        let mut alts = 0;
        for allele in alleles(field) {
            if allele == REFERENCE_ALLELE {
                refs += 1;
            } else {
                alts += 1;
            }
        }
        Self { refs, alts }
    }

    #[inline]
    pub fn ploidy(self) -> u32 {
        self.refs + self.alts
    }

    /// Fraction of non-reference alleles
    #[inline]
    pub fn dosage_ratio(self) -> f64 {
        // Splitting always yields at least one allele
        self.alts as f64 / self.ploidy().max(1) as f64
    }
}
