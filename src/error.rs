use thiserror::Error;

/// Errors raised while consuming a record stream or querying its results.
#[derive(Debug, Error)]
pub enum Error {
    /// A header or data line does not have the expected shape.
    #[error("Malformed record on line {line}: {reason}")]
    MalformedRecord { line: usize, reason: String },

    /// A requested individual is absent from the header's individual columns.
    #[error("Individual {0} not present in the VCF file")]
    MissingIndividual(String),

    /// A comparison or label was requested for something never accumulated.
    #[error("No value recorded for {0}")]
    Lookup(String),

    /// Summary statistics were requested over zero observations.
    #[error("Cannot compute statistics over an empty collection of values")]
    EmptyStatistics,

    #[error("Cannot compute statistics over a collection containing NaN")]
    NanStatistics,

    #[error("Individual {0} is already registered in the population")]
    DuplicateIndividual(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
