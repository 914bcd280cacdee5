pub mod pairs;
pub mod population;
pub mod stats;

pub use pairs::{PairKey, PairMap};
pub use population::Population;
pub use stats::{Model, Summary};
