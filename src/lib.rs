pub mod compare;
pub mod core;
pub mod error;
pub mod predict;
pub mod report;
pub mod utils;
pub mod vcf;

pub use error::{Error, Result};
