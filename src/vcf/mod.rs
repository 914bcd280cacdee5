pub mod dispatch;
pub mod genotype;
pub mod reader;

pub use dispatch::{DataRow, DispatchSummary, Dispatcher, Flow, Header, RecordHandler};
pub use genotype::Genotype;
pub use reader::open_vcf;
