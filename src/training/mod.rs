pub mod assembler;
pub mod dataset;
pub mod influx;
pub mod metrics;
pub mod synthetic;
pub mod types;

pub use assembler::TrainingDataAssembler;
pub use dataset::Dataset;
pub use influx::{HistoricalSource, InfluxClient};
pub use synthetic::SyntheticGenerator;
pub use types::{RecordOrigin, TrainingRecord};
