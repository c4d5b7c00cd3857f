pub mod config;
pub mod error;
pub mod period;
pub mod pipeline;
pub mod schema;
pub mod sources;
pub mod storage;

pub use config::Config;
pub use error::PipelineError;
pub use period::PeriodId;
pub use pipeline::{Pipeline, RunReport};
