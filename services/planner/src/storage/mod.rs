pub mod staging;
pub mod tables;

pub use staging::{StagedTables, StagingWriter};
