//! normalize -> join -> score/classify -> rank, driven by [`Pipeline`].

pub mod join;
pub mod normalize;
pub mod rank;
pub mod runner;
pub mod scoring;

pub use normalize::{Degradation, SourceKind, Sourced};
pub use runner::{Pipeline, RunReport};
