//! Pipeline module.
//!
//! This module provides the main cleaning pipeline and related components.

mod builder;
pub mod outliers;
pub mod progress;

pub use builder::{Pipeline, PipelineBuilder};
pub use outliers::{CapOutcome, OutlierCapper};
pub use progress::{
    ClosureProgressReporter, CleaningStage, ProgressReporter, ProgressUpdate,
};
