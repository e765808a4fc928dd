//! Output of a cleaning run: the cleaned CSV and the JSON run report.

mod writer;

pub use writer::{DatasetWriter, RunReport};
