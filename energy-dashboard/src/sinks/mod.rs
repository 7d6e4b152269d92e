use std::{fs, path::Path};

use crate::pipeline::PipelineError;

pub mod chart;
pub mod csv_export;
pub mod summary;

pub use chart::DashboardChartSink;
pub use csv_export::{BucketCsvSink, CombinedCsvSink};
pub use summary::SummarySink;

pub(crate) fn write_error<E: std::fmt::Display>(path: &Path, e: E) -> PipelineError {
    PipelineError::Sink(format!("failed to write '{}': {e}", path.display()))
}

pub(crate) fn ensure_parent(path: &Path) -> Result<(), PipelineError> {
    match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => fs::create_dir_all(parent).map_err(|e| write_error(path, e)),
        None => Ok(()),
    }
}
