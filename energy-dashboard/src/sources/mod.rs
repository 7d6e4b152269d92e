use std::{
    fs,
    path::{Path, PathBuf},
};

use time::PrimitiveDateTime;

use crate::pipeline::PipelineError;

pub mod building_csv_file;

pub use building_csv_file::{parse_timestamp, BuildingCsvSource};

/// A CSV row as read from disk, before validation.
///
/// `ts` and `kwh` are `None` when the cell is empty or unparseable.
#[derive(Debug, Clone, PartialEq)]
pub struct RawMeterRow {
    pub ts: Option<PrimitiveDateTime>,
    pub kwh: Option<f64>,
    pub extra: Vec<(String, String)>,
}

/// Lists the regular files in `dir` whose name ends with `suffix`, sorted by
/// file name.
pub fn discover(dir: &Path, suffix: &str) -> Result<Vec<PathBuf>, PipelineError> {
    if !dir.is_dir() {
        return Err(PipelineError::SourceDirMissing(dir.to_path_buf()));
    }

    let entries = fs::read_dir(dir).map_err(|e| {
        PipelineError::Source(format!("failed to list '{}': {e}", dir.display()))
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| {
            PipelineError::Source(format!("failed to list '{}': {e}", dir.display()))
        })?;
        let path = entry.path();
        let matches = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(suffix));
        if matches && path.is_file() {
            files.push(path);
        }
    }

    if files.is_empty() {
        return Err(PipelineError::NoSourceFiles {
            dir: dir.to_path_buf(),
            suffix: suffix.to_string(),
        });
    }

    files.sort();
    Ok(files)
}
