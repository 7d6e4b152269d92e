use std::path::{Path, PathBuf};

use campus_core::BucketTotal;
use time::{format_description::BorrowedFormatItem, macros::format_description, PrimitiveDateTime};

use super::{ensure_parent, write_error};
use crate::{
    dashboard::Dashboard,
    pipeline::{CombinedTable, PipelineError, Sink},
};

const TIMESTAMP_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

/// `Date` cell for the cleaned export: bare dates when the whole table sits
/// on midnight, full timestamps otherwise.
fn format_timestamp(ts: PrimitiveDateTime, date_only: bool) -> String {
    if date_only {
        ts.date().to_string()
    } else {
        ts.format(TIMESTAMP_FORMAT).unwrap_or_else(|_| ts.to_string())
    }
}

fn format_kwh(kwh: f64) -> String {
    // Debug keeps a trailing ".0" on whole numbers.
    format!("{kwh:?}")
}

pub fn write_combined(path: &Path, table: &CombinedTable) -> Result<(), PipelineError> {
    ensure_parent(path)?;
    let mut wtr = csv::Writer::from_path(path).map_err(|e| write_error(path, e))?;

    let mut header = vec!["Date", "kWh", "Building"];
    header.extend(table.extra_columns().iter().map(String::as_str));
    wtr.write_record(&header).map_err(|e| write_error(path, e))?;

    let date_only = table.all_midnight();
    for row in table.rows() {
        let mut record = vec![
            format_timestamp(row.reading.ts, date_only),
            format_kwh(row.reading.kwh),
            row.building.clone(),
        ];
        record.extend(
            table
                .extra_columns()
                .iter()
                .map(|c| row.extra_value(c).unwrap_or_default().to_string()),
        );
        wtr.write_record(&record).map_err(|e| write_error(path, e))?;
    }

    wtr.flush().map_err(|e| write_error(path, e))
}

pub fn write_buckets(path: &Path, buckets: &[BucketTotal]) -> Result<(), PipelineError> {
    ensure_parent(path)?;
    let mut wtr = csv::Writer::from_path(path).map_err(|e| write_error(path, e))?;

    wtr.write_record(["Date", "kWh"])
        .map_err(|e| write_error(path, e))?;
    for b in buckets {
        wtr.write_record([b.date.to_string(), format_kwh(b.kwh)])
            .map_err(|e| write_error(path, e))?;
    }

    wtr.flush().map_err(|e| write_error(path, e))
}

/// Writes the combined table as `Date,kWh,Building,<extra columns>`.
pub struct CombinedCsvSink {
    path: PathBuf,
}

impl CombinedCsvSink {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait::async_trait]
impl Sink<Dashboard> for CombinedCsvSink {
    async fn write(&self, input: &Dashboard) -> Result<(), PipelineError> {
        write_combined(&self.path, &input.combined)?;
        tracing::info!(path = %self.path.display(), rows = input.combined.len(), "saved combined data");
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rollup {
    Daily,
    Weekly,
}

/// Writes one of the rollup tables as `Date,kWh`.
pub struct BucketCsvSink {
    path: PathBuf,
    rollup: Rollup,
}

impl BucketCsvSink {
    pub fn new<P: Into<PathBuf>>(path: P, rollup: Rollup) -> Self {
        Self {
            path: path.into(),
            rollup,
        }
    }
}

#[async_trait::async_trait]
impl Sink<Dashboard> for BucketCsvSink {
    async fn write(&self, input: &Dashboard) -> Result<(), PipelineError> {
        let buckets = match self.rollup {
            Rollup::Daily => &input.daily,
            Rollup::Weekly => &input.weekly,
        };
        write_buckets(&self.path, buckets)?;
        tracing::info!(path = %self.path.display(), rows = buckets.len(), "saved {:?} totals", self.rollup);
        Ok(())
    }
}
