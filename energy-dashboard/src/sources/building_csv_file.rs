use std::{
    fs::File,
    path::{Path, PathBuf},
    pin::Pin,
};

use csv::StringRecord;
use futures::Stream;
use time::{
    format_description::{well_known::Rfc3339, BorrowedFormatItem},
    macros::format_description,
    Date, OffsetDateTime, PrimitiveDateTime, UtcOffset,
};

use super::RawMeterRow;
use crate::pipeline::{Envelope, PipelineError, Source};

const DATE_COLUMN: &str = "Date";
const KWH_COLUMN: &str = "kWh";
/// Replaced by the file-derived building name downstream.
const BUILDING_COLUMN: &str = "Building";

const DATETIME_FORMATS: &[&[BorrowedFormatItem<'static>]] = &[
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond]"),
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]"),
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
    format_description!("[year]-[month]-[day] [hour]:[minute]"),
    format_description!("[year]-[month]-[day]T[hour]:[minute]"),
    format_description!(
        "[month padding:none]/[day padding:none]/[year] [hour padding:none]:[minute]:[second]"
    ),
    format_description!("[month padding:none]/[day padding:none]/[year] [hour padding:none]:[minute]"),
];

const DATE_FORMATS: &[&[BorrowedFormatItem<'static>]] = &[
    format_description!("[year]-[month]-[day]"),
    format_description!("[month padding:none]/[day padding:none]/[year]"),
];

/// Parses a `Date` cell into a naive timestamp.
///
/// Offset-carrying RFC 3339 values are shifted to UTC. Date-only values land
/// on midnight. Returns `None` for anything unrecognised.
pub fn parse_timestamp(s: &str) -> Option<PrimitiveDateTime> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(ts) = OffsetDateTime::parse(s, &Rfc3339) {
        let utc = ts.to_offset(UtcOffset::UTC);
        return Some(PrimitiveDateTime::new(utc.date(), utc.time()));
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| PrimitiveDateTime::parse(s, *fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| Date::parse(s, *fmt).ok())
                .map(Date::midnight)
        })
}

fn parse_optional_f64(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        trimmed.parse().ok()
    }
}

/// Column positions resolved once per file.
struct Layout {
    width: usize,
    date: usize,
    kwh: usize,
    extra: Vec<(usize, String)>,
}

impl Layout {
    fn from_headers(headers: &StringRecord, path: &Path) -> Result<Self, PipelineError> {
        let find = |name: &str| headers.iter().position(|h| h == name);

        match (find(DATE_COLUMN), find(KWH_COLUMN)) {
            (Some(date), Some(kwh)) => {
                let extra = headers
                    .iter()
                    .enumerate()
                    .filter(|(idx, h)| *idx != date && *idx != kwh && *h != BUILDING_COLUMN)
                    .map(|(idx, h)| (idx, h.to_string()))
                    .collect();
                Ok(Self {
                    width: headers.len(),
                    date,
                    kwh,
                    extra,
                })
            }
            (date, kwh) => {
                let missing: Vec<&str> = [(date, DATE_COLUMN), (kwh, KWH_COLUMN)]
                    .into_iter()
                    .filter(|(idx, _)| idx.is_none())
                    .map(|(_, name)| name)
                    .collect();
                Err(PipelineError::MissingColumns {
                    path: path.to_path_buf(),
                    missing: missing.join(", "),
                })
            }
        }
    }

    fn row(&self, record: &StringRecord) -> RawMeterRow {
        let cell = |idx: usize| record.get(idx).unwrap_or("");
        RawMeterRow {
            ts: parse_timestamp(cell(self.date)),
            kwh: parse_optional_f64(cell(self.kwh)),
            extra: self
                .extra
                .iter()
                .map(|(idx, name)| (name.clone(), cell(*idx).to_string()))
                .collect(),
        }
    }
}

/// CSV source for one building's meter export.
///
/// Expected header columns (by name, exact match):
/// - Date (calendar date or date-time)
/// - kWh
///
/// Any other column is carried through untouched. The building name is the
/// file name with the source suffix stripped.
pub struct BuildingCsvSource {
    path: PathBuf,
    name: String,
}

impl BuildingCsvSource {
    pub fn new<P: Into<PathBuf>>(path: P, suffix: &str) -> Self {
        let path = path.into();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let name = file_name
            .strip_suffix(suffix)
            .map(str::to_string)
            .unwrap_or(file_name);
        Self { path, name }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait::async_trait]
impl Source<RawMeterRow> for BuildingCsvSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn stream(
        &self,
    ) -> Pin<Box<dyn Stream<Item = Result<Envelope<RawMeterRow>, PipelineError>> + Send>> {
        // Blocking reads are fine here: files are processed one at a time.
        let path = self.path.clone();
        let s = async_stream::try_stream! {
            let file = File::open(&path)
                .map_err(|e| PipelineError::Source(format!("failed to open CSV file: {e}")))?;
            // Short records are padded with empty cells; longer ones fail the file.
            let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(file);
            let headers = rdr
                .headers()
                .map_err(|e| PipelineError::Source(format!("failed to read CSV headers: {e}")))?
                .clone();
            let layout = Layout::from_headers(&headers, &path)?;

            let mut line: u64 = 0;
            for result in rdr.records() {
                let record = match result {
                    Ok(r) => r,
                    Err(e) => {
                        metrics::counter!("dashboard_csv_parse_errors_total").increment(1);
                        Err(PipelineError::Source(format!("failed to read CSV record: {e}")))?
                    }
                };
                line += 1;

                if record.len() > layout.width {
                    metrics::counter!("dashboard_csv_parse_errors_total").increment(1);
                    Err(PipelineError::Source(format!(
                        "record {line} has {} fields, header has {}",
                        record.len(),
                        layout.width
                    )))?;
                }

                yield Envelope {
                    payload: layout.row(&record),
                    line,
                };
            }
        };

        Box::pin(s)
    }
}
