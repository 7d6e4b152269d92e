use campus_core::{Campus, Reading};

use crate::transform::MeterRow;

/// One ingested row of the combined table.
#[derive(Debug, Clone, PartialEq)]
pub struct CombinedRow {
    pub reading: Reading,
    pub building: String,
    /// Columns other than `Date` and `kWh`, as `(header, value)` pairs.
    pub extra: Vec<(String, String)>,
}

impl CombinedRow {
    pub fn extra_value(&self, column: &str) -> Option<&str> {
        self.extra
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }
}

/// Flattened union of every ingested row across buildings.
///
/// Tracks the union of extra column names in first-seen order so exports can
/// emit a rectangular table.
#[derive(Debug, Clone, Default)]
pub struct CombinedTable {
    rows: Vec<CombinedRow>,
    extra_columns: Vec<String>,
}

impl CombinedTable {
    pub fn push(&mut self, row: CombinedRow) {
        for (name, _) in &row.extra {
            if !self.extra_columns.iter().any(|c| c == name) {
                self.extra_columns.push(name.clone());
            }
        }
        self.rows.push(row);
    }

    pub fn rows(&self) -> &[CombinedRow] {
        &self.rows
    }

    pub fn extra_columns(&self) -> &[String] {
        &self.extra_columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn readings(&self) -> impl Iterator<Item = Reading> + '_ {
        self.rows.iter().map(|r| r.reading)
    }

    /// True when no row carries a time of day.
    pub fn all_midnight(&self) -> bool {
        self.rows
            .iter()
            .all(|r| r.reading.ts.time() == time::Time::MIDNIGHT)
    }
}

/// Validated rows of a single source, ready to be folded in.
#[derive(Debug, Clone)]
pub struct FileBatch {
    pub building: String,
    pub rows: Vec<MeterRow>,
    pub rows_read: u64,
    pub rows_rejected: u64,
}

impl FileBatch {
    pub fn new<S: Into<String>>(building: S) -> Self {
        Self {
            building: building.into(),
            rows: Vec::new(),
            rows_read: 0,
            rows_rejected: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub files_loaded: u64,
    pub files_skipped: u64,
    pub rows_read: u64,
    pub rows_rejected: u64,
    pub rows_ingested: u64,
}

/// Accumulated result of ingesting source files one by one.
#[derive(Debug, Clone, Default)]
pub struct IngestState {
    pub campus: Campus,
    pub combined: CombinedTable,
    pub stats: IngestStats,
}

impl IngestState {
    /// Folds one file's batch into the state.
    pub fn ingest(mut self, batch: FileBatch) -> Self {
        let FileBatch {
            building,
            rows,
            rows_read,
            rows_rejected,
        } = batch;

        self.stats.files_loaded += 1;
        self.stats.rows_read += rows_read;
        self.stats.rows_rejected += rows_rejected;
        self.stats.rows_ingested += rows.len() as u64;

        for row in rows {
            self.campus.add_reading(&building, row.reading.ts, row.reading.kwh);
            self.combined.push(CombinedRow {
                reading: row.reading,
                building: building.clone(),
                extra: row.extra,
            });
        }
        self
    }

    /// Records a source that was skipped as a whole.
    pub fn skip(mut self) -> Self {
        self.stats.files_skipped += 1;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn row(ts: time::PrimitiveDateTime, kwh: f64, extra: &[(&str, &str)]) -> MeterRow {
        MeterRow {
            reading: Reading::new(ts, kwh),
            extra: extra
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    fn batch(name: &str, rows: Vec<MeterRow>) -> FileBatch {
        let mut b = FileBatch::new(name);
        b.rows_read = rows.len() as u64;
        b.rows = rows;
        b
    }

    #[test]
    fn ingest_folds_batches_into_campus_and_combined_table() {
        let state = IngestState::default()
            .ingest(batch(
                "A",
                vec![
                    row(datetime!(2024-01-01 00:00:00), 10.0, &[]),
                    row(datetime!(2024-01-02 00:00:00), 20.0, &[]),
                ],
            ))
            .ingest(batch("B", vec![row(datetime!(2024-01-01 00:00:00), 5.0, &[])]));

        assert_eq!(state.campus.campus_total(), 35.0);
        assert_eq!(state.campus.highest_consumer(), Some(("A", 30.0)));
        assert_eq!(state.combined.len(), 3);
        assert_eq!(state.combined.rows()[2].building, "B");
        assert_eq!(state.stats.files_loaded, 2);
        assert_eq!(state.stats.rows_ingested, 3);
    }

    #[test]
    fn empty_batch_creates_no_building() {
        let state = IngestState::default().ingest(FileBatch::new("Annex"));
        assert!(state.campus.get("Annex").is_none());
        assert_eq!(state.stats.files_loaded, 1);
        assert!(state.combined.is_empty());
        assert_eq!(state.stats.rows_ingested, 0);
    }

    #[test]
    fn extra_columns_are_unioned_in_first_seen_order() {
        let state = IngestState::default()
            .ingest(batch(
                "A",
                vec![row(datetime!(2024-01-01 00:00:00), 1.0, &[("Meter", "m1")])],
            ))
            .ingest(batch(
                "B",
                vec![row(
                    datetime!(2024-01-01 06:00:00),
                    2.0,
                    &[("Floor", "2"), ("Meter", "m7")],
                )],
            ));

        assert_eq!(state.combined.extra_columns(), &["Meter".to_string(), "Floor".to_string()]);
        assert_eq!(state.combined.rows()[0].extra_value("Floor"), None);
        assert_eq!(state.combined.rows()[1].extra_value("Meter"), Some("m7"));
        assert!(!state.combined.all_midnight());
    }
}
