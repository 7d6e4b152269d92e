use campus_core::{rollup, BucketTotal, Campus};

use crate::pipeline::{CombinedTable, IngestState, IngestStats};

/// Everything the output sinks read. Built once after ingestion and never
/// modified.
#[derive(Debug, Clone)]
pub struct Dashboard {
    pub campus: Campus,
    pub combined: CombinedTable,
    pub daily: Vec<BucketTotal>,
    pub weekly: Vec<BucketTotal>,
    pub stats: IngestStats,
}

impl Dashboard {
    pub fn from_state(state: IngestState) -> Self {
        let IngestState {
            campus,
            combined,
            stats,
        } = state;

        let daily = rollup::daily(combined.readings());
        let weekly = rollup::weekly(combined.readings());
        tracing::info!(days = daily.len(), weeks = weekly.len(), "daily and weekly tables ready");

        Self {
            campus,
            combined,
            daily,
            weekly,
            stats,
        }
    }
}
