use std::{path::PathBuf, pin::Pin, sync::Arc};

use futures::{Stream, StreamExt};
use tracing::{debug, info, warn};

use crate::{
    config::AppConfig,
    sources::{self, BuildingCsvSource, RawMeterRow},
    transform::{MeterRow, RowValidation},
};

mod state;

pub use state::{CombinedRow, CombinedTable, FileBatch, IngestState, IngestStats};

#[derive(Debug, Clone)]
pub struct Envelope<T> {
    pub payload: T,
    /// 1-based record number within the originating file, header excluded.
    pub line: u64,
}

#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("source directory '{0}' not found")]
    SourceDirMissing(PathBuf),
    #[error("no '{suffix}' files found in '{dir}'")]
    NoSourceFiles { dir: PathBuf, suffix: String },
    #[error("no valid rows were ingested")]
    NoRowsIngested,
    #[error("'{path}' is missing required columns: {missing}")]
    MissingColumns { path: PathBuf, missing: String },
    #[error("source error: {0}")]
    Source(String),
    #[error("transform error: {0}")]
    Transform(String),
    #[error("sink error: {0}")]
    Sink(String),
}

impl PipelineError {
    /// Setup errors end the run; everything else is scoped to a file, a row
    /// or a single output.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::SourceDirMissing(_) | Self::NoSourceFiles { .. } | Self::NoRowsIngested
        )
    }
}

#[async_trait::async_trait]
pub trait Source<T>: Send + Sync {
    /// Building name the records of this source are filed under.
    fn name(&self) -> &str;

    async fn stream(
        &self,
    ) -> Pin<Box<dyn Stream<Item = Result<Envelope<T>, PipelineError>> + Send>>;
}

#[async_trait::async_trait]
pub trait Transform<I, O>: Send + Sync {
    async fn apply(&self, input: Envelope<I>) -> Result<Envelope<O>, PipelineError>;
}

#[async_trait::async_trait]
pub trait Sink<T: Sync>: Send + Sync {
    async fn write(&self, input: &T) -> Result<(), PipelineError>;
}

pub struct Pipeline<S> {
    pub sources: Vec<S>,
    pub validation: Arc<dyn Transform<RawMeterRow, MeterRow> + Send + Sync>,
}

impl Pipeline<BuildingCsvSource> {
    /// Discovers the configured source files. Fails when the directory is
    /// missing or holds no matching file.
    pub fn from_config(cfg: &AppConfig) -> Result<Self, PipelineError> {
        let files = sources::discover(&cfg.source.dir, &cfg.source.suffix)?;
        info!(count = files.len(), dir = %cfg.source.dir.display(), "found source files");

        let sources = files
            .into_iter()
            .map(|path| BuildingCsvSource::new(path, &cfg.source.suffix))
            .collect();

        Ok(Self {
            sources,
            validation: Arc::new(RowValidation::new(cfg.validation.reject_negative)),
        })
    }
}

impl<S> Pipeline<S>
where
    S: Source<RawMeterRow>,
{
    /// Folds every source into a fresh [`IngestState`].
    ///
    /// A source that fails part-way is skipped as a whole; rows rejected by
    /// validation are dropped without failing their file.
    pub async fn run(self) -> Result<IngestState, PipelineError> {
        let mut state = IngestState::default();

        for source in &self.sources {
            info!(building = source.name(), "loading source");
            match self.load(source).await {
                Ok(batch) => {
                    info!(
                        building = source.name(),
                        rows = batch.rows.len(),
                        rejected = batch.rows_rejected,
                        "source loaded"
                    );
                    metrics::counter!("dashboard_files_loaded_total").increment(1);
                    metrics::counter!("dashboard_rows_ingested_total").increment(batch.rows.len() as u64);
                    state = state.ingest(batch);
                }
                Err(e) => {
                    warn!(building = source.name(), error = %e, "source skipped");
                    metrics::counter!("dashboard_files_skipped_total").increment(1);
                    state = state.skip();
                }
            }
        }

        if state.stats.rows_ingested == 0 {
            return Err(PipelineError::NoRowsIngested);
        }

        info!(
            rows = state.combined.len(),
            buildings = state.campus.len(),
            "combined dataset ready"
        );
        Ok(state)
    }

    async fn load(&self, source: &S) -> Result<FileBatch, PipelineError> {
        let mut stream = source.stream().await;
        let mut batch = FileBatch::new(source.name());

        while let Some(item) = stream.next().await {
            let env = item?;
            let line = env.line;
            batch.rows_read += 1;

            match self.validation.apply(env).await {
                Ok(valid) => batch.rows.push(valid.payload),
                Err(e) => {
                    batch.rows_rejected += 1;
                    debug!(building = source.name(), line, error = %e, "row dropped");
                }
            }
        }

        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    struct StaticSource {
        name: &'static str,
        rows: Vec<Result<RawMeterRow, &'static str>>,
    }

    #[async_trait::async_trait]
    impl Source<RawMeterRow> for StaticSource {
        fn name(&self) -> &str {
            self.name
        }

        async fn stream(
            &self,
        ) -> Pin<Box<dyn Stream<Item = Result<Envelope<RawMeterRow>, PipelineError>> + Send>>
        {
            let items: Vec<_> = self
                .rows
                .iter()
                .cloned()
                .enumerate()
                .map(|(i, r)| {
                    r.map(|payload| Envelope { payload, line: i as u64 + 1 })
                        .map_err(|e| PipelineError::Source(e.to_string()))
                })
                .collect();
            Box::pin(futures::stream::iter(items))
        }
    }

    fn raw(ts: Option<time::PrimitiveDateTime>, kwh: Option<f64>) -> RawMeterRow {
        RawMeterRow { ts, kwh, extra: Vec::new() }
    }

    fn pipeline(sources: Vec<StaticSource>) -> Pipeline<StaticSource> {
        Pipeline {
            sources,
            validation: Arc::new(RowValidation::new(true)),
        }
    }

    #[tokio::test]
    async fn failing_source_contributes_nothing() {
        let good = StaticSource {
            name: "A",
            rows: vec![Ok(raw(Some(datetime!(2024-01-01 00:00:00)), Some(10.0)))],
        };
        let broken = StaticSource {
            name: "B",
            rows: vec![
                Ok(raw(Some(datetime!(2024-01-01 00:00:00)), Some(99.0))),
                Err("ragged record"),
            ],
        };

        let state = pipeline(vec![good, broken]).run().await.unwrap();
        assert_eq!(state.campus.len(), 1);
        assert_eq!(state.campus.campus_total(), 10.0);
        assert_eq!(state.stats.files_loaded, 1);
        assert_eq!(state.stats.files_skipped, 1);
    }

    #[tokio::test]
    async fn invalid_rows_are_dropped_not_fatal() {
        let source = StaticSource {
            name: "A",
            rows: vec![
                Ok(raw(None, Some(1.0))),
                Ok(raw(Some(datetime!(2024-01-01 00:00:00)), None)),
                Ok(raw(Some(datetime!(2024-01-01 00:00:00)), Some(f64::NAN))),
                Ok(raw(Some(datetime!(2024-01-02 00:00:00)), Some(4.0))),
            ],
        };

        let state = pipeline(vec![source]).run().await.unwrap();
        assert_eq!(state.stats.rows_read, 4);
        assert_eq!(state.stats.rows_rejected, 3);
        assert_eq!(state.stats.rows_ingested, 1);
        assert_eq!(state.combined.len(), 1);
    }

    #[tokio::test]
    async fn no_valid_rows_is_fatal() {
        let source = StaticSource {
            name: "A",
            rows: vec![Ok(raw(None, None))],
        };

        let err = pipeline(vec![source]).run().await.unwrap_err();
        assert!(matches!(err, PipelineError::NoRowsIngested));
        assert!(err.is_fatal());
    }
}
