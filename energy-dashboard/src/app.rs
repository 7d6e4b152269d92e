use std::fs;

use tracing::info;

use crate::{
    config::AppConfig,
    dashboard::Dashboard,
    pipeline::{Pipeline, PipelineError, Sink},
    sinks::{csv_export::Rollup, BucketCsvSink, CombinedCsvSink, DashboardChartSink, SummarySink},
};

fn sinks(cfg: &AppConfig) -> Vec<Box<dyn Sink<Dashboard>>> {
    let out = &cfg.output;
    vec![
        Box::new(CombinedCsvSink::new(out.cleaned_data_path())),
        Box::new(BucketCsvSink::new(out.daily_totals_path(), Rollup::Daily)),
        Box::new(BucketCsvSink::new(out.weekly_totals_path(), Rollup::Weekly)),
        Box::new(SummarySink::new(out.summary_path())),
        Box::new(DashboardChartSink::new(&out.chart_path, out.chart_font.clone())),
    ]
}

/// Runs ingestion, rollups and every output sink in order.
///
/// Nothing is written unless ingestion succeeded, so a fatal setup error
/// leaves the output locations untouched.
pub async fn run(cfg: &AppConfig) -> Result<Dashboard, PipelineError> {
    let pipeline = Pipeline::from_config(cfg)?;
    let state = pipeline.run().await?;
    let dashboard = Dashboard::from_state(state);

    fs::create_dir_all(&cfg.output.dir).map_err(|e| {
        PipelineError::Sink(format!(
            "failed to create output directory '{}': {e}",
            cfg.output.dir.display()
        ))
    })?;

    for sink in sinks(cfg) {
        sink.write(&dashboard).await?;
    }

    info!(
        campus_total_kwh = dashboard.campus.campus_total(),
        buildings = dashboard.campus.len(),
        files_skipped = dashboard.stats.files_skipped,
        "analysis completed"
    );
    Ok(dashboard)
}
