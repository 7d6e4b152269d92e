use anyhow::Result;
use energy_dashboard::{app, config::AppConfig, metrics_snapshot, observability};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    observability::init_tracing();

    // Load configuration
    let cfg = AppConfig::load()?;

    // Capture run counters only when a snapshot was asked for
    if cfg.metrics.is_some() {
        metrics_snapshot::init()?;
    }

    if let Err(e) = app::run(&cfg).await {
        tracing::error!(error = %e, fatal = e.is_fatal(), "dashboard run halted");
        return Err(e.into());
    }

    if let Some(metrics_cfg) = &cfg.metrics {
        metrics_snapshot::write_snapshot(&metrics_cfg.snapshot_path)?;
    }

    Ok(())
}
