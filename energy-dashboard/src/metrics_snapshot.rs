use std::{fs, path::Path};

use anyhow::Context;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

static PROM_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Installs the Prometheus recorder so run counters are captured. No
/// listener is started; counters are only rendered by [`write_snapshot`].
pub fn init() -> anyhow::Result<()> {
    if PROM_HANDLE.get().is_some() {
        return Ok(());
    }
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .context("failed to install Prometheus metrics recorder")?;

    // Ignore error if the handle was already set; this should only be called once.
    let _ = PROM_HANDLE.set(handle);
    Ok(())
}

/// Writes the current counters in Prometheus text format.
pub fn write_snapshot(path: &Path) -> anyhow::Result<()> {
    let handle = PROM_HANDLE
        .get()
        .context("Prometheus recorder not initialized")?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, handle.render())
        .with_context(|| format!("failed to write metrics snapshot to '{}'", path.display()))?;

    tracing::info!(path = %path.display(), "saved metrics snapshot");
    Ok(())
}
