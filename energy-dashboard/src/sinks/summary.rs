use std::{fs, path::PathBuf};

use campus_core::Campus;

use super::{ensure_parent, write_error};
use crate::{
    dashboard::Dashboard,
    pipeline::{PipelineError, Sink},
};

/// Executive summary text: campus total, top consumer, then one report block
/// per building in first-seen order.
pub fn executive_summary(campus: &Campus) -> String {
    let mut text = String::from("\n================= EXECUTIVE SUMMARY =================\n");
    text.push_str(&format!(
        "Total Campus Consumption: {:.2} kWh\n",
        campus.campus_total()
    ));

    let (name, total) = campus.highest_consumer().unwrap_or(("None", 0.0));
    text.push_str(&format!("Highest Consuming Building: {name} ({total:.2} kWh)\n"));

    for b in campus.buildings() {
        text.push_str(&b.report());
    }

    text.push_str("\n=====================================================\n");
    text
}

pub struct SummarySink {
    path: PathBuf,
}

impl SummarySink {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait::async_trait]
impl Sink<Dashboard> for SummarySink {
    async fn write(&self, input: &Dashboard) -> Result<(), PipelineError> {
        ensure_parent(&self.path)?;
        fs::write(&self.path, executive_summary(&input.campus))
            .map_err(|e| write_error(&self.path, e))?;
        tracing::info!(path = %self.path.display(), "saved summary");
        Ok(())
    }
}
