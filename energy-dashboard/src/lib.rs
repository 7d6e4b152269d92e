pub mod app;
pub mod config;
pub mod dashboard;
pub mod metrics_snapshot;
pub mod observability;
pub mod pipeline;
pub mod sinks;
pub mod sources;
pub mod transform;

pub use dashboard::Dashboard;
pub use pipeline::{Envelope, Pipeline, PipelineError};
