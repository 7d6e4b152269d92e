use tracing_subscriber::{
    filter::{Directive, LevelFilter},
    EnvFilter,
};

const DEFAULT_DIRECTIVE: &str = "energy_dashboard=info";

/// Console logging for a dashboard run. `RUST_LOG` directives are layered on
/// top of `energy_dashboard=info`.
pub fn init_tracing() {
    let directive: Directive = DEFAULT_DIRECTIVE
        .parse()
        .unwrap_or_else(|_| LevelFilter::INFO.into());
    let filter = EnvFilter::from_default_env().add_directive(directive);

    // A global subscriber may already be set (tests drive several runs).
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
