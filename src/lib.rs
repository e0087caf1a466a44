pub mod config;
pub mod pipeline;
pub mod pipeline_config;
pub mod providers;

pub use pipeline::{PipelineError, PipelineOrchestrator, PipelineResult};
pub use pipeline_config::PipelineConfig;

use tracing_subscriber::EnvFilter;

/// Install the global `tracing` subscriber for a binary.
///
/// `RUST_LOG` wins when set; otherwise [`config::default_log_filter`] applies.
/// Output goes to stderr so stdout stays reserved for the JSON result.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .with_writer(std::io::stderr)
        .init();
}
