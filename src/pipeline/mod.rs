pub mod transcript;
pub mod entities;
pub mod sentiment;
pub mod soap;
pub mod orchestrator;

#[cfg(test)]
pub(crate) mod fixtures;

pub use orchestrator::{PipelineError, PipelineOrchestrator, PipelineResult};
