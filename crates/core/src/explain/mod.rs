//! The explanation-synthesis pipeline, leaf-first.

pub mod agents;
pub mod orchestrator;
pub mod price_move;
pub mod ranking;
pub mod synthesis;

pub use orchestrator::{Explainer, PipelineOptions};
