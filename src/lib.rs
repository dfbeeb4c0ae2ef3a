//! dockprep: staged structure preparation and docking over weekly challenge
//! datasets.
//!
//! This library discovers targets and candidate structures, decodes their
//! provenance from file names, and drives each candidate through preparation,
//! grid construction, docking, and conversion with resumable, validated
//! stage artifacts.

// Core modules
pub mod cli;
pub mod dataset;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod prep;

// Re-export commonly used error types
pub use error::{DecodeError, EngineError, PipelineError, SkipReason};
