//! Staged docking pipeline.
//!
//! # Architecture
//!
//! - **Config** (`config`): run settings, env and YAML loading
//! - **State** (`state`): stages, candidate states, expected artifact names
//! - **Validator** (`validator`): the exists-and-non-empty gate between stages
//! - **Resume** (`resume`): recompute-or-reuse decision per stage
//! - **Stages** (`stages`): the per-candidate stage pipeline
//! - **Observer** (`observer`): the injected run event sink
//! - **Summary** (`summary`): per-target and per-candidate outcomes
//! - **Orchestrator** (`orchestrator`): the top-level control loop
//!
//! # Candidate Flow
//!
//! ```text
//! Discovered -> Prepared -> GridBuilt -> Docked -> Converted -> Delivered
//!      \____________\___________\__________\___________\--> Failed@<stage>
//! ```
//!
//! With `update` off, every stage whose artifact already exists is reused, so
//! a re-run over a partial working directory picks up where the last one
//! stopped.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use dockprep::dataset::ChallengeData;
//! use dockprep::engine::SchrodingerEngine;
//! use dockprep::pipeline::{PipelineConfig, RunOrchestrator, TracingObserver};
//! use dockprep::prep::create_preparer;
//!
//! let config = PipelineConfig::from_env()?
//!     .with_structure_dir("/data/celpp")
//!     .with_output_dir("/scratch/dock");
//!
//! let orchestrator = RunOrchestrator::new(
//!     config.clone(),
//!     Box::new(ChallengeData::new(&config.structure_dir)),
//!     Arc::new(SchrodingerEngine::new(&config.engine)),
//!     Arc::from(create_preparer(config.preparer)),
//!     Arc::new(TracingObserver),
//! );
//!
//! let summary = orchestrator.run().await?;
//! println!("{} delivered, {} failed", summary.delivered_count(), summary.failed_count());
//! ```

pub mod config;
pub mod observer;
pub mod orchestrator;
pub mod resume;
pub mod stages;
pub mod state;
pub mod summary;
pub mod validator;

pub use config::{
    ConfigError, DockSettings, EngineConfig, GridSettings, LayoutSettings, PipelineConfig,
};
pub use observer::{RecordingObserver, RunEvent, RunObserver, TracingObserver};
pub use orchestrator::{inspect, InspectionReport, RunOrchestrator, TargetInspection};
pub use resume::should_recompute;
pub use stages::StagePipeline;
pub use state::{CandidateFiles, CandidateState, Stage};
pub use summary::{CandidateOutcome, RunSummary, TargetOutcome, TargetStatus, SUMMARY_FILE_NAME};
pub use validator::{validate, ArtifactStatus};
