//! Run event sink.
//!
//! The orchestrator and stage pipeline never log through global state
//! directly; they report [`RunEvent`]s to an injected [`RunObserver`].
//! [`TracingObserver`] forwards events to `tracing`, [`RecordingObserver`]
//! keeps them in memory for assertions.

use std::path::PathBuf;
use std::sync::Mutex;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::state::{CandidateState, Stage};
use crate::error::SkipReason;

/// Something that happened during a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RunEvent {
    RunStarted {
        run_id: String,
        structure_dir: PathBuf,
        output_dir: PathBuf,
        update: bool,
    },
    WeekSelected {
        week: String,
        ignored: Vec<String>,
    },
    /// A directory that is not a 4-character target id.
    DirectoryIgnored {
        name: String,
    },
    TargetSkipped {
        target: String,
        reason: SkipReason,
    },
    TargetMaterialized {
        target: String,
        work_dir: PathBuf,
        candidates: usize,
        rejected: usize,
    },
    CandidateRejected {
        target: String,
        file_name: String,
        reason: SkipReason,
    },
    /// State derived from existing artifacts before any stage runs.
    CandidateResumed {
        target: String,
        candidate: String,
        state: CandidateState,
    },
    StageStarted {
        target: String,
        candidate: String,
        stage: Stage,
    },
    ArtifactReused {
        target: String,
        candidate: String,
        stage: Stage,
        path: PathBuf,
    },
    /// The engine reported an error; the validator still decides.
    EngineFailed {
        target: String,
        candidate: String,
        stage: Stage,
        message: String,
    },
    StageCompleted {
        target: String,
        candidate: String,
        stage: Stage,
    },
    /// A pose other than the top pose could not be converted.
    PoseDropped {
        target: String,
        candidate: String,
        pose: u32,
        reason: SkipReason,
    },
    CandidateFailed {
        target: String,
        candidate: String,
        stage: Stage,
        reason: SkipReason,
    },
    CandidateDelivered {
        target: String,
        candidate: String,
        deliverable: PathBuf,
    },
    RunFinished {
        run_id: String,
        delivered: usize,
        failed: usize,
        skipped_targets: usize,
    },
}

/// Receives run events.
pub trait RunObserver: Send + Sync {
    fn on_event(&self, event: &RunEvent);
}

/// Forwards events to the `tracing` subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl RunObserver for TracingObserver {
    fn on_event(&self, event: &RunEvent) {
        match event {
            RunEvent::RunStarted {
                run_id,
                structure_dir,
                output_dir,
                update,
            } => info!(
                run_id = %run_id,
                structure_dir = %structure_dir.display(),
                output_dir = %output_dir.display(),
                update,
                "Starting docking run"
            ),
            RunEvent::WeekSelected { week, ignored } => {
                info!(week = %week, "Processing weekly dataset");
                if !ignored.is_empty() {
                    warn!(week = %week, ignored = ?ignored, "More than one week found, only the first is processed");
                }
            }
            RunEvent::DirectoryIgnored { name } => {
                debug!(directory = %name, "Not a target directory")
            }
            RunEvent::TargetSkipped { target, reason } => {
                error!(target_id = %target, reason = %reason, "Skipping target")
            }
            RunEvent::TargetMaterialized {
                target,
                work_dir,
                candidates,
                rejected,
            } => info!(
                target_id = %target,
                work_dir = %work_dir.display(),
                candidates,
                rejected,
                "Target materialized"
            ),
            RunEvent::CandidateRejected {
                target,
                file_name,
                reason,
            } => warn!(target_id = %target, file = %file_name, reason = %reason, "Skipping candidate"),
            RunEvent::CandidateResumed {
                target,
                candidate,
                state,
            } => info!(target_id = %target, candidate = %candidate, state = %state, "Resuming candidate"),
            RunEvent::StageStarted {
                target,
                candidate,
                stage,
            } => info!(target_id = %target, candidate = %candidate, stage = %stage, "Stage started"),
            RunEvent::ArtifactReused {
                target,
                candidate,
                stage,
                path,
            } => debug!(
                target_id = %target,
                candidate = %candidate,
                stage = %stage,
                path = %path.display(),
                "Reusing existing artifact"
            ),
            RunEvent::EngineFailed {
                target,
                candidate,
                stage,
                message,
            } => warn!(
                target_id = %target,
                candidate = %candidate,
                stage = %stage,
                "Engine call failed: {}",
                message
            ),
            RunEvent::StageCompleted {
                target,
                candidate,
                stage,
            } => debug!(target_id = %target, candidate = %candidate, stage = %stage, "Stage completed"),
            RunEvent::PoseDropped {
                target,
                candidate,
                pose,
                reason,
            } => warn!(
                target_id = %target,
                candidate = %candidate,
                pose,
                reason = %reason,
                "Dropping pose"
            ),
            RunEvent::CandidateFailed {
                target,
                candidate,
                stage,
                reason,
            } => error!(
                target_id = %target,
                candidate = %candidate,
                stage = %stage,
                reason = %reason,
                "Candidate failed"
            ),
            RunEvent::CandidateDelivered {
                target,
                candidate,
                deliverable,
            } => info!(
                target_id = %target,
                candidate = %candidate,
                deliverable = %deliverable.display(),
                "Candidate delivered"
            ),
            RunEvent::RunFinished {
                run_id,
                delivered,
                failed,
                skipped_targets,
            } => info!(
                run_id = %run_id,
                delivered,
                failed,
                skipped_targets,
                "Docking run finished"
            ),
        }
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<RunEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of the events recorded so far.
    pub fn events(&self) -> Vec<RunEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Number of recorded events matching `predicate`.
    pub fn count<F>(&self, predicate: F) -> usize
    where
        F: Fn(&RunEvent) -> bool,
    {
        self.events().iter().filter(|e| predicate(e)).count()
    }
}

impl RunObserver for RecordingObserver {
    fn on_event(&self, event: &RunEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}
