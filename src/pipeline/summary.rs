//! Run summaries.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::state::CandidateState;
use crate::dataset::RejectedCandidate;
use crate::error::{PipelineError, SkipReason};

/// File name of the summary written into the working root.
pub const SUMMARY_FILE_NAME: &str = "run_summary.json";

/// Final result of one candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateOutcome {
    /// Source file name.
    pub file_name: String,
    /// Stable `<method_type>-<target_id>_<candidate_id>` prefix.
    pub prefix: String,
    /// State the candidate ended in.
    pub state: CandidateState,
    /// Path of the `_docked` deliverable when delivered.
    pub deliverable: Option<PathBuf>,
}

/// Status of a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetStatus {
    /// Materialized and its candidates run.
    Processed,
    /// Dropped before any candidate ran.
    Skipped,
}

impl std::fmt::Display for TargetStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetStatus::Processed => write!(f, "processed"),
            TargetStatus::Skipped => write!(f, "skipped"),
        }
    }
}

/// Final result of one target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetOutcome {
    pub target: String,
    pub status: TargetStatus,
    /// Why the target was skipped.
    pub skip_reason: Option<SkipReason>,
    pub candidates: Vec<CandidateOutcome>,
    /// Files rejected during discovery.
    pub rejected: Vec<RejectedCandidate>,
}

impl TargetOutcome {
    pub fn processed(
        target: impl Into<String>,
        candidates: Vec<CandidateOutcome>,
        rejected: Vec<RejectedCandidate>,
    ) -> Self {
        Self {
            target: target.into(),
            status: TargetStatus::Processed,
            skip_reason: None,
            candidates,
            rejected,
        }
    }

    pub fn skipped(target: impl Into<String>, reason: SkipReason) -> Self {
        Self {
            target: target.into(),
            status: TargetStatus::Skipped,
            skip_reason: Some(reason),
            candidates: Vec::new(),
            rejected: Vec::new(),
        }
    }
}

/// Summary of a complete run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// Unique identifier for this run.
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub structure_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Weekly dataset that was processed.
    pub week: Option<String>,
    pub update: bool,
    /// Directories ignored because they are not target ids.
    pub ignored_directories: Vec<String>,
    pub targets: Vec<TargetOutcome>,
}

impl RunSummary {
    /// Starts a new summary with a fresh run id.
    pub fn new(structure_dir: &Path, output_dir: &Path, update: bool) -> Self {
        Self {
            run_id: format!("run-{}", Uuid::new_v4()),
            started_at: Utc::now(),
            completed_at: None,
            structure_dir: structure_dir.to_path_buf(),
            output_dir: output_dir.to_path_buf(),
            week: None,
            update,
            ignored_directories: Vec::new(),
            targets: Vec::new(),
        }
    }

    /// Marks the run as completed.
    pub fn finish(&mut self) {
        self.completed_at = Some(Utc::now());
    }

    fn candidates(&self) -> impl Iterator<Item = &CandidateOutcome> {
        self.targets.iter().flat_map(|t| t.candidates.iter())
    }

    /// Number of candidates that produced a deliverable.
    pub fn delivered_count(&self) -> usize {
        self.candidates().filter(|c| c.state.is_delivered()).count()
    }

    /// Number of candidates that failed at some stage.
    pub fn failed_count(&self) -> usize {
        self.candidates().filter(|c| c.state.is_failed()).count()
    }

    /// Number of candidate files rejected during discovery.
    pub fn rejected_count(&self) -> usize {
        self.targets.iter().map(|t| t.rejected.len()).sum()
    }

    pub fn skipped_targets(&self) -> usize {
        self.targets
            .iter()
            .filter(|t| t.status == TargetStatus::Skipped)
            .count()
    }

    /// All deliverables of the run.
    pub fn deliverables(&self) -> Vec<&Path> {
        self.candidates()
            .filter_map(|c| c.deliverable.as_deref())
            .collect()
    }

    pub fn duration(&self) -> Option<chrono::Duration> {
        self.completed_at.map(|end| end - self.started_at)
    }

    /// Writes the summary as pretty JSON.
    pub fn write(&self, path: &Path) -> Result<(), PipelineError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}
