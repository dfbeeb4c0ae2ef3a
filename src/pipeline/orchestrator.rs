//! Run orchestrator.
//!
//! The top-level control loop of a docking run:
//! - Dataset validity and working root creation (the only fatal steps)
//! - Week selection and target filtering
//! - Per-target materialization, isolated from sibling targets
//! - Per-candidate stage pipeline, isolated from sibling candidates
//! - The run summary written into the working root
//!
//! Everything runs strictly sequentially: one target, one candidate, one
//! stage at a time.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use super::config::{LayoutSettings, PipelineConfig};
use super::observer::{RunEvent, RunObserver};
use super::stages::StagePipeline;
use super::summary::{RunSummary, TargetOutcome, SUMMARY_FILE_NAME};
use crate::dataset::{ChallengeSource, Navigator, RejectedCandidate, Target};
use crate::engine::DockingEngine;
use crate::error::{PipelineError, SkipReason};
use crate::prep::ProteinPreparer;

/// The week a run processes, plus the weeks it leaves alone.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SelectedWeek {
    name: String,
    target_dirs: Vec<PathBuf>,
    ignored: Vec<String>,
}

/// Takes the lexicographically first week.
fn select_week(weeks: BTreeMap<String, Vec<PathBuf>>) -> Option<SelectedWeek> {
    let mut weeks = weeks.into_iter();
    let (name, target_dirs) = weeks.next()?;
    Some(SelectedWeek {
        name,
        target_dirs,
        ignored: weeks.map(|(name, _)| name).collect(),
    })
}

fn load_week(
    source: &dyn ChallengeSource,
    structure_dir: &Path,
) -> Result<Option<SelectedWeek>, PipelineError> {
    if !source.is_valid() {
        return Err(PipelineError::InvalidDataset(structure_dir.to_path_buf()));
    }
    let weeks = source
        .get_targets()
        .map_err(|source| PipelineError::Listing {
            path: structure_dir.to_path_buf(),
            source,
        })?;
    Ok(select_week(weeks))
}

/// Coordinates a complete run over one weekly dataset.
pub struct RunOrchestrator {
    config: PipelineConfig,
    source: Box<dyn ChallengeSource>,
    navigator: Navigator,
    pipeline: StagePipeline,
    observer: Arc<dyn RunObserver>,
}

impl RunOrchestrator {
    pub fn new(
        config: PipelineConfig,
        source: Box<dyn ChallengeSource>,
        engine: Arc<dyn DockingEngine>,
        preparer: Arc<dyn ProteinPreparer>,
        observer: Arc<dyn RunObserver>,
    ) -> Self {
        let navigator = Navigator::new(config.layout.clone());
        let pipeline = StagePipeline::new(config.clone(), engine, preparer, Arc::clone(&observer));
        Self {
            config,
            source,
            navigator,
            pipeline,
            observer,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Runs every target of the first week.
    ///
    /// Returns `Err` only when the dataset is invalid, the working root cannot
    /// be created, or the summary cannot be written. Failed targets and
    /// candidates are recorded in the summary.
    pub async fn run(&self) -> Result<RunSummary, PipelineError> {
        let config = &self.config;
        let mut summary = RunSummary::new(&config.structure_dir, &config.output_dir, config.update);
        self.emit(RunEvent::RunStarted {
            run_id: summary.run_id.clone(),
            structure_dir: config.structure_dir.clone(),
            output_dir: config.output_dir.clone(),
            update: config.update,
        });

        let week = load_week(self.source.as_ref(), &config.structure_dir)?;

        std::fs::create_dir_all(&config.output_dir).map_err(|source| {
            PipelineError::WorkingDirectory {
                path: config.output_dir.clone(),
                source,
            }
        })?;

        if let Some(week) = week {
            self.emit(RunEvent::WeekSelected {
                week: week.name.clone(),
                ignored: week.ignored.clone(),
            });
            summary.week = Some(week.name);

            let (targets, ignored) = self.navigator.partition_targets(week.target_dirs);
            for name in &ignored {
                self.emit(RunEvent::DirectoryIgnored { name: name.clone() });
            }
            summary.ignored_directories = ignored;

            for target in &targets {
                let outcome = self.run_target(target).await;
                summary.targets.push(outcome);
            }
        }

        summary.finish();
        summary.write(&config.output_dir.join(SUMMARY_FILE_NAME))?;
        self.emit(RunEvent::RunFinished {
            run_id: summary.run_id.clone(),
            delivered: summary.delivered_count(),
            failed: summary.failed_count(),
            skipped_targets: summary.skipped_targets(),
        });
        Ok(summary)
    }

    async fn run_target(&self, target: &Target) -> TargetOutcome {
        let target_id = target.id.to_string();

        let materialized = match self
            .navigator
            .enumerate_candidates(target, &self.config.output_dir)
        {
            Ok(materialized) => materialized,
            Err(reason) => {
                self.emit(RunEvent::TargetSkipped {
                    target: target_id.clone(),
                    reason: reason.clone(),
                });
                return TargetOutcome::skipped(target_id, reason);
            }
        };

        self.emit(RunEvent::TargetMaterialized {
            target: target_id.clone(),
            work_dir: materialized.work_dir.clone(),
            candidates: materialized.candidates.len(),
            rejected: materialized.rejected.len(),
        });
        for rejected in &materialized.rejected {
            self.emit(RunEvent::CandidateRejected {
                target: target_id.clone(),
                file_name: rejected.file_name.clone(),
                reason: rejected.reason.clone(),
            });
        }

        let mut outcomes = Vec::with_capacity(materialized.candidates.len());
        for candidate in &materialized.candidates {
            outcomes.push(self.pipeline.run_candidate(&materialized, candidate).await);
        }

        TargetOutcome::processed(target_id, outcomes, materialized.rejected)
    }

    /// Discovery report without touching the working root.
    pub fn inspect(&self) -> Result<InspectionReport, PipelineError> {
        inspect(
            self.source.as_ref(),
            &self.config.structure_dir,
            &self.config.layout,
        )
    }

    fn emit(&self, event: RunEvent) {
        self.observer.on_event(&event);
    }
}

/// What a run would attempt for one target.
#[derive(Debug, Clone, Serialize)]
pub struct TargetInspection {
    pub target: String,
    pub source_dir: PathBuf,
    /// Accepted candidate file names with their prefixes.
    pub candidates: Vec<(String, String)>,
    pub rejected: Vec<RejectedCandidate>,
    /// Structure files excluded by the ligand marker.
    pub ligand_structures: Vec<String>,
    pub ligands: Vec<String>,
    pub center_present: bool,
    /// Why a run would skip the whole target.
    pub skip_reason: Option<SkipReason>,
}

/// Read-only discovery report over the first week of a dataset.
#[derive(Debug, Clone, Serialize)]
pub struct InspectionReport {
    pub structure_dir: PathBuf,
    pub week: Option<String>,
    pub ignored_weeks: Vec<String>,
    pub ignored_directories: Vec<String>,
    pub targets: Vec<TargetInspection>,
}

impl InspectionReport {
    /// Targets a run would materialize.
    pub fn runnable_targets(&self) -> usize {
        self.targets.iter().filter(|t| t.skip_reason.is_none()).count()
    }

    /// Candidates a run would drive through the stage pipeline.
    pub fn runnable_candidates(&self) -> usize {
        self.targets
            .iter()
            .filter(|t| t.skip_reason.is_none())
            .map(|t| t.candidates.len())
            .sum()
    }
}

/// Scans the first week of `source` and reports what a run would attempt.
pub fn inspect(
    source: &dyn ChallengeSource,
    structure_dir: &Path,
    layout: &LayoutSettings,
) -> Result<InspectionReport, PipelineError> {
    let mut report = InspectionReport {
        structure_dir: structure_dir.to_path_buf(),
        week: None,
        ignored_weeks: Vec::new(),
        ignored_directories: Vec::new(),
        targets: Vec::new(),
    };

    let week = match load_week(source, structure_dir)? {
        Some(week) => week,
        None => return Ok(report),
    };
    report.week = Some(week.name);
    report.ignored_weeks = week.ignored;

    let navigator = Navigator::new(layout.clone());
    let (targets, ignored) = navigator.partition_targets(week.target_dirs);
    report.ignored_directories = ignored;

    for target in targets {
        let scan = navigator
            .scan_target(&target)
            .map_err(|source| PipelineError::Listing {
                path: target.source_dir.clone(),
                source,
            })?;
        let skip_reason = navigator.check_companions(&scan).err();

        report.targets.push(TargetInspection {
            target: target.id.to_string(),
            source_dir: target.source_dir.clone(),
            candidates: scan
                .candidates
                .iter()
                .map(|c| (c.file_name.clone(), c.name.prefix()))
                .collect(),
            ligand_structures: scan.ligand_structures.clone(),
            ligands: scan
                .ligands
                .iter()
                .filter_map(|p| p.file_name())
                .map(|n| n.to_string_lossy().to_string())
                .collect(),
            center_present: scan.center_file.is_some(),
            rejected: scan.rejected,
            skip_reason,
        });
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_week_takes_first() {
        let mut weeks = BTreeMap::new();
        weeks.insert("celpp_week20_2016".to_string(), vec![PathBuf::from("b")]);
        weeks.insert("celpp_week19_2016".to_string(), vec![PathBuf::from("a")]);

        let week = select_week(weeks).unwrap();
        assert_eq!(week.name, "celpp_week19_2016");
        assert_eq!(week.target_dirs, vec![PathBuf::from("a")]);
        assert_eq!(week.ignored, vec!["celpp_week20_2016".to_string()]);
    }

    #[test]
    fn test_select_week_empty() {
        assert!(select_week(BTreeMap::new()).is_none());
    }
}
