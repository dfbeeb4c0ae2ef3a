//! The per-candidate stage pipeline.
//!
//! A candidate moves through preparation, grid construction, docking,
//! splitting plus conversion, and delivery. Outside update mode the
//! candidate's state is first probed from disk and every stage it has already
//! passed is skipped outright. Each remaining step asks the resume controller
//! whether to run, discards the old output when it does, then hands the
//! expected output to the artifact validator; a rejected artifact fails the
//! candidate at that stage and no later stage is attempted.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use super::config::PipelineConfig;
use super::observer::{RunEvent, RunObserver};
use super::resume::should_recompute;
use super::state::{CandidateFiles, CandidateState, Stage};
use super::summary::CandidateOutcome;
use super::validator;
use crate::dataset::{DiscoveredCandidate, MaterializedTarget};
use crate::engine::{DockParams, DockingEngine, GridParams};
use crate::error::{EngineError, SkipReason};
use crate::prep::ProteinPreparer;

/// Identifies the candidate in emitted events.
struct Context<'a> {
    target: &'a str,
    candidate: &'a DiscoveredCandidate,
    files: &'a CandidateFiles,
}

/// Drives candidates through the ordered stages.
pub struct StagePipeline {
    config: PipelineConfig,
    engine: Arc<dyn DockingEngine>,
    preparer: Arc<dyn ProteinPreparer>,
    observer: Arc<dyn RunObserver>,
}

impl StagePipeline {
    pub fn new(
        config: PipelineConfig,
        engine: Arc<dyn DockingEngine>,
        preparer: Arc<dyn ProteinPreparer>,
        observer: Arc<dyn RunObserver>,
    ) -> Self {
        Self {
            config,
            engine,
            preparer,
            observer,
        }
    }

    /// Expected artifacts of `candidate` inside `work_dir`.
    pub fn files_for(&self, work_dir: &Path, candidate: &DiscoveredCandidate) -> CandidateFiles {
        CandidateFiles::new(
            work_dir,
            candidate,
            self.preparer.output_extension(),
            &self.config.layout,
        )
    }

    /// Runs one candidate to delivery or to its first failing stage.
    pub async fn run_candidate(
        &self,
        target: &MaterializedTarget,
        candidate: &DiscoveredCandidate,
    ) -> CandidateOutcome {
        let files = self.files_for(&target.work_dir, candidate);
        let ctx = Context {
            target: target.target.id.as_str(),
            candidate,
            files: &files,
        };

        let resumed = if self.config.update {
            CandidateState::Discovered
        } else {
            files.probe()
        };
        if resumed != CandidateState::Discovered {
            self.emit(RunEvent::CandidateResumed {
                target: ctx.target.to_string(),
                candidate: files.prefix.clone(),
                state: resumed.clone(),
            });
        }

        let state = match self.drive(&ctx, target, &resumed).await {
            Ok(()) => {
                let deliverable = files.path(&files.deliverable);
                self.emit(RunEvent::CandidateDelivered {
                    target: ctx.target.to_string(),
                    candidate: files.prefix.clone(),
                    deliverable,
                });
                CandidateState::Delivered
            }
            Err((stage, reason)) => {
                self.emit(RunEvent::CandidateFailed {
                    target: ctx.target.to_string(),
                    candidate: files.prefix.clone(),
                    stage,
                    reason: reason.clone(),
                });
                CandidateState::Failed { stage, reason }
            }
        };

        CandidateOutcome {
            file_name: candidate.file_name.clone(),
            prefix: files.prefix.clone(),
            deliverable: state
                .is_delivered()
                .then(|| files.path(&files.deliverable)),
            state,
        }
    }

    /// Runs every stage after the last one `resumed` reached.
    async fn drive(
        &self,
        ctx: &Context<'_>,
        target: &MaterializedTarget,
        resumed: &CandidateState,
    ) -> Result<(), (Stage, SkipReason)> {
        let at = |stage: Stage| move |reason: SkipReason| (stage, reason);

        if resumed.has_passed(Stage::Prepare) {
            self.skip_passed(ctx, Stage::Prepare);
        } else {
            self.prepare(ctx).await.map_err(at(Stage::Prepare))?;
        }

        if resumed.has_passed(Stage::Grid) {
            self.skip_passed(ctx, Stage::Grid);
        } else {
            self.build_grid(ctx, &target.center)
                .await
                .map_err(at(Stage::Grid))?;
        }

        if resumed.has_passed(Stage::Dock) {
            self.skip_passed(ctx, Stage::Dock);
        } else {
            self.dock(ctx, &target.ligand_file)
                .await
                .map_err(at(Stage::Dock))?;
        }

        let top_pose = if resumed.has_passed(Stage::Convert) {
            self.skip_passed(ctx, Stage::Convert);
            top_split_pose(ctx.files).map_err(at(Stage::Convert))?
        } else {
            self.convert(ctx).await.map_err(at(Stage::Convert))?
        };

        if resumed.has_passed(Stage::Deliver) {
            self.skip_passed(ctx, Stage::Deliver);
        } else {
            self.deliver(ctx, top_pose)
                .await
                .map_err(at(Stage::Deliver))?;
        }
        Ok(())
    }

    async fn prepare(&self, ctx: &Context<'_>) -> Result<(), SkipReason> {
        let files = ctx.files;
        let input = files.path(&files.raw);
        let output = files.expected_output(Stage::Prepare);
        self.stage_started(ctx, Stage::Prepare);

        if should_recompute(Stage::Prepare, &output, self.config.update) {
            discard(&output).await?;
            if !self.preparer.prepare(&input, &output, &ctx.candidate.name).await {
                return Err(SkipReason::PreparationRejected { input });
            }
        } else {
            self.reused(ctx, Stage::Prepare, &output);
        }

        validator::require(&output)?;
        self.stage_completed(ctx, Stage::Prepare);
        Ok(())
    }

    async fn build_grid(&self, ctx: &Context<'_>, center: &str) -> Result<(), SkipReason> {
        let files = ctx.files;
        let work_dir = files.work_dir.as_path();
        let params = GridParams::for_structure(&files.prepared, center, &self.config.grid);
        let params_file = params.input_file_name();
        self.stage_started(ctx, Stage::Grid);

        let output = files.path(&params.grid_file);
        self.run_step(ctx, Stage::Grid, &output, || async {
            params.write(&files.path(&params_file))?;
            self.engine
                .build_grid(work_dir, &params, Path::new(&params_file))
                .await
        })
        .await?;

        self.stage_completed(ctx, Stage::Grid);
        Ok(())
    }

    async fn dock(&self, ctx: &Context<'_>, ligand_file: &Path) -> Result<(), SkipReason> {
        let files = ctx.files;
        let work_dir = files.work_dir.as_path();
        let ligand = ligand_file
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let params = DockParams::new(&files.prefix, &files.grid, &ligand, &self.config.docking);
        let params_file = params.input_file_name();
        self.stage_started(ctx, Stage::Dock);

        let output = files.path(&params.output_file_name());
        self.run_step(ctx, Stage::Dock, &output, || async {
            params.write(&files.path(&params_file))?;
            self.engine
                .dock(work_dir, &params, Path::new(&params_file))
                .await
        })
        .await?;

        self.stage_completed(ctx, Stage::Dock);
        Ok(())
    }

    /// Splits the docked result and converts the receptor and every pose.
    /// Returns the top pose number.
    async fn convert(&self, ctx: &Context<'_>) -> Result<u32, SkipReason> {
        let files = ctx.files;
        let work_dir = files.work_dir.as_path();
        self.stage_started(ctx, Stage::Convert);

        let receptor_split = files.receptor_split();
        if should_recompute(Stage::Convert, &files.path(&receptor_split), self.config.update) {
            for pose in files.split_poses() {
                discard(&files.path(&files.pose_split(pose))).await?;
            }
        }
        self.run_step(ctx, Stage::Convert, &files.path(&receptor_split), || {
            self.engine
                .split(work_dir, Path::new(&files.docked), &files.split_base)
        })
        .await?;

        let poses = files.split_poses();
        let top = top_split_pose(files)?;

        let receptor_converted = files.receptor_converted();
        self.run_step(ctx, Stage::Convert, &files.path(&receptor_converted), || {
            self.engine.convert(
                work_dir,
                Path::new(&receptor_split),
                Path::new(&receptor_converted),
            )
        })
        .await?;

        for pose in poses {
            let input = files.pose_split(pose);
            let output = files.pose_converted(pose);
            let converted = self
                .run_step(ctx, Stage::Convert, &files.path(&output), || {
                    self.engine
                        .convert(work_dir, Path::new(&input), Path::new(&output))
                })
                .await;

            match converted {
                Ok(()) => {}
                Err(reason) if pose == top => return Err(reason),
                Err(reason) => self.emit(RunEvent::PoseDropped {
                    target: ctx.target.to_string(),
                    candidate: files.prefix.clone(),
                    pose,
                    reason,
                }),
            }
        }

        self.stage_completed(ctx, Stage::Convert);
        Ok(top)
    }

    /// Copies the top converted pose to the stable deliverable name.
    async fn deliver(&self, ctx: &Context<'_>, top_pose: u32) -> Result<(), SkipReason> {
        let files = ctx.files;
        let source = files.path(&files.pose_converted(top_pose));
        let output = files.expected_output(Stage::Deliver);
        self.stage_started(ctx, Stage::Deliver);

        if should_recompute(Stage::Deliver, &output, self.config.update) {
            discard(&output).await?;
            tokio::fs::copy(&source, &output)
                .await
                .map_err(|e| SkipReason::Materialization {
                    path: source.clone(),
                    message: e.to_string(),
                })?;
        } else {
            self.reused(ctx, Stage::Deliver, &output);
        }

        validator::require(&output)?;
        self.stage_completed(ctx, Stage::Deliver);
        Ok(())
    }

    /// Runs one engine call unless its output can be reused, then validates
    /// the output. The previous output is removed before a recompute, so a
    /// call that writes nothing leaves the artifact missing. Engine errors are
    /// reported but do not decide the outcome.
    async fn run_step<F, Fut>(
        &self,
        ctx: &Context<'_>,
        stage: Stage,
        output: &Path,
        step: F,
    ) -> Result<(), SkipReason>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), EngineError>>,
    {
        if should_recompute(stage, output, self.config.update) {
            discard(output).await?;
            if let Err(e) = step().await {
                self.emit(RunEvent::EngineFailed {
                    target: ctx.target.to_string(),
                    candidate: ctx.files.prefix.clone(),
                    stage,
                    message: e.to_string(),
                });
            }
        } else {
            self.reused(ctx, stage, output);
        }
        validator::require(output)
    }

    fn emit(&self, event: RunEvent) {
        self.observer.on_event(&event);
    }

    fn stage_started(&self, ctx: &Context<'_>, stage: Stage) {
        self.emit(RunEvent::StageStarted {
            target: ctx.target.to_string(),
            candidate: ctx.files.prefix.clone(),
            stage,
        });
    }

    fn stage_completed(&self, ctx: &Context<'_>, stage: Stage) {
        self.emit(RunEvent::StageCompleted {
            target: ctx.target.to_string(),
            candidate: ctx.files.prefix.clone(),
            stage,
        });
    }

    /// Records a stage the probed state already covers.
    fn skip_passed(&self, ctx: &Context<'_>, stage: Stage) {
        self.reused(ctx, stage, &ctx.files.expected_output(stage));
        self.stage_completed(ctx, stage);
    }

    fn reused(&self, ctx: &Context<'_>, stage: Stage, path: &Path) {
        self.emit(RunEvent::ArtifactReused {
            target: ctx.target.to_string(),
            candidate: ctx.files.prefix.clone(),
            stage,
            path: path.to_path_buf(),
        });
    }
}

/// Lowest-numbered split pose on disk.
fn top_split_pose(files: &CandidateFiles) -> Result<u32, SkipReason> {
    files
        .split_poses()
        .first()
        .copied()
        .ok_or_else(|| SkipReason::ArtifactMissing {
            path: files.path(&files.pose_split(1)),
        })
}

/// Removes a stale artifact; a file that is already gone is fine.
async fn discard(path: &Path) -> Result<(), SkipReason> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {
            debug!(path = %path.display(), "Removed previous artifact");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(SkipReason::Materialization {
            path: path.to_path_buf(),
            message: e.to_string(),
        }),
    }
}
