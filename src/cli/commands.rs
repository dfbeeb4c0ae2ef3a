//! CLI command definitions for dockprep.
//!
//! `run` drives the full pipeline over the first week of a challenge data
//! directory; `inspect` reports what a run would attempt without writing
//! anything.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use crate::dataset::{ChallengeData, ChallengeSource};
use crate::engine::SchrodingerEngine;
use crate::pipeline::{
    inspect, CandidateState, InspectionReport, PipelineConfig, RunOrchestrator, RunSummary,
    TargetStatus, TracingObserver,
};
use crate::prep::{create_preparer, PreparerKind};

/// Docking pipeline for weekly structure challenge datasets.
#[derive(Parser)]
#[command(name = "dockprep")]
#[command(about = "Prepare candidate structures and dock ligands against weekly challenge targets")]
#[command(version)]
#[command(
    long_about = "dockprep walks a weekly challenge dataset, prepares every candidate structure of every target, builds a docking grid, docks the target ligand, and delivers the top pose as <prefix>_docked.mol.\n\nRe-running without --update resumes from the first missing artifact of each candidate.\n\nExample usage:\n  dockprep run --structuredir /data/celpp --outdir /scratch/dock"
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,
}

impl Cli {
    /// Run log file for this invocation, if the command writes one.
    ///
    /// A run over an invalid dataset gets none, so it aborts without
    /// touching the output directory.
    pub fn log_path(&self) -> Option<PathBuf> {
        match &self.command {
            Commands::Run(args) => args
                .to_config()
                .ok()
                .filter(|config| ChallengeData::new(&config.structure_dir).is_valid())
                .map(|config| config.log_path()),
            Commands::Inspect(_) => None,
        }
    }
}

/// Available CLI subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Run the staged docking pipeline.
    Run(RunArgs),

    /// Report targets and candidates without processing anything.
    #[command(alias = "ls")]
    Inspect(InspectArgs),
}

/// Arguments for `dockprep run`.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Challenge data directory (`<dir>/<week>/<target>/`).
    #[arg(long = "structuredir", short = 's')]
    pub structure_dir: PathBuf,

    /// Working directory; one subdirectory per target is created here.
    #[arg(long = "outdir", short = 'o')]
    pub output_dir: PathBuf,

    /// Recompute every stage even when its artifact already exists.
    #[arg(long)]
    pub update: bool,

    /// YAML configuration file.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Structure preparation: pass-through or receptor-only.
    #[arg(long)]
    pub preparer: Option<PreparerKind>,

    /// Schrodinger installation root.
    #[arg(long, env = "SCHRODINGER")]
    pub schrodinger: Option<PathBuf>,

    /// Run log file (default: <outdir>/final.log).
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Output JSON summary.
    #[arg(short = 'j', long)]
    pub json: bool,
}

impl RunArgs {
    /// Resolves the configuration: file, then environment, then flags.
    pub fn to_config(&self) -> anyhow::Result<PipelineConfig> {
        let mut config = load_base_config(self.config.as_deref())?;
        config
            .apply_env(|key| std::env::var(key).ok())
            .context("invalid environment configuration")?;

        config = config
            .with_structure_dir(&self.structure_dir)
            .with_output_dir(&self.output_dir);
        if self.update {
            config = config.with_update(true);
        }
        if let Some(preparer) = self.preparer {
            config = config.with_preparer(preparer);
        }
        if let Some(home) = &self.schrodinger {
            config = config.with_schrodinger_home(home);
        }
        if let Some(log_file) = &self.log_file {
            config = config.with_log_file(log_file);
        }

        config.validate().context("invalid configuration")?;
        Ok(config)
    }
}

/// Arguments for `dockprep inspect`.
#[derive(Parser, Debug)]
pub struct InspectArgs {
    /// Challenge data directory (`<dir>/<week>/<target>/`).
    #[arg(long = "structuredir", short = 's')]
    pub structure_dir: PathBuf,

    /// YAML configuration file (only the layout section is used).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output JSON report.
    #[arg(short = 'j', long)]
    pub json: bool,
}

fn load_base_config(path: Option<&Path>) -> anyhow::Result<PipelineConfig> {
    match path {
        Some(path) => PipelineConfig::from_yaml_file(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(PipelineConfig::default()),
    }
}

pub fn parse_cli() -> Cli {
    Cli::parse()
}

pub async fn run() -> anyhow::Result<()> {
    run_with_cli(parse_cli()).await
}

pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Run(args) => {
            run_pipeline_command(args).await?;
        }
        Commands::Inspect(args) => {
            run_inspect_command(args)?;
        }
    }
    Ok(())
}

async fn run_pipeline_command(args: RunArgs) -> anyhow::Result<()> {
    let config = args.to_config()?;

    let orchestrator = RunOrchestrator::new(
        config.clone(),
        Box::new(ChallengeData::new(&config.structure_dir)),
        Arc::new(SchrodingerEngine::new(&config.engine)),
        Arc::from(create_preparer(config.preparer)),
        Arc::new(TracingObserver),
    );

    let summary = orchestrator.run().await.context("docking run aborted")?;

    if args.json {
        let json = serde_json::to_string_pretty(&summary)?;
        println!("{json}");
    } else {
        print_run_summary(&summary);
    }
    Ok(())
}

fn print_run_summary(summary: &RunSummary) {
    println!("✓ Docking run completed");
    println!("  Run id:          {}", summary.run_id);
    println!(
        "  Week:            {}",
        summary.week.as_deref().unwrap_or("(none)")
    );
    println!("  Output dir:      {}", summary.output_dir.display());
    println!("  Delivered:       {}", summary.delivered_count());
    println!("  Failed:          {}", summary.failed_count());
    println!("  Rejected files:  {}", summary.rejected_count());
    println!("  Skipped targets: {}", summary.skipped_targets());
    if let Some(duration) = summary.duration() {
        println!("  Duration:        {}s", duration.num_seconds());
    }

    if summary.targets.is_empty() {
        return;
    }
    println!();
    for target in &summary.targets {
        match (&target.status, &target.skip_reason) {
            (TargetStatus::Skipped, Some(reason)) => {
                println!("  {} skipped: {}", target.target, reason);
            }
            _ => println!("  {} ({})", target.target, target.status),
        }
        for candidate in &target.candidates {
            match &candidate.state {
                CandidateState::Failed { stage, reason } => {
                    println!("    ✗ {} failed at {}: {}", candidate.prefix, stage, reason);
                }
                state => println!("    ✓ {} {}", candidate.prefix, state),
            }
        }
        for rejected in &target.rejected {
            println!("    - {} rejected: {}", rejected.file_name, rejected.reason);
        }
    }
}

fn run_inspect_command(args: InspectArgs) -> anyhow::Result<()> {
    let config = load_base_config(args.config.as_deref())?;
    let source = ChallengeData::new(&args.structure_dir);
    let report = inspect(&source, &args.structure_dir, &config.layout)
        .context("failed to inspect challenge data")?;

    if args.json {
        let json = serde_json::to_string_pretty(&report)?;
        println!("{json}");
    } else {
        print_inspection(&report);
    }
    Ok(())
}

fn print_inspection(report: &InspectionReport) {
    println!("Challenge data: {}", report.structure_dir.display());
    match &report.week {
        Some(week) => println!("Week:           {}", week),
        None => {
            println!("Week:           (none)");
            return;
        }
    }
    if !report.ignored_weeks.is_empty() {
        println!("Ignored weeks:  {}", report.ignored_weeks.join(", "));
    }
    if !report.ignored_directories.is_empty() {
        println!("Not targets:    {}", report.ignored_directories.join(", "));
    }
    println!(
        "Runnable:       {} targets, {} candidates",
        report.runnable_targets(),
        report.runnable_candidates()
    );
    println!();

    for target in &report.targets {
        match &target.skip_reason {
            Some(reason) => println!("  {} would be skipped: {}", target.target, reason),
            None => println!("  {} ligand {}", target.target, target.ligands.join(", ")),
        }
        for (file_name, prefix) in &target.candidates {
            println!("    + {} -> {}", file_name, prefix);
        }
        for file_name in &target.ligand_structures {
            println!("    . {} (ligand structure)", file_name);
        }
        for rejected in &target.rejected {
            println!("    - {}: {}", rejected.file_name, rejected.reason);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run_args() {
        let cli = Cli::try_parse_from([
            "dockprep",
            "run",
            "--structuredir",
            "/data/celpp",
            "--outdir",
            "/scratch/dock",
            "--update",
            "--preparer",
            "receptor-only",
            "--log-level",
            "debug",
        ])
        .unwrap();

        assert_eq!(cli.log_level, "debug");
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.structure_dir, PathBuf::from("/data/celpp"));
                assert_eq!(args.output_dir, PathBuf::from("/scratch/dock"));
                assert!(args.update);
                assert_eq!(args.preparer, Some(PreparerKind::ReceptorOnly));
                assert!(!args.json);
            }
            Commands::Inspect(_) => panic!("expected run"),
        }
    }

    #[test]
    fn test_run_requires_directories() {
        assert!(Cli::try_parse_from(["dockprep", "run", "--structuredir", "/data"]).is_err());
        assert!(Cli::try_parse_from(["dockprep", "run", "--preparer", "alchemy"]).is_err());
    }

    #[test]
    fn test_run_args_to_config() {
        let args = RunArgs {
            structure_dir: PathBuf::from("/data/celpp"),
            output_dir: PathBuf::from("/scratch/dock"),
            update: true,
            config: None,
            preparer: Some(PreparerKind::ReceptorOnly),
            schrodinger: Some(PathBuf::from("/opt/schrodinger")),
            log_file: Some(PathBuf::from("/tmp/dock.log")),
            json: false,
        };
        let config = args.to_config().unwrap();
        assert_eq!(config.structure_dir, PathBuf::from("/data/celpp"));
        assert_eq!(config.output_dir, PathBuf::from("/scratch/dock"));
        assert!(config.update);
        assert_eq!(config.preparer, PreparerKind::ReceptorOnly);
        assert_eq!(config.engine.glide(), PathBuf::from("/opt/schrodinger/glide"));
        assert_eq!(config.log_path(), PathBuf::from("/tmp/dock.log"));
    }

    #[test]
    fn test_run_log_file_requires_valid_dataset() {
        let temp = tempfile::TempDir::new().unwrap();
        let data = temp.path().join("challenge");
        let work = temp.path().join("work");
        let parse = || {
            Cli::try_parse_from([
                "dockprep",
                "run",
                "-s",
                data.to_str().unwrap(),
                "-o",
                work.to_str().unwrap(),
            ])
            .unwrap()
        };

        assert!(parse().log_path().is_none());

        std::fs::create_dir_all(data.join("celpp_week19_2016")).unwrap();
        assert_eq!(parse().log_path(), Some(work.join("final.log")));
        assert!(!work.exists());
    }

    #[test]
    fn test_inspect_has_no_log_file() {
        let cli = Cli::try_parse_from(["dockprep", "inspect", "-s", "/data/celpp", "--json"]).unwrap();
        assert!(cli.log_path().is_none());
    }
}
