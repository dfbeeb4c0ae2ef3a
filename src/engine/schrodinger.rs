//! Schrodinger suite adapter.
//!
//! Runs `glide`, `split_structure.py` and `structconvert` as blocking child
//! processes. No timeout is applied: a hung engine blocks the run.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use super::{DockParams, DockingEngine, GridParams};
use crate::error::EngineError;
use crate::pipeline::config::EngineConfig;

/// Maximum stderr kept in an error message.
const MAX_STDERR_LENGTH: usize = 2_000;

/// Engine adapter invoking the Schrodinger command-line tools.
#[derive(Debug, Clone)]
pub struct SchrodingerEngine {
    glide: PathBuf,
    run_script: PathBuf,
    structconvert: PathBuf,
}

impl SchrodingerEngine {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            glide: config.glide(),
            run_script: config.run_script(),
            structconvert: config.structconvert(),
        }
    }

    async fn run<I, S>(&self, program: &Path, args: I, work_dir: &Path) -> Result<(), EngineError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let program_name = program.display().to_string();
        let start = Instant::now();

        let output = Command::new(program)
            .args(args)
            .current_dir(work_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|source| EngineError::Spawn {
                program: program_name.clone(),
                source,
            })?;

        debug!(
            program = %program_name,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Engine call finished with {}",
            output.status
        );

        if output.status.success() {
            Ok(())
        } else {
            Err(EngineError::NonZeroExit {
                program: program_name,
                code: output.status.code().unwrap_or(-1),
                stderr: truncate(String::from_utf8_lossy(&output.stderr).trim()),
            })
        }
    }
}

#[async_trait]
impl DockingEngine for SchrodingerEngine {
    fn name(&self) -> &str {
        "schrodinger"
    }

    async fn build_grid(
        &self,
        work_dir: &Path,
        _params: &GridParams,
        params_file: &Path,
    ) -> Result<(), EngineError> {
        self.run(
            &self.glide,
            [OsStr::new("-WAIT"), params_file.as_os_str()],
            work_dir,
        )
        .await
    }

    async fn dock(
        &self,
        work_dir: &Path,
        _params: &DockParams,
        params_file: &Path,
    ) -> Result<(), EngineError> {
        self.run(
            &self.glide,
            [OsStr::new("-WAIT"), params_file.as_os_str()],
            work_dir,
        )
        .await
    }

    async fn split(
        &self,
        work_dir: &Path,
        docked: &Path,
        output_base: &str,
    ) -> Result<(), EngineError> {
        let output = format!("{}.mae", output_base);
        self.run(
            &self.run_script,
            [
                OsStr::new("split_structure.py"),
                OsStr::new("-m"),
                OsStr::new("ligand"),
                OsStr::new("-many_files"),
                docked.as_os_str(),
                OsStr::new(&output),
            ],
            work_dir,
        )
        .await
    }

    async fn convert(
        &self,
        work_dir: &Path,
        input: &Path,
        output: &Path,
    ) -> Result<(), EngineError> {
        self.run(
            &self.structconvert,
            [input.as_os_str(), output.as_os_str()],
            work_dir,
        )
        .await
    }
}

fn truncate(s: &str) -> String {
    if s.len() <= MAX_STDERR_LENGTH {
        s.to_string()
    } else {
        let mut end = MAX_STDERR_LENGTH;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... [truncated]", &s[..end])
    }
}
