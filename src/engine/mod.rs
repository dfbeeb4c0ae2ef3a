//! External docking engine adapters.
//!
//! The engine is a black box driven through files: the pipeline writes a
//! parameter file, invokes one operation, and afterwards checks the expected
//! output with the artifact validator. An `Err` from any method is only logged;
//! success is decided by the files on disk.
//!
//! Each operation runs with the target working directory as its current
//! directory, and all paths passed in are relative to it.

pub mod params;
pub mod schrodinger;

use std::path::Path;

use async_trait::async_trait;

use crate::error::EngineError;

pub use params::{structure_stem, DockParams, GridParams};
pub use schrodinger::SchrodingerEngine;

/// Trait for docking engine adapters.
#[async_trait]
pub trait DockingEngine: Send + Sync {
    /// Returns the engine name for logs.
    fn name(&self) -> &str;

    /// Builds a search grid from the parameter file at `params_file`.
    async fn build_grid(
        &self,
        work_dir: &Path,
        params: &GridParams,
        params_file: &Path,
    ) -> Result<(), EngineError>;

    /// Docks the ligand against the grid described in `params_file`.
    async fn dock(
        &self,
        work_dir: &Path,
        params: &DockParams,
        params_file: &Path,
    ) -> Result<(), EngineError>;

    /// Splits a combined result into `<output_base>_receptor1.mae` and
    /// `<output_base>_ligand<N>.mae`.
    async fn split(
        &self,
        work_dir: &Path,
        docked: &Path,
        output_base: &str,
    ) -> Result<(), EngineError>;

    /// Converts `input` into the format implied by `output`'s extension.
    async fn convert(&self, work_dir: &Path, input: &Path, output: &Path)
        -> Result<(), EngineError>;
}
