//! Error types for dockprep operations.
//!
//! Two families live here:
//! - Fatal errors (`PipelineError`) that abort a whole run.
//! - Non-fatal conditions (`DecodeError`, `SkipReason`, `EngineError`) that are
//!   logged and isolated to a single target or candidate.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pipeline::config::ConfigError;

/// Errors produced while decoding a candidate filename.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("'{0}' does not match <method>-<target>_<candidate>[-<ligand>].<ext>")]
    Pattern(String),

    #[error("'{file}' names target '{found}' but belongs to target '{expected}'")]
    TargetMismatch {
        file: String,
        expected: String,
        found: String,
    },
}

/// Why a target or candidate was dropped from the run.
///
/// None of these abort the run; the orchestrator records them and moves on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    #[error("'{name}' is not a 4-character alphanumeric target id")]
    InvalidTargetId { name: String },

    #[error("failed to decode candidate name: {message}")]
    DecodeFailure { message: String },

    #[error("'{file}' decodes to prefix '{prefix}' already taken by '{kept}'")]
    DuplicatePrefix {
        file: String,
        prefix: String,
        kept: String,
    },

    #[error("missing companion file {path}")]
    MissingCompanionFile { path: PathBuf },

    #[error("expected exactly one ligand file, found {found}: {files:?}")]
    AmbiguousLigandSet { found: usize, files: Vec<String> },

    #[error("expected artifact {path} does not exist")]
    ArtifactMissing { path: PathBuf },

    #[error("expected artifact {path} has size 0")]
    ArtifactEmpty { path: PathBuf },

    #[error("preparer rejected {input}")]
    PreparationRejected { input: PathBuf },

    #[error("failed to materialize {path}: {message}")]
    Materialization { path: PathBuf, message: String },
}

impl From<DecodeError> for SkipReason {
    fn from(err: DecodeError) -> Self {
        SkipReason::DecodeFailure {
            message: err.to_string(),
        }
    }
}

/// Errors reported by an external engine invocation.
///
/// These never decide a candidate's fate on their own: the artifact validator
/// inspects the expected output afterwards.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{program}' exited with code {code}: {stderr}")]
    NonZeroExit {
        program: String,
        code: i32,
        stderr: String,
    },

    #[error("failed to write parameter file {path}: {source}")]
    ParameterFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that abort an entire run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{0} is not a valid challenge data directory")]
    InvalidDataset(PathBuf),

    #[error("failed to create working directory {path}: {source}")]
    WorkingDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to list targets under {path}: {source}")]
    Listing {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_error_becomes_skip_reason() {
        let reason: SkipReason = DecodeError::Pattern("bad_name_format.pdb".into()).into();
        match reason {
            SkipReason::DecodeFailure { message } => {
                assert!(message.contains("bad_name_format.pdb"));
            }
            other => panic!("unexpected reason: {other:?}"),
        }
    }

    #[test]
    fn test_skip_reason_serializes_with_kind_tag() {
        let reason = SkipReason::AmbiguousLigandSet {
            found: 2,
            files: vec!["lig_1.mae".into(), "lig_2.mae".into()],
        };
        let json = serde_json::to_value(&reason).unwrap();
        assert_eq!(json["kind"], "ambiguous_ligand_set");
        assert_eq!(json["found"], 2);
    }

    #[test]
    fn test_engine_error_display() {
        let err = EngineError::NonZeroExit {
            program: "glide".into(),
            code: 3,
            stderr: "license".into(),
        };
        assert_eq!(err.to_string(), "'glide' exited with code 3: license");
    }
}
