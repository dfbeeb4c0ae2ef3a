//! Artifact validation, the only gate between stages.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::SkipReason;

/// Outcome of checking an expected stage output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactStatus {
    /// The file exists and has a non-zero size.
    Valid,
    /// Nothing exists at the path, or it is not a regular file.
    Missing,
    /// The file exists but is zero bytes.
    Empty,
}

impl ArtifactStatus {
    pub fn is_valid(&self) -> bool {
        matches!(self, ArtifactStatus::Valid)
    }

    /// The skip reason for a rejected artifact, `None` when valid.
    pub fn into_skip_reason(self, path: &Path) -> Option<SkipReason> {
        match self {
            ArtifactStatus::Valid => None,
            ArtifactStatus::Missing => Some(SkipReason::ArtifactMissing {
                path: path.to_path_buf(),
            }),
            ArtifactStatus::Empty => Some(SkipReason::ArtifactEmpty {
                path: path.to_path_buf(),
            }),
        }
    }
}

impl fmt::Display for ArtifactStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactStatus::Valid => write!(f, "valid"),
            ArtifactStatus::Missing => write!(f, "missing"),
            ArtifactStatus::Empty => write!(f, "empty"),
        }
    }
}

/// Checks that `path` is a non-empty regular file.
pub fn validate(path: &Path) -> ArtifactStatus {
    match std::fs::metadata(path) {
        Ok(meta) if !meta.is_file() => ArtifactStatus::Missing,
        Ok(meta) if meta.len() == 0 => ArtifactStatus::Empty,
        Ok(_) => ArtifactStatus::Valid,
        Err(_) => ArtifactStatus::Missing,
    }
}

/// Validates `path` and converts a rejection into a [`SkipReason`].
pub fn require(path: &Path) -> Result<(), SkipReason> {
    match validate(path).into_skip_reason(path) {
        None => Ok(()),
        Some(reason) => Err(reason),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_validate_states() {
        let temp = TempDir::new().unwrap();
        let full = temp.path().join("full.pdb");
        let empty = temp.path().join("empty.pdb");
        std::fs::write(&full, "ATOM").unwrap();
        std::fs::write(&empty, "").unwrap();

        assert_eq!(validate(&full), ArtifactStatus::Valid);
        assert_eq!(validate(&empty), ArtifactStatus::Empty);
        assert_eq!(validate(&temp.path().join("absent.pdb")), ArtifactStatus::Missing);
        assert_eq!(validate(temp.path()), ArtifactStatus::Missing);
    }

    #[test]
    fn test_require_maps_to_skip_reason() {
        let temp = TempDir::new().unwrap();
        let empty = temp.path().join("empty.zip");
        std::fs::write(&empty, "").unwrap();

        assert_eq!(
            require(&empty),
            Err(SkipReason::ArtifactEmpty { path: empty.clone() })
        );
        let absent = temp.path().join("absent.zip");
        assert_eq!(
            require(&absent),
            Err(SkipReason::ArtifactMissing { path: absent.clone() })
        );
        assert!(ArtifactStatus::Valid.into_skip_reason(&absent).is_none());
    }
}
