//! Protein preparation implementations.
//!
//! Preparation is the first pipeline stage. It is a single capability,
//! `prepare(input, output, info) -> bool`, so a lab can plug in its own
//! scientific preparation without touching the orchestrator.
//!
//! Two implementations ship here:
//! - [`PassThroughPreparer`]: copies the structure unchanged (the default).
//! - [`ReceptorOnlyPreparer`]: drops `HETATM` and `CONECT` records.

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::dataset::CandidateName;

/// Selectable preparation implementations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PreparerKind {
    /// Copy the candidate structure unchanged.
    #[default]
    PassThrough,
    /// Strip heteroatom and connectivity records.
    ReceptorOnly,
}

impl PreparerKind {
    /// Returns the display name for this preparer.
    pub fn display_name(&self) -> &'static str {
        match self {
            PreparerKind::PassThrough => "pass-through",
            PreparerKind::ReceptorOnly => "receptor-only",
        }
    }
}

impl std::fmt::Display for PreparerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl std::str::FromStr for PreparerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pass-through" | "passthrough" | "copy" => Ok(PreparerKind::PassThrough),
            "receptor-only" | "receptor" => Ok(PreparerKind::ReceptorOnly),
            other => Err(format!("Unknown preparer: {}", other)),
        }
    }
}

/// Trait for structure preparation.
#[async_trait]
pub trait ProteinPreparer: Send + Sync {
    /// Returns the preparer kind.
    fn kind(&self) -> PreparerKind;

    /// Extension of the prepared structure, without the dot.
    fn output_extension(&self) -> &str {
        "pdb"
    }

    /// Prepares `input` into `output`. Returning `false` rejects the candidate.
    async fn prepare(&self, input: &Path, output: &Path, info: &CandidateName) -> bool;
}

/// Passes the structure forward without any processing.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassThroughPreparer;

#[async_trait]
impl ProteinPreparer for PassThroughPreparer {
    fn kind(&self) -> PreparerKind {
        PreparerKind::PassThrough
    }

    async fn prepare(&self, input: &Path, output: &Path, info: &CandidateName) -> bool {
        match tokio::fs::copy(input, output).await {
            Ok(bytes) => {
                debug!(candidate = %info, bytes, "Copied structure without preparation");
                true
            }
            Err(e) => {
                warn!(candidate = %info, input = %input.display(), "Copy failed: {}", e);
                false
            }
        }
    }
}

/// Keeps only receptor records by removing `HETATM` and `CONECT` lines.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReceptorOnlyPreparer;

impl ReceptorOnlyPreparer {
    fn strip(structure: &str) -> String {
        structure
            .lines()
            .filter(|line| !line.starts_with("HETATM") && !line.starts_with("CONECT"))
            .fold(String::with_capacity(structure.len()), |mut out, line| {
                out.push_str(line);
                out.push('\n');
                out
            })
    }
}

#[async_trait]
impl ProteinPreparer for ReceptorOnlyPreparer {
    fn kind(&self) -> PreparerKind {
        PreparerKind::ReceptorOnly
    }

    async fn prepare(&self, input: &Path, output: &Path, info: &CandidateName) -> bool {
        let structure = match tokio::fs::read_to_string(input).await {
            Ok(s) => s,
            Err(e) => {
                warn!(candidate = %info, input = %input.display(), "Read failed: {}", e);
                return false;
            }
        };

        let receptor = Self::strip(&structure);
        if let Err(e) = tokio::fs::write(output, receptor).await {
            warn!(candidate = %info, output = %output.display(), "Write failed: {}", e);
            return false;
        }
        true
    }
}

/// Creates a preparer for the given kind.
pub fn create_preparer(kind: PreparerKind) -> Box<dyn ProteinPreparer> {
    match kind {
        PreparerKind::PassThrough => Box::new(PassThroughPreparer),
        PreparerKind::ReceptorOnly => Box::new(ReceptorOnlyPreparer),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const COMPLEX: &str = "\
ATOM      1  N   MET A   1      11.104  13.207   2.100  1.00 20.00           N
HETATM  500  C1  LIG A 900       1.000   2.000   3.000  1.00 20.00           C
ATOM      2  CA  MET A   1      12.560  13.207   2.100  1.00 20.00           C
CONECT  500  501
END
";

    fn info() -> CandidateName {
        CandidateName::decode("hiResApo-1abc_2xyz.pdb").unwrap()
    }

    #[test]
    fn test_preparer_kind_from_str() {
        assert_eq!(
            "pass-through".parse::<PreparerKind>().unwrap(),
            PreparerKind::PassThrough
        );
        assert_eq!(
            "Receptor-Only".parse::<PreparerKind>().unwrap(),
            PreparerKind::ReceptorOnly
        );
        assert!("alchemy".parse::<PreparerKind>().is_err());
        assert_eq!(PreparerKind::ReceptorOnly.to_string(), "receptor-only");
    }

    #[tokio::test]
    async fn test_pass_through_copies_bytes() {
        let temp = TempDir::new().unwrap();
        let input = temp.path().join("hiResApo-1abc_2xyz.pdb");
        let output = temp.path().join("hiResApo-1abc_2xyz_prepared.pdb");
        std::fs::write(&input, COMPLEX).unwrap();

        assert!(PassThroughPreparer.prepare(&input, &output, &info()).await);
        assert_eq!(std::fs::read_to_string(&output).unwrap(), COMPLEX);
    }

    #[tokio::test]
    async fn test_pass_through_missing_input() {
        let temp = TempDir::new().unwrap();
        let ok = PassThroughPreparer
            .prepare(
                &temp.path().join("missing.pdb"),
                &temp.path().join("out.pdb"),
                &info(),
            )
            .await;
        assert!(!ok);
    }

    #[tokio::test]
    async fn test_receptor_only_strips_hetero_records() {
        let temp = TempDir::new().unwrap();
        let input = temp.path().join("in.pdb");
        let output = temp.path().join("out.pdb");
        std::fs::write(&input, COMPLEX).unwrap();

        let preparer = create_preparer(PreparerKind::ReceptorOnly);
        assert_eq!(preparer.kind(), PreparerKind::ReceptorOnly);
        assert!(preparer.prepare(&input, &output, &info()).await);

        let prepared = std::fs::read_to_string(&output).unwrap();
        assert!(!prepared.contains("HETATM"));
        assert!(!prepared.contains("CONECT"));
        assert_eq!(prepared.lines().filter(|l| l.starts_with("ATOM")).count(), 2);
        assert!(prepared.ends_with("END\n"));
    }
}
