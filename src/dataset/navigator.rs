//! Target and candidate discovery.
//!
//! The navigator turns a weekly dataset directory into processable units:
//! it filters target directories, decodes candidate structure names, checks
//! the per-target companion files, and materializes everything a target needs
//! into its own working subdirectory.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;
use walkdir::WalkDir;

use super::challenge::child_dirs;
use super::naming::CandidateName;
use crate::error::SkipReason;
use crate::pipeline::config::LayoutSettings;

/// A validated four-character alphanumeric target identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetId(String);

impl TargetId {
    pub fn parse(name: &str) -> Result<Self, SkipReason> {
        if name.len() == 4 && name.chars().all(|c| c.is_ascii_alphanumeric()) {
            Ok(Self(name.to_string()))
        } else {
            Err(SkipReason::InvalidTargetId {
                name: name.to_string(),
            })
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One structural case inside a weekly dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub id: TargetId,
    /// Directory in the challenge data holding the target's inputs.
    pub source_dir: PathBuf,
}

/// A candidate file whose name decoded successfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredCandidate {
    pub file_name: String,
    pub name: CandidateName,
}

/// A file that looked like a candidate but was not accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedCandidate {
    pub file_name: String,
    pub reason: SkipReason,
}

/// Read-only inventory of a target's source directory.
#[derive(Debug, Clone)]
pub struct TargetScan {
    pub target: Target,
    /// Center descriptor, if present.
    pub center_file: Option<PathBuf>,
    /// Accepted candidates in filename order.
    pub candidates: Vec<DiscoveredCandidate>,
    pub rejected: Vec<RejectedCandidate>,
    /// Structure files excluded because they carry the ligand marker.
    pub ligand_structures: Vec<String>,
    /// Ligand input files for docking.
    pub ligands: Vec<PathBuf>,
}

/// A target copied into its working directory and ready for the pipeline.
#[derive(Debug, Clone)]
pub struct MaterializedTarget {
    pub target: Target,
    pub work_dir: PathBuf,
    /// First line of the center descriptor, trimmed.
    pub center: String,
    /// Local copy of the single ligand input.
    pub ligand_file: PathBuf,
    /// Candidates copied into `work_dir`.
    pub candidates: Vec<DiscoveredCandidate>,
    /// Candidates dropped during scanning or copying.
    pub rejected: Vec<RejectedCandidate>,
}

/// Walks a dataset according to a [`LayoutSettings`].
#[derive(Debug, Clone)]
pub struct Navigator {
    layout: LayoutSettings,
}

impl Navigator {
    pub fn new(layout: LayoutSettings) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &LayoutSettings {
        &self.layout
    }

    /// Lists the valid targets directly below `dataset_dir`.
    pub fn enumerate_targets(&self, dataset_dir: &Path) -> Result<Vec<Target>, walkdir::Error> {
        let (targets, _) = self.partition_targets(child_dirs(dataset_dir)?);
        Ok(targets)
    }

    /// Splits candidate target directories into valid targets and rejected names.
    pub fn partition_targets<I>(&self, dirs: I) -> (Vec<Target>, Vec<String>)
    where
        I: IntoIterator<Item = PathBuf>,
    {
        let mut targets = Vec::new();
        let mut rejected = Vec::new();
        for dir in dirs {
            let name = dir
                .file_name()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default();
            match TargetId::parse(&name) {
                Ok(id) => targets.push(Target {
                    id,
                    source_dir: dir,
                }),
                Err(_) => {
                    debug!(directory = %name, "Not a 4-character target id, skipping");
                    rejected.push(name);
                }
            }
        }
        (targets, rejected)
    }

    /// Inventories a target's source directory without modifying anything.
    pub fn scan_target(&self, target: &Target) -> Result<TargetScan, walkdir::Error> {
        let layout = &self.layout;
        let candidate_suffix = format!(".{}", layout.candidate_extension);
        let ligand_suffix = format!(".{}", layout.ligand_extension);

        let mut scan = TargetScan {
            target: target.clone(),
            center_file: None,
            candidates: Vec::new(),
            rejected: Vec::new(),
            ligand_structures: Vec::new(),
            ligands: Vec::new(),
        };
        let mut prefixes: HashMap<String, String> = HashMap::new();

        for entry in WalkDir::new(&target.source_dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let file_name = entry.file_name().to_string_lossy().to_string();

            if file_name == layout.center_file {
                scan.center_file = Some(entry.into_path());
            } else if file_name.starts_with(&layout.ligand_prefix)
                && file_name.ends_with(&ligand_suffix)
            {
                if !file_name.contains(&layout.ligand_exclude_marker) {
                    scan.ligands.push(entry.into_path());
                }
            } else if file_name.ends_with(&candidate_suffix) {
                if file_name.contains(&layout.receptor_ligand_marker) {
                    scan.ligand_structures.push(file_name);
                    continue;
                }
                match CandidateName::decode_for_target(&file_name, target.id.as_str()) {
                    Ok(name) => {
                        let prefix = name.prefix();
                        if let Some(kept) = prefixes.get(&prefix) {
                            scan.rejected.push(RejectedCandidate {
                                reason: SkipReason::DuplicatePrefix {
                                    file: file_name.clone(),
                                    prefix,
                                    kept: kept.clone(),
                                },
                                file_name,
                            });
                        } else {
                            prefixes.insert(prefix, file_name.clone());
                            scan.candidates.push(DiscoveredCandidate { file_name, name });
                        }
                    }
                    Err(e) => scan.rejected.push(RejectedCandidate {
                        file_name,
                        reason: e.into(),
                    }),
                }
            }
        }

        Ok(scan)
    }

    /// Checks the per-target companion files and returns the single ligand.
    pub fn check_companions<'a>(&self, scan: &'a TargetScan) -> Result<&'a Path, SkipReason> {
        if scan.center_file.is_none() {
            return Err(SkipReason::MissingCompanionFile {
                path: scan.target.source_dir.join(&self.layout.center_file),
            });
        }
        match scan.ligands.as_slice() {
            [ligand] => Ok(ligand.as_path()),
            ligands => Err(SkipReason::AmbiguousLigandSet {
                found: ligands.len(),
                files: ligands
                    .iter()
                    .filter_map(|p| p.file_name())
                    .map(|n| n.to_string_lossy().to_string())
                    .collect(),
            }),
        }
    }

    /// Scans a target, checks its companions, and copies it into
    /// `<working_root>/<target_id>/`.
    ///
    /// Nothing is written when the target fails its companion checks.
    pub fn enumerate_candidates(
        &self,
        target: &Target,
        working_root: &Path,
    ) -> Result<MaterializedTarget, SkipReason> {
        let scan = self
            .scan_target(target)
            .map_err(|e| SkipReason::Materialization {
                path: target.source_dir.clone(),
                message: e.to_string(),
            })?;
        let ligand_src = self.check_companions(&scan)?.to_path_buf();
        let center_src = scan
            .center_file
            .clone()
            .unwrap_or_else(|| target.source_dir.join(&self.layout.center_file));

        let center = read_center(&center_src)?;

        let work_dir = working_root.join(target.id.as_str());
        fs::create_dir_all(&work_dir).map_err(|e| SkipReason::Materialization {
            path: work_dir.clone(),
            message: e.to_string(),
        })?;

        copy_into(&center_src, &work_dir)?;
        let ligand_file = copy_into(&ligand_src, &work_dir)?;

        let mut rejected = scan.rejected;
        let mut candidates = Vec::with_capacity(scan.candidates.len());
        for candidate in scan.candidates {
            let src = target.source_dir.join(&candidate.file_name);
            match copy_into(&src, &work_dir) {
                Ok(_) => candidates.push(candidate),
                Err(reason) => rejected.push(RejectedCandidate {
                    file_name: candidate.file_name,
                    reason,
                }),
            }
        }

        Ok(MaterializedTarget {
            target: target.clone(),
            work_dir,
            center,
            ligand_file,
            candidates,
            rejected,
        })
    }
}

/// Reads the spatial center descriptor: the first line of the file.
fn read_center(path: &Path) -> Result<String, SkipReason> {
    let content = fs::read_to_string(path).map_err(|_| SkipReason::MissingCompanionFile {
        path: path.to_path_buf(),
    })?;
    content
        .lines()
        .next()
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
        .ok_or_else(|| SkipReason::MissingCompanionFile {
            path: path.to_path_buf(),
        })
}

fn copy_into(src: &Path, dir: &Path) -> Result<PathBuf, SkipReason> {
    let dest = match src.file_name() {
        Some(name) => dir.join(name),
        None => {
            return Err(SkipReason::Materialization {
                path: src.to_path_buf(),
                message: "path has no file name".to_string(),
            })
        }
    };
    fs::copy(src, &dest).map_err(|e| SkipReason::Materialization {
        path: src.to_path_buf(),
        message: e.to_string(),
    })?;
    Ok(dest)
}
