//! Candidate stage state.
//!
//! Progress is kept as an explicit [`CandidateState`] that is derived from the
//! working directory once, by probing the expected artifacts in stage order,
//! and then advanced in memory as stages run.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use super::config::LayoutSettings;
use super::validator::{validate, ArtifactStatus};
use crate::dataset::DiscoveredCandidate;
use crate::engine::structure_stem;
use crate::error::SkipReason;

/// Ordered processing stages of a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Structure preparation.
    Prepare,
    /// Search grid construction.
    Grid,
    /// Ligand docking.
    Dock,
    /// Result splitting and format conversion.
    Convert,
    /// Copying the top pose to the deliverable name.
    Deliver,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::Prepare,
        Stage::Grid,
        Stage::Dock,
        Stage::Convert,
        Stage::Deliver,
    ];

    /// State a candidate is in once this stage succeeded.
    pub fn reached(self) -> CandidateState {
        match self {
            Stage::Prepare => CandidateState::Prepared,
            Stage::Grid => CandidateState::GridBuilt,
            Stage::Dock => CandidateState::Docked,
            Stage::Convert => CandidateState::Converted,
            Stage::Deliver => CandidateState::Delivered,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Prepare => write!(f, "prepare"),
            Stage::Grid => write!(f, "grid"),
            Stage::Dock => write!(f, "dock"),
            Stage::Convert => write!(f, "convert"),
            Stage::Deliver => write!(f, "deliver"),
        }
    }
}

/// Where a candidate is in `Discovered -> ... -> Delivered`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CandidateState {
    Discovered,
    Prepared,
    GridBuilt,
    Docked,
    Converted,
    Delivered,
    /// Terminal for this candidate only.
    Failed { stage: Stage, reason: SkipReason },
}

impl CandidateState {
    pub fn is_delivered(&self) -> bool {
        matches!(self, CandidateState::Delivered)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, CandidateState::Failed { .. })
    }

    /// Whether `stage` lies at or before the last stage this state reached.
    pub fn has_passed(&self, stage: Stage) -> bool {
        let last = match self {
            CandidateState::Discovered | CandidateState::Failed { .. } => return false,
            CandidateState::Prepared => Stage::Prepare,
            CandidateState::GridBuilt => Stage::Grid,
            CandidateState::Docked => Stage::Dock,
            CandidateState::Converted => Stage::Convert,
            CandidateState::Delivered => Stage::Deliver,
        };
        stage <= last
    }
}

impl fmt::Display for CandidateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CandidateState::Discovered => write!(f, "discovered"),
            CandidateState::Prepared => write!(f, "prepared"),
            CandidateState::GridBuilt => write!(f, "grid_built"),
            CandidateState::Docked => write!(f, "docked"),
            CandidateState::Converted => write!(f, "converted"),
            CandidateState::Delivered => write!(f, "delivered"),
            CandidateState::Failed { stage, .. } => write!(f, "failed@{}", stage),
        }
    }
}

/// Expected artifact names of one candidate inside its target working directory.
///
/// Names are bare file names; the engine runs with the working directory as
/// its current directory.
#[derive(Debug, Clone)]
pub struct CandidateFiles {
    pub work_dir: PathBuf,
    pub prefix: String,
    /// Local copy of the raw candidate structure.
    pub raw: String,
    pub prepared: String,
    pub grid_input: String,
    pub grid: String,
    pub dock_input: String,
    pub docked: String,
    /// Base passed to the splitter; outputs are `<base>_receptor1.*` and
    /// `<base>_ligand<N>.*`.
    pub split_base: String,
    pub deliverable: String,
    split_extension: String,
    receptor_extension: String,
    interchange_extension: String,
}

impl CandidateFiles {
    pub fn new(
        work_dir: &Path,
        candidate: &DiscoveredCandidate,
        prepared_extension: &str,
        layout: &LayoutSettings,
    ) -> Self {
        let name = &candidate.name;
        let prefix = name.prefix();
        let prepared = name.derived("prepared", prepared_extension);
        let stem = structure_stem(&prepared).to_string();
        let interchange = layout.interchange_extension.trim_start_matches('.').to_string();

        Self {
            work_dir: work_dir.to_path_buf(),
            raw: candidate.file_name.clone(),
            grid_input: format!("{}_grid.in", stem),
            grid: format!("{}.zip", stem),
            prepared,
            dock_input: format!("{}_dock.in", prefix),
            docked: format!("{}_dock_pv.maegz", prefix),
            split_base: format!("{}_postdocking", prefix),
            deliverable: name.derived("docked", &interchange),
            split_extension: layout.ligand_extension.trim_start_matches('.').to_string(),
            receptor_extension: layout.candidate_extension.trim_start_matches('.').to_string(),
            interchange_extension: interchange,
            prefix,
        }
    }

    /// Absolute path of a file inside the working directory.
    pub fn path(&self, file_name: &str) -> PathBuf {
        self.work_dir.join(file_name)
    }

    pub fn receptor_split(&self) -> String {
        format!("{}_receptor1.{}", self.split_base, self.split_extension)
    }

    pub fn receptor_converted(&self) -> String {
        format!("{}_receptor1.{}", self.split_base, self.receptor_extension)
    }

    /// Split pose `n` (1-based).
    pub fn pose_split(&self, n: u32) -> String {
        format!("{}_ligand{}.{}", self.split_base, n, self.split_extension)
    }

    /// Converted pose `n` (1-based).
    pub fn pose_converted(&self, n: u32) -> String {
        format!("{}_ligand{}.{}", self.split_base, n, self.interchange_extension)
    }

    /// Split pose numbers present on disk, ascending. The first is the top pose.
    pub fn split_poses(&self) -> Vec<u32> {
        self.pose_numbers(&self.split_extension)
    }

    fn pose_numbers(&self, extension: &str) -> Vec<u32> {
        let head = format!("{}_ligand", self.split_base);
        let tail = format!(".{}", extension);
        let mut numbers: Vec<u32> = WalkDir::new(&self.work_dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter_map(|entry| {
                let name = entry.file_name().to_string_lossy().to_string();
                name.strip_prefix(&head)?
                    .strip_suffix(&tail)?
                    .parse::<u32>()
                    .ok()
            })
            .collect();
        numbers.sort_unstable();
        numbers.dedup();
        numbers
    }

    /// Expected output gating `stage`. Conversion is gated on the receptor;
    /// the top pose is checked separately.
    pub fn expected_output(&self, stage: Stage) -> PathBuf {
        match stage {
            Stage::Prepare => self.path(&self.prepared),
            Stage::Grid => self.path(&self.grid),
            Stage::Dock => self.path(&self.docked),
            Stage::Convert => self.path(&self.receptor_converted()),
            Stage::Deliver => self.path(&self.deliverable),
        }
    }

    /// Derives the current state from disk: the last stage, in order, whose
    /// artifacts all validate.
    pub fn probe(&self) -> CandidateState {
        let mut state = CandidateState::Discovered;
        for stage in Stage::ALL {
            let mut valid = validate(&self.expected_output(stage)) == ArtifactStatus::Valid;
            if valid && stage == Stage::Convert {
                valid = match self.split_poses().first() {
                    Some(top) => validate(&self.path(&self.pose_converted(*top))).is_valid(),
                    None => false,
                };
            }
            if !valid {
                break;
            }
            state = stage.reached();
        }
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::CandidateName;
    use tempfile::TempDir;

    fn files(dir: &Path) -> CandidateFiles {
        let candidate = DiscoveredCandidate {
            file_name: "hiResApo-1abc_2xyz.pdb".to_string(),
            name: CandidateName::decode("hiResApo-1abc_2xyz.pdb").unwrap(),
        };
        CandidateFiles::new(dir, &candidate, "pdb", &LayoutSettings::default())
    }

    fn touch(files: &CandidateFiles, name: &str) {
        std::fs::write(files.path(name), "data").unwrap();
    }

    #[test]
    fn test_artifact_names() {
        let f = files(Path::new("/work/1abc"));
        assert_eq!(f.prefix, "hiResApo-1abc_2xyz");
        assert_eq!(f.prepared, "hiResApo-1abc_2xyz_prepared.pdb");
        assert_eq!(f.grid_input, "hiResApo-1abc_2xyz_prepared_grid.in");
        assert_eq!(f.grid, "hiResApo-1abc_2xyz_prepared.zip");
        assert_eq!(f.dock_input, "hiResApo-1abc_2xyz_dock.in");
        assert_eq!(f.docked, "hiResApo-1abc_2xyz_dock_pv.maegz");
        assert_eq!(f.receptor_split(), "hiResApo-1abc_2xyz_postdocking_receptor1.mae");
        assert_eq!(f.receptor_converted(), "hiResApo-1abc_2xyz_postdocking_receptor1.pdb");
        assert_eq!(f.pose_split(3), "hiResApo-1abc_2xyz_postdocking_ligand3.mae");
        assert_eq!(f.pose_converted(1), "hiResApo-1abc_2xyz_postdocking_ligand1.mol");
        assert_eq!(f.deliverable, "hiResApo-1abc_2xyz_docked.mol");
        assert_eq!(
            f.expected_output(Stage::Deliver),
            PathBuf::from("/work/1abc/hiResApo-1abc_2xyz_docked.mol")
        );
    }

    #[test]
    fn test_split_poses_sorted_numerically() {
        let temp = TempDir::new().unwrap();
        let f = files(temp.path());
        for n in [10, 2, 1] {
            touch(&f, &f.pose_split(n));
        }
        touch(&f, "hiResApo-1abc_2xyz_postdocking_ligandX.mae");
        touch(&f, "other_postdocking_ligand0.mae");
        assert_eq!(f.split_poses(), vec![1, 2, 10]);
    }

    #[test]
    fn test_probe_walks_stages_in_order() {
        let temp = TempDir::new().unwrap();
        let f = files(temp.path());
        assert_eq!(f.probe(), CandidateState::Discovered);

        touch(&f, &f.prepared);
        assert_eq!(f.probe(), CandidateState::Prepared);

        // A later artifact without the earlier one does not count.
        touch(&f, &f.docked);
        assert_eq!(f.probe(), CandidateState::Prepared);

        touch(&f, &f.grid);
        assert_eq!(f.probe(), CandidateState::Docked);

        touch(&f, &f.receptor_converted());
        assert_eq!(f.probe(), CandidateState::Docked);
        touch(&f, &f.pose_split(1));
        touch(&f, &f.pose_converted(1));
        assert_eq!(f.probe(), CandidateState::Converted);

        touch(&f, &f.deliverable);
        assert_eq!(f.probe(), CandidateState::Delivered);
    }

    #[test]
    fn test_probe_rejects_empty_artifact() {
        let temp = TempDir::new().unwrap();
        let f = files(temp.path());
        std::fs::write(f.path(&f.prepared), "").unwrap();
        assert_eq!(f.probe(), CandidateState::Discovered);
    }

    #[test]
    fn test_state_display() {
        let failed = CandidateState::Failed {
            stage: Stage::Prepare,
            reason: SkipReason::ArtifactEmpty {
                path: PathBuf::from("x_prepared.pdb"),
            },
        };
        assert_eq!(failed.to_string(), "failed@prepare");
        assert!(failed.is_failed());
        assert_eq!(Stage::Grid.reached(), CandidateState::GridBuilt);
    }

    #[test]
    fn test_has_passed_follows_stage_order() {
        let docked = CandidateState::Docked;
        assert!(docked.has_passed(Stage::Prepare));
        assert!(docked.has_passed(Stage::Dock));
        assert!(!docked.has_passed(Stage::Convert));
        assert!(!CandidateState::Discovered.has_passed(Stage::Prepare));
        assert!(CandidateState::Delivered.has_passed(Stage::Deliver));

        let failed = CandidateState::Failed {
            stage: Stage::Dock,
            reason: SkipReason::ArtifactMissing {
                path: PathBuf::from("x_dock_pv.maegz"),
            },
        };
        assert!(!failed.has_passed(Stage::Prepare));
    }
}
