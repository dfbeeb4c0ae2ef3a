//! Challenge data directory access.
//!
//! A challenge data root holds one directory per weekly dataset, each holding
//! one directory per potential target:
//!
//! ```text
//! <root>/celpp_week19_2016/1fcz/center.txt
//! <root>/celpp_week19_2016/1fcz/LMCSS-1fcz_1fcz-156.pdb
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// Read-only view over a weekly challenge dataset.
pub trait ChallengeSource: Send + Sync {
    /// Whether the dataset can be processed at all.
    fn is_valid(&self) -> bool;

    /// Maps each week name to its potential target directories, unfiltered.
    fn get_targets(&self) -> Result<BTreeMap<String, Vec<PathBuf>>, walkdir::Error>;
}

/// Filesystem-backed challenge data directory.
#[derive(Debug, Clone)]
pub struct ChallengeData {
    root: PathBuf,
}

impl ChallengeData {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Immediate subdirectories of `dir`, sorted by name.
pub(crate) fn child_dirs(dir: &Path) -> Result<Vec<PathBuf>, walkdir::Error> {
    let mut dirs = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry?;
        if entry.file_type().is_dir() {
            dirs.push(entry.into_path());
        }
    }
    Ok(dirs)
}

impl ChallengeSource for ChallengeData {
    fn is_valid(&self) -> bool {
        self.root.is_dir()
            && child_dirs(&self.root)
                .map(|weeks| !weeks.is_empty())
                .unwrap_or(false)
    }

    fn get_targets(&self) -> Result<BTreeMap<String, Vec<PathBuf>>, walkdir::Error> {
        let mut weeks = BTreeMap::new();
        for week_dir in child_dirs(&self.root)? {
            let week_name = week_dir
                .file_name()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default();
            weeks.insert(week_name, child_dirs(&week_dir)?);
        }
        Ok(weeks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_empty_root_is_invalid() {
        let temp = TempDir::new().unwrap();
        assert!(!ChallengeData::new(temp.path()).is_valid());
        assert!(!ChallengeData::new(temp.path().join("missing")).is_valid());
    }

    #[test]
    fn test_file_root_is_invalid() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("dataset.week.4");
        fs::write(&file, "").unwrap();
        assert!(!ChallengeData::new(&file).is_valid());
    }

    #[test]
    fn test_get_targets_groups_by_week() {
        let temp = TempDir::new().unwrap();
        let week = temp.path().join("celpp_week19_2016");
        fs::create_dir_all(week.join("1fcz")).unwrap();
        fs::create_dir_all(week.join("5hib")).unwrap();
        fs::create_dir_all(week.join("readme_dir")).unwrap();
        fs::write(week.join("notes.txt"), "not a target").unwrap();

        let data = ChallengeData::new(temp.path());
        assert!(data.is_valid());

        let targets = data.get_targets().unwrap();
        assert_eq!(targets.len(), 1);
        let names: Vec<String> = targets["celpp_week19_2016"]
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["1fcz", "5hib", "readme_dir"]);
    }
}
