//! Pipeline configuration.
//!
//! This module provides configuration options for a docking run: input and
//! working locations, the resume flag, engine locations, parameter-file
//! settings, and the dataset naming layout.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::prep::PreparerKind;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable has an invalid value.
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    /// Configuration validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    /// IO error while reading a configuration file.
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid YAML.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Configuration for a docking run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Challenge data root (`<root>/<week>/<target>/`).
    pub structure_dir: PathBuf,
    /// Working root; one subdirectory per target is materialized here.
    pub output_dir: PathBuf,
    /// Recompute every stage even when its artifact already exists.
    pub update: bool,
    /// Preparation implementation used for stage 1.
    pub preparer: PreparerKind,
    /// Run log file. `None` means `<output_dir>/final.log`.
    pub log_file: Option<PathBuf>,
    /// External engine locations.
    pub engine: EngineConfig,
    /// Grid parameter-file settings.
    pub grid: GridSettings,
    /// Docking parameter-file settings.
    pub docking: DockSettings,
    /// Dataset and artifact naming.
    pub layout: LayoutSettings,
}

/// Where the external docking suite lives.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Installation root (`$SCHRODINGER`).
    pub schrodinger_home: PathBuf,
    /// Explicit path to the structure converter; defaults to
    /// `<schrodinger_home>/utilities/structconvert`.
    pub structconvert: Option<PathBuf>,
}

impl EngineConfig {
    /// Path of the grid/docking executable.
    pub fn glide(&self) -> PathBuf {
        self.schrodinger_home.join("glide")
    }

    /// Path of the script runner used for splitting results.
    pub fn run_script(&self) -> PathBuf {
        self.schrodinger_home.join("run")
    }

    /// Path of the structure format converter.
    pub fn structconvert(&self) -> PathBuf {
        self.structconvert
            .clone()
            .unwrap_or_else(|| self.schrodinger_home.join("utilities").join("structconvert"))
    }
}

/// Search box dimensions written to the grid parameter file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GridSettings {
    pub inner_box: [u32; 3],
    pub outer_box: [u32; 3],
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            inner_box: [10, 10, 10],
            outer_box: [30, 30, 30],
        }
    }
}

/// Settings written to the docking parameter file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DockSettings {
    pub precision: String,
    pub postdock_xp_dele: f64,
    pub expanded_sampling: bool,
    pub poses_per_ligand: u32,
    pub write_xp_desc: bool,
}

impl Default for DockSettings {
    fn default() -> Self {
        Self {
            precision: "XP".to_string(),
            postdock_xp_dele: 0.5,
            expanded_sampling: true,
            poses_per_ligand: 10,
            write_xp_desc: false,
        }
    }
}

/// File naming conventions of the dataset and the working directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutSettings {
    /// Per-target spatial center descriptor.
    pub center_file: String,
    /// Extension of candidate structure files.
    pub candidate_extension: String,
    /// Candidates whose name contains this marker are ligands, not receptors.
    pub receptor_ligand_marker: String,
    /// Ligand input files start with this prefix.
    pub ligand_prefix: String,
    /// Ligand input files carry this extension.
    pub ligand_extension: String,
    /// Ligand files containing this marker are ignored.
    pub ligand_exclude_marker: String,
    /// Extension of converted poses and the final deliverable.
    pub interchange_extension: String,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            center_file: "center.txt".to_string(),
            candidate_extension: "pdb".to_string(),
            receptor_ligand_marker: "lig.pdb".to_string(),
            ligand_prefix: "lig_".to_string(),
            ligand_extension: "mae".to_string(),
            ligand_exclude_marker: "unprep".to_string(),
            interchange_extension: "mol".to_string(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            structure_dir: PathBuf::from("."),
            output_dir: PathBuf::from("./docking"),
            update: false,
            preparer: PreparerKind::default(),
            log_file: None,
            engine: EngineConfig::default(),
            grid: GridSettings::default(),
            docking: DockSettings::default(),
            layout: LayoutSettings::default(),
        }
    }
}

impl PipelineConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a configuration from a YAML file. Missing keys keep their defaults.
    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Creates configuration from environment variables on top of the defaults.
    ///
    /// # Environment Variables
    ///
    /// - `SCHRODINGER`: engine installation root
    /// - `DOCKPREP_STRUCTCONVERT`: structure converter override
    /// - `DOCKPREP_UPDATE`: recompute existing artifacts (default: false)
    /// - `DOCKPREP_PREPARER`: `pass-through` or `receptor-only`
    /// - `DOCKPREP_PRECISION`: docking precision (default: XP)
    /// - `DOCKPREP_POSES_PER_LIGAND`: poses written per ligand (default: 10)
    /// - `DOCKPREP_LOG_FILE`: run log file
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Overlays values found through `lookup` onto this configuration.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("SCHRODINGER") {
            self.engine.schrodinger_home = PathBuf::from(val);
        }

        if let Some(val) = lookup("DOCKPREP_STRUCTCONVERT") {
            self.engine.structconvert = Some(PathBuf::from(val));
        }

        if let Some(val) = lookup("DOCKPREP_UPDATE") {
            self.update = parse_env_bool(&val, "DOCKPREP_UPDATE")?;
        }

        if let Some(val) = lookup("DOCKPREP_PREPARER") {
            self.preparer = val.parse().map_err(|message| ConfigError::InvalidValue {
                key: "DOCKPREP_PREPARER".to_string(),
                message,
            })?;
        }

        if let Some(val) = lookup("DOCKPREP_PRECISION") {
            self.docking.precision = val;
        }

        if let Some(val) = lookup("DOCKPREP_POSES_PER_LIGAND") {
            self.docking.poses_per_ligand = parse_env_value(&val, "DOCKPREP_POSES_PER_LIGAND")?;
        }

        if let Some(val) = lookup("DOCKPREP_LOG_FILE") {
            self.log_file = Some(PathBuf::from(val));
        }

        Ok(())
    }

    /// Validates the configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.docking.poses_per_ligand == 0 {
            return Err(ConfigError::ValidationFailed(
                "poses_per_ligand must be greater than 0".to_string(),
            ));
        }

        if self.docking.precision.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "precision cannot be empty".to_string(),
            ));
        }

        let inner_fits = self
            .grid
            .inner_box
            .iter()
            .zip(self.grid.outer_box.iter())
            .all(|(inner, outer)| inner > &0 && inner <= outer);
        if !inner_fits {
            return Err(ConfigError::ValidationFailed(
                "inner_box must be positive and fit inside outer_box".to_string(),
            ));
        }

        let layout = &self.layout;
        for (key, value) in [
            ("center_file", &layout.center_file),
            ("candidate_extension", &layout.candidate_extension),
            ("ligand_prefix", &layout.ligand_prefix),
            ("ligand_extension", &layout.ligand_extension),
            ("interchange_extension", &layout.interchange_extension),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::ValidationFailed(format!(
                    "{} cannot be empty",
                    key
                )));
            }
        }

        Ok(())
    }

    /// The run log file, defaulting into the working root.
    pub fn log_path(&self) -> PathBuf {
        self.log_file
            .clone()
            .unwrap_or_else(|| self.output_dir.join("final.log"))
    }

    /// Builder method to set the challenge data root.
    pub fn with_structure_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.structure_dir = dir.into();
        self
    }

    /// Builder method to set the working root.
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Builder method to set update mode.
    pub fn with_update(mut self, update: bool) -> Self {
        self.update = update;
        self
    }

    /// Builder method to set the preparer.
    pub fn with_preparer(mut self, preparer: PreparerKind) -> Self {
        self.preparer = preparer;
        self
    }

    /// Builder method to set the engine installation root.
    pub fn with_schrodinger_home(mut self, home: impl Into<PathBuf>) -> Self {
        self.engine.schrodinger_home = home.into();
        self
    }

    /// Builder method to set the run log file.
    pub fn with_log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = Some(path.into());
        self
    }
}

/// Parse an environment variable value into a type.
fn parse_env_value<T: std::str::FromStr>(value: &str, key: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("could not parse '{}'", value),
    })
}

/// Parse an environment variable as a boolean.
fn parse_env_bool(value: &str, key: &str) -> Result<bool, ConfigError> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("expected boolean value, got '{}'", value),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert!(!config.update);
        assert_eq!(config.preparer, PreparerKind::PassThrough);
        assert_eq!(config.grid.inner_box, [10, 10, 10]);
        assert_eq!(config.grid.outer_box, [30, 30, 30]);
        assert_eq!(config.docking.precision, "XP");
        assert_eq!(config.docking.poses_per_ligand, 10);
        assert_eq!(config.layout.center_file, "center.txt");
        assert_eq!(config.layout.interchange_extension, "mol");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = PipelineConfig::new()
            .with_structure_dir("/data/celpp")
            .with_output_dir("/scratch/dock")
            .with_update(true)
            .with_preparer(PreparerKind::ReceptorOnly)
            .with_schrodinger_home("/opt/schrodinger");

        assert_eq!(config.structure_dir, PathBuf::from("/data/celpp"));
        assert_eq!(config.output_dir, PathBuf::from("/scratch/dock"));
        assert!(config.update);
        assert_eq!(config.preparer, PreparerKind::ReceptorOnly);
        assert_eq!(config.engine.glide(), PathBuf::from("/opt/schrodinger/glide"));
        assert_eq!(
            config.engine.structconvert(),
            PathBuf::from("/opt/schrodinger/utilities/structconvert")
        );
        assert_eq!(config.log_path(), PathBuf::from("/scratch/dock/final.log"));
    }

    #[test]
    fn test_apply_env() {
        let mut config = PipelineConfig::default();
        config
            .apply_env(lookup_from(&[
                ("SCHRODINGER", "/opt/schrodinger2015-3"),
                ("DOCKPREP_STRUCTCONVERT", "/usr/local/bin/structconvert"),
                ("DOCKPREP_UPDATE", "yes"),
                ("DOCKPREP_PREPARER", "receptor-only"),
                ("DOCKPREP_POSES_PER_LIGAND", "3"),
            ]))
            .unwrap();

        assert_eq!(
            config.engine.schrodinger_home,
            PathBuf::from("/opt/schrodinger2015-3")
        );
        assert_eq!(
            config.engine.structconvert(),
            PathBuf::from("/usr/local/bin/structconvert")
        );
        assert!(config.update);
        assert_eq!(config.preparer, PreparerKind::ReceptorOnly);
        assert_eq!(config.docking.poses_per_ligand, 3);
    }

    #[test]
    fn test_apply_env_rejects_bad_values() {
        let mut config = PipelineConfig::default();
        let err = config
            .apply_env(lookup_from(&[("DOCKPREP_POSES_PER_LIGAND", "many")]))
            .unwrap_err();
        assert!(err.to_string().contains("DOCKPREP_POSES_PER_LIGAND"));

        let err = config
            .apply_env(lookup_from(&[("DOCKPREP_UPDATE", "maybe")]))
            .unwrap_err();
        assert!(err.to_string().contains("expected boolean"));

        let err = config
            .apply_env(lookup_from(&[("DOCKPREP_PREPARER", "alchemy")]))
            .unwrap_err();
        assert!(err.to_string().contains("DOCKPREP_PREPARER"));
    }

    #[test]
    fn test_validation_zero_poses() {
        let mut config = PipelineConfig::default();
        config.docking.poses_per_ligand = 0;
        let result = config.validate();
        assert!(result.unwrap_err().to_string().contains("poses_per_ligand"));
    }

    #[test]
    fn test_validation_inner_box_larger_than_outer() {
        let mut config = PipelineConfig::default();
        config.grid.inner_box = [40, 10, 10];
        let result = config.validate();
        assert!(result.unwrap_err().to_string().contains("inner_box"));
    }

    #[test]
    fn test_validation_empty_layout_field() {
        let mut config = PipelineConfig::default();
        config.layout.center_file = String::new();
        let result = config.validate();
        assert!(result.unwrap_err().to_string().contains("center_file"));
    }

    #[test]
    fn test_from_yaml_file_keeps_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("dockprep.yaml");
        std::fs::write(
            &path,
            "update: true\ndocking:\n  poses_per_ligand: 5\nlayout:\n  interchange_extension: sdf\n",
        )
        .unwrap();

        let config = PipelineConfig::from_yaml_file(&path).unwrap();
        assert!(config.update);
        assert_eq!(config.docking.poses_per_ligand, 5);
        assert_eq!(config.docking.precision, "XP");
        assert_eq!(config.layout.interchange_extension, "sdf");
        assert_eq!(config.layout.center_file, "center.txt");
    }

    #[test]
    fn test_from_yaml_file_missing() {
        let err = PipelineConfig::from_yaml_file(Path::new("/nonexistent/dockprep.yaml"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_parse_env_bool() {
        assert!(parse_env_bool("true", "test").unwrap());
        assert!(parse_env_bool("1", "test").unwrap());
        assert!(parse_env_bool("ON", "test").unwrap());
        assert!(!parse_env_bool("false", "test").unwrap());
        assert!(!parse_env_bool("no", "test").unwrap());
        assert!(parse_env_bool("invalid", "test").is_err());
    }
}
