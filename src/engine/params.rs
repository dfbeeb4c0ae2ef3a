//! Parameter files for grid generation and docking.
//!
//! The docking engine reads plain `KEY<TAB>value` blocks. The pipeline writes
//! one before each invocation, next to the artifacts it refers to, so every
//! path inside is a bare file name relative to the target working directory.

use std::path::Path;

use crate::error::EngineError;
use crate::pipeline::config::{DockSettings, GridSettings};

fn render_lines(lines: &[(&str, String)]) -> String {
    lines
        .iter()
        .map(|(key, value)| format!("{}\t{}\n", key, value))
        .collect()
}

fn join_box(dims: &[u32; 3]) -> String {
    dims.iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn write_file(path: &Path, content: String) -> Result<(), EngineError> {
    std::fs::write(path, content).map_err(|source| EngineError::ParameterFile {
        path: path.to_path_buf(),
        source,
    })
}

/// Grid generation input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridParams {
    pub center: String,
    pub grid_file: String,
    pub receptor_file: String,
    pub inner_box: [u32; 3],
    pub outer_box: [u32; 3],
}

impl GridParams {
    /// Grid input for a prepared structure; outputs are named after its stem.
    pub fn for_structure(receptor_file: &str, center: &str, settings: &GridSettings) -> Self {
        Self {
            center: center.to_string(),
            grid_file: format!("{}.zip", structure_stem(receptor_file)),
            receptor_file: receptor_file.to_string(),
            inner_box: settings.inner_box,
            outer_box: settings.outer_box,
        }
    }

    /// Name of the parameter file itself.
    pub fn input_file_name(&self) -> String {
        format!("{}_grid.in", structure_stem(&self.receptor_file))
    }

    pub fn render(&self) -> String {
        render_lines(&[
            ("GRID_CENTER", self.center.clone()),
            ("GRIDFILE", self.grid_file.clone()),
            ("INNERBOX", join_box(&self.inner_box)),
            ("OUTERBOX", join_box(&self.outer_box)),
            ("RECEP_FILE", self.receptor_file.clone()),
        ])
    }

    pub fn write(&self, path: &Path) -> Result<(), EngineError> {
        write_file(path, self.render())
    }
}

/// Docking input.
#[derive(Debug, Clone)]
pub struct DockParams {
    pub prefix: String,
    pub grid_file: String,
    pub ligand_file: String,
    pub settings: DockSettings,
}

impl DockParams {
    pub fn new(prefix: &str, grid_file: &str, ligand_file: &str, settings: &DockSettings) -> Self {
        Self {
            prefix: prefix.to_string(),
            grid_file: grid_file.to_string(),
            ligand_file: ligand_file.to_string(),
            settings: settings.clone(),
        }
    }

    pub fn input_file_name(&self) -> String {
        format!("{}_dock.in", self.prefix)
    }

    /// Combined pose-and-receptor file the engine writes.
    pub fn output_file_name(&self) -> String {
        format!("{}_dock_pv.maegz", self.prefix)
    }

    pub fn render(&self) -> String {
        let s = &self.settings;
        render_lines(&[
            ("GRIDFILE", self.grid_file.clone()),
            ("LIGANDFILE", self.ligand_file.clone()),
            ("POSTDOCK_XP_DELE", s.postdock_xp_dele.to_string()),
            ("PRECISION", s.precision.clone()),
            ("EXPANDED_SAMPLING", python_bool(s.expanded_sampling)),
            ("POSES_PER_LIG", s.poses_per_ligand.to_string()),
            ("WRITE_XP_DESC", python_bool(s.write_xp_desc)),
        ])
    }

    pub fn write(&self, path: &Path) -> Result<(), EngineError> {
        write_file(path, self.render())
    }
}

/// The engine expects `True`/`False`.
fn python_bool(value: bool) -> String {
    let literal = if value { "True" } else { "False" };
    literal.to_string()
}

/// File name up to the first dot.
pub fn structure_stem(file_name: &str) -> &str {
    file_name.split('.').next().unwrap_or(file_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_grid_params_naming() {
        let params = GridParams::for_structure(
            "hiResApo-1abc_2xyz_prepared.pdb",
            "1.0,2.0,3.0",
            &GridSettings::default(),
        );
        assert_eq!(params.grid_file, "hiResApo-1abc_2xyz_prepared.zip");
        assert_eq!(params.input_file_name(), "hiResApo-1abc_2xyz_prepared_grid.in");
    }

    #[test]
    fn test_grid_params_render() {
        let params = GridParams::for_structure("rec.pdb", "1.0,2.0,3.0", &GridSettings::default());
        assert_eq!(
            params.render(),
            "GRID_CENTER\t1.0,2.0,3.0\n\
             GRIDFILE\trec.zip\n\
             INNERBOX\t10, 10, 10\n\
             OUTERBOX\t30, 30, 30\n\
             RECEP_FILE\trec.pdb\n"
        );
    }

    #[test]
    fn test_dock_params_render() {
        let params = DockParams::new(
            "hiResApo-1abc_2xyz",
            "hiResApo-1abc_2xyz_prepared.zip",
            "lig_1.mae",
            &DockSettings::default(),
        );
        assert_eq!(params.input_file_name(), "hiResApo-1abc_2xyz_dock.in");
        assert_eq!(params.output_file_name(), "hiResApo-1abc_2xyz_dock_pv.maegz");

        let rendered = params.render();
        assert!(rendered.starts_with("GRIDFILE\thiResApo-1abc_2xyz_prepared.zip\n"));
        assert!(rendered.contains("LIGANDFILE\tlig_1.mae\n"));
        assert!(rendered.contains("POSTDOCK_XP_DELE\t0.5\n"));
        assert!(rendered.contains("PRECISION\tXP\n"));
        assert!(rendered.contains("EXPANDED_SAMPLING\tTrue\n"));
        assert!(rendered.contains("POSES_PER_LIG\t10\n"));
        assert!(rendered.ends_with("WRITE_XP_DESC\tFalse\n"));
    }

    #[test]
    fn test_write_parameter_file() {
        let temp = TempDir::new().unwrap();
        let params = GridParams::for_structure("rec.pdb", "0,0,0", &GridSettings::default());
        let path = temp.path().join(params.input_file_name());
        params.write(&path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), params.render());

        let err = params.write(&temp.path().join("missing/dir/rec_grid.in"));
        assert!(matches!(err, Err(EngineError::ParameterFile { .. })));
    }

    #[test]
    fn test_structure_stem() {
        assert_eq!(structure_stem("a_prepared.pdb"), "a_prepared");
        assert_eq!(structure_stem("noext"), "noext");
        assert_eq!(structure_stem("x.tar.gz"), "x");
    }
}
