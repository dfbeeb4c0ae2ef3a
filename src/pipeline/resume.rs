//! Resume control: recompute a stage or reuse its artifact.
//!
//! With `update` off, any stage whose expected output already exists is
//! skipped, so re-running over a partial working directory resumes at the
//! first missing artifact of each candidate. A reused artifact still passes
//! through the validator before the next stage trusts it.

use std::path::Path;

use tracing::trace;

use super::state::Stage;

/// Decides whether `stage` must run to produce `expected_output`.
pub fn should_recompute(stage: Stage, expected_output: &Path, update_mode: bool) -> bool {
    if update_mode {
        return true;
    }
    let missing = !expected_output.exists();
    trace!(
        stage = %stage,
        path = %expected_output.display(),
        recompute = missing,
        "Resume check"
    );
    missing
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_update_mode_always_recomputes() {
        let temp = TempDir::new().unwrap();
        let existing = temp.path().join("x_prepared.pdb");
        std::fs::write(&existing, "ATOM").unwrap();

        for stage in Stage::ALL {
            assert!(should_recompute(stage, &existing, true));
            assert!(should_recompute(stage, &temp.path().join("absent"), true));
        }
    }

    #[test]
    fn test_existing_artifact_is_reused() {
        let temp = TempDir::new().unwrap();
        let existing = temp.path().join("x.zip");
        std::fs::write(&existing, "grid").unwrap();

        assert!(!should_recompute(Stage::Grid, &existing, false));
        assert!(should_recompute(Stage::Grid, &temp.path().join("y.zip"), false));
    }

    #[test]
    fn test_existing_empty_artifact_is_not_recomputed() {
        let temp = TempDir::new().unwrap();
        let empty = temp.path().join("x_dock_pv.maegz");
        std::fs::write(&empty, "").unwrap();

        // Presence alone decides; the validator rejects it afterwards.
        assert!(!should_recompute(Stage::Dock, &empty, false));
    }
}
