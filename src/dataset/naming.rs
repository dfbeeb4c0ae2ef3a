//! Candidate filename convention.
//!
//! Candidate structures carry their provenance in their name:
//!
//! ```text
//! <method_type>-<target_id>_<candidate_id>[-<ligand_id>].<ext>
//! hiResApo-1abc_2xyz.pdb
//! LMCSS-1fcz_1fcz-156.pdb
//! ```
//!
//! Every derived artifact is named from the stable prefix
//! `<method_type>-<target_id>_<candidate_id>`.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::DecodeError;

fn candidate_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"^([A-Za-z0-9]+)-([A-Za-z0-9]+)_([A-Za-z0-9]+)(?:-([A-Za-z0-9]+))?\.([A-Za-z0-9]+)$",
        )
        .expect("candidate filename pattern is valid")
    })
}

/// Decoded provenance of a candidate structure file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CandidateName {
    /// Structure preparation method (e.g. `hiResApo`, `LMCSS`).
    pub method_type: String,
    /// Four-character target the candidate was prepared for.
    pub target_id: String,
    /// Identifier of the source structure.
    pub candidate_id: String,
    /// Optional ligand identifier.
    pub ligand_id: Option<String>,
    /// File extension without the leading dot.
    pub extension: String,
}

impl CandidateName {
    /// Decodes a bare filename (no directory components).
    pub fn decode(filename: &str) -> Result<Self, DecodeError> {
        let caps = candidate_pattern()
            .captures(filename)
            .ok_or_else(|| DecodeError::Pattern(filename.to_string()))?;

        Ok(Self {
            method_type: caps[1].to_string(),
            target_id: caps[2].to_string(),
            candidate_id: caps[3].to_string(),
            ligand_id: caps.get(4).map(|m| m.as_str().to_string()),
            extension: caps[5].to_string(),
        })
    }

    /// Decodes a filename and checks it belongs to `target_id`.
    pub fn decode_for_target(filename: &str, target_id: &str) -> Result<Self, DecodeError> {
        let name = Self::decode(filename)?;
        if name.target_id != target_id {
            return Err(DecodeError::TargetMismatch {
                file: filename.to_string(),
                expected: target_id.to_string(),
                found: name.target_id,
            });
        }
        Ok(name)
    }

    /// The stable `<method_type>-<target_id>_<candidate_id>` prefix.
    pub fn prefix(&self) -> String {
        format!("{}-{}_{}", self.method_type, self.target_id, self.candidate_id)
    }

    /// Inverse of [`CandidateName::decode`].
    pub fn encode(&self) -> String {
        match &self.ligand_id {
            Some(ligand) => format!("{}-{}.{}", self.prefix(), ligand, self.extension),
            None => format!("{}.{}", self.prefix(), self.extension),
        }
    }

    /// Names a derived artifact: `<prefix>_<suffix>.<extension>`.
    pub fn derived(&self, suffix: &str, extension: &str) -> String {
        format!(
            "{}_{}.{}",
            self.prefix(),
            suffix,
            extension.trim_start_matches('.')
        )
    }
}

impl fmt::Display for CandidateName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.prefix())
    }
}
