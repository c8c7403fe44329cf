//! Control-table data files
//!
//! One JSON file per standard:
//!
//! ```text
//! { "standard": "ASVS", "title": "...", "version": "4.0.3",
//!   "controls": [ { "id": "V1.1.1", "title": "...", "description": "...", "category": "..." } ] }
//! ```
//!
//! `controls` is an array so that file order survives parsing; listings and
//! search results follow it.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::registry::{ControlEntry, RegistryError};

/// Bundled tables, in load order
const BUILTIN_TABLES: [(&str, &str); 5] = [
    ("asvs.json", include_str!("../data/asvs.json")),
    ("masvs.json", include_str!("../data/masvs.json")),
    ("nist.json", include_str!("../data/nist.json")),
    ("iso27001.json", include_str!("../data/iso27001.json")),
    ("sbs.json", include_str!("../data/sbs.json")),
];

/// Parsed content of one control-table file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlTable {
    /// Standard name; upper-cased when registered
    pub standard: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub version: String,
    pub controls: Vec<ControlEntry>,
}

impl ControlTable {
    /// Parse a table from JSON text; `origin` names the file in errors.
    pub fn from_json(origin: &str, text: &str) -> Result<Self, RegistryError> {
        serde_json::from_str(text).map_err(|source| RegistryError::Parse {
            origin: origin.to_string(),
            source,
        })
    }

    /// Read and parse a table file
    pub fn from_file(path: &Path) -> Result<Self, RegistryError> {
        let text = fs::read_to_string(path).map_err(|source| RegistryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&path.display().to_string(), &text)
    }
}

/// Parse the five bundled tables (ASVS, MASVS, NIST, ISO27001, SBS)
pub fn builtin_tables() -> Result<Vec<ControlTable>, RegistryError> {
    BUILTIN_TABLES
        .iter()
        .map(|(origin, text)| ControlTable::from_json(origin, text))
        .collect()
}

/// Read every `*.json` table in `dir`, sorted by file name
pub fn read_dir_tables(dir: &Path) -> Result<Vec<ControlTable>, RegistryError> {
    let io_err = |source| RegistryError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut paths: Vec<PathBuf> = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        if path.extension().and_then(|ext| ext.to_str()) == Some("json") {
            paths.push(path);
        }
    }
    paths.sort();

    paths.iter().map(|path| ControlTable::from_file(path)).collect()
}
