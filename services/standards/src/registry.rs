//! Standards registry
//!
//! Immutable catalogue of every loaded standard and its controls. Built once
//! at startup and shared read-only (behind an `Arc`) by the resolver and the
//! threat store.
//!
//! Control ids are unique across standards: a table whose id is already
//! owned by another standard is rejected at build time, so the flat
//! id → standard lookup is never ambiguous.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::resolver::normalize_tag;
use crate::source::{builtin_tables, read_dir_tables, ControlTable};

/// Sample size reported by [`StandardsRegistry::standard_info`]
pub const INFO_SAMPLE_SIZE: usize = 5;
/// Sample size reported per standard by [`StandardsRegistry::standards_overview`]
pub const OVERVIEW_SAMPLE_SIZE: usize = 3;

// ── Errors ──────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Malformed control table {origin}: {source}")]
    Parse {
        origin: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Control table has an empty standard name")]
    EmptyStandardName,

    #[error("Standard {0} is loaded twice")]
    DuplicateStandard(String),

    #[error("Control {id} appears twice in {standard}")]
    DuplicateControl { id: String, standard: String },

    #[error("Control {id} of {standard} is already owned by {owner}")]
    ControlCollision {
        id: String,
        standard: String,
        owner: String,
    },
}

// ── Records ─────────────────────────────────────────────────────────

/// One control of a standard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlEntry {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
}

/// Summary of one standard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandardInfo {
    pub name: String,
    pub controls_count: usize,
    /// Sorted, de-duplicated categories
    pub categories: Vec<String>,
    /// First control ids in table order
    pub sample_controls: Vec<String>,
}

/// A loaded standard: its controls in file order plus an id index
#[derive(Debug, Clone)]
pub struct Standard {
    name: String,
    title: String,
    version: String,
    controls: Vec<ControlEntry>,
    index: HashMap<String, usize>,
}

impl Standard {
    fn from_table(table: ControlTable) -> Result<Self, RegistryError> {
        let name = table.standard.trim().to_uppercase();
        if name.is_empty() {
            return Err(RegistryError::EmptyStandardName);
        }

        let mut index = HashMap::with_capacity(table.controls.len());
        for (pos, control) in table.controls.iter().enumerate() {
            if index.insert(control.id.clone(), pos).is_some() {
                return Err(RegistryError::DuplicateControl {
                    id: control.id.clone(),
                    standard: name,
                });
            }
        }

        Ok(Self {
            name,
            title: table.title,
            version: table.version,
            controls: table.controls,
            index,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Controls in table order
    pub fn controls(&self) -> &[ControlEntry] {
        &self.controls
    }

    /// Exact (case-sensitive) id lookup
    pub fn get(&self, id: &str) -> Option<&ControlEntry> {
        self.index.get(id).map(|&pos| &self.controls[pos])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.controls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controls.is_empty()
    }

    /// Control ids in table order
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.controls.iter().map(|c| c.id.as_str())
    }

    /// Summary with the first `samples` ids
    pub fn info(&self, samples: usize) -> StandardInfo {
        let categories: BTreeSet<&str> = self.controls.iter().map(|c| c.category.as_str()).collect();
        StandardInfo {
            name: self.name.clone(),
            controls_count: self.controls.len(),
            categories: categories.into_iter().map(str::to_string).collect(),
            sample_controls: self.ids().take(samples).map(str::to_string).collect(),
        }
    }
}

// ── Registry ────────────────────────────────────────────────────────

/// All loaded standards, in load order
#[derive(Debug, Clone)]
pub struct StandardsRegistry {
    standards: Vec<Standard>,
    by_name: HashMap<String, usize>,
    /// control id → index of the owning standard
    owners: HashMap<String, usize>,
}

impl StandardsRegistry {
    /// Registry of the five bundled standards:
    /// ASVS, MASVS, NIST, ISO27001, SBS (in that order).
    pub fn builtin() -> Result<Self, RegistryError> {
        Self::from_tables(builtin_tables()?)
    }

    /// Bundled standards followed by every `*.json` table found in `dir`
    pub fn load_dir(dir: &Path) -> Result<Self, RegistryError> {
        let mut tables = builtin_tables()?;
        tables.extend(read_dir_tables(dir)?);
        Self::from_tables(tables)
    }

    /// Build a registry from parsed tables; load order is table order.
    pub fn from_tables(tables: Vec<ControlTable>) -> Result<Self, RegistryError> {
        let mut standards: Vec<Standard> = Vec::with_capacity(tables.len());
        let mut by_name = HashMap::new();
        let mut owners: HashMap<String, usize> = HashMap::new();

        for table in tables {
            let standard = Standard::from_table(table)?;
            let slot = standards.len();

            if by_name.insert(standard.name.clone(), slot).is_some() {
                return Err(RegistryError::DuplicateStandard(standard.name));
            }
            for id in standard.ids() {
                if let Some(&owner) = owners.get(id) {
                    return Err(RegistryError::ControlCollision {
                        id: id.to_string(),
                        standard: standard.name.clone(),
                        owner: standards[owner].name.clone(),
                    });
                }
                owners.insert(id.to_string(), slot);
            }

            debug!(
                standard = %standard.name,
                version = %standard.version,
                controls = standard.len(),
                "Loaded control table"
            );
            standards.push(standard);
        }

        info!(
            standards = standards.len(),
            controls = owners.len(),
            "Standards registry ready"
        );

        Ok(Self {
            standards,
            by_name,
            owners,
        })
    }

    /// Standard names in load order
    pub fn standard_names(&self) -> Vec<&str> {
        self.standards.iter().map(|s| s.name.as_str()).collect()
    }

    /// Standards in load order
    pub fn standards(&self) -> &[Standard] {
        &self.standards
    }

    /// Look up a standard; the name is upper-cased first but not trimmed.
    pub fn standard(&self, name: &str) -> Option<&Standard> {
        self.by_name
            .get(&name.to_uppercase())
            .map(|&slot| &self.standards[slot])
    }

    /// Flat lookup after normalization (trim + upper-case)
    pub fn control_entry(&self, tag: &str) -> Option<&ControlEntry> {
        self.control_by_id(&normalize_tag(tag))
    }

    /// Flat lookup on the exact id, no normalization
    pub fn control_by_id(&self, id: &str) -> Option<&ControlEntry> {
        self.owners
            .get(id)
            .and_then(|&slot| self.standards[slot].get(id))
    }

    /// Name of the standard owning the exact id
    pub fn owner_standard_of(&self, id: &str) -> Option<&str> {
        self.owners
            .get(id)
            .map(|&slot| self.standards[slot].name.as_str())
    }

    /// Every control with its owning standard, in load then table order
    pub fn all_controls(&self) -> impl Iterator<Item = (&Standard, &ControlEntry)> {
        self.standards
            .iter()
            .flat_map(|s| s.controls.iter().map(move |c| (s, c)))
    }

    /// Total number of controls across standards
    pub fn control_count(&self) -> usize {
        self.owners.len()
    }

    /// Control ids of one standard in table order; empty for unknown names
    pub fn tags_by_standard(&self, name: &str) -> Vec<String> {
        self.standard(name)
            .map(|s| s.ids().map(str::to_string).collect())
            .unwrap_or_default()
    }

    pub fn standard_info(&self, name: &str) -> Option<StandardInfo> {
        self.standard(name).map(|s| s.info(INFO_SAMPLE_SIZE))
    }

    /// One summary per standard, in load order
    pub fn standards_overview(&self) -> Vec<StandardInfo> {
        self.standards
            .iter()
            .map(|s| s.info(OVERVIEW_SAMPLE_SIZE))
            .collect()
    }
}
