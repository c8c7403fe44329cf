//! STRIDE threat categories
//!
//! Threat `type` values arrive as free text, often straight from a model
//! reply ("Spoofing (Identity)", "TAMPERING"). [`StrideCategory::normalize`]
//! maps them onto the six canonical categories or rejects them.

use crate::errors::ParseError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// One of the six STRIDE categories
///
/// Serialized with its canonical display name ("Information Disclosure").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StrideCategory {
    #[serde(rename = "Spoofing")]
    Spoofing,
    #[serde(rename = "Tampering")]
    Tampering,
    #[serde(rename = "Repudiation")]
    Repudiation,
    #[serde(rename = "Information Disclosure")]
    InformationDisclosure,
    #[serde(rename = "Denial of Service")]
    DenialOfService,
    #[serde(rename = "Elevation of Privilege")]
    ElevationOfPrivilege,
}

impl StrideCategory {
    /// All categories, in the priority order used by the substring fallback
    /// of [`StrideCategory::normalize`].
    pub const ALL: [StrideCategory; 6] = [
        StrideCategory::Spoofing,
        StrideCategory::Tampering,
        StrideCategory::Repudiation,
        StrideCategory::InformationDisclosure,
        StrideCategory::DenialOfService,
        StrideCategory::ElevationOfPrivilege,
    ];

    /// Canonical display name
    pub fn as_str(&self) -> &'static str {
        match self {
            StrideCategory::Spoofing => "Spoofing",
            StrideCategory::Tampering => "Tampering",
            StrideCategory::Repudiation => "Repudiation",
            StrideCategory::InformationDisclosure => "Information Disclosure",
            StrideCategory::DenialOfService => "Denial of Service",
            StrideCategory::ElevationOfPrivilege => "Elevation of Privilege",
        }
    }

    /// Key of the control-suggestion table: upper case, spaces as underscores
    /// (`INFORMATION_DISCLOSURE`).
    pub fn suggestion_key(&self) -> String {
        self.as_str().to_uppercase().replace(' ', "_")
    }

    /// Canonicalize a free-text category.
    ///
    /// 1. Empty or whitespace-only input is rejected.
    /// 2. Case-insensitive exact match against the canonical names.
    /// 3. Case-insensitive substring match: the first category (in
    ///    [`StrideCategory::ALL`] order) whose name occurs in the input.
    pub fn normalize(input: &str) -> Option<Self> {
        let cleaned = input.trim();
        if cleaned.is_empty() {
            return None;
        }
        let lowered = cleaned.to_lowercase();

        Self::ALL
            .iter()
            .copied()
            .find(|category| category.as_str().to_lowercase() == lowered)
            .or_else(|| {
                Self::ALL
                    .iter()
                    .copied()
                    .find(|category| lowered.contains(&category.as_str().to_lowercase()))
            })
    }

    /// `true` when [`StrideCategory::normalize`] accepts the input
    pub fn is_valid(input: &str) -> bool {
        Self::normalize(input).is_some()
    }

    /// The six canonical names
    pub fn valid_categories() -> BTreeSet<&'static str> {
        Self::ALL.iter().map(|category| category.as_str()).collect()
    }
}

impl fmt::Display for StrideCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrideCategory {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::normalize(s).ok_or_else(|| ParseError::InvalidStrideCategory {
            value: s.to_string(),
        })
    }
}


// ── Property-Based Tests ────────────────────────────────────────────
