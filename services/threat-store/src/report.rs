//! Threat report filtering
//!
//! A report lists threats newest first, optionally narrowed to one system,
//! to threats whose remediation references every listed standard, and to
//! an inherent and/or current risk tier.

use risk_engine::RiskAssessment;
use serde::{Deserialize, Serialize, Serializer};
use standards::{normalize_tag, strip_display_suffix, StandardsRegistry};
use types::ids::InformationSystemId;
use types::risk::RiskLevel;
use types::threat::Threat;

use crate::config::StoreConfig;
use crate::error::StoreError;

/// Report query as received from the caller
///
/// Risk levels are raw strings and validated when the report runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportFilter {
    pub skip: usize,
    /// Page size; the store default when unset
    pub limit: Option<usize>,
    pub system_id: Option<InformationSystemId>,
    /// Standard names; a threat must reference every one of them
    pub standards: Vec<String>,
    pub inherit_risk: Option<String>,
    pub current_risk: Option<String>,
}

impl ReportFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_system(mut self, system_id: InformationSystemId) -> Self {
        self.system_id = Some(system_id);
        self
    }

    /// Filter by a system id given as text
    pub fn with_system_str(self, system_id: &str) -> Result<Self, StoreError> {
        Ok(self.with_system(system_id.trim().parse()?))
    }

    /// Comma-separated standard names (`"asvs, NIST"`); blanks are dropped.
    pub fn with_standards_csv(mut self, csv: &str) -> Self {
        self.standards = csv
            .split(',')
            .map(|name| name.trim().to_uppercase())
            .filter(|name| !name.is_empty())
            .collect();
        self
    }

    pub fn with_inherit_risk(mut self, level: impl Into<String>) -> Self {
        self.inherit_risk = Some(level.into());
        self
    }

    pub fn with_current_risk(mut self, level: impl Into<String>) -> Self {
        self.current_risk = Some(level.into());
        self
    }

    pub fn with_page(mut self, skip: usize, limit: usize) -> Self {
        self.skip = skip;
        self.limit = Some(limit);
        self
    }

    /// Validate levels and page size against the store limits
    pub(crate) fn compile(&self, config: &StoreConfig) -> Result<CompiledFilter, StoreError> {
        let limit = self.limit.unwrap_or(config.report_default_limit);
        if limit == 0 || limit > config.report_max_limit {
            return Err(StoreError::InvalidFilter(format!(
                "limit must be between 1 and {}, got {limit}",
                config.report_max_limit
            )));
        }

        let parse_level = |value: &Option<String>| -> Result<Option<RiskLevel>, StoreError> {
            match value {
                Some(text) => Ok(Some(text.parse::<RiskLevel>()?)),
                None => Ok(None),
            }
        };

        Ok(CompiledFilter {
            skip: self.skip,
            limit,
            system_id: self.system_id,
            standards: self
                .standards
                .iter()
                .map(|name| name.trim().to_uppercase())
                .filter(|name| !name.is_empty())
                .collect(),
            inherit_risk: parse_level(&self.inherit_risk)?,
            current_risk: parse_level(&self.current_risk)?,
        })
    }
}

/// Validated report query
#[derive(Debug, Clone)]
pub(crate) struct CompiledFilter {
    pub skip: usize,
    pub limit: usize,
    pub system_id: Option<InformationSystemId>,
    pub standards: Vec<String>,
    pub inherit_risk: Option<RiskLevel>,
    pub current_risk: Option<RiskLevel>,
}

impl CompiledFilter {
    /// Standard and level predicates; the system predicate is applied by
    /// the caller while scanning.
    pub fn matches(
        &self,
        threat: &Threat,
        assessment: Option<&RiskAssessment>,
        registry: &StandardsRegistry,
    ) -> bool {
        let standards_ok = self.standards.iter().all(|standard| {
            threat
                .control_tags()
                .iter()
                .any(|tag| tag_belongs_to(tag, standard, registry))
        });
        if !standards_ok {
            return false;
        }

        if let Some(level) = self.inherit_risk {
            if assessment.map(|a| a.inherit_risk) != Some(level) {
                return false;
            }
        }
        if let Some(level) = self.current_risk {
            if assessment.map(|a| a.current_risk_level) != Some(level) {
                return false;
            }
        }
        true
    }
}

/// `true` when a stored tag references `standard`: either it is in display
/// form with that suffix (`"V2.1.1 (ASVS)"`) or the standard owns its id.
pub fn tag_belongs_to(tag: &str, standard: &str, registry: &StandardsRegistry) -> bool {
    let tag = tag.trim();
    if tag.ends_with(&format!("({standard})")) {
        return true;
    }
    let base = strip_display_suffix(tag).unwrap_or(tag);
    registry.owner_standard_of(&normalize_tag(base)) == Some(standard)
}

fn level_label<S: Serializer>(level: &Option<RiskLevel>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(RiskLevel::label(*level))
}

/// One report line: the threat, its system and its computed risk
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThreatReportRow {
    #[serde(flatten)]
    pub threat: Threat,
    pub system_title: String,
    pub assessment: Option<RiskAssessment>,
    /// `"UNKNOWN"` when the threat has no risk record
    #[serde(serialize_with = "level_label")]
    pub inherit_risk: Option<RiskLevel>,
    #[serde(serialize_with = "level_label")]
    pub current_risk_level: Option<RiskLevel>,
}
