//! Threat and remediation records
//!
//! A threat owns exactly one risk assessment and one remediation plan; they
//! have no lifecycle of their own and disappear with the threat.

use crate::ids::{InformationSystemId, RemediationId, ThreatId};
use crate::risk::RiskFactors;
use crate::stride::StrideCategory;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

/// Deserialize a tag list where `null` means "no tags"
fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Remediation plan of a threat
///
/// `control_tags` keeps insertion order and duplicates exactly as supplied;
/// it is never null once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Remediation {
    pub id: RemediationId,
    pub description: String,
    /// `true` once the remediation has been applied
    pub status: bool,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub control_tags: Vec<String>,
}

impl Remediation {
    /// Create a pending (not yet applied) remediation
    pub fn new(description: impl Into<String>, control_tags: Vec<String>) -> Self {
        Self {
            id: RemediationId::new(),
            description: description.into(),
            status: false,
            control_tags,
        }
    }

    /// Apply a partial update; absent fields keep their value
    pub fn apply(&mut self, update: &RemediationUpdate) {
        if let Some(description) = &update.description {
            self.description = description.clone();
        }
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(tags) = &update.control_tags {
            self.control_tags = tags.clone();
        }
    }
}

/// Threat record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Threat {
    pub id: ThreatId,
    pub information_system_id: InformationSystemId,
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub category: StrideCategory,
    pub risk: Option<RiskFactors>,
    pub remediation: Option<Remediation>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Optimistic-locking counter, bumped on every write
    pub version: u64,
}

impl Threat {
    /// `true` when a remediation exists and is marked applied
    pub fn remediation_applied(&self) -> bool {
        self.remediation.as_ref().map(|r| r.status).unwrap_or(false)
    }

    /// Control tags of the remediation, empty when there is none
    pub fn control_tags(&self) -> &[String] {
        self.remediation
            .as_ref()
            .map(|r| r.control_tags.as_slice())
            .unwrap_or(&[])
    }
}

/// Remediation block of a threat-creation payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewRemediation {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub control_tags: Vec<String>,
}

/// Threat-creation payload (manual entry or accepted AI suggestion)
///
/// `category` is the raw `type` text; it is normalized by the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewThreat {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "type")]
    pub category: Option<String>,
    #[serde(default)]
    pub risk: Option<RiskFactors>,
    #[serde(default)]
    pub remediation: Option<NewRemediation>,
}

/// Partial remediation update
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemediationUpdate {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<bool>,
    #[serde(default)]
    pub control_tags: Option<Vec<String>>,
}

/// Partial threat update
///
/// Risk factors travel flat next to the threat fields
/// (`{"title": ..., "skill_level": 6, "residual_risk": 2.0}`).
/// `"residual_risk": null` clears the residual override.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThreatUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "type")]
    pub category: Option<String>,
    /// Factor values to overlay; the wire `residual_risk` key lands in
    /// [`ThreatUpdate::residual_risk`], never here.
    #[serde(flatten)]
    pub risk: RiskFactors,
    /// `None` keeps the override, `Some(None)` clears it, `Some(Some(_))` sets it
    #[serde(
        default,
        with = "crate::risk::residual::patch",
        skip_serializing_if = "Option::is_none"
    )]
    pub residual_risk: Option<Option<Decimal>>,
    #[serde(default)]
    pub remediation: Option<RemediationUpdate>,
}

impl ThreatUpdate {
    /// Requested change to the residual override.
    ///
    /// A value placed in `risk.residual_risk` counts as a set when
    /// `residual_risk` itself is absent.
    pub fn residual_change(&self) -> Option<Option<Decimal>> {
        self.residual_risk
            .or_else(|| self.risk.residual_risk.map(Some))
    }

    /// `true` when any factor or the residual override changes
    pub fn touches_risk(&self) -> bool {
        !self.risk.is_empty() || self.residual_change().is_some()
    }
}

/// One entry of a batch update: a threat id plus its partial update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchThreatUpdate {
    pub threat_id: ThreatId,
    #[serde(flatten)]
    pub update: ThreatUpdate,
}
