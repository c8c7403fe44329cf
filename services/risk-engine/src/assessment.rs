//! Inherent vs current risk
//!
//! Inherent risk ignores remediation. Current risk switches to the manual
//! `residual_risk` score once the remediation is applied; residual scores
//! share the overall-score thresholds.

use types::risk::{RiskFactors, RiskLevel};
use types::threat::Threat;

use crate::scoring::{level_from_score, overall_score};

/// Tier of the overall score
pub fn inherent_risk(risk: &RiskFactors) -> RiskLevel {
    level_from_score(overall_score(risk))
}

/// Tier after remediation.
///
/// Uses `residual_risk` only when the remediation is applied and a residual
/// score is recorded; otherwise the inherent tier.
pub fn current_risk(risk: &RiskFactors, remediation_applied: bool) -> RiskLevel {
    match risk.residual_risk {
        Some(residual) if remediation_applied => level_from_score(residual),
        _ => inherent_risk(risk),
    }
}

/// Inherent tier of a threat, `None` when it has no risk record
pub fn threat_inherent_risk_level(threat: &Threat) -> Option<RiskLevel> {
    threat.risk.as_ref().map(inherent_risk)
}

/// Current tier of a threat, `None` when it has no risk record.
///
/// A threat without remediation is treated as unremediated.
pub fn threat_current_risk_level(threat: &Threat) -> Option<RiskLevel> {
    threat
        .risk
        .as_ref()
        .map(|risk| current_risk(risk, threat.remediation_applied()))
}
