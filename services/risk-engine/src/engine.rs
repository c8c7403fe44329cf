//! Risk Engine orchestrator
//!
//! Produces the computed risk fields served with every threat: the three
//! scores, the inherent tier (`inherit_risk`) and the current tier.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use types::risk::{RiskFactors, RiskLevel};
use types::threat::Threat;

use crate::scoring::{self, RiskThresholds};
use crate::validator::{self, FactorError, FactorSource};

/// Risk engine configuration
#[derive(Debug, Clone, Default)]
pub struct RiskEngineConfig {
    /// Tier bounds shared by overall and residual scores
    pub thresholds: RiskThresholds,
}

/// Computed risk of one threat
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    #[serde(with = "rust_decimal::serde::float")]
    pub likelihood: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub impact: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub overall: Decimal,
    pub inherit_risk: RiskLevel,
    pub current_risk_level: RiskLevel,
}

/// Risk engine service
#[derive(Debug, Clone, Default)]
pub struct RiskEngine {
    config: RiskEngineConfig,
}

impl RiskEngine {
    /// Create a new risk engine with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new risk engine with custom configuration
    pub fn with_config(config: RiskEngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RiskEngineConfig {
        &self.config
    }

    /// Score a risk record.
    ///
    /// The current tier comes from `residual_risk` when the remediation is
    /// applied and a residual score exists, otherwise it equals the
    /// inherent tier.
    pub fn assess(&self, risk: &RiskFactors, remediation_applied: bool) -> RiskAssessment {
        let thresholds = &self.config.thresholds;
        let overall = scoring::overall_score(risk);
        let inherit_risk = thresholds.classify(overall);
        let current_risk_level = match risk.residual_risk {
            Some(residual) if remediation_applied => thresholds.classify(residual),
            _ => inherit_risk,
        };

        RiskAssessment {
            likelihood: scoring::likelihood_score(risk),
            impact: scoring::impact_score(risk),
            overall,
            inherit_risk,
            current_risk_level,
        }
    }

    /// Score a threat; `None` when it has no risk record
    pub fn assess_threat(&self, threat: &Threat) -> Option<RiskAssessment> {
        threat
            .risk
            .as_ref()
            .map(|risk| self.assess(risk, threat.remediation_applied()))
    }

    /// Validate factor values before they are stored
    pub fn check_factors(&self, risk: &RiskFactors, source: FactorSource) -> Result<(), FactorError> {
        validator::validate_factors(risk, source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_assess_all_nines_but_one() {
        let mut risk = RiskFactors::uniform(9);
        risk.non_compliance = Some(7);

        let engine = RiskEngine::new();
        let assessment = engine.assess(&risk, false);
        assert_eq!(assessment.likelihood, Decimal::from(9));
        assert_eq!(assessment.impact, Decimal::from_str("8.75").unwrap());
        assert_eq!(assessment.overall, Decimal::from_str("8.875").unwrap());
        assert_eq!(assessment.inherit_risk, RiskLevel::High);
        assert_eq!(assessment.current_risk_level, RiskLevel::High);
    }

    #[test]
    fn test_assess_zeros() {
        let assessment = RiskEngine::new().assess(&RiskFactors::uniform(0), true);
        assert_eq!(assessment.overall, Decimal::ZERO);
        assert_eq!(assessment.inherit_risk, RiskLevel::Low);
        assert_eq!(assessment.current_risk_level, RiskLevel::Low);
    }

    #[test]
    fn test_assess_residual_override() {
        let risk = RiskFactors {
            residual_risk: Some(Decimal::from(3)),
            ..RiskFactors::uniform(9)
        };
        let engine = RiskEngine::new();
        assert_eq!(engine.assess(&risk, true).current_risk_level, RiskLevel::Medium);
        assert_eq!(engine.assess(&risk, false).current_risk_level, RiskLevel::Critical);
    }

    #[test]
    fn test_custom_thresholds_apply_to_both_tiers() {
        let engine = RiskEngine::with_config(RiskEngineConfig {
            thresholds: RiskThresholds {
                medium: Decimal::from(1),
                high: Decimal::from(2),
                critical: Decimal::from(3),
            },
        });
        let risk = RiskFactors {
            residual_risk: Some(Decimal::from(2)),
            ..RiskFactors::uniform(3)
        };
        let assessment = engine.assess(&risk, true);
        assert_eq!(assessment.inherit_risk, RiskLevel::Critical);
        assert_eq!(assessment.current_risk_level, RiskLevel::High);
    }

    #[test]
    fn test_assessment_serializes_scores_as_numbers() {
        let assessment = RiskEngine::new().assess(&RiskFactors::uniform(5), false);
        let json = serde_json::to_value(&assessment).unwrap();
        assert_eq!(json["overall"], serde_json::json!(5.0));
        assert_eq!(json["inherit_risk"], "MEDIUM");
    }
}
