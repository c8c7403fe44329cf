//! Risk scores and tiers
//!
//! OWASP Risk Rating: each factor group is averaged, likelihood is the mean
//! of the threat-agent and vulnerability groups, impact the mean of the
//! technical and business groups, and the overall score the mean of both.

use rust_decimal::Decimal;
use types::risk::{Factor, FactorGroup, RiskFactors, RiskLevel};

// ── Tier thresholds ──────────────────────────────────────────────────────

/// Lower bounds of the MEDIUM, HIGH and CRITICAL tiers.
///
/// A score equal to a bound belongs to the higher tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RiskThresholds {
    pub medium: Decimal,
    pub high: Decimal,
    pub critical: Decimal,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            medium: Decimal::from(3),
            high: Decimal::from(6),
            critical: Decimal::from(9),
        }
    }
}

impl RiskThresholds {
    pub fn classify(&self, score: Decimal) -> RiskLevel {
        if score < self.medium {
            RiskLevel::Low
        } else if score < self.high {
            RiskLevel::Medium
        } else if score < self.critical {
            RiskLevel::High
        } else {
            RiskLevel::Critical
        }
    }
}

/// Tier of a score under the standard 3 / 6 / 9 thresholds
///
/// `score < 3` → LOW, `< 6` → MEDIUM, `< 9` → HIGH, else CRITICAL.
pub fn level_from_score(score: Decimal) -> RiskLevel {
    RiskThresholds::default().classify(score)
}

// ── Scores ───────────────────────────────────────────────────────────────

/// Mean of the four factors of a group, `None` if any is missing
fn group_mean(risk: &RiskFactors, group: FactorGroup) -> Option<Decimal> {
    let mut sum = Decimal::ZERO;
    for factor in Factor::ALL.iter().filter(|f| f.group() == group) {
        sum += Decimal::from(risk.get(*factor)?);
    }
    Some(sum / Decimal::from(4))
}

fn pair_mean(risk: &RiskFactors, first: FactorGroup, second: FactorGroup) -> Decimal {
    match (group_mean(risk, first), group_mean(risk, second)) {
        (Some(a), Some(b)) => (a + b) / Decimal::from(2),
        _ => Decimal::ZERO,
    }
}

/// Likelihood score; `0` unless all eight likelihood factors are set
pub fn likelihood_score(risk: &RiskFactors) -> Decimal {
    pair_mean(risk, FactorGroup::ThreatAgent, FactorGroup::Vulnerability)
}

/// Impact score; `0` unless all eight impact factors are set
pub fn impact_score(risk: &RiskFactors) -> Decimal {
    pair_mean(risk, FactorGroup::TechnicalImpact, FactorGroup::BusinessImpact)
}

/// Mean of likelihood and impact
pub fn overall_score(risk: &RiskFactors) -> Decimal {
    (likelihood_score(risk) + impact_score(risk)) / Decimal::from(2)
}
