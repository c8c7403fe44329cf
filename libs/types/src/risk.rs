//! OWASP Risk Rating types
//!
//! Sixteen discrete factors (each 0–9) grouped into threat agent,
//! vulnerability, technical impact and business impact, plus an optional
//! continuous residual-risk score.

use crate::errors::ParseError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Factor group of the OWASP methodology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FactorGroup {
    ThreatAgent,
    Vulnerability,
    TechnicalImpact,
    BusinessImpact,
}

/// One of the sixteen risk-rating factors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Factor {
    SkillLevel,
    Motive,
    Opportunity,
    Size,
    EaseOfDiscovery,
    EaseOfExploit,
    Awareness,
    IntrusionDetection,
    LossOfConfidentiality,
    LossOfIntegrity,
    LossOfAvailability,
    LossOfAccountability,
    FinancialDamage,
    ReputationDamage,
    NonCompliance,
    PrivacyViolation,
}

impl Factor {
    /// All factors in declaration order
    pub const ALL: [Factor; 16] = [
        Factor::SkillLevel,
        Factor::Motive,
        Factor::Opportunity,
        Factor::Size,
        Factor::EaseOfDiscovery,
        Factor::EaseOfExploit,
        Factor::Awareness,
        Factor::IntrusionDetection,
        Factor::LossOfConfidentiality,
        Factor::LossOfIntegrity,
        Factor::LossOfAvailability,
        Factor::LossOfAccountability,
        Factor::FinancialDamage,
        Factor::ReputationDamage,
        Factor::NonCompliance,
        Factor::PrivacyViolation,
    ];

    /// Wire / column name of the factor
    pub fn name(&self) -> &'static str {
        match self {
            Factor::SkillLevel => "skill_level",
            Factor::Motive => "motive",
            Factor::Opportunity => "opportunity",
            Factor::Size => "size",
            Factor::EaseOfDiscovery => "ease_of_discovery",
            Factor::EaseOfExploit => "ease_of_exploit",
            Factor::Awareness => "awareness",
            Factor::IntrusionDetection => "intrusion_detection",
            Factor::LossOfConfidentiality => "loss_of_confidentiality",
            Factor::LossOfIntegrity => "loss_of_integrity",
            Factor::LossOfAvailability => "loss_of_availability",
            Factor::LossOfAccountability => "loss_of_accountability",
            Factor::FinancialDamage => "financial_damage",
            Factor::ReputationDamage => "reputation_damage",
            Factor::NonCompliance => "non_compliance",
            Factor::PrivacyViolation => "privacy_violation",
        }
    }

    /// Look up a factor by its wire name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|factor| factor.name() == name)
    }

    pub fn group(&self) -> FactorGroup {
        match self {
            Factor::SkillLevel | Factor::Motive | Factor::Opportunity | Factor::Size => {
                FactorGroup::ThreatAgent
            }
            Factor::EaseOfDiscovery
            | Factor::EaseOfExploit
            | Factor::Awareness
            | Factor::IntrusionDetection => FactorGroup::Vulnerability,
            Factor::LossOfConfidentiality
            | Factor::LossOfIntegrity
            | Factor::LossOfAvailability
            | Factor::LossOfAccountability => FactorGroup::TechnicalImpact,
            Factor::FinancialDamage
            | Factor::ReputationDamage
            | Factor::NonCompliance
            | Factor::PrivacyViolation => FactorGroup::BusinessImpact,
        }
    }
}

impl fmt::Display for Factor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// OWASP risk factors of a threat
///
/// Every factor is optional: a missing factor means "not yet assessed".
/// `residual_risk` is a free 0–9 float set manually or after remediation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskFactors {
    // Threat agent
    pub skill_level: Option<u8>,
    pub motive: Option<u8>,
    pub opportunity: Option<u8>,
    pub size: Option<u8>,

    // Vulnerability
    pub ease_of_discovery: Option<u8>,
    pub ease_of_exploit: Option<u8>,
    pub awareness: Option<u8>,
    pub intrusion_detection: Option<u8>,

    // Technical impact
    pub loss_of_confidentiality: Option<u8>,
    pub loss_of_integrity: Option<u8>,
    pub loss_of_availability: Option<u8>,
    pub loss_of_accountability: Option<u8>,

    // Business impact
    pub financial_damage: Option<u8>,
    pub reputation_damage: Option<u8>,
    pub non_compliance: Option<u8>,
    pub privacy_violation: Option<u8>,

    #[serde(
        default,
        with = "residual",
        skip_serializing_if = "Option::is_none"
    )]
    pub residual_risk: Option<Decimal>,
}

/// JSON-float (de)serialization of residual-risk scores.
///
/// Any finite float is accepted. Values beyond the `Decimal` range
/// saturate to `Decimal::MAX` / `Decimal::MIN`.
pub mod residual {
    use rust_decimal::Decimal;
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};
    use std::str::FromStr;

    /// Exact decimal form of a float, saturating outside the `Decimal` range
    pub fn from_f64(value: f64) -> Option<Decimal> {
        if value.is_nan() {
            return None;
        }
        let saturated = if value.is_sign_negative() {
            Decimal::MIN
        } else {
            Decimal::MAX
        };
        if value.is_infinite() {
            return Some(saturated);
        }
        Decimal::from_str(&value.to_string())
            .ok()
            .or_else(|| Decimal::from_f64_retain(value))
            .or(Some(saturated))
    }

    fn decode<E: Error>(value: Option<f64>) -> Result<Option<Decimal>, E> {
        match value {
            None => Ok(None),
            Some(number) => from_f64(number)
                .map(Some)
                .ok_or_else(|| E::custom("residual_risk must be a number")),
        }
    }

    pub fn serialize<S: Serializer>(
        value: &Option<Decimal>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        rust_decimal::serde::float_option::serialize(value, serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Decimal>, D::Error> {
        decode(Option::<f64>::deserialize(deserializer)?)
    }

    /// Three-state form used by partial updates: a missing key is `None`
    /// (via `#[serde(default)]`), `null` is `Some(None)` and a number is
    /// `Some(Some(_))`.
    pub mod patch {
        use rust_decimal::Decimal;
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            value: &Option<Option<Decimal>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(inner) => super::serialize(inner, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<Option<Decimal>>, D::Error> {
            super::decode(Option::<f64>::deserialize(deserializer)?).map(Some)
        }
    }
}

impl RiskFactors {
    /// All sixteen factors set to the same value, no residual risk
    pub fn uniform(value: u8) -> Self {
        let mut risk = Self::default();
        for factor in Factor::ALL {
            risk.set(factor, Some(value));
        }
        risk
    }

    /// Value of a single factor
    pub fn get(&self, factor: Factor) -> Option<u8> {
        match factor {
            Factor::SkillLevel => self.skill_level,
            Factor::Motive => self.motive,
            Factor::Opportunity => self.opportunity,
            Factor::Size => self.size,
            Factor::EaseOfDiscovery => self.ease_of_discovery,
            Factor::EaseOfExploit => self.ease_of_exploit,
            Factor::Awareness => self.awareness,
            Factor::IntrusionDetection => self.intrusion_detection,
            Factor::LossOfConfidentiality => self.loss_of_confidentiality,
            Factor::LossOfIntegrity => self.loss_of_integrity,
            Factor::LossOfAvailability => self.loss_of_availability,
            Factor::LossOfAccountability => self.loss_of_accountability,
            Factor::FinancialDamage => self.financial_damage,
            Factor::ReputationDamage => self.reputation_damage,
            Factor::NonCompliance => self.non_compliance,
            Factor::PrivacyViolation => self.privacy_violation,
        }
    }

    /// Set a single factor
    pub fn set(&mut self, factor: Factor, value: Option<u8>) {
        let slot = match factor {
            Factor::SkillLevel => &mut self.skill_level,
            Factor::Motive => &mut self.motive,
            Factor::Opportunity => &mut self.opportunity,
            Factor::Size => &mut self.size,
            Factor::EaseOfDiscovery => &mut self.ease_of_discovery,
            Factor::EaseOfExploit => &mut self.ease_of_exploit,
            Factor::Awareness => &mut self.awareness,
            Factor::IntrusionDetection => &mut self.intrusion_detection,
            Factor::LossOfConfidentiality => &mut self.loss_of_confidentiality,
            Factor::LossOfIntegrity => &mut self.loss_of_integrity,
            Factor::LossOfAvailability => &mut self.loss_of_availability,
            Factor::LossOfAccountability => &mut self.loss_of_accountability,
            Factor::FinancialDamage => &mut self.financial_damage,
            Factor::ReputationDamage => &mut self.reputation_damage,
            Factor::NonCompliance => &mut self.non_compliance,
            Factor::PrivacyViolation => &mut self.privacy_violation,
        };
        *slot = value;
    }

    /// Overlay every populated field of `patch` onto `self`.
    ///
    /// Fields absent from the patch keep their current value.
    pub fn apply_patch(&mut self, patch: &RiskFactors) {
        for factor in Factor::ALL {
            if let Some(value) = patch.get(factor) {
                self.set(factor, Some(value));
            }
        }
        if patch.residual_risk.is_some() {
            self.residual_risk = patch.residual_risk;
        }
    }

    /// `true` when no factor and no residual risk is populated
    pub fn is_empty(&self) -> bool {
        Factor::ALL.iter().all(|factor| self.get(*factor).is_none())
            && self.residual_risk.is_none()
    }

    /// `true` when all sixteen factors are populated
    pub fn is_fully_assessed(&self) -> bool {
        Factor::ALL.iter().all(|factor| self.get(*factor).is_some())
    }
}

/// Qualitative risk tier
///
/// Ordered LOW < MEDIUM < HIGH < CRITICAL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

/// Label reported for a threat without any risk record
pub const UNKNOWN_RISK_LABEL: &str = "UNKNOWN";

impl RiskLevel {
    pub const ALL: [RiskLevel; 4] = [
        RiskLevel::Low,
        RiskLevel::Medium,
        RiskLevel::High,
        RiskLevel::Critical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
            RiskLevel::Critical => "CRITICAL",
        }
    }

    /// Case-insensitive parse of `LOW|MEDIUM|HIGH|CRITICAL`
    pub fn parse(value: &str) -> Option<Self> {
        let upper = value.trim().to_uppercase();
        Self::ALL.iter().copied().find(|level| level.as_str() == upper)
    }

    /// Label of an optional level, `"UNKNOWN"` when absent
    pub fn label(level: Option<RiskLevel>) -> &'static str {
        level.map(|l| l.as_str()).unwrap_or(UNKNOWN_RISK_LABEL)
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskLevel {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| ParseError::InvalidRiskLevel {
            value: s.to_string(),
        })
    }
}
