//! Risk factor validation
//!
//! Manual entry accepts any value in `0..=9`. Values suggested by the AI
//! assistant must come from the discrete OWASP option set of each factor.
//! `residual_risk` is free-form and never validated.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use types::risk::{Factor, RiskFactors};

/// Highest value of any factor
pub const MAX_FACTOR_VALUE: u8 = 9;

/// Where a set of factor values came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FactorSource {
    Manual,
    Ai,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FactorError {
    #[error("{factor} must be between 0 and 9, got {value}")]
    OutOfRange { factor: Factor, value: u8 },

    #[error("{factor} = {value} is not an OWASP option (allowed: {allowed:?})")]
    NotAllowed {
        factor: Factor,
        value: u8,
        allowed: &'static [u8],
    },
}

/// OWASP option values of a factor
pub fn allowed_values(factor: Factor) -> &'static [u8] {
    match factor {
        Factor::SkillLevel => &[0, 1, 3, 5, 6, 9],
        Factor::Motive => &[0, 1, 4, 9],
        Factor::Opportunity => &[0, 4, 7, 9],
        Factor::Size => &[0, 2, 4, 5, 6, 9],
        Factor::EaseOfDiscovery => &[0, 1, 3, 7, 9],
        Factor::EaseOfExploit => &[0, 1, 3, 5, 9],
        Factor::Awareness => &[0, 1, 4, 6, 9],
        Factor::IntrusionDetection => &[0, 1, 3, 8, 9],
        Factor::LossOfConfidentiality => &[0, 2, 6, 7, 9],
        Factor::LossOfIntegrity => &[0, 1, 3, 5, 7, 9],
        Factor::LossOfAvailability => &[0, 1, 5, 7, 9],
        Factor::LossOfAccountability => &[0, 1, 7, 9],
        Factor::FinancialDamage => &[0, 1, 3, 7, 9],
        Factor::ReputationDamage => &[0, 1, 4, 5, 9],
        Factor::NonCompliance => &[0, 2, 5, 7],
        Factor::PrivacyViolation => &[0, 3, 5, 7, 9],
    }
}

/// Check a single factor value
pub fn validate_value(factor: Factor, value: u8, source: FactorSource) -> Result<(), FactorError> {
    match source {
        FactorSource::Manual if value > MAX_FACTOR_VALUE => {
            Err(FactorError::OutOfRange { factor, value })
        }
        FactorSource::Ai if !allowed_values(factor).contains(&value) => {
            Err(FactorError::NotAllowed {
                factor,
                value,
                allowed: allowed_values(factor),
            })
        }
        _ => Ok(()),
    }
}

/// Validate every populated factor.
///
/// Returns the first failure in factor declaration order. Missing factors
/// are not an error.
pub fn validate_factors(risk: &RiskFactors, source: FactorSource) -> Result<(), FactorError> {
    for factor in Factor::ALL {
        if let Some(value) = risk.get(factor) {
            validate_value(factor, value, source)?;
        }
    }
    Ok(())
}
