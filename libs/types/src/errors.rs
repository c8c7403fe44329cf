//! Error types for the threat-model type library
//!
//! Parsing failures for the closed vocabularies (STRIDE categories, risk
//! levels). Lookups that are expected to miss return `Option` instead.

use thiserror::Error;

/// Failure to parse a closed-vocabulary value
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Invalid STRIDE category: {value}")]
    InvalidStrideCategory { value: String },

    #[error("Invalid risk level: {value} (expected LOW, MEDIUM, HIGH or CRITICAL)")]
    InvalidRiskLevel { value: String },
}
