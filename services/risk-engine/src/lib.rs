//! Risk Engine Service
//!
//! OWASP risk-rating computations over a threat's sixteen factors:
//! - likelihood / impact / overall scores and their qualitative tier
//! - inherent vs current (remediation-aware) risk
//! - factor validation for manual entry and AI suggestions
//!
//! Every scoring function is total: missing factors score `0` (LOW).

pub mod scoring;
pub mod assessment;
pub mod validator;
pub mod engine;

pub use assessment::{current_risk, inherent_risk, threat_current_risk_level, threat_inherent_risk_level};
pub use engine::{RiskAssessment, RiskEngine, RiskEngineConfig};
pub use scoring::{impact_score, level_from_score, likelihood_score, overall_score, RiskThresholds};
pub use validator::{allowed_values, validate_factors, FactorError, FactorSource};
