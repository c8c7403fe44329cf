//! Threat Store Service
//!
//! In-memory record store for information systems and their threats, with
//! the integration policies around the pure risk and tag engines:
//! - STRIDE coercion of free-text categories
//! - factor validation and default risk for manual threats
//! - optimistic versioning of threat writes
//! - report filtering by system, standard and risk tier
//! - intake of AI threat-analysis replies

pub mod config;
pub mod error;
pub mod store;
pub mod report;
pub mod intake;

pub use config::StoreConfig;
pub use error::StoreError;
pub use intake::{parse_ai_response, AiAnalysis, IntakeError, RejectedThreat};
pub use report::{ReportFilter, ThreatReportRow};
pub use store::ThreatStore;
