//! Store errors

use risk_engine::FactorError;
use thiserror::Error;
use types::errors::ParseError;
use types::ids::{InformationSystemId, RemediationId, ThreatId};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Information system not found: {0}")]
    SystemNotFound(InformationSystemId),

    #[error("Threat not found: {0}")]
    ThreatNotFound(ThreatId),

    #[error("Remediation not found: {0}")]
    RemediationNotFound(RemediationId),

    #[error("Title must not be empty")]
    EmptyTitle,

    #[error(transparent)]
    InvalidValue(#[from] ParseError),

    #[error("Invalid risk factors: {0}")]
    InvalidFactors(#[from] FactorError),

    #[error("Version conflict on threat {id}: expected {expected}, found {actual}")]
    VersionConflict {
        id: ThreatId,
        expected: u64,
        actual: u64,
    },

    #[error("No threats were updated in system {0}")]
    NothingUpdated(InformationSystemId),

    #[error("Invalid identifier: {0}")]
    InvalidId(#[from] uuid::Error),

    #[error("Invalid report filter: {0}")]
    InvalidFilter(String),
}
