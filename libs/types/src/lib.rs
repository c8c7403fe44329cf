//! Types library for the threat-modeling service
//!
//! This library provides the record and value types shared by the standards
//! registry, the risk engine and the threat store.
//!
//! # Modules
//! - `ids`: Unique identifiers (InformationSystemId, ThreatId, RemediationId)
//! - `stride`: STRIDE threat categories and free-text normalization
//! - `risk`: OWASP risk-rating factors and risk levels
//! - `threat`: Threat and remediation records, create/update payloads
//! - `system`: Information system records
//! - `errors`: Error taxonomy

// Public modules
pub mod ids;
pub mod stride;
pub mod risk;
pub mod threat;
pub mod system;
pub mod errors;

// Library version constant
pub const LIB_VERSION: &str = "1.0.0";

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::ids::*;
    pub use crate::stride::*;
    pub use crate::risk::*;
    pub use crate::threat::*;
    pub use crate::system::*;
    pub use crate::errors::*;
}
