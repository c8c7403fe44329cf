//! Security-control standards
//!
//! Loads the bundled control catalogues (ASVS, MASVS, NIST CSF, ISO 27001,
//! SBS Peru) into an immutable [`StandardsRegistry`] and resolves the
//! free-text control tags attached to remediations against it.
//!
//! - `source`: on-disk / embedded control-table format
//! - `registry`: the immutable registry built once at startup
//! - `resolver`: tag normalization, validation, formatting, search
//! - `suggestions`: STRIDE category → suggested control ids

pub mod source;
pub mod registry;
pub mod resolver;
pub mod suggestions;

pub use registry::{ControlEntry, RegistryError, Standard, StandardInfo, StandardsRegistry};
pub use resolver::{
    normalize_tag, strip_display_suffix, CategorizedTags, ControlTagResolver, DetailedTag,
    TagDetails, TagValidation, SEARCH_DEFAULT_LIMIT, UNKNOWN_STANDARD,
};
