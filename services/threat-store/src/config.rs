//! Store configuration

use types::stride::StrideCategory;

/// Threat store configuration
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Category used when a supplied STRIDE category cannot be normalized.
    /// `None` rejects the write instead.
    pub fallback_category: Option<StrideCategory>,
    /// Value of every factor of a manual threat created without a risk block
    pub default_factor_value: u8,
    /// Title of a threat created without one
    pub default_threat_title: String,
    /// Description of a remediation created without one
    pub default_remediation_description: String,
    /// Report page size when the filter sets none
    pub report_default_limit: usize,
    /// Largest report page size accepted
    pub report_max_limit: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            fallback_category: Some(StrideCategory::Spoofing),
            default_factor_value: 5,
            default_threat_title: "New Threat".to_string(),
            default_remediation_description: "No remediation defined".to_string(),
            report_default_limit: 1000,
            report_max_limit: 5000,
        }
    }
}

impl StoreConfig {
    /// Reject invalid categories instead of coercing them
    pub fn strict() -> Self {
        Self {
            fallback_category: None,
            ..Self::default()
        }
    }
}
