//! Suggested controls per STRIDE category
//!
//! Keys are the upper-case, underscore-joined category names
//! (`"INFORMATION_DISCLOSURE"`); see `StrideCategory::suggestion_key`.

use types::stride::StrideCategory;

/// Category key → suggested control ids, in display order
pub const STRIDE_CONTROL_SUGGESTIONS: [(&str, &[&str]); 6] = [
    ("SPOOFING", &["V2.1.1", "V2.2.1", "AUTH-1", "A.9.1.1", "PR.AC-1"]),
    ("TAMPERING", &["V4.1.1", "V4.2.1", "CODE-1", "A.8.2.1", "PR.DS-6"]),
    ("REPUDIATION", &["V3.1.1", "V3.2.1", "A.9.4.2", "PR.PT-1"]),
    (
        "INFORMATION_DISCLOSURE",
        &["V2.1.2", "V2.1.3", "STORAGE-1", "A.9.4.1", "PR.DS-1"],
    ),
    ("DENIAL_OF_SERVICE", &["V1.1.1", "V1.2.1", "A.11.2.4", "PR.DS-4"]),
    ("ELEVATION_OF_PRIVILEGE", &["V4.1.1", "V4.2.1", "A.9.2.3", "PR.AC-4"]),
];

/// Suggested ids for a free-text category name.
///
/// The name is upper-cased and spaces become underscores, so
/// `"Information Disclosure"` and `"information disclosure"` both resolve.
pub fn suggested_ids(category: &str) -> &'static [&'static str] {
    let key = category.trim().to_uppercase().replace(' ', "_");
    STRIDE_CONTROL_SUGGESTIONS
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, ids)| *ids)
        .unwrap_or(&[])
}

/// Suggested ids for a typed category
pub fn suggested_ids_for(category: StrideCategory) -> &'static [&'static str] {
    suggested_ids(&category.suggestion_key())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_category_has_suggestions() {
        for category in StrideCategory::ALL {
            assert!(!suggested_ids_for(category).is_empty(), "{category}");
        }
    }

    #[test]
    fn test_free_text_key() {
        assert_eq!(suggested_ids("Information Disclosure")[2], "STORAGE-1");
        assert_eq!(suggested_ids("denial of service").len(), 4);
        assert!(suggested_ids("Phishing").is_empty());
    }

    #[test]
    fn test_suggestions_exist_in_builtin_registry() {
        let registry = crate::StandardsRegistry::builtin().unwrap();
        for (_, ids) in STRIDE_CONTROL_SUGGESTIONS {
            for id in ids {
                assert!(registry.control_by_id(id).is_some(), "{id}");
            }
        }
    }
}
