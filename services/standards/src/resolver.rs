//! Control tag resolver
//!
//! Turns free-text control references (typed by users or produced by the AI
//! assistant) into validated, displayable tags against the
//! [`StandardsRegistry`]. Every operation is fail-soft: unknown input yields
//! `None`, `false` or an empty collection, never an error.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::HashSet;
use std::sync::Arc;

use types::stride::StrideCategory;

use crate::registry::{ControlEntry, StandardInfo, StandardsRegistry};
use crate::suggestions;

/// Default result cap for [`ControlTagResolver::search`]
pub const SEARCH_DEFAULT_LIMIT: usize = 50;
/// Minimum query length (in characters) for search
pub const SEARCH_MIN_QUERY_CHARS: usize = 2;
/// Group name for tags no standard owns
pub const UNKNOWN_STANDARD: &str = "UNKNOWN";

/// Canonical lookup form of a tag: trimmed and upper-cased.
///
/// Standard-name prefixes (`ASVS-V2.1.1`) are left in place.
pub fn normalize_tag(tag: &str) -> String {
    tag.trim().to_uppercase()
}

/// Base tag of an already-formatted `"<tag> (<STD>)"` string.
///
/// The input is trimmed, must end in `)` and contain a `(` after its first
/// character with a non-empty, `)`-free group before the final `)`. The
/// earliest such `(` splits the string; whitespace before it is dropped.
/// Returns `None` when the input is not in display form.
pub fn strip_display_suffix(query: &str) -> Option<&str> {
    let text = query.trim();
    let body = text.strip_suffix(')')?;
    let floor = body.rfind(')').map_or(0, |pos| pos + 1);

    let open = body[floor..]
        .char_indices()
        .map(|(pos, ch)| (floor + pos, ch))
        .find(|&(pos, ch)| ch == '(' && pos >= 1 && pos + 1 < body.len())
        .map(|(pos, _)| pos)?;

    let base = body[..open].trim_end();
    if base.is_empty() || base.contains('\n') {
        return None;
    }
    Some(base)
}

// ── Result records ──────────────────────────────────────────────────

/// Catalogue data of a resolved tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagDetails {
    pub title: String,
    pub description: String,
    pub category: String,
    pub standard: String,
}

/// Tag with display form and catalogue data, as served to tag pickers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailedTag {
    /// Display form, `"<id> (<STD>)"`
    pub tag: String,
    pub tag_id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub standard: String,
}

/// Per-tag outcome of [`ControlTagResolver::validate_batch`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagValidation {
    pub tag: String,
    pub is_valid: bool,
}

/// Tags grouped by owning standard.
///
/// Groups follow registry load order with [`UNKNOWN_STANDARD`] last; empty
/// groups are omitted. Serializes as a JSON object in that order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategorizedTags {
    groups: Vec<(String, Vec<String>)>,
}

impl CategorizedTags {
    pub fn get(&self, standard: &str) -> Option<&[String]> {
        self.groups
            .iter()
            .find(|(name, _)| name == standard)
            .map(|(_, tags)| tags.as_slice())
    }

    /// Group names in output order
    pub fn standards(&self) -> Vec<&str> {
        self.groups.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.groups
            .iter()
            .map(|(name, tags)| (name.as_str(), tags.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

impl Serialize for CategorizedTags {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.groups.len()))?;
        for (name, tags) in &self.groups {
            map.serialize_entry(name, tags)?;
        }
        map.end()
    }
}

// ── Resolver ────────────────────────────────────────────────────────

/// Tag operations over a shared registry; cheap to clone.
#[derive(Debug, Clone)]
pub struct ControlTagResolver {
    registry: Arc<StandardsRegistry>,
}

impl ControlTagResolver {
    pub fn new(registry: Arc<StandardsRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &StandardsRegistry {
        &self.registry
    }

    pub fn normalize(&self, tag: &str) -> String {
        normalize_tag(tag)
    }

    /// True iff the normalized tag is a known control id
    pub fn validate(&self, tag: &str) -> bool {
        self.registry.control_entry(tag).is_some()
    }

    pub fn validate_batch<S: AsRef<str>>(&self, tags: &[S]) -> Vec<TagValidation> {
        tags.iter()
            .map(|tag| TagValidation {
                tag: tag.as_ref().to_string(),
                is_valid: self.validate(tag.as_ref()),
            })
            .collect()
    }

    pub fn details(&self, tag: &str) -> Option<TagDetails> {
        let id = normalize_tag(tag);
        let entry = self.registry.control_by_id(&id)?;
        let standard = self.registry.owner_standard_of(&id)?;
        Some(details_of(entry, standard))
    }

    /// `"<tag as given> (<STD>)"` for known tags, the input unchanged otherwise
    pub fn format_for_display(&self, tag: &str) -> String {
        match self.registry.owner_standard_of(&normalize_tag(tag)) {
            Some(standard) => format!("{tag} ({standard})"),
            None => tag.to_string(),
        }
    }

    /// Ranked control-id search.
    ///
    /// Stages, each excluding ids already selected:
    /// 1. exact id match (case-insensitive)
    /// 2. id contains the query
    /// 3. all ids of the standard named by the query, or else of every
    ///    standard whose name contains it
    /// 4. title or description contains the query
    ///
    /// Queries shorter than two characters return nothing. A display-form
    /// query (`"V2.1.1 (ASVS)"`) is reduced to its base tag first.
    pub fn search(&self, query: &str, limit: usize) -> Vec<String> {
        if query.chars().count() < SEARCH_MIN_QUERY_CHARS {
            return Vec::new();
        }
        let base = match strip_display_suffix(query) {
            Some(base) => base,
            None => query,
        };
        let needle = base.to_lowercase();
        let standard_needle = base.to_uppercase();

        let registry = &*self.registry;
        let mut ranked = Ranked::default();

        // 1. exact
        for (_, control) in registry.all_controls() {
            if control.id.to_lowercase() == needle {
                ranked.push(&control.id);
            }
        }
        // 2. partial
        for (_, control) in registry.all_controls() {
            if control.id.to_lowercase().contains(&needle) {
                ranked.push(&control.id);
            }
        }
        // 3. by standard
        match registry.standard(&standard_needle) {
            _ if standard_needle.is_empty() => {}
            Some(standard) => standard.ids().for_each(|id| ranked.push(id)),
            None => registry
                .standards()
                .iter()
                .filter(|standard| standard.name().contains(&standard_needle))
                .flat_map(|standard| standard.ids())
                .for_each(|id| ranked.push(id)),
        }
        // 4. content
        for (_, control) in registry.all_controls() {
            if control.title.to_lowercase().contains(&needle)
                || control.description.to_lowercase().contains(&needle)
            {
                ranked.push(&control.id);
            }
        }

        ranked
            .ids
            .into_iter()
            .take(limit)
            .map(str::to_string)
            .collect()
    }

    /// Search results as detailed tags; a blank query lists the first
    /// `limit` predefined tags instead.
    pub fn search_detailed(&self, query: &str, limit: usize) -> Vec<DetailedTag> {
        if query.trim().is_empty() {
            return self.all_predefined_tags().into_iter().take(limit).collect();
        }
        self.search(query, limit)
            .iter()
            .filter_map(|id| self.detailed_by_id(id))
            .collect()
    }

    /// Every control of every standard, in load then table order
    pub fn all_predefined_tags(&self) -> Vec<DetailedTag> {
        self.registry
            .all_controls()
            .map(|(standard, control)| detailed(control, standard.name()))
            .collect()
    }

    /// Suggested controls for a free-text STRIDE category name.
    ///
    /// Ids missing from the registry are skipped; unknown categories yield
    /// an empty list.
    pub fn suggested_tags_for_stride(&self, category: &str) -> Vec<DetailedTag> {
        suggestions::suggested_ids(category)
            .iter()
            .filter_map(|id| self.detailed_by_normalized(id))
            .collect()
    }

    pub fn suggested_tags_for(&self, category: StrideCategory) -> Vec<DetailedTag> {
        self.suggested_tags_for_stride(&category.suggestion_key())
    }

    /// Group tags by owning standard, matching the tag exactly as given.
    pub fn categorize<S: AsRef<str>>(&self, tags: &[S]) -> CategorizedTags {
        let mut buckets: Vec<Vec<String>> = vec![Vec::new(); self.registry.standards().len()];
        let mut unknown = Vec::new();

        for tag in tags {
            let tag = tag.as_ref();
            let owner = self
                .registry
                .standards()
                .iter()
                .position(|standard| standard.contains(tag));
            match owner {
                Some(slot) => buckets[slot].push(tag.to_string()),
                None => unknown.push(tag.to_string()),
            }
        }

        let mut groups: Vec<(String, Vec<String>)> = self
            .registry
            .standards()
            .iter()
            .zip(buckets)
            .filter(|(_, tags)| !tags.is_empty())
            .map(|(standard, tags)| (standard.name().to_string(), tags))
            .collect();
        if !unknown.is_empty() {
            groups.push((UNKNOWN_STANDARD.to_string(), unknown));
        }
        CategorizedTags { groups }
    }

    pub fn tags_by_standard(&self, standard: &str) -> Vec<String> {
        self.registry.tags_by_standard(standard)
    }

    pub fn standard_names(&self) -> Vec<&str> {
        self.registry.standard_names()
    }

    pub fn standard_info(&self, standard: &str) -> Option<StandardInfo> {
        self.registry.standard_info(standard)
    }

    pub fn standards_overview(&self) -> Vec<StandardInfo> {
        self.registry.standards_overview()
    }

    fn detailed_by_id(&self, id: &str) -> Option<DetailedTag> {
        let entry = self.registry.control_by_id(id)?;
        let standard = self.registry.owner_standard_of(id)?;
        Some(detailed(entry, standard))
    }

    fn detailed_by_normalized(&self, tag: &str) -> Option<DetailedTag> {
        self.detailed_by_id(&normalize_tag(tag))
    }
}

/// Ids in first-seen order
#[derive(Default)]
struct Ranked<'a> {
    ids: Vec<&'a str>,
    seen: HashSet<&'a str>,
}

impl<'a> Ranked<'a> {
    fn push(&mut self, id: &'a str) {
        if self.seen.insert(id) {
            self.ids.push(id);
        }
    }
}

fn details_of(entry: &ControlEntry, standard: &str) -> TagDetails {
    TagDetails {
        title: entry.title.clone(),
        description: entry.description.clone(),
        category: entry.category.clone(),
        standard: standard.to_string(),
    }
}

fn detailed(entry: &ControlEntry, standard: &str) -> DetailedTag {
    DetailedTag {
        tag: format!("{} ({standard})", entry.id),
        tag_id: entry.id.clone(),
        title: entry.title.clone(),
        description: entry.description.clone(),
        category: entry.category.clone(),
        standard: standard.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> ControlTagResolver {
        ControlTagResolver::new(Arc::new(StandardsRegistry::builtin().unwrap()))
    }

    #[test]
    fn test_normalize_tag() {
        assert_eq!(normalize_tag("  v2.1.1 "), "V2.1.1");
        assert_eq!(normalize_tag(""), "");
        assert_eq!(normalize_tag("   "), "");
        assert_eq!(normalize_tag("asvs-v2.1.1"), "ASVS-V2.1.1");
    }

    #[test]
    fn test_validate() {
        let r = resolver();
        assert!(r.validate("V2.1.1"));
        assert!(r.validate(" v2.1.1"));
        assert!(r.validate("pr.ac-1"));
        assert!(!r.validate("ASVS-V2.1.1"));
        assert!(!r.validate(""));
        assert!(!r.validate("V99.9.9"));
    }

    #[test]
    fn test_legacy_mixed_case_key_never_validates() {
        let r = resolver();
        // Upper-casing the input breaks the accented mixed-case key.
        assert!(!r.validate("SBS-Resolución-4368-2015-Art5"));
        assert_eq!(
            r.registry().owner_standard_of("SBS-Resolución-4368-2015-Art5"),
            Some("SBS")
        );
    }

    #[test]
    fn test_details() {
        let r = resolver();
        let details = r.details("a.9.1.1").unwrap();
        assert_eq!(details.standard, "ISO27001");
        assert!(!details.title.is_empty());
        assert!(r.details("A.9.1").is_none());
    }

    #[test]
    fn test_format_for_display_keeps_input_casing() {
        let r = resolver();
        assert_eq!(r.format_for_display("v2.1.1"), "v2.1.1 (ASVS)");
        assert_eq!(r.format_for_display("AUTH-1"), "AUTH-1 (MASVS)");
        assert_eq!(r.format_for_display("custom-tag"), "custom-tag");
    }

    #[test]
    fn test_strip_display_suffix() {
        assert_eq!(strip_display_suffix("V2.1.1 (ASVS)"), Some("V2.1.1"));
        assert_eq!(strip_display_suffix("  V2.1.1(ASVS)  "), Some("V2.1.1"));
        assert_eq!(strip_display_suffix("A (B) (C)"), Some("A (B)"));
        assert_eq!(strip_display_suffix("((B)"), Some("("));
        assert_eq!(strip_display_suffix("V2.1.1 ()"), None);
        assert_eq!(strip_display_suffix("(ASVS)"), None);
        assert_eq!(strip_display_suffix("V2.1.1"), None);
        assert_eq!(strip_display_suffix("A (B) x"), None);
    }

    #[test]
    fn test_search_short_query() {
        let r = resolver();
        assert!(r.search("", SEARCH_DEFAULT_LIMIT).is_empty());
        assert!(r.search("V", SEARCH_DEFAULT_LIMIT).is_empty());
    }

    #[test]
    fn test_search_exact_first() {
        let r = resolver();
        let results = r.search("v2.1.1", SEARCH_DEFAULT_LIMIT);
        assert_eq!(results[0], "V2.1.1");
    }

    #[test]
    fn test_search_display_form() {
        let r = resolver();
        let results = r.search("V2.1.1 (ASVS)", SEARCH_DEFAULT_LIMIT);
        assert_eq!(results[0], "V2.1.1");
    }

    #[test]
    fn test_search_partial_after_exact() {
        let r = resolver();
        let results = r.search("PR.AC", SEARCH_DEFAULT_LIMIT);
        assert!(!results.is_empty());
        let partial_end = results.iter().take_while(|id| id.starts_with("PR.AC")).count();
        assert!(partial_end >= 5);
        assert!(results.iter().take(partial_end).all(|id| id.contains("PR.AC")));
    }

    #[test]
    fn test_search_standard_name_returns_all_ids() {
        let r = resolver();
        let results = r.search("asvs", 500);
        let asvs = r.tags_by_standard("ASVS");
        for id in &asvs {
            assert!(results.contains(id), "{id}");
        }
    }

    #[test]
    fn test_search_standard_substring() {
        let r = resolver();
        // "SVS" names both ASVS and MASVS
        let results = r.search("svs", 500);
        assert!(results.contains(&"V1.1.1".to_string()));
        assert!(results.contains(&"ARCH-1".to_string()));
    }

    #[test]
    fn test_search_padded_query_skips_standard_stage() {
        let r = resolver();
        // " A" is not a substring of any standard name, so only content
        // matches remain.
        let results = r.search(" A", 1000);
        assert!(!results.is_empty());
        assert!(!results.contains(&"V2.2.3".to_string()));
        assert!(!results.contains(&"AUTH-5".to_string()));
        for id in &results {
            let entry = r.registry().control_by_id(id).unwrap();
            let haystack = format!("{} {}", entry.title, entry.description).to_lowercase();
            assert!(haystack.contains(" a"), "{id}");
        }
    }

    #[test]
    fn test_search_no_duplicates_and_limit() {
        let r = resolver();
        let results = r.search("PR", 7);
        assert_eq!(results.len(), 7);
        let unique: HashSet<&String> = results.iter().collect();
        assert_eq!(unique.len(), results.len());
    }

    #[test]
    fn test_search_content_stage() {
        let r = resolver();
        let results = r.search("entropía", SEARCH_DEFAULT_LIMIT);
        assert!(!results.is_empty());
        for id in &results {
            let entry = r.registry().control_by_id(id).unwrap();
            let haystack = format!("{} {}", entry.title, entry.description).to_lowercase();
            assert!(haystack.contains("entropía"));
        }
    }

    #[test]
    fn test_search_detailed() {
        let r = resolver();
        let listed = r.search_detailed("   ", 10);
        assert_eq!(listed.len(), 10);
        assert_eq!(listed[0].tag, "V1.1.1 (ASVS)");

        let found = r.search_detailed("auth-1", SEARCH_DEFAULT_LIMIT);
        assert_eq!(found[0].tag_id, "AUTH-1");
        assert_eq!(found[0].standard, "MASVS");
    }

    #[test]
    fn test_all_predefined_tags() {
        let r = resolver();
        let all = r.all_predefined_tags();
        assert_eq!(all.len(), r.registry().control_count());
        assert!(all.iter().all(|t| t.tag == format!("{} ({})", t.tag_id, t.standard)));
    }

    #[test]
    fn test_suggested_tags_for_stride() {
        let r = resolver();
        let tags = r.suggested_tags_for_stride("Spoofing");
        let ids: Vec<&str> = tags.iter().map(|t| t.tag_id.as_str()).collect();
        assert_eq!(ids, vec!["V2.1.1", "V2.2.1", "AUTH-1", "A.9.1.1", "PR.AC-1"]);
        assert_eq!(tags[2].tag, "AUTH-1 (MASVS)");

        assert_eq!(
            r.suggested_tags_for(StrideCategory::InformationDisclosure),
            r.suggested_tags_for_stride("information disclosure")
        );
        assert!(r.suggested_tags_for_stride("Phishing").is_empty());
    }

    #[test]
    fn test_categorize() {
        let r = resolver();
        let grouped = r.categorize(&["PR.AC-1", "V2.1.1", "bogus", "AUTH-1", "V3.1.1", "v2.1.1"]);
        assert_eq!(grouped.standards(), vec!["ASVS", "MASVS", "NIST", "UNKNOWN"]);
        assert_eq!(grouped.get("ASVS").unwrap(), ["V2.1.1", "V3.1.1"]);
        // exact match only: lower-case input is not owned
        assert_eq!(grouped.get("UNKNOWN").unwrap(), ["bogus", "v2.1.1"]);
        assert!(grouped.get("SBS").is_none());
    }

    #[test]
    fn test_categorize_serializes_in_order() {
        let r = resolver();
        let grouped = r.categorize(&["SBS-2137-1", "V1.1.1"]);
        let json = serde_json::to_string(&grouped).unwrap();
        assert_eq!(json, r#"{"ASVS":["V1.1.1"],"SBS":["SBS-2137-1"]}"#);
        assert!(r.categorize::<&str>(&[]).is_empty());
    }

    #[test]
    fn test_validate_batch() {
        let r = resolver();
        let results = r.validate_batch(&["V2.1.1", "nope"]);
        assert!(results[0].is_valid);
        assert!(!results[1].is_valid);
        assert_eq!(results[1].tag, "nope");
    }
}
