//! Threat store
//!
//! Thread-safe in-memory store for information systems and their threats.
//! Every threat owns one risk record and one remediation; both live inside
//! the threat and go away with it.
//!
//! Lock order: `systems` before `threats` before `remediations`. A guard
//! may be held while touching a map later in that order, never the reverse.
//! A remediation id is indexed under the guard that makes its threat
//! visible, so a concurrent delete cannot leave it behind. Reads clone
//! records out and release guards before doing further lookups.

use chrono::Utc;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

use risk_engine::{FactorSource, RiskEngine};
use standards::{strip_display_suffix, ControlTagResolver};
use types::errors::ParseError;
use types::ids::{InformationSystemId, RemediationId, ThreatId};
use types::risk::RiskFactors;
use types::stride::StrideCategory;
use types::system::InformationSystem;
use types::threat::{
    BatchThreatUpdate, NewThreat, Remediation, RemediationUpdate, Threat, ThreatUpdate,
};

use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::intake::AiAnalysis;
use crate::report::{ReportFilter, ThreatReportRow};

/// A record plus its insertion sequence number
#[derive(Debug, Clone)]
struct Stored<T> {
    seq: u64,
    record: T,
}

/// In-memory threat store
#[derive(Debug)]
pub struct ThreatStore {
    config: StoreConfig,
    resolver: ControlTagResolver,
    engine: RiskEngine,
    systems: DashMap<InformationSystemId, Stored<InformationSystem>>,
    threats: DashMap<ThreatId, Stored<Threat>>,
    /// remediation id → owning threat
    remediations: DashMap<RemediationId, ThreatId>,
    sequence: AtomicU64,
}

impl ThreatStore {
    /// Create a store with default configuration
    pub fn new(resolver: ControlTagResolver) -> Self {
        Self::with_config(resolver, StoreConfig::default())
    }

    /// Create a store with custom configuration
    pub fn with_config(resolver: ControlTagResolver, config: StoreConfig) -> Self {
        Self {
            config,
            resolver,
            engine: RiskEngine::new(),
            systems: DashMap::new(),
            threats: DashMap::new(),
            remediations: DashMap::new(),
            sequence: AtomicU64::new(1),
        }
    }

    /// Replace the risk engine used for reports
    pub fn with_engine(mut self, engine: RiskEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn resolver(&self) -> &ControlTagResolver {
        &self.resolver
    }

    pub fn engine(&self) -> &RiskEngine {
        &self.engine
    }

    fn next_seq(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::Relaxed)
    }

    // ── Information systems ──────────────────────────────────────────

    pub fn create_information_system(
        &self,
        title: impl Into<String>,
        description: Option<String>,
    ) -> Result<InformationSystem, StoreError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(StoreError::EmptyTitle);
        }

        let system = InformationSystem::new(title, description, Utc::now());
        self.systems.insert(
            system.id,
            Stored {
                seq: self.next_seq(),
                record: system.clone(),
            },
        );

        info!(system_id = %system.id, title = %system.title, "Information system created");
        Ok(system)
    }

    /// System with its threats in creation order
    pub fn get_information_system(&self, id: InformationSystemId) -> Option<InformationSystem> {
        let mut system = self.systems.get(&id)?.record.clone();
        system.threats = self.threats_of(id);
        Some(system)
    }

    /// Systems newest first, each with its threats
    pub fn list_information_systems(&self, skip: usize, limit: usize) -> Vec<InformationSystem> {
        let mut systems: Vec<(u64, InformationSystem)> = self
            .systems
            .iter()
            .map(|entry| (entry.seq, entry.record.clone()))
            .collect();
        systems.sort_by(|a, b| b.0.cmp(&a.0));

        systems
            .into_iter()
            .skip(skip)
            .take(limit)
            .map(|(_, mut system)| {
                system.threats = self.threats_of(system.id);
                system
            })
            .collect()
    }

    /// Record the reference of an uploaded architecture diagram
    pub fn attach_diagram(
        &self,
        id: InformationSystemId,
        reference: impl Into<String>,
    ) -> Result<InformationSystem, StoreError> {
        let reference = reference.into();
        {
            let mut entry = self
                .systems
                .get_mut(&id)
                .ok_or(StoreError::SystemNotFound(id))?;
            entry.record.diagram = Some(reference.clone());
        }
        info!(system_id = %id, diagram = %reference, "Diagram attached");
        self.get_information_system(id)
            .ok_or(StoreError::SystemNotFound(id))
    }

    /// Delete a system and every threat it owns; returns the threat count.
    pub fn delete_information_system(&self, id: InformationSystemId) -> Result<usize, StoreError> {
        if self.systems.remove(&id).is_none() {
            return Err(StoreError::SystemNotFound(id));
        }

        let mut removed = 0;
        let mut orphaned = Vec::new();
        self.threats.retain(|_, entry| {
            if entry.record.information_system_id != id {
                return true;
            }
            removed += 1;
            if let Some(remediation) = &entry.record.remediation {
                orphaned.push(remediation.id);
            }
            false
        });
        for remediation_id in orphaned {
            self.remediations.remove(&remediation_id);
        }

        info!(system_id = %id, threats = removed, "Information system deleted");
        Ok(removed)
    }

    // ── Threats ──────────────────────────────────────────────────────

    /// Create a threat from a manual entry or accepted AI suggestion.
    ///
    /// Missing fields take the configured defaults. A threat without a
    /// risk block gets every factor set to `default_factor_value`. The
    /// remediation starts pending with its control tags exactly as given.
    pub fn create_threat(
        &self,
        system_id: InformationSystemId,
        new: NewThreat,
    ) -> Result<Threat, StoreError> {
        let category = self.coerce_category(new.category.as_deref())?;
        let risk = new
            .risk
            .unwrap_or_else(|| RiskFactors::uniform(self.config.default_factor_value));
        self.engine.check_factors(&risk, FactorSource::Manual)?;

        let remediation_input = new.remediation.unwrap_or_default();
        let remediation = Remediation::new(
            remediation_input
                .description
                .unwrap_or_else(|| self.config.default_remediation_description.clone()),
            remediation_input.control_tags,
        );

        // Held until the threat and its remediation are indexed so a
        // concurrent system delete cannot miss either.
        let system_guard = self
            .systems
            .get(&system_id)
            .ok_or(StoreError::SystemNotFound(system_id))?;

        let now = Utc::now();
        let threat = Threat {
            id: ThreatId::new(),
            information_system_id: system_id,
            title: new
                .title
                .unwrap_or_else(|| self.config.default_threat_title.clone()),
            description: new.description.unwrap_or_default(),
            category,
            risk: Some(risk),
            remediation: Some(remediation),
            created_at: now,
            updated_at: now,
            version: 1,
        };
        self.threats.insert(
            threat.id,
            Stored {
                seq: self.next_seq(),
                record: threat.clone(),
            },
        );
        if let Some(remediation) = &threat.remediation {
            self.remediations.insert(remediation.id, threat.id);
        }
        drop(system_guard);

        self.log_unknown_tags(threat.id, threat.control_tags());

        info!(
            threat_id = %threat.id,
            system_id = %system_id,
            category = %threat.category,
            "Threat created"
        );
        Ok(threat)
    }

    pub fn get_threat(&self, id: ThreatId) -> Option<Threat> {
        self.threats.get(&id).map(|entry| entry.record.clone())
    }

    /// Threats of a system in creation order
    pub fn threats_by_system(&self, system_id: InformationSystemId) -> Result<Vec<Threat>, StoreError> {
        if !self.systems.contains_key(&system_id) {
            return Err(StoreError::SystemNotFound(system_id));
        }
        Ok(self.threats_of(system_id))
    }

    /// Partially update a threat.
    ///
    /// With `expected_version` set, the write only happens if the stored
    /// version still matches. Nothing is changed when validation fails.
    pub fn update_threat(
        &self,
        id: ThreatId,
        update: &ThreatUpdate,
        expected_version: Option<u64>,
    ) -> Result<Threat, StoreError> {
        let category = match update.category.as_deref() {
            Some(raw) => Some(self.coerce_category(Some(raw))?),
            None => None,
        };
        self.engine.check_factors(&update.risk, FactorSource::Manual)?;

        let updated = {
            let mut entry = self.threats.get_mut(&id).ok_or(StoreError::ThreatNotFound(id))?;
            let threat = &mut entry.record;
            if let Some(expected) = expected_version {
                if threat.version != expected {
                    return Err(StoreError::VersionConflict {
                        id,
                        expected,
                        actual: threat.version,
                    });
                }
            }
            if let Some(remediation_id) = apply_update(
                threat,
                update,
                category,
                &self.config.default_remediation_description,
            ) {
                self.remediations.insert(remediation_id, id);
            }
            threat.clone()
        };

        if update.remediation.as_ref().and_then(|r| r.control_tags.as_ref()).is_some() {
            self.log_unknown_tags(id, updated.control_tags());
        }

        debug!(threat_id = %id, version = updated.version, "Threat updated");
        Ok(updated)
    }

    /// Apply several updates to threats of one system.
    ///
    /// Ids that are unknown or belong to another system are skipped. An
    /// unrecognized category keeps the existing one. Factor values are
    /// validated for the whole batch before anything is written.
    pub fn batch_update(
        &self,
        system_id: InformationSystemId,
        updates: &[BatchThreatUpdate],
    ) -> Result<Vec<Threat>, StoreError> {
        if !self.systems.contains_key(&system_id) {
            return Err(StoreError::SystemNotFound(system_id));
        }
        for item in updates {
            self.engine.check_factors(&item.update.risk, FactorSource::Manual)?;
        }

        let mut updated = Vec::new();
        for item in updates {
            let category = match item.update.category.as_deref() {
                Some(raw) => {
                    let normalized = StrideCategory::normalize(raw);
                    if normalized.is_none() {
                        warn!(threat_id = %item.threat_id, value = raw, "Invalid STRIDE category in batch update, keeping existing");
                    }
                    normalized
                }
                None => None,
            };

            let Some(mut entry) = self.threats.get_mut(&item.threat_id) else {
                debug!(threat_id = %item.threat_id, "Batch update skipped unknown threat");
                continue;
            };
            if entry.record.information_system_id != system_id {
                debug!(threat_id = %item.threat_id, "Batch update skipped threat of another system");
                continue;
            }

            let threat = &mut entry.record;
            if let Some(remediation_id) = apply_update(
                threat,
                &item.update,
                category,
                &self.config.default_remediation_description,
            ) {
                self.remediations.insert(remediation_id, threat.id);
            }
            updated.push(threat.clone());
        }

        if updated.is_empty() {
            return Err(StoreError::NothingUpdated(system_id));
        }

        info!(system_id = %system_id, updated = updated.len(), "Batch update applied");
        Ok(updated)
    }

    pub fn update_remediation(
        &self,
        remediation_id: RemediationId,
        update: &RemediationUpdate,
    ) -> Result<Remediation, StoreError> {
        let not_found = StoreError::RemediationNotFound(remediation_id);
        let threat_id = match self.remediations.get(&remediation_id) {
            Some(entry) => *entry.value(),
            None => return Err(not_found),
        };

        let result = {
            let mut entry = self.threats.get_mut(&threat_id).ok_or(not_found)?;
            let threat = &mut entry.record;
            let Some(remediation) = threat.remediation.as_mut() else {
                return Err(StoreError::RemediationNotFound(remediation_id));
            };
            remediation.apply(update);
            let result = remediation.clone();
            touch(threat);
            result
        };

        if update.control_tags.is_some() {
            self.log_unknown_tags(threat_id, &result.control_tags);
        }
        debug!(remediation_id = %remediation_id, status = result.status, "Remediation updated");
        Ok(result)
    }

    /// Remove a threat with its risk and remediation
    pub fn delete_threat(&self, id: ThreatId) -> bool {
        let Some((_, stored)) = self.threats.remove(&id) else {
            return false;
        };
        if let Some(remediation) = &stored.record.remediation {
            self.remediations.remove(&remediation.id);
        }
        info!(threat_id = %id, "Threat deleted");
        true
    }

    // ── Reports and intake ───────────────────────────────────────────

    /// Threats matching `filter`, newest first
    pub fn report(&self, filter: &ReportFilter) -> Result<Vec<ThreatReportRow>, StoreError> {
        let compiled = filter.compile(&self.config)?;

        let titles: HashMap<InformationSystemId, String> = self
            .systems
            .iter()
            .map(|entry| (*entry.key(), entry.record.title.clone()))
            .collect();

        let mut candidates: Vec<(u64, Threat)> = self
            .threats
            .iter()
            .filter(|entry| {
                compiled
                    .system_id
                    .map_or(true, |id| entry.record.information_system_id == id)
            })
            .map(|entry| (entry.seq, entry.record.clone()))
            .collect();
        candidates.sort_by(|a, b| b.0.cmp(&a.0));

        let registry = self.resolver.registry();
        let rows = candidates
            .into_iter()
            .filter_map(|(_, threat)| {
                let assessment = self.engine.assess_threat(&threat);
                if !compiled.matches(&threat, assessment.as_ref(), registry) {
                    return None;
                }
                Some(ThreatReportRow {
                    system_title: titles
                        .get(&threat.information_system_id)
                        .cloned()
                        .unwrap_or_default(),
                    inherit_risk: assessment.as_ref().map(|a| a.inherit_risk),
                    current_risk_level: assessment.as_ref().map(|a| a.current_risk_level),
                    assessment,
                    threat,
                })
            })
            .skip(compiled.skip)
            .take(compiled.limit)
            .collect();
        Ok(rows)
    }

    /// Persist the accepted suggestions of an AI analysis.
    ///
    /// Returns the number of threats created. Suggestions the store refuses
    /// are logged and skipped.
    pub fn import_ai_analysis(
        &self,
        system_id: InformationSystemId,
        analysis: &AiAnalysis,
    ) -> Result<usize, StoreError> {
        if !self.systems.contains_key(&system_id) {
            return Err(StoreError::SystemNotFound(system_id));
        }

        for rejected in &analysis.rejected {
            warn!(
                index = rejected.index,
                title = ?rejected.title,
                reason = %rejected.reason,
                "AI threat suggestion rejected"
            );
        }

        let mut created = 0;
        for suggestion in &analysis.accepted {
            match self.create_threat(system_id, suggestion.clone()) {
                Ok(_) => created += 1,
                Err(StoreError::SystemNotFound(id)) => return Err(StoreError::SystemNotFound(id)),
                Err(err) => warn!(title = ?suggestion.title, error = %err, "AI threat suggestion not imported"),
            }
        }

        info!(
            system_id = %system_id,
            created,
            rejected = analysis.rejected.len(),
            "AI analysis imported"
        );
        Ok(created)
    }

    // ── Internals ────────────────────────────────────────────────────

    fn threats_of(&self, system_id: InformationSystemId) -> Vec<Threat> {
        let mut threats: Vec<(u64, Threat)> = self
            .threats
            .iter()
            .filter(|entry| entry.record.information_system_id == system_id)
            .map(|entry| (entry.seq, entry.record.clone()))
            .collect();
        threats.sort_by_key(|(seq, _)| *seq);
        threats.into_iter().map(|(_, threat)| threat).collect()
    }

    /// Normalize a category, falling back per configuration
    fn coerce_category(&self, raw: Option<&str>) -> Result<StrideCategory, StoreError> {
        let raw = raw.unwrap_or_default();
        if let Some(category) = StrideCategory::normalize(raw) {
            return Ok(category);
        }
        match self.config.fallback_category {
            Some(fallback) => {
                warn!(value = raw, fallback = %fallback, "Invalid STRIDE category, using fallback");
                Ok(fallback)
            }
            None => Err(ParseError::InvalidStrideCategory {
                value: raw.to_string(),
            }
            .into()),
        }
    }

    fn log_unknown_tags(&self, threat_id: ThreatId, tags: &[String]) {
        for tag in tags {
            let base = strip_display_suffix(tag).unwrap_or(tag);
            if !self.resolver.validate(base) {
                warn!(threat_id = %threat_id, tag = %tag, "Control tag not found in any standard");
            }
        }
    }
}

/// Bump version and modification time
fn touch(threat: &mut Threat) {
    threat.version += 1;
    threat.updated_at = Utc::now();
}

/// Apply a validated partial update in place.
///
/// Returns the id of a remediation created because the threat had none.
fn apply_update(
    threat: &mut Threat,
    update: &ThreatUpdate,
    category: Option<StrideCategory>,
    default_remediation_description: &str,
) -> Option<RemediationId> {
    if let Some(title) = &update.title {
        threat.title = title.clone();
    }
    if let Some(description) = &update.description {
        threat.description = description.clone();
    }
    if let Some(category) = category {
        threat.category = category;
    }

    if update.touches_risk() {
        let residual = update.residual_change();
        match threat.risk.as_mut() {
            Some(risk) => {
                risk.apply_patch(&update.risk);
                if let Some(residual) = residual {
                    risk.residual_risk = residual;
                }
            }
            None => {
                let mut risk = update.risk.clone();
                risk.residual_risk = residual.flatten();
                // Clearing an override on a threat without risk is a no-op.
                if !risk.is_empty() {
                    threat.risk = Some(risk);
                }
            }
        }
    }

    let mut created = None;
    if let Some(remediation_update) = &update.remediation {
        let remediation = threat.remediation.get_or_insert_with(|| {
            let remediation = Remediation::new(default_remediation_description, Vec::new());
            created = Some(remediation.id);
            remediation
        });
        remediation.apply(remediation_update);
    }

    touch(threat);
    created
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use standards::StandardsRegistry;
    use std::sync::Arc;
    use types::risk::RiskLevel;
    use types::threat::NewRemediation;

    fn store_with(config: StoreConfig) -> ThreatStore {
        let registry = Arc::new(StandardsRegistry::builtin().unwrap());
        ThreatStore::with_config(ControlTagResolver::new(registry), config)
    }

    fn store() -> ThreatStore {
        store_with(StoreConfig::default())
    }

    fn new_threat(title: &str, category: &str) -> NewThreat {
        NewThreat {
            title: Some(title.to_string()),
            category: Some(category.to_string()),
            ..NewThreat::default()
        }
    }

    #[test]
    fn test_create_system_rejects_blank_title() {
        let store = store();
        assert!(matches!(
            store.create_information_system("  ", None),
            Err(StoreError::EmptyTitle)
        ));
    }

    #[test]
    fn test_create_threat_defaults() {
        let store = store();
        let system = store.create_information_system("Banca móvil", None).unwrap();
        let threat = store.create_threat(system.id, NewThreat::default()).unwrap();

        assert_eq!(threat.title, "New Threat");
        assert_eq!(threat.description, "");
        assert_eq!(threat.category, StrideCategory::Spoofing);
        assert_eq!(threat.risk, Some(RiskFactors::uniform(5)));
        assert_eq!(threat.version, 1);

        let remediation = threat.remediation.as_ref().unwrap();
        assert_eq!(remediation.description, "No remediation defined");
        assert!(!remediation.status);
        assert!(remediation.control_tags.is_empty());
    }

    #[test]
    fn test_create_threat_normalizes_category() {
        let store = store();
        let system = store.create_information_system("API", None).unwrap();
        let threat = store
            .create_threat(system.id, new_threat("Log wiping", "repudiation (ASVS V7)"))
            .unwrap();
        assert_eq!(threat.category, StrideCategory::Repudiation);
    }

    #[test]
    fn test_strict_config_rejects_invalid_category() {
        let store = store_with(StoreConfig::strict());
        let system = store.create_information_system("API", None).unwrap();
        let err = store
            .create_threat(system.id, new_threat("x", "Phishing"))
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::InvalidValue(ParseError::InvalidStrideCategory { ref value }) if value == "Phishing"
        ));
        assert!(store.threats_by_system(system.id).unwrap().is_empty());
    }

    #[test]
    fn test_create_threat_keeps_tags_verbatim() {
        let store = store();
        let system = store.create_information_system("API", None).unwrap();
        let tags = vec!["PR.AC-1".to_string(), "custom".to_string(), "PR.AC-1".to_string()];
        let threat = store
            .create_threat(
                system.id,
                NewThreat {
                    remediation: Some(NewRemediation {
                        description: Some("Enforce MFA".to_string()),
                        control_tags: tags.clone(),
                    }),
                    ..NewThreat::default()
                },
            )
            .unwrap();
        assert_eq!(threat.control_tags(), tags.as_slice());
    }

    #[test]
    fn test_create_threat_rejects_out_of_range_factor() {
        let store = store();
        let system = store.create_information_system("API", None).unwrap();
        let mut risk = RiskFactors::uniform(3);
        risk.motive = Some(12);
        let err = store
            .create_threat(
                system.id,
                NewThreat {
                    risk: Some(risk),
                    ..NewThreat::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidFactors(_)));
    }

    #[test]
    fn test_create_threat_unknown_system() {
        let store = store();
        let missing = InformationSystemId::new();
        assert!(matches!(
            store.create_threat(missing, NewThreat::default()),
            Err(StoreError::SystemNotFound(id)) if id == missing
        ));
    }

    #[test]
    fn test_update_threat_partial() {
        let store = store();
        let system = store.create_information_system("API", None).unwrap();
        let threat = store.create_threat(system.id, new_threat("t", "Tampering")).unwrap();

        let update = ThreatUpdate {
            description: Some("Body signing missing".to_string()),
            risk: RiskFactors {
                skill_level: Some(9),
                residual_risk: Some(Decimal::from(2)),
                ..RiskFactors::default()
            },
            remediation: Some(RemediationUpdate {
                status: Some(true),
                ..RemediationUpdate::default()
            }),
            ..ThreatUpdate::default()
        };
        let updated = store.update_threat(threat.id, &update, Some(1)).unwrap();

        assert_eq!(updated.title, "t");
        assert_eq!(updated.description, "Body signing missing");
        assert_eq!(updated.version, 2);
        let risk = updated.risk.as_ref().unwrap();
        assert_eq!(risk.skill_level, Some(9));
        assert_eq!(risk.motive, Some(5));
        assert!(updated.remediation_applied());
        assert_eq!(
            risk_engine::threat_current_risk_level(&updated),
            Some(RiskLevel::Low)
        );
    }

    fn remediated_with_residual(store: &ThreatStore, system_id: InformationSystemId) -> Threat {
        let threat = store.create_threat(system_id, new_threat("t", "Tampering")).unwrap();
        let update: ThreatUpdate = serde_json::from_str(
            r#"{"residual_risk": 1.5, "remediation": {"status": true}}"#,
        )
        .unwrap();
        let updated = store.update_threat(threat.id, &update, None).unwrap();
        assert_eq!(
            risk_engine::threat_current_risk_level(&updated),
            Some(RiskLevel::Low)
        );
        updated
    }

    #[test]
    fn test_update_threat_clears_residual_override() {
        let store = store();
        let system = store.create_information_system("API", None).unwrap();
        let threat = remediated_with_residual(&store, system.id);

        let clear: ThreatUpdate = serde_json::from_str(r#"{"residual_risk": null}"#).unwrap();
        let cleared = store.update_threat(threat.id, &clear, None).unwrap();

        let risk = cleared.risk.as_ref().unwrap();
        assert_eq!(risk.residual_risk, None);
        assert_eq!(risk.motive, Some(5));
        assert!(cleared.remediation_applied());
        assert_eq!(
            risk_engine::threat_current_risk_level(&cleared),
            risk_engine::threat_inherent_risk_level(&cleared)
        );
        assert_eq!(
            risk_engine::threat_current_risk_level(&cleared),
            Some(RiskLevel::Medium)
        );
    }

    #[test]
    fn test_update_without_residual_key_keeps_override() {
        let store = store();
        let system = store.create_information_system("API", None).unwrap();
        let threat = remediated_with_residual(&store, system.id);

        let rename: ThreatUpdate = serde_json::from_str(r#"{"title": "renamed"}"#).unwrap();
        let updated = store.update_threat(threat.id, &rename, None).unwrap();
        assert_eq!(
            updated.risk.as_ref().unwrap().residual_risk,
            Some(Decimal::new(15, 1))
        );
    }

    #[test]
    fn test_batch_update_clears_residual_override() {
        let store = store();
        let system = store.create_information_system("API", None).unwrap();
        let threat = remediated_with_residual(&store, system.id);

        let json = format!(r#"[{{"threat_id": "{}", "residual_risk": null}}]"#, threat.id);
        let items: Vec<BatchThreatUpdate> = serde_json::from_str(&json).unwrap();
        let updated = store.batch_update(system.id, &items).unwrap();

        assert_eq!(updated[0].risk.as_ref().unwrap().residual_risk, None);
        assert_eq!(
            risk_engine::threat_current_risk_level(&updated[0]),
            risk_engine::threat_inherent_risk_level(&updated[0])
        );
    }

    #[test]
    fn test_huge_residual_saturates_to_critical() {
        let store = store();
        let system = store.create_information_system("API", None).unwrap();
        let threat = store.create_threat(system.id, new_threat("t", "Tampering")).unwrap();

        let update: ThreatUpdate = serde_json::from_str(
            r#"{"residual_risk": 1e30, "remediation": {"status": true}}"#,
        )
        .unwrap();
        let updated = store.update_threat(threat.id, &update, None).unwrap();
        assert_eq!(updated.risk.as_ref().unwrap().residual_risk, Some(Decimal::MAX));
        assert_eq!(
            risk_engine::threat_current_risk_level(&updated),
            Some(RiskLevel::Critical)
        );
    }

    #[test]
    fn test_system_delete_during_creates_drops_every_remediation() {
        use std::thread;

        for _ in 0..20 {
            let store = Arc::new(store());
            let system = store.create_information_system("Doomed", None).unwrap();
            let writers: Vec<_> = (0..4)
                .map(|_| {
                    let store = Arc::clone(&store);
                    thread::spawn(move || {
                        while store.create_threat(system.id, NewThreat::default()).is_ok() {}
                    })
                })
                .collect();

            thread::yield_now();
            store.delete_information_system(system.id).unwrap();
            for writer in writers {
                writer.join().unwrap();
            }

            assert_eq!(store.threats.len(), 0);
            assert_eq!(store.remediations.len(), 0);
        }
    }

    #[test]
    fn test_update_threat_version_conflict() {
        let store = store();
        let system = store.create_information_system("API", None).unwrap();
        let threat = store.create_threat(system.id, new_threat("t", "Tampering")).unwrap();

        let rename = ThreatUpdate {
            title: Some("renamed".to_string()),
            ..ThreatUpdate::default()
        };
        store.update_threat(threat.id, &rename, Some(1)).unwrap();
        let err = store.update_threat(threat.id, &rename, Some(1)).unwrap_err();
        assert!(matches!(
            err,
            StoreError::VersionConflict { expected: 1, actual: 2, .. }
        ));
        // unconditional writes still go through
        assert_eq!(store.update_threat(threat.id, &rename, None).unwrap().version, 3);
    }

    #[test]
    fn test_update_threat_invalid_category_falls_back() {
        let store = store();
        let system = store.create_information_system("API", None).unwrap();
        let threat = store.create_threat(system.id, new_threat("t", "Tampering")).unwrap();
        let update = ThreatUpdate {
            category: Some("Phishing".to_string()),
            ..ThreatUpdate::default()
        };
        let updated = store.update_threat(threat.id, &update, None).unwrap();
        assert_eq!(updated.category, StrideCategory::Spoofing);
    }

    #[test]
    fn test_failed_update_changes_nothing() {
        let store = store();
        let system = store.create_information_system("API", None).unwrap();
        let threat = store.create_threat(system.id, new_threat("t", "Tampering")).unwrap();
        let update = ThreatUpdate {
            title: Some("renamed".to_string()),
            risk: RiskFactors {
                size: Some(10),
                ..RiskFactors::default()
            },
            ..ThreatUpdate::default()
        };
        assert!(store.update_threat(threat.id, &update, None).is_err());
        assert_eq!(store.get_threat(threat.id).unwrap(), threat);
    }

    #[test]
    fn test_update_remediation() {
        let store = store();
        let system = store.create_information_system("API", None).unwrap();
        let threat = store.create_threat(system.id, NewThreat::default()).unwrap();
        let remediation_id = threat.remediation.as_ref().unwrap().id;

        let update = RemediationUpdate {
            control_tags: Some(vec!["V2.1.1 (ASVS)".to_string()]),
            status: Some(true),
            ..RemediationUpdate::default()
        };
        let remediation = store.update_remediation(remediation_id, &update).unwrap();
        assert!(remediation.status);
        assert_eq!(remediation.description, "No remediation defined");

        let stored = store.get_threat(threat.id).unwrap();
        assert_eq!(stored.control_tags(), ["V2.1.1 (ASVS)"]);
        assert_eq!(stored.version, 2);

        assert!(matches!(
            store.update_remediation(RemediationId::new(), &update),
            Err(StoreError::RemediationNotFound(_))
        ));
    }

    #[test]
    fn test_delete_threat() {
        let store = store();
        let system = store.create_information_system("API", None).unwrap();
        let threat = store.create_threat(system.id, NewThreat::default()).unwrap();
        let remediation_id = threat.remediation.as_ref().unwrap().id;

        assert!(store.delete_threat(threat.id));
        assert!(!store.delete_threat(threat.id));
        assert!(store.get_threat(threat.id).is_none());
        assert!(store
            .update_remediation(remediation_id, &RemediationUpdate::default())
            .is_err());
    }

    #[test]
    fn test_delete_system_cascades() {
        let store = store();
        let doomed = store.create_information_system("Legacy", None).unwrap();
        let kept = store.create_information_system("Core", None).unwrap();
        let a = store.create_threat(doomed.id, NewThreat::default()).unwrap();
        store.create_threat(doomed.id, NewThreat::default()).unwrap();
        let b = store.create_threat(kept.id, NewThreat::default()).unwrap();

        assert_eq!(store.delete_information_system(doomed.id).unwrap(), 2);
        assert!(store.get_threat(a.id).is_none());
        assert!(store.get_threat(b.id).is_some());
        assert!(store.get_information_system(doomed.id).is_none());
        assert!(matches!(
            store.delete_information_system(doomed.id),
            Err(StoreError::SystemNotFound(_))
        ));
    }

    #[test]
    fn test_system_listing_and_diagram() {
        let store = store();
        let first = store.create_information_system("First", None).unwrap();
        let second = store
            .create_information_system("Second", Some("payments".to_string()))
            .unwrap();
        store.create_threat(first.id, NewThreat::default()).unwrap();

        let listed = store.list_information_systems(0, 10);
        assert_eq!(listed[0].id, second.id);
        assert_eq!(listed[1].id, first.id);
        assert_eq!(listed[1].threats.len(), 1);
        assert_eq!(store.list_information_systems(1, 10).len(), 1);

        let with_diagram = store.attach_diagram(first.id, "diagrams/first.png").unwrap();
        assert_eq!(with_diagram.diagram.as_deref(), Some("diagrams/first.png"));
        assert_eq!(with_diagram.threats.len(), 1);
    }
}
