//! Encounter-scoped join over the record store.
//!
//! resolve encounter → patient → provider/organization/payer → clinical
//! events (by encounter id only) → sort → assemble.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use super::entities::{
    read_encounter, read_event, read_organization, read_patient, read_payer, read_provider,
};
use super::fields::FieldReader;
use super::ProfileError;
use crate::models::{
    ClinicalEvent, EncounterProfile, EventKind, EventLink, FieldWarning, TableName,
};
use crate::pipeline::store::RecordStore;

/// Builds `EncounterProfile`s from a populated, read-only store.
///
/// Holds only a shared reference, so any number of builders may run over
/// the same store at once.
#[derive(Debug, Clone, Copy)]
pub struct ProfileBuilder<'a> {
    store: &'a RecordStore,
}

impl<'a> ProfileBuilder<'a> {
    pub fn new(store: &'a RecordStore) -> Self {
        Self { store }
    }

    pub fn build(&self, encounter_id: &str) -> Result<EncounterProfile, ProfileError> {
        let _span = tracing::info_span!("build_profile", encounter_id).entered();
        let mut warnings = Vec::new();

        // Step 1: the encounter itself
        let encounter_row = self
            .store
            .get_by_id(TableName::Encounters, encounter_id)
            .map_err(|_| ProfileError::MissingEncounter(encounter_id.to_string()))?;
        let (encounter, patient_id) = {
            let mut r = FieldReader::new(TableName::Encounters, encounter_row, &mut warnings);
            read_encounter(&mut r, encounter_id)
        };

        // Step 2: the patient is mandatory
        let patient_id = patient_id.ok_or_else(|| {
            ProfileError::DataIntegrity(format!("encounter {encounter_id} has no patient reference"))
        })?;
        let patient_row = self
            .store
            .get_by_id(TableName::Patients, &patient_id)
            .map_err(|_| {
                ProfileError::DataIntegrity(format!(
                    "encounter {encounter_id} references unknown patient {patient_id}"
                ))
            })?;
        let patient = {
            let mut r = FieldReader::new(TableName::Patients, patient_row, &mut warnings);
            read_patient(&mut r, &patient_id)
        };

        // Step 3: optional references
        let provider = self.resolve_optional(
            TableName::Providers,
            "PROVIDER",
            encounter_row.position,
            encounter.provider_id.as_deref(),
            &mut warnings,
            read_provider,
        );
        let organization = self.resolve_optional(
            TableName::Organizations,
            "ORGANIZATION",
            encounter_row.position,
            encounter.organization_id.as_deref(),
            &mut warnings,
            read_organization,
        );
        let payer = self.resolve_optional(
            TableName::Payers,
            "PAYER",
            encounter_row.position,
            encounter.payer_id.as_deref(),
            &mut warnings,
            read_payer,
        );

        // Step 4+5: encounter-scoped events, coerced and sorted
        let mut events = BTreeMap::new();
        for kind in EventKind::ALL {
            let collection = self.collect_events(*kind, encounter_id, &patient_id, &mut warnings)?;
            events.insert(*kind, collection);
        }

        // Step 6: assemble
        let profile = EncounterProfile::new(
            encounter,
            patient,
            provider,
            organization,
            payer,
            events,
            warnings,
        );

        tracing::info!(
            events = profile.event_count(),
            warnings = profile.warnings().len(),
            "Profile built"
        );
        Ok(profile)
    }

    /// Resolve a reference that may legitimately be missing. An id that is
    /// present but does not resolve is reported as a field warning on the
    /// encounter row.
    fn resolve_optional<T>(
        &self,
        table: TableName,
        column: &str,
        encounter_row: usize,
        id: Option<&str>,
        warnings: &mut Vec<FieldWarning>,
        read: impl FnOnce(&mut FieldReader, &str) -> T,
    ) -> Option<T> {
        let id = id?;
        match self.store.get_by_id(table, id) {
            Ok(row) => {
                let mut r = FieldReader::new(table, row, warnings);
                Some(read(&mut r, id))
            }
            Err(_) => {
                tracing::warn!(table = %table, id, "Unresolved reference, treating as absent");
                warnings.push(FieldWarning {
                    table: TableName::Encounters,
                    source_row: encounter_row,
                    column: column.to_string(),
                    raw: id.to_string(),
                    reason: format!("no {table} row with this id"),
                });
                None
            }
        }
    }

    fn collect_events(
        &self,
        kind: EventKind,
        encounter_id: &str,
        patient_id: &str,
        warnings: &mut Vec<FieldWarning>,
    ) -> Result<Vec<ClinicalEvent>, ProfileError> {
        let table = kind.table();
        let mut collected = Vec::new();

        for row in self.store.lookup_by_encounter(table, encounter_id) {
            let mut r = FieldReader::new(table, row, warnings);

            let event_patient = match r.key("PATIENT") {
                Some(p) if p != patient_id => {
                    return Err(ProfileError::DataIntegrity(format!(
                        "{table} row {} links encounter {encounter_id} to patient {p}, \
                         but the encounter belongs to {patient_id}",
                        row.position
                    )));
                }
                Some(p) => p,
                None => {
                    r.warn("PATIENT", String::new(), "missing patient; using the encounter's");
                    patient_id.to_string()
                }
            };

            let link = EventLink {
                encounter_id: encounter_id.to_string(),
                patient_id: event_patient,
                source_row: row.position,
            };
            collected.push(read_event(&mut r, kind, link));
        }

        // Stable: rows with equal dates keep their table order.
        collected.sort_by(|a, b| compare_dates(a, b));
        Ok(collected)
    }
}

/// Ascending by natural date (a bare date counts as midnight); undated
/// events go last.
fn compare_dates(a: &ClinicalEvent, b: &ClinicalEvent) -> Ordering {
    match (a.occurred_at(), b.occurred_at()) {
        (Some(x), Some(y)) => x.timeline_cmp(y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ObservationValue, Record, Value};
    use crate::test_support::*;

    #[test]
    fn builds_profile_for_requested_encounter() {
        let store = sample_store();
        let profile = ProfileBuilder::new(&store).build("E1").unwrap();
        assert_eq!(profile.encounter_id(), "E1");
        assert_eq!(profile.encounter().id, "E1");
        assert_eq!(profile.patient().id, "P1");
    }

    #[test]
    fn scenario_single_observation_no_conditions() {
        let store = sample_store();
        let profile = ProfileBuilder::new(&store).build("E1").unwrap();

        assert_eq!(profile.patient().id, "P1");
        assert_eq!(profile.encounter().encounter_class.as_deref(), Some("ambulatory"));
        assert_eq!(profile.encounter().code.as_deref(), Some("185345009"));
        assert_eq!(profile.conditions().count(), 0);
        assert!(profile.events(EventKind::Condition).is_empty());

        let observations: Vec<_> = profile.observations().collect();
        assert_eq!(observations.len(), 1);
        assert!(observations[0].date > profile.encounter().start);
        assert_eq!(observations[0].value, Some(ObservationValue::Numeric(72.0)));
    }

    #[test]
    fn unknown_encounter_is_missing_encounter_error() {
        let store = sample_store();
        let err = ProfileBuilder::new(&store).build("E404").unwrap_err();
        assert_eq!(err, ProfileError::MissingEncounter("E404".into()));
    }

    #[test]
    fn unresolved_patient_is_data_integrity_error() {
        let mut store = RecordStore::new();
        store.index(TableName::Encounters, vec![encounter_row("E1", "P-missing")]).unwrap();
        let err = ProfileBuilder::new(&store).build("E1").unwrap_err();
        assert!(matches!(err, ProfileError::DataIntegrity(msg) if msg.contains("P-missing")));
    }

    #[test]
    fn null_patient_reference_is_data_integrity_error() {
        let mut store = RecordStore::new();
        let row = encounter_row("E1", "P1").with("PATIENT", Value::Null);
        store.index(TableName::Encounters, vec![row]).unwrap();
        store.index(TableName::Patients, vec![patient_row("P1")]).unwrap();
        let err = ProfileBuilder::new(&store).build("E1").unwrap_err();
        assert!(matches!(err, ProfileError::DataIntegrity(_)));
    }

    #[test]
    fn missing_optional_references_are_none() {
        let mut store = RecordStore::new();
        let row = encounter_row("E1", "P1")
            .with("PROVIDER", Value::Null)
            .with("ORGANIZATION", Value::Null)
            .with("PAYER", Value::Null);
        store.index(TableName::Encounters, vec![row]).unwrap();
        store.index(TableName::Patients, vec![patient_row("P1")]).unwrap();

        let profile = ProfileBuilder::new(&store).build("E1").unwrap();
        assert!(profile.provider().is_none());
        assert!(profile.organization().is_none());
        assert!(profile.payer().is_none());
        assert!(profile.warnings().is_empty());
    }

    #[test]
    fn dangling_optional_reference_warns() {
        let mut store = RecordStore::new();
        store.index(TableName::Encounters, vec![encounter_row("E1", "P1")]).unwrap();
        store.index(TableName::Patients, vec![patient_row("P1")]).unwrap();

        let profile = ProfileBuilder::new(&store).build("E1").unwrap();
        assert!(profile.provider().is_none());
        let columns: Vec<_> = profile.warnings().iter().map(|w| w.column.as_str()).collect();
        assert!(columns.contains(&"PROVIDER"));
        assert!(columns.contains(&"ORGANIZATION"));
        assert!(columns.contains(&"PAYER"));
    }

    #[test]
    fn resolves_references_when_present() {
        let store = full_store();
        let profile = ProfileBuilder::new(&store).build("E1").unwrap();
        assert_eq!(profile.provider().unwrap().id, "PR1");
        assert_eq!(profile.organization().unwrap().id, "O1");
        assert_eq!(profile.payer().unwrap().name.as_deref(), Some("Medicare"));
    }

    #[test]
    fn patient_level_events_excluded() {
        let mut store = sample_store();
        store
            .index(
                TableName::Conditions,
                vec![
                    condition_row("E2", "P1", "2019-01-01", "Hypertension"),
                    condition_row("E1", "P1", "2020-01-01", "Acute bronchitis"),
                ],
            )
            .unwrap();
        let profile = ProfileBuilder::new(&store).build("E1").unwrap();
        let names: Vec<_> = profile
            .conditions()
            .map(|c| c.description.clone().unwrap_or_default())
            .collect();
        assert_eq!(names, vec!["Acute bronchitis"]);
    }

    #[test]
    fn every_event_appears_exactly_once_in_its_own_encounter() {
        let store = full_store();
        let builder = ProfileBuilder::new(&store);
        let ids = store.ids(TableName::Encounters);

        let mut seen: Vec<(TableName, usize, String)> = Vec::new();
        for id in &ids {
            let profile = builder.build(id).unwrap();
            for event in profile.all_events() {
                assert_eq!(&event.link().encounter_id, id);
                seen.push((event.kind().table(), event.link().source_row, id.clone()));
            }
        }

        for kind in EventKind::ALL {
            let table = kind.table();
            for id in &ids {
                for row in store.lookup_by_encounter(table, id) {
                    let hits = seen
                        .iter()
                        .filter(|(t, r, _)| *t == table && *r == row.position)
                        .collect::<Vec<_>>();
                    assert_eq!(hits.len(), 1, "{table} row {} seen {hits:?}", row.position);
                    assert_eq!(&hits[0].2, id);
                }
            }
        }
    }

    #[test]
    fn events_sorted_by_date_with_stable_ties() {
        let mut store = sample_store();
        store
            .index(
                TableName::Observations,
                vec![
                    observation_row("E1", "P1", "2020-01-01T12:00:00Z").with("DESCRIPTION", "late"),
                    observation_row("E1", "P1", "2020-01-01T11:00:00Z").with("DESCRIPTION", "tie-a"),
                    observation_row("E1", "P1", "not a date").with("DESCRIPTION", "undated"),
                    observation_row("E1", "P1", "2020-01-01T11:00:00Z").with("DESCRIPTION", "tie-b"),
                ],
            )
            .unwrap();

        let profile = ProfileBuilder::new(&store).build("E1").unwrap();
        let order: Vec<_> = profile
            .observations()
            .map(|o| o.description.clone().unwrap_or_default())
            .collect();
        assert_eq!(order, vec!["Heart rate", "tie-a", "tie-b", "late", "undated"]);
        assert_eq!(profile.warnings().len(), 1);
        assert_eq!(profile.warnings()[0].column, "DATE");
    }

    #[test]
    fn bare_date_ties_midnight_timestamp_in_row_order() {
        let mut store = RecordStore::new();
        store.index(TableName::Encounters, vec![encounter_row("E1", "P1")]).unwrap();
        store.index(TableName::Patients, vec![patient_row("P1")]).unwrap();
        store
            .index(
                TableName::Observations,
                vec![
                    observation_row("E1", "P1", "2020-01-01T00:00:00Z").with("DESCRIPTION", "midnight"),
                    observation_row("E1", "P1", "2020-01-01").with("DESCRIPTION", "date-only"),
                    observation_row("E1", "P1", "2020-01-01T00:00:00Z").with("DESCRIPTION", "midnight-again"),
                ],
            )
            .unwrap();

        let profile = ProfileBuilder::new(&store).build("E1").unwrap();
        let order: Vec<_> = profile
            .observations()
            .map(|o| o.description.clone().unwrap_or_default())
            .collect();
        assert_eq!(order, vec!["midnight", "date-only", "midnight-again"]);
    }

    #[test]
    fn malformed_field_does_not_abort_build() {
        let mut store = RecordStore::new();
        let row = encounter_row("E1", "P1").with("TOTAL_CLAIM_COST", "lots");
        store.index(TableName::Encounters, vec![row]).unwrap();
        store.index(TableName::Patients, vec![patient_row("P1")]).unwrap();

        let profile = ProfileBuilder::new(&store).build("E1").unwrap();
        assert_eq!(profile.encounter().total_claim_cost, None);
        assert!(profile
            .warnings()
            .iter()
            .any(|w| w.column == "TOTAL_CLAIM_COST" && w.raw == "lots"));
    }

    #[test]
    fn event_for_other_patient_is_data_integrity_error() {
        let mut store = sample_store();
        store
            .index(
                TableName::Conditions,
                vec![condition_row("E1", "P2", "2020-01-01", "Mismatch")],
            )
            .unwrap();
        let err = ProfileBuilder::new(&store).build("E1").unwrap_err();
        assert!(matches!(err, ProfileError::DataIntegrity(_)));
    }

    #[test]
    fn concurrent_builds_share_store() {
        let store = full_store();
        std::thread::scope(|s| {
            let handles: Vec<_> = ["E1", "E2"]
                .into_iter()
                .map(|id| {
                    let store = &store;
                    s.spawn(move || ProfileBuilder::new(store).build(id).unwrap())
                })
                .collect();
            for handle in handles {
                let profile = handle.join().unwrap();
                assert!(["E1", "E2"].contains(&profile.encounter_id()));
            }
        });
    }

    #[test]
    fn reason_code_absent_is_none() {
        let mut store = RecordStore::new();
        let row: Record = encounter_row("E1", "P1").with("REASONCODE", "");
        store.index(TableName::Encounters, vec![row]).unwrap();
        store.index(TableName::Patients, vec![patient_row("P1")]).unwrap();
        let profile = ProfileBuilder::new(&store).build("E1").unwrap();
        assert_eq!(profile.encounter().reason_code, None);
    }
}
