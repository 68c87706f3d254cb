//! The encounter-scoped aggregate handed from the profile builder to the
//! narrative generator.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::encounter::Encounter;
use super::enums::{EventKind, TableName};
use super::events::{ClinicalEvent, Condition, Observation};
use super::patient::Patient;
use super::reference::{Organization, Payer, Provider};

/// A field that could not be interpreted and was recorded as absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldWarning {
    pub table: TableName,
    pub source_row: usize,
    pub column: String,
    pub raw: String,
    pub reason: String,
}

/// Fully resolved view of one encounter.
///
/// Built in one piece by `ProfileBuilder`; there are no mutating methods.
/// Every `EventKind` has an entry in `events`, possibly empty, and each
/// collection is sorted by its natural date with source-row order breaking
/// ties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncounterProfile {
    encounter: Encounter,
    patient: Patient,
    provider: Option<Provider>,
    organization: Option<Organization>,
    payer: Option<Payer>,
    events: BTreeMap<EventKind, Vec<ClinicalEvent>>,
    warnings: Vec<FieldWarning>,
}

impl EncounterProfile {
    pub(crate) fn new(
        encounter: Encounter,
        patient: Patient,
        provider: Option<Provider>,
        organization: Option<Organization>,
        payer: Option<Payer>,
        mut events: BTreeMap<EventKind, Vec<ClinicalEvent>>,
        warnings: Vec<FieldWarning>,
    ) -> Self {
        for kind in EventKind::ALL {
            events.entry(*kind).or_default();
        }
        Self {
            encounter,
            patient,
            provider,
            organization,
            payer,
            events,
            warnings,
        }
    }

    pub fn encounter_id(&self) -> &str {
        &self.encounter.id
    }

    pub fn encounter(&self) -> &Encounter {
        &self.encounter
    }

    pub fn patient(&self) -> &Patient {
        &self.patient
    }

    pub fn provider(&self) -> Option<&Provider> {
        self.provider.as_ref()
    }

    pub fn organization(&self) -> Option<&Organization> {
        self.organization.as_ref()
    }

    /// `None` means self-pay or unknown payer.
    pub fn payer(&self) -> Option<&Payer> {
        self.payer.as_ref()
    }

    pub fn events(&self, kind: EventKind) -> &[ClinicalEvent] {
        self.events.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All events, grouped by kind in section order.
    pub fn all_events(&self) -> impl Iterator<Item = &ClinicalEvent> {
        self.events.values().flatten()
    }

    pub fn event_count(&self) -> usize {
        self.events.values().map(Vec::len).sum()
    }

    pub fn conditions(&self) -> impl Iterator<Item = &Condition> {
        self.events(EventKind::Condition).iter().filter_map(|e| match e {
            ClinicalEvent::Condition(c) => Some(c),
            _ => None,
        })
    }

    pub fn observations(&self) -> impl Iterator<Item = &Observation> {
        self.events(EventKind::Observation).iter().filter_map(|e| match e {
            ClinicalEvent::Observation(o) => Some(o),
            _ => None,
        })
    }

    /// Field-level problems found while building; the affected values are absent.
    pub fn warnings(&self) -> &[FieldWarning] {
        &self.warnings
    }
}
