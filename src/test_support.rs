//! Shared fixtures for unit tests.

use crate::models::{EncounterProfile, EventKind, Patient, Record, TableName, Value};
use crate::pipeline::profile::entities::read_patient;
use crate::pipeline::profile::{FieldReader, ProfileBuilder};
use crate::pipeline::store::{RecordStore, Row};

pub const SCENARIO_TEXT: &str = "Patient visited for a symptom-related ambulatory encounter.";

pub fn encounter_row(id: &str, patient: &str) -> Record {
    Record::new()
        .with("Id", id)
        .with("START", "2020-01-01T10:00:00Z")
        .with("STOP", "2020-01-01T10:15:00Z")
        .with("PATIENT", patient)
        .with("ORGANIZATION", "O1")
        .with("PROVIDER", "PR1")
        .with("PAYER", "PAY1")
        .with("ENCOUNTERCLASS", "ambulatory")
        .with("CODE", "185345009")
        .with("DESCRIPTION", "Encounter for symptom")
        .with("BASE_ENCOUNTER_COST", "85.55")
        .with("TOTAL_CLAIM_COST", "85.55")
        .with("PAYER_COVERAGE", "0.0")
        .with("REASONCODE", Value::Null)
        .with("REASONDESCRIPTION", Value::Null)
}

pub fn patient_row(id: &str) -> Record {
    Record::new()
        .with("Id", id)
        .with("BIRTHDATE", "1980-06-15")
        .with("DEATHDATE", Value::Null)
        .with("SSN", "999-12-3456")
        .with("DRIVERS", Value::Null)
        .with("PASSPORT", Value::Null)
        .with("PREFIX", "Mr.")
        .with("FIRST", "John")
        .with("MIDDLE", Value::Null)
        .with("LAST", "Doe")
        .with("SUFFIX", Value::Null)
        .with("MAIDEN", Value::Null)
        .with("MARITAL", "M")
        .with("RACE", "white")
        .with("ETHNICITY", "nonhispanic")
        .with("GENDER", "M")
        .with("BIRTHPLACE", "Boston Massachusetts US")
        .with("ADDRESS", "1 Main St")
        .with("CITY", "Boston")
        .with("STATE", "Massachusetts")
        .with("COUNTY", "Suffolk County")
        .with("ZIP", "02101")
        .with("LAT", "42.36")
        .with("LON", "-71.05")
        .with("HEALTHCARE_EXPENSES", "1000.0")
        .with("HEALTHCARE_COVERAGE", "500.0")
        .with("INCOME", "50000")
}

pub fn patient(id: &str) -> Patient {
    let record = patient_row(id);
    let mut warnings = Vec::new();
    let mut r = FieldReader::new(
        TableName::Patients,
        Row {
            position: 0,
            record: &record,
        },
        &mut warnings,
    );
    read_patient(&mut r, id)
}

pub fn provider_row(id: &str) -> Record {
    Record::new()
        .with("Id", id)
        .with("ORGANIZATION", "O1")
        .with("NAME", "Dr. Ada Smith")
        .with("GENDER", "F")
        .with("SPECIALITY", "GENERAL PRACTICE")
        .with("CITY", "Boston")
}

pub fn organization_row(id: &str) -> Record {
    Record::new()
        .with("Id", id)
        .with("NAME", "Boston Family Clinic")
        .with("CITY", "Boston")
        .with("STATE", "MA")
}

pub fn payer_row(id: &str) -> Record {
    Record::new()
        .with("Id", id)
        .with("NAME", "Medicare")
        .with("OWNERSHIP", "GOVERNMENT")
        .with("STATE_HEADQUARTERED", "MA")
}

pub fn observation_row(encounter: &str, patient: &str, date: &str) -> Record {
    Record::new()
        .with("DATE", date)
        .with("PATIENT", patient)
        .with("ENCOUNTER", encounter)
        .with("CATEGORY", "vital-signs")
        .with("CODE", "8867-4")
        .with("DESCRIPTION", "Heart rate")
        .with("VALUE", "72.0")
        .with("UNITS", "/min")
        .with("TYPE", "numeric")
}

pub fn condition_row(encounter: &str, patient: &str, start: &str, description: &str) -> Record {
    Record::new()
        .with("START", start)
        .with("STOP", Value::Null)
        .with("PATIENT", patient)
        .with("ENCOUNTER", encounter)
        .with("CODE", "10509002")
        .with("DESCRIPTION", description)
}

/// Minimal row for any event table, dated through its natural date column.
pub fn event_row(kind: EventKind, encounter: &str, patient: &str, date: &str) -> Record {
    Record::new()
        .with(kind.date_column(), date)
        .with("PATIENT", patient)
        .with("ENCOUNTER", encounter)
        .with("CODE", "12345")
        .with("DESCRIPTION", format!("{} entry", kind.as_str()))
}

/// One ambulatory encounter, its patient and references, one observation
/// recorded after the encounter started, no conditions.
pub fn sample_store() -> RecordStore {
    let mut store = RecordStore::new();
    store.index(TableName::Encounters, vec![encounter_row("E1", "P1")]).unwrap();
    store.index(TableName::Patients, vec![patient_row("P1")]).unwrap();
    store.index(TableName::Providers, vec![provider_row("PR1")]).unwrap();
    store.index(TableName::Organizations, vec![organization_row("O1")]).unwrap();
    store.index(TableName::Payers, vec![payer_row("PAY1")]).unwrap();
    store
        .index(
            TableName::Observations,
            vec![observation_row("E1", "P1", "2020-01-01T10:30:00Z")],
        )
        .unwrap();
    store
}

/// `sample_store` plus a second encounter and rows in every event table.
pub fn full_store() -> RecordStore {
    let mut store = sample_store();
    let e2 = encounter_row("E2", "P1")
        .with("START", "2020-02-01T09:00:00Z")
        .with("STOP", "2020-02-01T09:30:00Z")
        .with("REASONCODE", "10509002.0")
        .with("REASONDESCRIPTION", "Acute bronchitis (disorder)");
    store.index(TableName::Encounters, vec![e2]).unwrap();

    for kind in EventKind::ALL {
        store
            .index(
                kind.table(),
                vec![
                    event_row(*kind, "E1", "P1", "2020-01-01T10:05:00Z"),
                    event_row(*kind, "E2", "P1", "2020-02-01T09:10:00Z"),
                    event_row(*kind, "E1", "P1", "2020-01-01T10:01:00Z"),
                    event_row(*kind, "E2", "P1", "2020-02-01T09:10:00Z")
                        .with("ENCOUNTER", Value::Null),
                ],
            )
            .unwrap();
    }
    store
}

pub fn sample_profile() -> EncounterProfile {
    ProfileBuilder::new(&sample_store()).build("E1").unwrap()
}

pub fn full_profile(encounter_id: &str) -> EncounterProfile {
    ProfileBuilder::new(&full_store()).build(encounter_id).unwrap()
}
