//! Typed entities read from raw rows.

use super::fields::FieldReader;
use crate::models::{
    Allergy, AllergyReaction, CarePlan, ClinicalEvent, Condition, Device, Encounter, EventKind,
    EventLink, ImagingStudy, Immunization, Medication, Observation, ObservationValue,
    Organization, Patient, Payer, Procedure, Provider, Temporal,
};

/// Read an encounter row. `None` for the patient id means the row violates
/// the "every encounter has a patient" invariant; the caller decides.
pub fn read_encounter(r: &mut FieldReader, id: &str) -> (Encounter, Option<String>) {
    let patient_id = r.key("PATIENT");
    let start = r.temporal("START");
    let mut stop = r.temporal("STOP");

    if let (Some(begin), Some(end)) = (start, stop) {
        if end < begin {
            r.warn("STOP", end.to_string(), "encounter stop precedes start");
            stop = None;
        }
    }

    let encounter = Encounter {
        id: id.to_string(),
        start,
        stop,
        patient_id: patient_id.clone().unwrap_or_default(),
        organization_id: r.key("ORGANIZATION"),
        provider_id: r.key("PROVIDER"),
        payer_id: r.key("PAYER"),
        encounter_class: r.text("ENCOUNTERCLASS"),
        code: r.code("CODE"),
        description: r.text("DESCRIPTION"),
        base_encounter_cost: r.number("BASE_ENCOUNTER_COST"),
        total_claim_cost: r.number("TOTAL_CLAIM_COST"),
        payer_coverage: r.number("PAYER_COVERAGE"),
        reason_code: r.code("REASONCODE"),
        reason_description: r.text("REASONDESCRIPTION"),
    };
    (encounter, patient_id)
}

pub fn read_patient(r: &mut FieldReader, id: &str) -> Patient {
    Patient {
        id: id.to_string(),
        birth_date: r.date("BIRTHDATE"),
        death_date: r.date("DEATHDATE"),
        ssn: r.text("SSN"),
        drivers: r.text("DRIVERS"),
        passport: r.text("PASSPORT"),
        prefix: r.text("PREFIX"),
        first: r.text("FIRST"),
        middle: r.text("MIDDLE"),
        last: r.text("LAST"),
        suffix: r.text("SUFFIX"),
        maiden: r.text("MAIDEN"),
        marital: r.text("MARITAL"),
        race: r.text("RACE"),
        ethnicity: r.text("ETHNICITY"),
        gender: r.text("GENDER"),
        birthplace: r.text("BIRTHPLACE"),
        address: r.text("ADDRESS"),
        city: r.text("CITY"),
        state: r.text("STATE"),
        county: r.text("COUNTY"),
        fips: r.code("FIPS"),
        zip: r.code("ZIP"),
        lat: r.number("LAT"),
        lon: r.number("LON"),
        healthcare_expenses: r.number("HEALTHCARE_EXPENSES"),
        healthcare_coverage: r.number("HEALTHCARE_COVERAGE"),
        income: r.number("INCOME"),
    }
}

pub fn read_organization(r: &mut FieldReader, id: &str) -> Organization {
    Organization {
        id: id.to_string(),
        name: r.text("NAME"),
        address: r.text("ADDRESS"),
        city: r.text("CITY"),
        state: r.text("STATE"),
        zip: r.code("ZIP"),
        phone: r.text("PHONE"),
    }
}

pub fn read_provider(r: &mut FieldReader, id: &str) -> Provider {
    Provider {
        id: id.to_string(),
        organization_id: r.key("ORGANIZATION"),
        name: r.text("NAME"),
        gender: r.text("GENDER"),
        speciality: r.text("SPECIALITY"),
        address: r.text("ADDRESS"),
        city: r.text("CITY"),
        state: r.text("STATE"),
        zip: r.code("ZIP"),
    }
}

pub fn read_payer(r: &mut FieldReader, id: &str) -> Payer {
    Payer {
        id: id.to_string(),
        name: r.text("NAME"),
        ownership: r.text("OWNERSHIP"),
        address: r.text("ADDRESS"),
        city: r.text("CITY"),
        state: r.text_first(&["STATE_HEADQUARTERED", "STATE"]),
        zip: r.code("ZIP"),
        phone: r.text("PHONE"),
    }
}

/// The ordering date. Older exports name the procedure date `START`.
fn natural_date(r: &mut FieldReader, kind: EventKind) -> Option<Temporal> {
    let column = kind.date_column();
    if kind == EventKind::Procedure && !r.contains(column) {
        return r.temporal("START");
    }
    r.temporal(column)
}

fn observation_value(r: &mut FieldReader) -> Option<ObservationValue> {
    let declared = r.text("TYPE").map(|t| t.trim().to_ascii_lowercase());
    match declared.as_deref() {
        Some("numeric") => r.number("VALUE").map(ObservationValue::Numeric),
        Some(_) => r.text("VALUE").map(ObservationValue::Text),
        None => {
            let text = r.text("VALUE")?;
            Some(match text.trim().parse::<f64>() {
                Ok(n) if n.is_finite() => ObservationValue::Numeric(n),
                _ => ObservationValue::Text(text),
            })
        }
    }
}

fn allergy_reactions(r: &mut FieldReader) -> Vec<AllergyReaction> {
    (1..=2)
        .filter_map(|n| {
            let reaction = AllergyReaction {
                code: r.code(&format!("REACTION{n}")),
                description: r.text(&format!("DESCRIPTION{n}")),
                severity: r.text(&format!("SEVERITY{n}")),
            };
            let recorded = reaction.code.is_some()
                || reaction.description.is_some()
                || reaction.severity.is_some();
            recorded.then_some(reaction)
        })
        .collect()
}

/// Read one clinical event row of the given kind.
pub fn read_event(r: &mut FieldReader, kind: EventKind, link: EventLink) -> ClinicalEvent {
    match kind {
        EventKind::Condition => ClinicalEvent::Condition(Condition {
            link,
            start: natural_date(r, kind),
            stop: r.temporal("STOP"),
            code: r.code("CODE"),
            description: r.text("DESCRIPTION"),
        }),
        EventKind::Procedure => ClinicalEvent::Procedure(Procedure {
            link,
            date: natural_date(r, kind),
            code: r.code("CODE"),
            description: r.text("DESCRIPTION"),
            base_cost: r.number("BASE_COST"),
            reason_code: r.code("REASONCODE"),
            reason_description: r.text("REASONDESCRIPTION"),
        }),
        EventKind::Medication => ClinicalEvent::Medication(Medication {
            link,
            start: natural_date(r, kind),
            stop: r.temporal("STOP"),
            payer_id: r.key("PAYER"),
            code: r.code("CODE"),
            description: r.text("DESCRIPTION"),
            base_cost: r.number("BASE_COST"),
            payer_coverage: r.number("PAYER_COVERAGE"),
            dispenses: r.count("DISPENSES"),
            total_cost: r.number("TOTALCOST"),
            reason_code: r.code("REASONCODE"),
            reason_description: r.text("REASONDESCRIPTION"),
        }),
        EventKind::Observation => ClinicalEvent::Observation(Observation {
            link,
            date: natural_date(r, kind),
            category: r.text("CATEGORY"),
            code: r.code("CODE"),
            description: r.text("DESCRIPTION"),
            value: observation_value(r),
            units: r.text("UNITS"),
            value_type: r.text("TYPE"),
        }),
        EventKind::Immunization => ClinicalEvent::Immunization(Immunization {
            link,
            date: natural_date(r, kind),
            code: r.code("CODE"),
            description: r.text("DESCRIPTION"),
            base_cost: r.number("BASE_COST"),
        }),
        EventKind::Allergy => ClinicalEvent::Allergy(Allergy {
            link,
            start: natural_date(r, kind),
            stop: r.temporal("STOP"),
            code: r.code("CODE"),
            system: r.text("SYSTEM"),
            description: r.text("DESCRIPTION"),
            allergy_type: r.text("TYPE"),
            category: r.text("CATEGORY"),
            reactions: allergy_reactions(r),
        }),
        EventKind::CarePlan => ClinicalEvent::CarePlan(CarePlan {
            link,
            id: r.key("Id"),
            start: natural_date(r, kind),
            stop: r.temporal("STOP"),
            code: r.code("CODE"),
            description: r.text("DESCRIPTION"),
            reason_code: r.code("REASONCODE"),
            reason_description: r.text("REASONDESCRIPTION"),
        }),
        EventKind::Device => ClinicalEvent::Device(Device {
            link,
            start: natural_date(r, kind),
            stop: r.temporal("STOP"),
            code: r.code("CODE"),
            description: r.text("DESCRIPTION"),
            udi: r.text("UDI"),
        }),
        EventKind::ImagingStudy => ClinicalEvent::ImagingStudy(ImagingStudy {
            link,
            id: r.key("Id"),
            date: natural_date(r, kind),
            series_uid: r.text("SERIES_UID"),
            body_site_code: r.code("BODYSITE_CODE"),
            body_site_description: r.text("BODYSITE_DESCRIPTION"),
            modality_code: r.code("MODALITY_CODE"),
            modality_description: r.text("MODALITY_DESCRIPTION"),
            instance_uid: r.text("INSTANCE_UID"),
            sop_code: r.code("SOP_CODE"),
            sop_description: r.text("SOP_DESCRIPTION"),
            procedure_code: r.code("PROCEDURE_CODE"),
        }),
    }
}
