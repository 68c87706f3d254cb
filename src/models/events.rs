//! Clinical events, one variant per source table.
//!
//! Each payload only carries the columns its table actually has, so a
//! condition can never grow a dosage and an observation never has a UDI.

use serde::{Deserialize, Serialize};

use super::enums::EventKind;
use super::temporal::Temporal;

/// Ownership shared by every clinical event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventLink {
    pub encounter_id: String,
    pub patient_id: String,
    /// Position of the row in its source table.
    pub source_row: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub link: EventLink,
    pub start: Option<Temporal>,
    pub stop: Option<Temporal>,
    pub code: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Procedure {
    pub link: EventLink,
    pub date: Option<Temporal>,
    pub code: Option<String>,
    pub description: Option<String>,
    pub base_cost: Option<f64>,
    pub reason_code: Option<String>,
    pub reason_description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Medication {
    pub link: EventLink,
    pub start: Option<Temporal>,
    pub stop: Option<Temporal>,
    pub payer_id: Option<String>,
    pub code: Option<String>,
    pub description: Option<String>,
    pub base_cost: Option<f64>,
    pub payer_coverage: Option<f64>,
    pub dispenses: Option<u32>,
    pub total_cost: Option<f64>,
    pub reason_code: Option<String>,
    pub reason_description: Option<String>,
}

/// Observation values are typed by the row's `TYPE` column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ObservationValue {
    Numeric(f64),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub link: EventLink,
    pub date: Option<Temporal>,
    pub category: Option<String>,
    /// LOINC code.
    pub code: Option<String>,
    pub description: Option<String>,
    pub value: Option<ObservationValue>,
    pub units: Option<String>,
    pub value_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Immunization {
    pub link: EventLink,
    pub date: Option<Temporal>,
    /// CVX code.
    pub code: Option<String>,
    pub description: Option<String>,
    pub base_cost: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllergyReaction {
    pub code: Option<String>,
    pub description: Option<String>,
    pub severity: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allergy {
    pub link: EventLink,
    pub start: Option<Temporal>,
    pub stop: Option<Temporal>,
    pub code: Option<String>,
    pub system: Option<String>,
    pub description: Option<String>,
    pub allergy_type: Option<String>,
    pub category: Option<String>,
    /// At most two, as recorded (`REACTION1`, `REACTION2`).
    pub reactions: Vec<AllergyReaction>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarePlan {
    pub link: EventLink,
    pub id: Option<String>,
    pub start: Option<Temporal>,
    pub stop: Option<Temporal>,
    pub code: Option<String>,
    pub description: Option<String>,
    pub reason_code: Option<String>,
    pub reason_description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub link: EventLink,
    pub start: Option<Temporal>,
    pub stop: Option<Temporal>,
    pub code: Option<String>,
    pub description: Option<String>,
    pub udi: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImagingStudy {
    pub link: EventLink,
    pub id: Option<String>,
    pub date: Option<Temporal>,
    pub series_uid: Option<String>,
    pub body_site_code: Option<String>,
    pub body_site_description: Option<String>,
    pub modality_code: Option<String>,
    pub modality_description: Option<String>,
    pub instance_uid: Option<String>,
    pub sop_code: Option<String>,
    pub sop_description: Option<String>,
    pub procedure_code: Option<String>,
}

/// A clinical event tagged by its table of origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClinicalEvent {
    Condition(Condition),
    Procedure(Procedure),
    Medication(Medication),
    Observation(Observation),
    Immunization(Immunization),
    Allergy(Allergy),
    CarePlan(CarePlan),
    Device(Device),
    ImagingStudy(ImagingStudy),
}

impl ClinicalEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Condition(_) => EventKind::Condition,
            Self::Procedure(_) => EventKind::Procedure,
            Self::Medication(_) => EventKind::Medication,
            Self::Observation(_) => EventKind::Observation,
            Self::Immunization(_) => EventKind::Immunization,
            Self::Allergy(_) => EventKind::Allergy,
            Self::CarePlan(_) => EventKind::CarePlan,
            Self::Device(_) => EventKind::Device,
            Self::ImagingStudy(_) => EventKind::ImagingStudy,
        }
    }

    pub fn link(&self) -> &EventLink {
        match self {
            Self::Condition(e) => &e.link,
            Self::Procedure(e) => &e.link,
            Self::Medication(e) => &e.link,
            Self::Observation(e) => &e.link,
            Self::Immunization(e) => &e.link,
            Self::Allergy(e) => &e.link,
            Self::CarePlan(e) => &e.link,
            Self::Device(e) => &e.link,
            Self::ImagingStudy(e) => &e.link,
        }
    }

    /// The natural date the event is ordered by (`DATE` or `START`).
    pub fn occurred_at(&self) -> Option<&Temporal> {
        match self {
            Self::Condition(e) => e.start.as_ref(),
            Self::Procedure(e) => e.date.as_ref(),
            Self::Medication(e) => e.start.as_ref(),
            Self::Observation(e) => e.date.as_ref(),
            Self::Immunization(e) => e.date.as_ref(),
            Self::Allergy(e) => e.start.as_ref(),
            Self::CarePlan(e) => e.start.as_ref(),
            Self::Device(e) => e.start.as_ref(),
            Self::ImagingStudy(e) => e.date.as_ref(),
        }
    }
}
