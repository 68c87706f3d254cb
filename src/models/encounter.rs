use serde::{Deserialize, Serialize};

use super::temporal::Temporal;

/// The anchor of a profile: one clinical visit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Encounter {
    pub id: String,
    pub start: Option<Temporal>,
    /// Absent for ongoing encounters. Never earlier than `start`.
    pub stop: Option<Temporal>,
    pub patient_id: String,
    pub organization_id: Option<String>,
    pub provider_id: Option<String>,
    pub payer_id: Option<String>,
    /// e.g. ambulatory, emergency, wellness, inpatient.
    pub encounter_class: Option<String>,
    /// SNOMED CT code of the encounter type.
    pub code: Option<String>,
    pub description: Option<String>,
    pub base_encounter_cost: Option<f64>,
    pub total_claim_cost: Option<f64>,
    pub payer_coverage: Option<f64>,
    pub reason_code: Option<String>,
    pub reason_description: Option<String>,
}
