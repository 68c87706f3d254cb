use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid {field} value: {value}")]
pub struct InvalidEnum {
    pub field: String,
    pub value: String,
}

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$(Self::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = InvalidEnum;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

str_enum!(TableName {
    Allergies => "allergies",
    Careplans => "careplans",
    Conditions => "conditions",
    Devices => "devices",
    Encounters => "encounters",
    ImagingStudies => "imaging_studies",
    Immunizations => "immunizations",
    Medications => "medications",
    Observations => "observations",
    Organizations => "organizations",
    Patients => "patients",
    Payers => "payers",
    PayerTransitions => "payer_transitions",
    Procedures => "procedures",
    Providers => "providers",
});

/// Clinical event variants. Declaration order is the section order of the
/// rendered profile.
str_enum!(EventKind {
    Condition => "condition",
    Allergy => "allergy",
    Observation => "observation",
    Procedure => "procedure",
    Medication => "medication",
    Immunization => "immunization",
    CarePlan => "careplan",
    Device => "device",
    ImagingStudy => "imaging_study",
});

pub const ID_COLUMN: &str = "Id";
pub const ENCOUNTER_COLUMN: &str = "ENCOUNTER";
pub const PATIENT_COLUMN: &str = "PATIENT";

impl TableName {
    /// Column holding a globally unique row identifier, for tables resolved
    /// by id. Care plans and imaging studies carry an `Id` column too, but
    /// it is not a lookup key (imaging studies repeat it per instance).
    pub fn primary_key(&self) -> Option<&'static str> {
        match self {
            Self::Encounters
            | Self::Patients
            | Self::Organizations
            | Self::Providers
            | Self::Payers => Some(ID_COLUMN),
            _ => None,
        }
    }

    pub fn encounter_key(&self) -> Option<&'static str> {
        self.event_kind().map(|_| ENCOUNTER_COLUMN)
    }

    pub fn patient_key(&self) -> Option<&'static str> {
        match self {
            Self::Encounters | Self::PayerTransitions => Some(PATIENT_COLUMN),
            _ if self.event_kind().is_some() => Some(PATIENT_COLUMN),
            _ => None,
        }
    }

    pub fn event_kind(&self) -> Option<EventKind> {
        match self {
            Self::Allergies => Some(EventKind::Allergy),
            Self::Careplans => Some(EventKind::CarePlan),
            Self::Conditions => Some(EventKind::Condition),
            Self::Devices => Some(EventKind::Device),
            Self::ImagingStudies => Some(EventKind::ImagingStudy),
            Self::Immunizations => Some(EventKind::Immunization),
            Self::Medications => Some(EventKind::Medication),
            Self::Observations => Some(EventKind::Observation),
            Self::Procedures => Some(EventKind::Procedure),
            Self::Encounters
            | Self::Organizations
            | Self::Patients
            | Self::Payers
            | Self::PayerTransitions
            | Self::Providers => None,
        }
    }
}

impl EventKind {
    pub fn table(&self) -> TableName {
        match self {
            Self::Condition => TableName::Conditions,
            Self::Allergy => TableName::Allergies,
            Self::Observation => TableName::Observations,
            Self::Procedure => TableName::Procedures,
            Self::Medication => TableName::Medications,
            Self::Immunization => TableName::Immunizations,
            Self::CarePlan => TableName::Careplans,
            Self::Device => TableName::Devices,
            Self::ImagingStudy => TableName::ImagingStudies,
        }
    }

    /// Column carrying the date the event is ordered by.
    pub fn date_column(&self) -> &'static str {
        match self {
            Self::Observation | Self::Procedure | Self::Immunization | Self::ImagingStudy => "DATE",
            Self::Condition | Self::Allergy | Self::Medication | Self::CarePlan | Self::Device => {
                "START"
            }
        }
    }

    /// Heading used in the rendered profile.
    pub fn section_title(&self) -> &'static str {
        match self {
            Self::Condition => "CONDITIONS",
            Self::Allergy => "ALLERGIES",
            Self::Observation => "OBSERVATIONS",
            Self::Procedure => "PROCEDURES",
            Self::Medication => "MEDICATIONS",
            Self::Immunization => "IMMUNIZATIONS",
            Self::CarePlan => "CARE PLANS",
            Self::Device => "DEVICES",
            Self::ImagingStudy => "IMAGING STUDIES",
        }
    }
}
