pub mod fields;
pub mod entities;
pub mod builder;

pub use builder::*;
pub use fields::FieldReader;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProfileError {
    #[error("Encounter not found: {0}")]
    MissingEncounter(String),

    #[error("Data integrity error: {0}")]
    DataIntegrity(String),
}
