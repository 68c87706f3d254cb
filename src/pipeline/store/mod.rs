pub mod index;

pub use index::*;

use thiserror::Error;

use crate::models::TableName;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("No {table} row with id {id}")]
    NotFound { table: TableName, id: String },

    #[error("Duplicate id {id} in {table}")]
    DuplicateId { table: TableName, id: String },

    #[error("Unknown table: {0}")]
    UnknownTable(String),
}
