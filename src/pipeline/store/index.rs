//! Build-once, read-many index over the input tables.
//!
//! Rows are kept in arrival order per table; every index maps a key to row
//! positions, so lookups return rows in their original order. After the
//! store is populated it is only read, which makes `&RecordStore` safe to
//! share between concurrent profile builds.

use std::collections::HashMap;
use std::str::FromStr;

use super::StoreError;
use crate::models::{Record, TableName};

/// A row together with its position in the source table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Row<'a> {
    pub position: usize,
    pub record: &'a Record,
}

#[derive(Debug, Default)]
struct TableIndex {
    rows: Vec<Record>,
    by_id: HashMap<String, usize>,
    by_encounter: HashMap<String, Vec<usize>>,
    by_patient: HashMap<String, Vec<usize>>,
}

impl TableIndex {
    fn row(&self, position: usize) -> Row<'_> {
        Row {
            position,
            record: &self.rows[position],
        }
    }

    fn rows_at<'a>(&'a self, positions: Option<&'a Vec<usize>>) -> Vec<Row<'a>> {
        positions
            .map(|ps| ps.iter().map(|&p| self.row(p)).collect())
            .unwrap_or_default()
    }
}

#[derive(Debug, Default)]
pub struct RecordStore {
    tables: HashMap<TableName, TableIndex>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register rows for a table and index them by every key column the table
    /// exposes. Calling it again for the same table appends.
    ///
    /// Fails without indexing anything if a primary id would be duplicated.
    /// Returns the number of rows added.
    pub fn index(
        &mut self,
        table: TableName,
        rows: impl IntoIterator<Item = Record>,
    ) -> Result<usize, StoreError> {
        let rows: Vec<Record> = rows.into_iter().collect();
        let entry = self.tables.entry(table).or_default();

        if let Some(pk) = table.primary_key() {
            let mut seen = std::collections::HashSet::new();
            for record in &rows {
                if let Some(id) = record.key(pk) {
                    if entry.by_id.contains_key(&id) || !seen.insert(id.clone()) {
                        return Err(StoreError::DuplicateId { table, id });
                    }
                }
            }
        }

        let added = rows.len();
        for record in rows {
            let position = entry.rows.len();

            if let Some(pk) = table.primary_key() {
                match record.key(pk) {
                    Some(id) => {
                        entry.by_id.insert(id, position);
                    }
                    None => tracing::warn!(
                        table = %table,
                        row = position,
                        "Row has no id and cannot be resolved by reference"
                    ),
                }
            }
            if let Some(id) = table.encounter_key().and_then(|col| record.key(col)) {
                entry.by_encounter.entry(id).or_default().push(position);
            }
            if let Some(id) = table.patient_key().and_then(|col| record.key(col)) {
                entry.by_patient.entry(id).or_default().push(position);
            }

            entry.rows.push(record);
        }

        tracing::debug!(table = %table, rows = added, "Indexed table");
        Ok(added)
    }

    /// Same as [`index`](Self::index) for a table named by its file stem.
    pub fn index_named(
        &mut self,
        table_name: &str,
        rows: impl IntoIterator<Item = Record>,
    ) -> Result<usize, StoreError> {
        let table = TableName::from_str(table_name)
            .map_err(|_| StoreError::UnknownTable(table_name.to_string()))?;
        self.index(table, rows)
    }

    /// Rows whose `ENCOUNTER` column equals `encounter_id`. Empty when none
    /// match or the table was never registered.
    pub fn lookup_by_encounter(&self, table: TableName, encounter_id: &str) -> Vec<Row<'_>> {
        self.tables
            .get(&table)
            .map(|t| t.rows_at(t.by_encounter.get(encounter_id)))
            .unwrap_or_default()
    }

    /// Rows whose `PATIENT` column equals `patient_id`.
    pub fn lookup_by_patient(&self, table: TableName, patient_id: &str) -> Vec<Row<'_>> {
        self.tables
            .get(&table)
            .map(|t| t.rows_at(t.by_patient.get(patient_id)))
            .unwrap_or_default()
    }

    /// Resolve exactly one row by primary id.
    pub fn get_by_id(&self, table: TableName, id: &str) -> Result<Row<'_>, StoreError> {
        self.tables
            .get(&table)
            .and_then(|t| t.by_id.get(id).map(|&p| t.row(p)))
            .ok_or_else(|| StoreError::NotFound {
                table,
                id: id.to_string(),
            })
    }

    /// Primary ids of a table in row order.
    pub fn ids(&self, table: TableName) -> Vec<String> {
        let Some(pk) = table.primary_key() else {
            return Vec::new();
        };
        self.tables
            .get(&table)
            .map(|t| t.rows.iter().filter_map(|r| r.key(pk)).collect())
            .unwrap_or_default()
    }

    pub fn row_count(&self, table: TableName) -> usize {
        self.tables.get(&table).map_or(0, |t| t.rows.len())
    }
}
