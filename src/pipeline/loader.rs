//! CSV ingestion into a `RecordStore`.
//!
//! One file per table, named after it (`encounters.csv`, `patients.csv`, ...).
//! An empty cell means "not recorded" and becomes `Value::Null`; every other
//! cell is kept verbatim as text for the profile builder to interpret.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::models::{Record, TableName, Value};
use crate::pipeline::store::{RecordStore, StoreError};

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed CSV in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{0} is not a known table file")]
    UnknownTable(PathBuf),

    #[error("Indexing failed: {0}")]
    Store(#[from] StoreError),
}

/// Read one CSV table into records, in file order.
pub fn load_table(path: &Path) -> Result<Vec<Record>, LoadError> {
    let csv_err = |source| LoadError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(csv_err)?;
    let headers = reader.headers().map_err(csv_err)?.clone();

    let mut rows = Vec::new();
    for result in reader.records() {
        let row = result.map_err(csv_err)?;
        let record: Record = headers
            .iter()
            .zip(row.iter())
            .map(|(column, cell)| {
                let value = if cell.is_empty() {
                    Value::Null
                } else {
                    Value::Text(cell.to_string())
                };
                (column.to_string(), value)
            })
            .collect();
        rows.push(record);
    }
    Ok(rows)
}

/// Table a file holds, from its stem.
pub fn table_for_path(path: &Path) -> Option<TableName> {
    if path.extension().and_then(|e| e.to_str()) != Some("csv") {
        return None;
    }
    path.file_stem()?.to_str()?.parse().ok()
}

/// Load and index a single table file into `store`.
pub fn load_into(store: &mut RecordStore, path: &Path) -> Result<usize, LoadError> {
    let table = table_for_path(path).ok_or_else(|| LoadError::UnknownTable(path.to_path_buf()))?;
    let rows = load_table(path)?;
    let count = store.index(table, rows)?;
    tracing::info!(table = %table, rows = count, "Table loaded");
    Ok(count)
}

/// Load every known table in `dir`. Unknown files are skipped.
pub fn load_directory(dir: &Path) -> Result<RecordStore, LoadError> {
    let _span = tracing::info_span!("load_directory", dir = %dir.display()).entered();
    let io_err = |source| LoadError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut paths: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(io_err)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<_, _>>()
        .map_err(io_err)?;
    paths.sort();

    let mut store = RecordStore::new();
    for path in paths {
        if table_for_path(&path).is_none() {
            tracing::debug!(path = %path.display(), "Skipping non-table file");
            continue;
        }
        load_into(&mut store, &path)?;
    }

    if store.row_count(TableName::Encounters) == 0 {
        tracing::warn!(dir = %dir.display(), "No encounters loaded");
    }
    Ok(store)
}
