//! Narrative persistence.
//!
//! Layout: `<root>/<encounter_id>/<n>/narrative.txt` plus `narrative.json`,
//! where `n` is the first unused variant number starting at 0. Repeated runs
//! for the same encounter never overwrite earlier narratives.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::models::Narrative;

pub const NARRATIVE_TEXT_FILE: &str = "narrative.txt";
pub const NARRATIVE_JSON_FILE: &str = "narrative.json";

#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Cannot write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot serialize narrative: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Encounter id {0:?} cannot be used as a directory name")]
    InvalidEncounterId(String),
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> OutputError + '_ {
    move |source| OutputError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Reject ids that would escape the output root.
fn encounter_dir(root: &Path, encounter_id: &str) -> Result<PathBuf, OutputError> {
    let invalid = encounter_id.is_empty()
        || encounter_id == "."
        || encounter_id == ".."
        || encounter_id.contains(['/', '\\']);
    if invalid {
        return Err(OutputError::InvalidEncounterId(encounter_id.to_string()));
    }
    Ok(root.join(encounter_id))
}

/// Create and return the first free variant directory under `parent`.
fn claim_variant_dir(parent: &Path) -> Result<PathBuf, OutputError> {
    fs::create_dir_all(parent).map_err(io_error(parent))?;
    for n in 0u32.. {
        let candidate = parent.join(n.to_string());
        match fs::create_dir(&candidate) {
            Ok(()) => return Ok(candidate),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(io_error(&candidate)(e)),
        }
    }
    Err(OutputError::Io {
        path: parent.to_path_buf(),
        source: std::io::Error::new(ErrorKind::Other, "no free variant number"),
    })
}

/// Write the narrative text and its JSON form. Returns the variant directory.
pub fn save_narrative(root: &Path, narrative: &Narrative) -> Result<PathBuf, OutputError> {
    let parent = encounter_dir(root, &narrative.provenance.encounter_id)?;
    let dir = claim_variant_dir(&parent)?;

    let text_path = dir.join(NARRATIVE_TEXT_FILE);
    fs::write(&text_path, format!("{}\n", narrative.text)).map_err(io_error(&text_path))?;

    let json_path = dir.join(NARRATIVE_JSON_FILE);
    let json = serde_json::to_string_pretty(narrative)?;
    fs::write(&json_path, json).map_err(io_error(&json_path))?;

    tracing::info!(
        encounter_id = %narrative.provenance.encounter_id,
        dir = %dir.display(),
        "Narrative saved"
    );
    Ok(dir)
}
