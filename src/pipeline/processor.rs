//! Encounter narrative orchestrator.
//!
//! Single entry point that drives the full pipeline for one encounter:
//! store → profile → narrative → (optional) output.
//!
//! The backend is injected through `TextBackend`, so the orchestrator is
//! fully testable with `MockBackend`.

use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::models::{EncounterProfile, Narrative};
use crate::pipeline::loader::LoadError;
use crate::pipeline::narrative::{render_profile, GenerationError, NarrativeGenerator};
use crate::pipeline::output::{save_narrative, OutputError};
use crate::pipeline::profile::{ProfileBuilder, ProfileError};
use crate::pipeline::store::{RecordStore, StoreError};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that abort processing of one encounter.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Loading failed: {0}")]
    Load(#[from] LoadError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Profile failed: {0}")]
    Profile(#[from] ProfileError),

    #[error("Generation failed: {0}")]
    Generation(#[from] GenerationError),

    #[error("Output failed: {0}")]
    Output(#[from] OutputError),
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Composes `RecordStore` → `ProfileBuilder` → `NarrativeGenerator`.
///
/// The store is read-only once the pipeline owns it; `run` may be called
/// for any number of encounters.
pub struct NarrativePipeline {
    store: RecordStore,
    generator: NarrativeGenerator,
}

impl NarrativePipeline {
    pub fn new(store: RecordStore, generator: NarrativeGenerator) -> Self {
        Self { store, generator }
    }

    /// Build the profile for `encounter_id`.
    pub fn profile(&self, encounter_id: &str) -> Result<EncounterProfile, PipelineError> {
        Ok(ProfileBuilder::new(&self.store).build(encounter_id)?)
    }

    /// Canonical rendered block, without calling the backend.
    pub fn render(&self, encounter_id: &str) -> Result<String, PipelineError> {
        render_encounter(&self.store, encounter_id)
    }

    /// Profile and narrate one encounter.
    pub fn run(&self, encounter_id: &str) -> Result<Narrative, PipelineError> {
        let _span = tracing::info_span!("pipeline_run", encounter_id = %encounter_id).entered();

        let profile = self.profile(encounter_id)?;
        if !profile.warnings().is_empty() {
            tracing::warn!(
                warnings = profile.warnings().len(),
                "Profile built with field warnings"
            );
        }
        Ok(self.generator.generate(&profile)?)
    }

    /// `run`, then persist under `output_dir`. Returns the narrative and its directory.
    pub fn run_and_save(
        &self,
        encounter_id: &str,
        output_dir: &Path,
    ) -> Result<(Narrative, PathBuf), PipelineError> {
        let narrative = self.run(encounter_id)?;
        let dir = save_narrative(output_dir, &narrative)?;
        Ok((narrative, dir))
    }
}

/// Canonical rendered block for one encounter. Needs no backend.
pub fn render_encounter(store: &RecordStore, encounter_id: &str) -> Result<String, PipelineError> {
    let profile = ProfileBuilder::new(store).build(encounter_id)?;
    Ok(render_profile(&profile))
}

/// Reproducibly sample one encounter id. Same ids and seed, same pick.
pub fn pick_encounter(ids: &[String], seed: u64) -> Option<&str> {
    let mut rng = StdRng::seed_from_u64(seed);
    ids.choose(&mut rng).map(String::as_str)
}
