use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Where a narrative came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    pub narrative_id: Uuid,
    pub encounter_id: String,
    /// e.g. `ollama:medgemma` or `openai:gpt-4o`.
    pub backend: String,
    pub generated_at: DateTime<Utc>,
    /// Backend calls made, including the successful one.
    pub attempts: u32,
    /// SHA-256 (base64) of the rendered profile block sent to the backend.
    pub profile_digest: String,
}

/// Generated clinical narrative for one encounter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Narrative {
    pub text: String,
    pub provenance: Provenance,
}
