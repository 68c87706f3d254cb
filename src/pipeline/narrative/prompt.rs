use serde::{Deserialize, Serialize};

/// System prompt for narrative generation.
pub const NARRATIVE_SYSTEM_PROMPT: &str = r#"You are an experienced clinician. You receive the structured record of a single patient encounter and narrate it as a medical professional would in a conversation with a colleague.

RULES:
1. Write a concise summary in plain prose. No headings, no bullet lists.
2. Use only facts present in the encounter profile. Never invent findings, diagnoses, results or treatments.
3. Keep clinically relevant details: reason for the visit, relevant history recorded during the encounter, findings, procedures, medications and the plan.
4. Omit administrative details that are not clinically useful unless they explain the course of care.
5. Dates and values must match the profile exactly."#;

/// Task instruction appended after the rendered profile.
pub const TASK_INSTRUCTION: &str = "Produce a clinical narrative summarizing this encounter.";

/// Sampling parameters forwarded to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationParameters {
    pub temperature: f32,
    pub max_tokens: u32,
    pub seed: Option<u64>,
}

/// Everything a backend needs for one completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub system: String,
    pub prompt: String,
    pub parameters: GenerationParameters,
}

impl GenerationRequest {
    pub fn for_profile(rendered: &str, parameters: GenerationParameters) -> Self {
        Self {
            system: NARRATIVE_SYSTEM_PROMPT.to_string(),
            prompt: build_narrative_prompt(rendered),
            parameters,
        }
    }
}

/// Wrap the rendered profile in delimiters and append the task instruction.
pub fn build_narrative_prompt(rendered: &str) -> String {
    format!(
        "<encounter_profile>\n{}\n</encounter_profile>\n\n{TASK_INSTRUCTION}",
        rendered.trim_end()
    )
}
