use serde::{Deserialize, Serialize};

use super::backend::{check_status, http_client, transport_error, TextBackend};
use super::prompt::GenerationRequest;
use super::BackendError;

pub const OLLAMA_DEFAULT_URL: &str = "http://localhost:11434";

/// Ollama HTTP backend using the non-streaming `/api/generate` endpoint.
pub struct OllamaBackend {
    base_url: String,
    model: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl OllamaBackend {
    pub fn new(base_url: &str, model: &str, timeout_secs: u64) -> Result<Self, BackendError> {
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            client: http_client(timeout_secs)?,
            timeout_secs,
        })
    }
}

/// Request body for Ollama /api/generate
#[derive(Serialize)]
struct OllamaGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u64>,
}

/// Response body from Ollama /api/generate
#[derive(Deserialize)]
struct OllamaGenerateResponse {
    response: String,
}

impl<'a> OllamaGenerateRequest<'a> {
    fn from_request(model: &'a str, request: &'a GenerationRequest) -> Self {
        Self {
            model,
            prompt: &request.prompt,
            system: &request.system,
            stream: false,
            options: OllamaOptions {
                temperature: request.parameters.temperature,
                num_predict: request.parameters.max_tokens,
                seed: request.parameters.seed,
            },
        }
    }
}

impl TextBackend for OllamaBackend {
    fn complete(&self, request: &GenerationRequest) -> Result<String, BackendError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = OllamaGenerateRequest::from_request(&self.model, request);

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .map_err(|e| transport_error(e, &self.base_url, self.timeout_secs))?;

        let parsed: OllamaGenerateResponse = check_status(response)?
            .json()
            .map_err(|e| BackendError::MalformedResponse(e.to_string()))?;

        Ok(parsed.response)
    }

    fn identifier(&self) -> String {
        format!("ollama:{}", self.model)
    }
}
