use serde::{Deserialize, Serialize};

use super::backend::{check_status, http_client, transport_error, TextBackend};
use super::prompt::GenerationRequest;
use super::BackendError;

pub const OPENAI_DEFAULT_URL: &str = "https://api.openai.com";

/// OpenAI-compatible chat completions backend.
pub struct OpenAiBackend {
    base_url: String,
    model: String,
    api_key: Option<String>,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl OpenAiBackend {
    pub fn new(
        base_url: &str,
        model: &str,
        api_key: Option<String>,
        timeout_secs: u64,
    ) -> Result<Self, BackendError> {
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            client: http_client(timeout_secs)?,
            timeout_secs,
        })
    }
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u64>,
}

impl<'a> ChatCompletionRequest<'a> {
    fn from_request(model: &'a str, request: &'a GenerationRequest) -> Self {
        Self {
            model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.prompt,
                },
            ],
            temperature: request.parameters.temperature,
            max_tokens: request.parameters.max_tokens,
            seed: request.parameters.seed,
        }
    }
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

fn first_choice_text(parsed: ChatCompletionResponse) -> Result<String, BackendError> {
    let choice = parsed
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| BackendError::MalformedResponse("response has no choices".into()))?;
    Ok(choice.message.content.unwrap_or_default())
}

impl TextBackend for OpenAiBackend {
    fn complete(&self, request: &GenerationRequest) -> Result<String, BackendError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = ChatCompletionRequest::from_request(&self.model, request);

        let mut builder = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .map_err(|e| transport_error(e, &self.base_url, self.timeout_secs))?;

        let parsed: ChatCompletionResponse = check_status(response)?
            .json()
            .map_err(|e| BackendError::MalformedResponse(e.to_string()))?;

        first_choice_text(parsed)
    }

    fn identifier(&self) -> String {
        format!("openai:{}", self.model)
    }
}
