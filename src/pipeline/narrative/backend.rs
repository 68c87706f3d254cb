use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use super::prompt::GenerationRequest;
use super::BackendError;

/// Text-generation capability the narrative generator depends on.
pub trait TextBackend: Send + Sync {
    /// Run one completion. Must not retry internally.
    fn complete(&self, request: &GenerationRequest) -> Result<String, BackendError>;

    /// Stable identifier recorded in narrative provenance, e.g. `ollama:medgemma`.
    fn identifier(&self) -> String;
}

/// Build the blocking HTTP client shared by the HTTP backends.
pub(crate) fn http_client(timeout_secs: u64) -> Result<reqwest::blocking::Client, BackendError> {
    reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| BackendError::Connection(format!("HTTP client setup failed: {e}")))
}

/// Map a transport-level reqwest failure.
pub(crate) fn transport_error(e: reqwest::Error, base_url: &str, timeout_secs: u64) -> BackendError {
    if e.is_timeout() {
        BackendError::Timeout(format!("no response within {timeout_secs}s"))
    } else if e.is_connect() {
        BackendError::Connection(base_url.to_string())
    } else if e.is_decode() {
        BackendError::MalformedResponse(e.to_string())
    } else {
        BackendError::Connection(format!("{base_url}: {e}"))
    }
}

/// Classify a non-success HTTP status.
pub(crate) fn status_error(status: u16, body: String) -> BackendError {
    match status {
        401 | 403 => BackendError::Unauthorized { status },
        408 => BackendError::Timeout("backend reported request timeout (408)".to_string()),
        429 => BackendError::RateLimited { status },
        500..=599 => BackendError::Server { status, body },
        _ => BackendError::BadRequest { status, body },
    }
}

/// Check the response status, reading the body on failure.
pub(crate) fn check_status(
    response: reqwest::blocking::Response,
) -> Result<reqwest::blocking::Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    Err(status_error(status.as_u16(), body))
}

/// Mock backend for testing: replays a scripted queue of results.
///
/// Once the script runs out, every further call returns the fallback.
pub struct MockBackend {
    script: Mutex<VecDeque<Result<String, BackendError>>>,
    fallback: Result<String, BackendError>,
    calls: Mutex<Vec<GenerationRequest>>,
}

impl MockBackend {
    /// Always answer with `text`.
    pub fn new(text: &str) -> Self {
        Self::scripted(Vec::new(), Ok(text.to_string()))
    }

    /// Always fail with `error`.
    pub fn failing(error: BackendError) -> Self {
        Self::scripted(Vec::new(), Err(error))
    }

    pub fn scripted(
        script: Vec<Result<String, BackendError>>,
        fallback: Result<String, BackendError>,
    ) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or(0)
    }

    pub fn last_request(&self) -> Option<GenerationRequest> {
        self.calls.lock().ok().and_then(|c| c.last().cloned())
    }
}

impl TextBackend for MockBackend {
    fn complete(&self, request: &GenerationRequest) -> Result<String, BackendError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(request.clone());
        }
        let next = self.script.lock().ok().and_then(|mut s| s.pop_front());
        next.unwrap_or_else(|| self.fallback.clone())
    }

    fn identifier(&self) -> String {
        "mock".to_string()
    }
}

/// Shared handle so tests can inspect a backend after boxing it.
impl<T: TextBackend + ?Sized> TextBackend for std::sync::Arc<T> {
    fn complete(&self, request: &GenerationRequest) -> Result<String, BackendError> {
        (**self).complete(request)
    }

    fn identifier(&self) -> String {
        (**self).identifier()
    }
}
