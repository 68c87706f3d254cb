pub mod render;
pub mod prompt;
pub mod sanitize;
pub mod backend;
pub mod ollama;
pub mod openai;
pub mod retry;
pub mod generator;

pub use render::*;
pub use prompt::*;
pub use sanitize::*;
pub use backend::*;
pub use ollama::*;
pub use openai::*;
pub use retry::*;
pub use generator::*;

use thiserror::Error;

/// Failure of a single backend call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Rate limited by backend (status {status})")]
    RateLimited { status: u16 },

    #[error("Cannot reach backend at {0}")]
    Connection(String),

    #[error("Backend error (status {status}): {body}")]
    Server { status: u16, body: String },

    #[error("Backend rejected request (status {status}): {body}")]
    BadRequest { status: u16, body: String },

    #[error("Backend refused credentials (status {status})")]
    Unauthorized { status: u16 },

    #[error("Malformed backend response: {0}")]
    MalformedResponse(String),

    #[error("Backend returned empty text")]
    EmptyResponse,
}

impl BackendError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            BackendError::Timeout(_)
                | BackendError::RateLimited { .. }
                | BackendError::Connection(_)
                | BackendError::Server { .. }
                | BackendError::MalformedResponse(_)
                | BackendError::EmptyResponse
        )
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    #[error("Narrative generation failed after {attempts} attempt(s): {last}")]
    GenerationFailure { attempts: u32, last: BackendError },

    #[error("Narrative generation cancelled")]
    Cancelled,
}
