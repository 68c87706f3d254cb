use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;

use crate::config::{BackendKind, GenerationConfig};
use crate::models::{EncounterProfile, Narrative, Provenance};

use super::backend::TextBackend;
use super::ollama::OllamaBackend;
use super::openai::OpenAiBackend;
use super::prompt::{GenerationParameters, GenerationRequest};
use super::render::{profile_digest, render_profile};
use super::retry::{run_with_retry, CancellationToken, RetryPolicy};
use super::sanitize::clean_backend_output;
use super::{BackendError, GenerationError};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeneratorSettings {
    pub parameters: GenerationParameters,
    pub retry: RetryPolicy,
}

impl From<&GenerationConfig> for GeneratorSettings {
    fn from(cfg: &GenerationConfig) -> Self {
        Self {
            parameters: GenerationParameters {
                temperature: cfg.temperature,
                max_tokens: cfg.max_tokens,
                seed: cfg.seed,
            },
            retry: RetryPolicy {
                max_attempts: cfg.max_attempts,
                backoff_base: Duration::from_millis(cfg.backoff_base_ms),
            },
        }
    }
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self::from(&GenerationConfig::default())
    }
}

/// Turns an encounter profile into a narrative:
/// render → prompt → backend (with retry) → clean → validate → provenance
pub struct NarrativeGenerator {
    backend: Box<dyn TextBackend>,
    settings: GeneratorSettings,
    cancel: CancellationToken,
}

impl NarrativeGenerator {
    pub fn new(backend: Box<dyn TextBackend>, settings: GeneratorSettings) -> Self {
        Self {
            backend,
            settings,
            cancel: CancellationToken::new(),
        }
    }

    /// Generator with the HTTP backend `cfg` selects.
    pub fn from_config(cfg: &GenerationConfig) -> Result<Self, BackendError> {
        let backend: Box<dyn TextBackend> = match cfg.backend {
            BackendKind::Ollama => Box::new(OllamaBackend::new(
                &cfg.base_url,
                &cfg.model,
                cfg.timeout_secs,
            )?),
            BackendKind::Openai => Box::new(OpenAiBackend::new(
                &cfg.base_url,
                &cfg.model,
                cfg.api_key.clone(),
                cfg.timeout_secs,
            )?),
        };
        tracing::info!(backend = %backend.identifier(), "Text backend configured");
        Ok(Self::new(backend, GeneratorSettings::from(cfg)))
    }

    /// Share a cancellation flag with the caller.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn backend_identifier(&self) -> String {
        self.backend.identifier()
    }

    pub fn generate(&self, profile: &EncounterProfile) -> Result<Narrative, GenerationError> {
        let _span = tracing::info_span!(
            "generate_narrative",
            encounter_id = %profile.encounter_id()
        )
        .entered();

        let rendered = render_profile(profile);
        let request = GenerationRequest::for_profile(&rendered, self.settings.parameters);
        let backend = self.backend.identifier();

        let (text, attempts) = run_with_retry(self.settings.retry, &self.cancel, |attempt| {
            tracing::debug!(attempt, backend = %backend, "Calling text backend");
            let raw = self.backend.complete(&request)?;
            let text = clean_backend_output(&raw);
            if text.is_empty() {
                return Err(BackendError::EmptyResponse);
            }
            Ok(text)
        })
        .inspect_err(|e| {
            tracing::error!(error = %e, "Narrative generation failed");
        })?;

        tracing::info!(
            attempts,
            backend = %backend,
            chars = text.len(),
            "Narrative generated"
        );

        Ok(Narrative {
            text,
            provenance: Provenance {
                narrative_id: Uuid::new_v4(),
                encounter_id: profile.encounter_id().to_string(),
                backend,
                generated_at: Utc::now(),
                attempts,
                profile_digest: profile_digest(&rendered),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::pipeline::narrative::{MockBackend, TASK_INSTRUCTION};
    use crate::test_support::*;

    fn fast_settings(max_attempts: u32) -> GeneratorSettings {
        GeneratorSettings {
            retry: RetryPolicy {
                max_attempts,
                backoff_base: Duration::ZERO,
            },
            ..GeneratorSettings::default()
        }
    }

    fn generator(mock: &Arc<MockBackend>, max_attempts: u32) -> NarrativeGenerator {
        NarrativeGenerator::new(Box::new(mock.clone()), fast_settings(max_attempts))
    }

    fn timeout() -> BackendError {
        BackendError::Timeout("test".into())
    }

    #[test]
    fn scenario_narrative_has_exact_text_and_provenance() {
        let mock = Arc::new(MockBackend::new(SCENARIO_TEXT));
        let profile = sample_profile();
        let narrative = generator(&mock, 3).generate(&profile).unwrap();

        assert_eq!(narrative.text, SCENARIO_TEXT);
        assert_eq!(narrative.provenance.encounter_id, "E1");
        assert_eq!(narrative.provenance.backend, "mock");
        assert_eq!(narrative.provenance.attempts, 1);
        assert_eq!(
            narrative.provenance.profile_digest,
            profile_digest(&render_profile(&profile))
        );
    }

    #[test]
    fn request_contains_rendered_profile_and_task() {
        let mock = Arc::new(MockBackend::new("ok"));
        let profile = sample_profile();
        generator(&mock, 3).generate(&profile).unwrap();

        let request = mock.last_request().unwrap();
        assert!(request.prompt.contains(&render_profile(&profile).trim_end().to_string()));
        assert!(request.prompt.ends_with(TASK_INSTRUCTION));
        assert_eq!(request.parameters.seed, Some(313));
    }

    #[test]
    fn fails_twice_then_succeeds() {
        let mock = Arc::new(MockBackend::scripted(
            vec![Err(timeout()), Err(BackendError::RateLimited { status: 429 })],
            Ok("Recovered narrative.".into()),
        ));
        let narrative = generator(&mock, 3).generate(&sample_profile()).unwrap();
        assert_eq!(narrative.text, "Recovered narrative.");
        assert_eq!(narrative.provenance.attempts, 3);
        assert_eq!(mock.call_count(), 3);
    }

    #[test]
    fn always_failing_backend_capped_at_max_attempts() {
        let mock = Arc::new(MockBackend::failing(BackendError::Server {
            status: 503,
            body: "unavailable".into(),
        }));
        let err = generator(&mock, 4).generate(&sample_profile()).unwrap_err();
        assert_eq!(
            err,
            GenerationError::GenerationFailure {
                attempts: 4,
                last: BackendError::Server {
                    status: 503,
                    body: "unavailable".into()
                },
            }
        );
        assert_eq!(mock.call_count(), 4);
    }

    #[test]
    fn permanent_failure_not_retried() {
        let mock = Arc::new(MockBackend::failing(BackendError::BadRequest {
            status: 400,
            body: "bad".into(),
        }));
        let err = generator(&mock, 3).generate(&sample_profile()).unwrap_err();
        assert!(matches!(err, GenerationError::GenerationFailure { attempts: 1, .. }));
        assert_eq!(mock.call_count(), 1);
    }

    #[test]
    fn blank_output_retried_once_beyond_budget() {
        let mock = Arc::new(MockBackend::scripted(
            vec![Err(timeout()), Ok("   \n".into())],
            Ok("Final text.".into()),
        ));
        let narrative = generator(&mock, 2).generate(&sample_profile()).unwrap();
        assert_eq!(narrative.text, "Final text.");
        assert_eq!(mock.call_count(), 3);
    }

    #[test]
    fn persistent_blank_output_is_generation_failure() {
        let mock = Arc::new(MockBackend::new("<unused0>  "));
        let err = generator(&mock, 1).generate(&sample_profile()).unwrap_err();
        assert_eq!(
            err,
            GenerationError::GenerationFailure {
                attempts: 2,
                last: BackendError::EmptyResponse,
            }
        );
        assert_eq!(mock.call_count(), 2);
    }

    #[test]
    fn model_artifacts_stripped_from_text() {
        let mock = Arc::new(MockBackend::new("<unused94>thought\nplanning\n<unused95>Seen today."));
        let narrative = generator(&mock, 1).generate(&sample_profile()).unwrap();
        assert_eq!(narrative.text, "planning\nSeen today.");
    }

    #[test]
    fn cancelled_generation_makes_no_calls() {
        let mock = Arc::new(MockBackend::new("text"));
        let token = CancellationToken::new();
        token.cancel();
        let err = generator(&mock, 3)
            .with_cancellation(token)
            .generate(&sample_profile())
            .unwrap_err();
        assert_eq!(err, GenerationError::Cancelled);
        assert_eq!(mock.call_count(), 0);
    }

    #[test]
    fn settings_from_config() {
        let cfg = GenerationConfig {
            max_attempts: 5,
            backoff_base_ms: 10,
            temperature: 0.2,
            ..Default::default()
        };
        let settings = GeneratorSettings::from(&cfg);
        assert_eq!(settings.retry.max_attempts, 5);
        assert_eq!(settings.retry.backoff_base, Duration::from_millis(10));
        assert_eq!(settings.parameters.temperature, 0.2);
    }

    #[test]
    fn from_config_selects_backend() {
        let cfg = GenerationConfig {
            backend: BackendKind::Openai,
            model: "gpt-4o".into(),
            base_url: "http://localhost:8000".into(),
            ..Default::default()
        };
        let generator = NarrativeGenerator::from_config(&cfg).unwrap();
        assert_eq!(generator.backend_identifier(), "openai:gpt-4o");

        let generator = NarrativeGenerator::from_config(&GenerationConfig::default()).unwrap();
        assert_eq!(generator.backend_identifier(), "ollama:medgemma");
    }

    #[test]
    fn generator_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<NarrativeGenerator>();
    }
}
