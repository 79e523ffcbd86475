use std::time::Duration;

use tracing::{info, warn};

use crate::llm::gemini::{collect_text, first_inline_image, GeminiResponse, ServiceError};
use crate::llm::request::{build_instruction, data_url_from_inline, ImagePart};
use crate::locales::{locale, Language, Locale};

const MAX_RETRIES: usize = 3;
const INITIAL_DELAY_MS: u64 = 1000;

/// One raw call to the external generation service. Implemented by
/// `GeminiClient` in production and by scripted doubles in tests.
pub trait GenerateContent {
    async fn generate(
        &self,
        image_parts: &[ImagePart],
        instruction: &str,
    ) -> Result<GeminiResponse, ServiceError>;
}

/// Terminal outcome of one `generate_fused_image` call. Messages are
/// localized and rendered to the user as-is.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// A malformed input image; never retried.
    #[error("{0}")]
    InvalidDataUrl(String),
    /// Both the primary and the fallback prompt failed.
    #[error("{0}")]
    FallbackExhausted(String),
    /// A non-content-policy failure after the inner retries were exhausted.
    #[error("{0}")]
    Unrecoverable(String),
    /// Guard for the inner loop exiting without a classified outcome.
    #[error("{0}")]
    Connection(String),
}

/// Classification of one failed service call, decided in exactly one place
/// so the fragile substring matching has a single home.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ServiceFailureKind {
    /// Server-side internal error; the identical request may be retried.
    TransientInternal,
    /// Anything else (auth, quota, malformed request); never retried.
    Permanent,
}

fn classify_service_error(err: &ServiceError) -> ServiceFailureKind {
    // Gemini exposes no structured error taxonomy; match the markers its
    // 5xx bodies are known to carry.
    if err.0.contains("\"code\":500") || err.0.contains("INTERNAL") {
        ServiceFailureKind::TransientInternal
    } else {
        ServiceFailureKind::Permanent
    }
}

fn retry_delay(attempt: usize) -> Duration {
    Duration::from_millis(INITIAL_DELAY_MS << (attempt.max(1) - 1))
}

/// Outcome of one inner retry loop, consumed by the outer fallback logic.
#[derive(Debug)]
enum AttemptError {
    /// The service answered but produced no inline image, which reads as a
    /// content-policy rejection or a model refusal.
    NoImage { detail: String },
    /// Transport or service failure, already past its retry budget.
    Service { message: String },
    /// The loop exited without resolving; should be unreachable.
    Exhausted,
}

impl AttemptError {
    fn into_message(self, t: &Locale) -> String {
        match self {
            AttemptError::NoImage { detail } => detail,
            AttemptError::Service { message } => message,
            AttemptError::Exhausted => t.connection_failed.to_string(),
        }
    }
}

/// Drives one logical "generate a fused image" operation to a terminal
/// outcome. Stateless across calls; the only shared resource is the
/// injected service handle.
#[derive(Debug, Clone)]
pub struct Orchestrator<S> {
    service: S,
}

impl<S: GenerateContent> Orchestrator<S> {
    pub fn new(service: S) -> Self {
        Orchestrator { service }
    }

    /// Fuses the three input images into one generated photograph.
    ///
    /// Two-level recovery: transient internal errors retry the identical
    /// request with exponential backoff; a "returned text instead of an
    /// image" outcome swaps in the fallback prompt exactly once. The two
    /// policies stay separate because resubmitting a rejected prompt wastes
    /// retries, and rewording a prompt does nothing for an outage.
    pub async fn generate_fused_image(
        &self,
        character_image: &str,
        prop_image: &str,
        background_image: &str,
        lang: Language,
        camera_angle: &str,
    ) -> Result<String, GenerationError> {
        let t = locale(lang);

        let image_parts = [character_image, prop_image, background_image]
            .iter()
            .map(|data_url| ImagePart::from_data_url(data_url, lang))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| GenerationError::InvalidDataUrl(err.to_string()))?;

        info!("Attempting generation with primary prompt");
        let primary = build_instruction(t.prompt_template, camera_angle);
        let primary_error = match self.call_with_retry(&image_parts, &primary, t).await {
            Ok(image_url) => return Ok(image_url),
            Err(err) => err,
        };

        match primary_error {
            AttemptError::NoImage { .. } => {
                warn!("Primary prompt produced no image, retrying with fallback prompt");
                let fallback = build_instruction(t.fallback_prompt_template, camera_angle);
                match self.call_with_retry(&image_parts, &fallback, t).await {
                    Ok(image_url) => Ok(image_url),
                    Err(fallback_error) => {
                        warn!("Fallback prompt also failed");
                        Err(GenerationError::FallbackExhausted(format!(
                            "{}{}",
                            t.fallback_failed_prefix,
                            fallback_error.into_message(t)
                        )))
                    }
                }
            }
            AttemptError::Exhausted => {
                Err(GenerationError::Connection(t.connection_failed.to_string()))
            }
            AttemptError::Service { message } => Err(GenerationError::Unrecoverable(format!(
                "{}{}",
                t.unrecoverable_prefix, message
            ))),
        }
    }

    /// Inner bounded retry: up to `MAX_RETRIES` identical requests, backing
    /// off 1000/2000/4000 ms, retrying only on transient internal errors.
    async fn call_with_retry(
        &self,
        image_parts: &[ImagePart],
        instruction: &str,
        t: &Locale,
    ) -> Result<String, AttemptError> {
        for attempt in 1..=MAX_RETRIES {
            match self.service.generate(image_parts, instruction).await {
                Ok(response) => {
                    if let Some((mime_type, data)) = first_inline_image(&response) {
                        return Ok(data_url_from_inline(mime_type, data));
                    }
                    let text = collect_text(&response);
                    let shown = if text.trim().is_empty() { t.no_response } else { text.as_str() };
                    warn!("Gemini returned no image part: {shown}");
                    return Err(AttemptError::NoImage {
                        detail: format!("{}\"{}\"", t.returned_text_prefix, shown),
                    });
                }
                Err(err) => {
                    warn!("Gemini call failed (attempt {attempt}/{MAX_RETRIES}): {err}");
                    let transient =
                        classify_service_error(&err) == ServiceFailureKind::TransientInternal;
                    if transient && attempt < MAX_RETRIES {
                        let delay = retry_delay(attempt);
                        info!("Internal error detected, retrying in {}ms", delay.as_millis());
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    return Err(AttemptError::Service { message: err.0 });
                }
            }
        }
        Err(AttemptError::Exhausted)
    }
}
