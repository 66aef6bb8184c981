//! Delegated responder backed by an external intent-detection service.

use super::{GeneratorError, ResponseGenerator};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Reply used when the detector answers without any fulfillment text.
pub const EMPTY_REPLY_PLACEHOLDER: &str = "Lo siento, no pude procesar tu mensaje.";

/// What is sent to the intent-detection service for one user message.
#[derive(Debug, Clone, Copy)]
pub struct DetectIntentRequest<'a> {
    pub session_token: &'a str,
    pub text: &'a str,
    pub language_code: &'a str,
}

/// The part of a detection result this service consumes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetectIntentResult {
    pub fulfillment_text: Option<String>,
}

/// External natural-language-understanding collaborator.
#[async_trait]
pub trait IntentDetector: Send + Sync {
    async fn detect_intent(
        &self,
        request: DetectIntentRequest<'_>,
    ) -> Result<DetectIntentResult, GeneratorError>;
}

pub struct IntentResponder {
    detector: Arc<dyn IntentDetector>,
    language_code: String,
    timeout: Duration,
}

impl IntentResponder {
    pub fn new(detector: Arc<dyn IntentDetector>, language_code: String, timeout: Duration) -> Self {
        Self {
            detector,
            language_code,
            timeout,
        }
    }
}

#[async_trait]
impl ResponseGenerator for IntentResponder {
    async fn generate(&self, text: &str, session_id: &str) -> Result<String, GeneratorError> {
        let request = DetectIntentRequest {
            session_token: session_id,
            text,
            language_code: &self.language_code,
        };

        let result = tokio::time::timeout(self.timeout, self.detector.detect_intent(request))
            .await
            .map_err(|_| {
                warn!(
                    session_id = %session_id,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Intent detection timed out"
                );
                GeneratorError::Timeout(self.timeout.as_millis() as u64)
            })??;

        match result.fulfillment_text.filter(|t| !t.trim().is_empty()) {
            Some(reply) => Ok(reply),
            None => {
                debug!(session_id = %session_id, "Intent result carried no fulfillment text");
                Ok(EMPTY_REPLY_PLACEHOLDER.to_string())
            }
        }
    }

    fn name(&self) -> &'static str {
        "intent"
    }
}
