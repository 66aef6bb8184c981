//! Reply generation.
//!
//! `ResponseGenerator` is the single capability the chat service depends on.
//! Two implementations are chosen at startup:
//!
//! - [`pattern::PatternResponder`]: local keyword rules with random replies.
//! - [`intent::IntentResponder`]: delegates to an external intent-detection
//!   service through an [`intent::IntentDetector`] such as
//!   [`dialogflow::DialogflowClient`].

pub mod dialogflow;
pub mod intent;
pub mod pattern;

pub use dialogflow::{DialogflowClient, DialogflowConfig};
pub use intent::{DetectIntentRequest, DetectIntentResult, IntentDetector, IntentResponder};
pub use pattern::{PatternResponder, Rule};

use async_trait::async_trait;
use thiserror::Error;

/// Error type for reply generation.
#[derive(Error, Debug)]
pub enum GeneratorError {
    #[error("Responder not configured: {0}")]
    NotConfigured(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Upstream timed out after {0} ms")]
    Timeout(u64),

    #[error("Rate limited")]
    RateLimited,
}

impl GeneratorError {
    /// Short label used for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            GeneratorError::NotConfigured(_) => "not_configured",
            GeneratorError::Upstream(_) => "upstream",
            GeneratorError::Timeout(_) => "timeout",
            GeneratorError::RateLimited => "rate_limited",
        }
    }
}

#[async_trait]
pub trait ResponseGenerator: Send + Sync {
    /// Produces a reply for `text`. `session_id` scopes delegated calls.
    async fn generate(&self, text: &str, session_id: &str) -> Result<String, GeneratorError>;

    /// Name reported in logs.
    fn name(&self) -> &'static str;
}
