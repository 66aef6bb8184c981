//! Dialogflow ES `detectIntent` client.
//!
//! Speaks the v2 REST API: one POST per user message to
//! `{endpoint}/projects/{project}/agent/sessions/{session}:detectIntent`,
//! authenticated with an OAuth bearer token.

use super::intent::{DetectIntentRequest, DetectIntentResult, IntentDetector};
use super::GeneratorError;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Dialogflow API base URL.
pub const DIALOGFLOW_API_BASE: &str = "https://dialogflow.googleapis.com/v2";

/// Dialogflow client configuration.
#[derive(Debug, Clone)]
pub struct DialogflowConfig {
    pub endpoint: String,
    pub project_id: String,
    pub access_token: SecretString,
    pub request_timeout: Duration,
}

pub struct DialogflowClient {
    config: DialogflowConfig,
    client: Client,
}

impl DialogflowClient {
    pub fn new(config: DialogflowConfig) -> Result<Self, GeneratorError> {
        if config.project_id.is_empty() {
            return Err(GeneratorError::NotConfigured(
                "Dialogflow project id is empty".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| {
                GeneratorError::NotConfigured(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { config, client })
    }

    fn detect_intent_url(&self, session_token: &str) -> String {
        format!(
            "{}/projects/{}/agent/sessions/{}:detectIntent",
            self.config.endpoint.trim_end_matches('/'),
            self.config.project_id,
            session_token
        )
    }
}

#[async_trait]
impl IntentDetector for DialogflowClient {
    async fn detect_intent(
        &self,
        request: DetectIntentRequest<'_>,
    ) -> Result<DetectIntentResult, GeneratorError> {
        let body = DetectIntentBody {
            query_input: QueryInput {
                text: TextInput {
                    text: request.text,
                    language_code: request.language_code,
                },
            },
        };

        tracing::debug!(
            project = %self.config.project_id,
            session_id = %request.session_token,
            text_len = request.text.len(),
            "Sending detectIntent request"
        );

        let response = self
            .client
            .post(self.detect_intent_url(request.session_token))
            .bearer_auth(self.config.access_token.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GeneratorError::Timeout(self.config.request_timeout.as_millis() as u64)
                } else {
                    GeneratorError::Upstream(format!("detectIntent transport error: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(match status {
                StatusCode::TOO_MANY_REQUESTS => GeneratorError::RateLimited,
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    GeneratorError::Upstream(format!("detectIntent rejected credentials ({})", status))
                }
                _ => {
                    let text = response.text().await.unwrap_or_default();
                    let snippet: String = text.chars().take(200).collect();
                    GeneratorError::Upstream(format!("detectIntent error {}: {}", status, snippet))
                }
            });
        }

        let parsed: DetectIntentResponse = response.json().await.map_err(|e| {
            GeneratorError::Upstream(format!("Failed to parse detectIntent response: {}", e))
        })?;

        Ok(DetectIntentResult {
            fulfillment_text: parsed.query_result.and_then(|r| r.fulfillment_text),
        })
    }
}

// ============================================================================
// Dialogflow API wire types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DetectIntentBody<'a> {
    query_input: QueryInput<'a>,
}

#[derive(Debug, Serialize)]
struct QueryInput<'a> {
    text: TextInput<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TextInput<'a> {
    text: &'a str,
    language_code: &'a str,
}

// Unknown fields are ignored; any shape without fulfillment text is an empty reply.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DetectIntentResponse {
    #[serde(default)]
    query_result: Option<QueryResult>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResult {
    #[serde(default)]
    fulfillment_text: Option<String>,
}
