//! PotensApiOracle - REST implementation of the oracle boundary.
//!
//! Every oracle operation is one POST to the Potens chat endpoint with a
//! `{"prompt": ...}` payload. Calls are synchronous from the dialogue's point
//! of view: one bounded-timeout request, retried a small bounded number of
//! times on 429/5xx and transport errors with capped exponential backoff.
//! There is no cancellation; a turn waits for the call or its timeout.

use crate::config::OracleConfig;
use crate::json::parse_lenient;
use crate::prompts;
use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use docflow_core::oracle::{
    ApprovalSummary, ConfirmationCheck, ExtractionReport, FieldEdit, Oracle,
};
use docflow_core::template::Template;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

const BACKOFF_BASE_MS: u64 = 600;
const BACKOFF_CAP_MS: u64 = 8_000;

/// Oracle implementation that talks to the Potens HTTP API.
#[derive(Clone)]
pub struct PotensApiOracle {
    client: Client,
    config: OracleConfig,
}

impl PotensApiOracle {
    /// Creates an oracle client over the given configuration.
    pub fn new(config: OracleConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { client, config }
    }

    /// Creates an oracle client from environment variables.
    pub fn try_from_env() -> Result<Self> {
        let config = OracleConfig::try_from_env()?;
        Ok(Self::new(config))
    }

    /// Sends one prompt, retrying retryable failures with capped backoff.
    async fn call(&self, prompt: &str) -> Result<String> {
        let mut last_error = anyhow!("oracle call never attempted");

        for attempt in 0..self.config.max_attempts {
            if attempt > 0 {
                let delay = BACKOFF_BASE_MS.saturating_mul(1 << (attempt - 1));
                tokio::time::sleep(Duration::from_millis(delay.min(BACKOFF_CAP_MS))).await;
            }

            match self.send_once(prompt).await {
                Ok(text) => return Ok(text),
                Err(CallError::Retryable(err)) => {
                    warn!(attempt, error = %err, "retryable oracle failure");
                    last_error = err;
                }
                Err(CallError::Fatal(err)) => return Err(err),
            }
        }

        Err(last_error)
    }

    async fn send_once(&self, prompt: &str) -> std::result::Result<String, CallError> {
        let body = ChatRequest { prompt };
        let response = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| {
                let wrapped = anyhow!("Potens request failed: {err}");
                if err.is_connect() || err.is_timeout() {
                    CallError::Retryable(wrapped)
                } else {
                    CallError::Fatal(wrapped)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "failed to read Potens error body".to_string());
            let wrapped = anyhow!("Potens returned {status}: {text}");
            return if is_retryable(status) {
                Err(CallError::Retryable(wrapped))
            } else {
                Err(CallError::Fatal(wrapped))
            };
        }

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|err| CallError::Fatal(anyhow!("Potens response was not JSON: {err}")))?;

        // Response key priority observed across API versions.
        let content = payload
            .get("message")
            .or_else(|| payload.get("text"))
            .and_then(|v| v.as_str())
            .map(|s| s.trim().to_string())
            .ok_or_else(|| {
                CallError::Fatal(anyhow!("Potens response carried no message text"))
            })?;

        debug!(chars = content.len(), "oracle reply received");
        Ok(content)
    }

    /// One call whose reply must decode as `T` via the lenient parser.
    async fn call_json<T: serde::de::DeserializeOwned>(&self, prompt: &str) -> Result<T> {
        let raw = self.call(prompt).await?;
        match parse_lenient(&raw) {
            Some(parsed) => Ok(parsed),
            None => bail!("oracle reply was not parsable JSON: {raw:.120}"),
        }
    }
}

enum CallError {
    Retryable(anyhow::Error),
    Fatal(anyhow::Error),
}

fn is_retryable(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    )
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    prompt: &'a str,
}

#[async_trait]
impl Oracle for PotensApiOracle {
    async fn classify(&self, utterance: &str, candidates: &[String]) -> Result<String> {
        let reply = self.call(&prompts::classify(utterance, candidates)).await?;
        Ok(reply.trim().to_string())
    }

    async fn extract_and_ask(
        &self,
        utterance: &str,
        template: &Template,
    ) -> Result<ExtractionReport> {
        self.call_json(&prompts::extract_and_ask(utterance, template))
            .await
    }

    async fn render_confirmation(
        &self,
        filled_fields: &HashMap<String, String>,
        doc_type: &str,
    ) -> Result<String> {
        self.call(&prompts::render_confirmation(filled_fields, doc_type))
            .await
    }

    async fn answer_freeform(&self, question: &str, context: &str) -> Result<String> {
        self.call(&prompts::answer_freeform(question, context)).await
    }

    async fn summarize_for_approval(&self, confirm_text: &str) -> Result<ApprovalSummary> {
        self.call_json(&prompts::summarize_for_approval(confirm_text))
            .await
    }

    async fn suggest_next_step(&self, doc_type: &str, creator_name: &str) -> Result<String> {
        self.call(&prompts::suggest_next_step(doc_type, creator_name))
            .await
    }

    async fn draft_rejection_note(
        &self,
        memo: &str,
        creator_name: &str,
        doc_title: &str,
    ) -> Result<String> {
        self.call(&prompts::draft_rejection_note(memo, creator_name, doc_title))
            .await
    }

    async fn apply_field_edit(
        &self,
        filled_fields: &HashMap<String, String>,
        instruction: &str,
    ) -> Result<FieldEdit> {
        self.call_json(&prompts::apply_field_edit(filled_fields, instruction))
            .await
    }

    async fn validate_confirmation(
        &self,
        confirm_text: &str,
        required_fields: &[String],
    ) -> Result<ConfirmationCheck> {
        self.call_json(&prompts::validate_confirmation(confirm_text, required_fields))
            .await
    }
}
