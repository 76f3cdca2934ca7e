//! AI match insight: forwards match context to a chat-completions style
//! language-model endpoint and returns a structured prediction.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

use crate::config::InsightConfig;
use crate::models::{InsightRequest, PredictionInsight};

#[derive(Debug, Error)]
pub enum InsightError {
    #[error("insight endpoint is not configured (INSIGHT_API_KEY missing)")]
    NotConfigured,
    #[error("insight endpoint returned {status}: {body}")]
    Http { status: u16, body: String },
    #[error("insight response was malformed: {0}")]
    Malformed(String),
    #[error("insight request failed: {0}")]
    Request(#[from] reqwest::Error),
}

// ── Chat-completions response types ──────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

/// Model output before validation; confidence may arrive as any number.
#[derive(Debug, Deserialize)]
struct RawInsight {
    prediction: String,
    confidence: f64,
    #[serde(default)]
    analysis: String,
    #[serde(default)]
    trend: String,
    #[serde(default)]
    odds: serde_json::Value,
}

pub struct InsightClient {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    timeout: Duration,
}

impl InsightClient {
    pub fn new(config: &InsightConfig) -> Self {
        Self {
            client: Client::new(),
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            timeout: config.timeout,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    pub async fn predict(&self, request: &InsightRequest) -> Result<PredictionInsight, InsightError> {
        let api_key = self.api_key.as_ref().ok_or(InsightError::NotConfigured)?;

        tracing::info!("Requesting AI insight for {}", request.match_name);

        let body = json!({
            "model": self.model,
            "response_format": { "type": "json_object" },
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": build_prompt(request) },
            ],
        });

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Insight endpoint error {}: {}", status, body);
            return Err(InsightError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let chat: ChatResponse = response.json().await?;
        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| InsightError::Malformed("no completion content".to_string()))?;

        parse_insight(&content)
    }
}

const SYSTEM_PROMPT: &str = "You are a sports analyst. Reply with a JSON object with the keys \
    prediction (string), confidence (integer 0-100), analysis (string), trend (string) \
    and odds (string with suggested decimal odds).";

fn build_prompt(request: &InsightRequest) -> String {
    let history = if request.history.is_empty() {
        "none".to_string()
    } else {
        request.history.join("; ")
    };

    format!(
        "Match: {}\nHome team: {}\nAway team: {}\nRecent meetings: {}\nCurrent form: {}",
        request.match_name, request.teams.home, request.teams.away, history, request.current_form
    )
}

/// Validate model output. Confidence is clamped into 0-100.
pub fn parse_insight(content: &str) -> Result<PredictionInsight, InsightError> {
    let raw: RawInsight = serde_json::from_str(content.trim())
        .map_err(|e| InsightError::Malformed(e.to_string()))?;

    if !raw.confidence.is_finite() {
        return Err(InsightError::Malformed("confidence is not a number".to_string()));
    }

    let odds = match raw.odds {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    };

    Ok(PredictionInsight {
        prediction: raw.prediction,
        confidence: raw.confidence.round().clamp(0.0, 100.0) as u8,
        analysis: raw.analysis,
        trend: raw.trend,
        odds,
    })
}
