// SPDX-FileCopyrightText: 2026 Warung Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! NLU gateway over the Gemini API.
//!
//! Maps utterances (text, voice notes, images) to an intent and a flat
//! slot map. Calls route through the credential rotator: quota errors
//! propagate as quota so the pool can cool the key down, and deadline
//! expiry is classified as transient.

pub mod intent;
pub mod prompt;

use std::sync::Arc;
use std::time::{Duration, Instant};

use base64::Engine;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use warung_core::WarungError;
use warung_keypool::{KeyFailure, KeyPool};
use warung_metrics::record_gemini_request;

pub use intent::{Classification, Intent, Slots};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// One line of conversation context.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    /// "inbound" (user) or "outbound" (bot).
    pub direction: String,
    pub text: String,
}

/// Opaque media blob attached to the utterance.
#[derive(Debug, Clone)]
pub struct MediaInput {
    pub bytes: Vec<u8>,
    pub mime: String,
}

/// NLU client configuration.
#[derive(Debug, Clone)]
pub struct NluConfig {
    pub model: String,
    pub timeout: Duration,
}

impl Default for NluConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.0-flash".to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Gemini-backed classifier.
pub struct NluClient {
    http: reqwest::Client,
    pool: Arc<KeyPool>,
    config: NluConfig,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: CandidateContent,
}

#[derive(Debug, Default, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

impl NluClient {
    pub fn new(pool: Arc<KeyPool>, config: NluConfig) -> Result<Self, WarungError> {
        let timeout = if config.timeout.is_zero() {
            DEFAULT_TIMEOUT
        } else {
            config.timeout
        };
        // The per-call deadline is enforced with tokio::time::timeout so
        // expiry can be classified as transient; the reqwest timeout is a
        // slightly larger backstop.
        let http = reqwest::Client::builder()
            .timeout(timeout + Duration::from_secs(5))
            .build()
            .map_err(|e| WarungError::Internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            pool,
            config: NluConfig { timeout, ..config },
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Override the API base URL (tests point this at a mock server).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Classify one utterance with optional media and recent history.
    pub async fn classify(
        &self,
        utterance: &str,
        media: Option<&MediaInput>,
        history: &[HistoryEntry],
    ) -> Result<Classification, WarungError> {
        let body = build_request(utterance, media, history);

        self.pool
            .invoke(|secret| {
                let body = body.clone();
                async move { self.call_model(&secret, body).await }
            })
            .await
    }

    async fn call_model(
        &self,
        secret: &str,
        body: Value,
    ) -> Result<Classification, KeyFailure> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, self.config.model, secret
        );

        let started = Instant::now();
        let response =
            match tokio::time::timeout(self.config.timeout, self.http.post(&url).json(&body).send())
                .await
            {
                Err(_) => {
                    record_gemini_request("transient", started.elapsed().as_secs_f64());
                    return Err(KeyFailure::Transient(format!(
                        "gemini deadline exceeded after {:?}",
                        self.config.timeout
                    )));
                }
                Ok(Err(e)) => {
                    record_gemini_request("transient", started.elapsed().as_secs_f64());
                    return Err(KeyFailure::Transient(format!("gemini request: {e}")));
                }
                Ok(Ok(response)) => response,
            };

        let status = response.status();
        let body_text = response.text().await.unwrap_or_default();
        let elapsed = started.elapsed().as_secs_f64();

        if status.as_u16() == 429 || is_quota_message(&body_text) {
            record_gemini_request("quota", elapsed);
            return Err(KeyFailure::Quota(format!(
                "gemini status={status}: {body_text}"
            )));
        }
        if status.is_server_error() {
            record_gemini_request("transient", elapsed);
            return Err(KeyFailure::Transient(format!(
                "gemini status={status}: {body_text}"
            )));
        }
        if !status.is_success() {
            record_gemini_request("error", elapsed);
            return Err(KeyFailure::Fatal(WarungError::Upstream {
                endpoint: "generateContent".to_string(),
                message: body_text,
                code: i64::from(status.as_u16()),
            }));
        }

        match parse_classification(&body_text) {
            Ok(classification) => {
                record_gemini_request("ok", elapsed);
                debug!(intent = %classification.intent, "utterance classified");
                Ok(classification)
            }
            Err(e) => {
                record_gemini_request("error", elapsed);
                Err(KeyFailure::Fatal(e))
            }
        }
    }
}

fn is_quota_message(body: &str) -> bool {
    let lower = body.to_lowercase();
    lower.contains("quota") || lower.contains("rate limit") || lower.contains("exceeded")
}

/// Assemble the generateContent request body.
fn build_request(utterance: &str, media: Option<&MediaInput>, history: &[HistoryEntry]) -> Value {
    let mut parts = Vec::new();

    if let Some(media) = media {
        parts.push(json!({
            "inline_data": {
                "mime_type": media.mime,
                "data": base64::engine::general_purpose::STANDARD.encode(&media.bytes),
            }
        }));
    }

    let mut text = String::new();
    if !history.is_empty() {
        text.push_str("Riwayat percakapan terakhir:\n");
        // History arrives newest-first; replay it oldest-first.
        for entry in history.iter().rev() {
            let speaker = if entry.direction == "outbound" {
                "bot"
            } else {
                "user"
            };
            text.push_str(&format!("[{speaker}] {}\n", entry.text));
        }
        text.push('\n');
    }
    text.push_str("Pesan user saat ini: ");
    text.push_str(utterance);
    parts.push(json!({ "text": text }));

    json!({
        "system_instruction": { "parts": [{ "text": prompt::SYSTEM_PROMPT }] },
        "contents": [{ "role": "user", "parts": parts }],
        "generationConfig": { "response_mime_type": "application/json", "temperature": 0.1 },
    })
}

/// Extract the classification JSON from a generateContent response.
fn parse_classification(body: &str) -> Result<Classification, WarungError> {
    let response: GenerateResponse = serde_json::from_str(body)
        .map_err(|e| WarungError::Internal(format!("decode gemini response: {e}")))?;

    let text: String = response
        .candidates
        .first()
        .map(|c| {
            c.content
                .parts
                .iter()
                .map(|p| p.text.as_str())
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        warn!("gemini returned no candidate text");
        return Ok(Classification::unknown());
    }

    Classification::from_model_text(&text)
}
