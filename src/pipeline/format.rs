//! AI formatting: send extracted text to Gemini and return its Markdown.
//!
//! The request is a single `generateContent` call built from
//! [`crate::prompts::format_prompt`]. The model's text is returned verbatim.
//! Any failure (transport, HTTP status, blocked or empty response) becomes a
//! [`FormatError`] whose message is shown to the user unchanged; no retries
//! are attempted.

use crate::config::ConversionConfig;
use crate::prompts::format_prompt;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::debug;

/// Why the formatting call failed.
#[derive(Debug, Error)]
pub enum FormatError {
    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(String),

    /// Network failure before a response arrived.
    #[error("{0}")]
    Transport(String),

    /// The call exceeded the configured timeout.
    #[error("request timed out after {secs}s")]
    Timeout { secs: u64 },

    /// The API answered with a non-success status.
    #[error("[{status}] {message}")]
    Api { status: u16, message: String },

    /// The prompt or response was blocked by safety filters.
    #[error("response blocked: {0}")]
    Blocked(String),

    /// The response carried no text.
    #[error("model returned no text")]
    EmptyResponse,

    /// The response body could not be decoded.
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Reformats raw text as Markdown.
#[async_trait]
pub trait MarkdownFormatter: Send + Sync {
    /// Return the model's Markdown for `raw_text`, authenticated with `api_key`.
    async fn format(&self, raw_text: &str, api_key: &str) -> Result<String, FormatError>;
}

// ── Wire types ───────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<RequestPart>,
}

#[derive(Debug, Serialize)]
struct RequestPart {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
    #[serde(default)]
    thought: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

// ── Gemini formatter ─────────────────────────────────────────────────────

/// [`MarkdownFormatter`] calling the Gemini `generateContent` REST endpoint.
#[derive(Debug, Clone)]
pub struct GeminiFormatter {
    http: reqwest::Client,
    base_url: String,
    model: String,
    temperature: Option<f32>,
    timeout_secs: u64,
}

impl GeminiFormatter {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self, FormatError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| FormatError::Client(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            temperature: None,
            timeout_secs,
        })
    }

    /// Build from the model, endpoint, temperature and timeout in `config`.
    pub fn from_config(config: &ConversionConfig) -> Result<Self, FormatError> {
        let mut formatter = Self::new(&config.base_url, &config.model, config.api_timeout_secs)?;
        formatter.temperature = config.temperature;
        Ok(formatter)
    }

    pub fn with_temperature(mut self, t: f32) -> Self {
        self.temperature = Some(t);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Full `generateContent` URL for the configured model.
    pub fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }

    fn build_request(&self, raw_text: &str) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![RequestPart {
                    text: format_prompt(raw_text),
                }],
            }],
            generation_config: self.temperature.map(|temperature| GenerationConfig { temperature }),
        }
    }
}

#[async_trait]
impl MarkdownFormatter for GeminiFormatter {
    async fn format(&self, raw_text: &str, api_key: &str) -> Result<String, FormatError> {
        let start = Instant::now();
        let request = self.build_request(raw_text);

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            return Err(api_error(status.as_u16(), &body));
        }

        let parsed: GenerateContentResponse =
            serde_json::from_str(&body).map_err(|e| FormatError::Malformed(e.to_string()))?;
        let text = response_text(parsed)?;

        debug!(
            "Model {} returned {} chars in {:?}",
            self.model,
            text.len(),
            start.elapsed()
        );
        Ok(text)
    }
}

impl GeminiFormatter {
    fn transport_error(&self, e: reqwest::Error) -> FormatError {
        if e.is_timeout() {
            FormatError::Timeout {
                secs: self.timeout_secs,
            }
        } else {
            FormatError::Transport(e.to_string())
        }
    }
}

/// Map a non-success response to [`FormatError::Api`], preferring the
/// service's own error message.
fn api_error(status: u16, body: &str) -> FormatError {
    let message = serde_json::from_str::<ErrorResponse>(body)
        .map(|r| r.error.message)
        .unwrap_or_else(|_| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                "request failed".to_string()
            } else {
                trimmed.to_string()
            }
        });
    FormatError::Api { status, message }
}

/// Concatenate the text parts of the first candidate, skipping thought parts.
fn response_text(response: GenerateContentResponse) -> Result<String, FormatError> {
    let Some(candidate) = response.candidates.into_iter().next() else {
        return Err(match response.prompt_feedback.and_then(|f| f.block_reason) {
            Some(reason) => FormatError::Blocked(reason),
            None => FormatError::EmptyResponse,
        });
    };

    let text: String = candidate
        .content
        .map(|c| c.parts)
        .unwrap_or_default()
        .into_iter()
        .filter(|p| !p.thought)
        .filter_map(|p| p.text)
        .collect();

    if text.is_empty() {
        let reason = candidate.finish_reason.unwrap_or_default();
        let blocked = matches!(
            reason.as_str(),
            "SAFETY" | "BLOCKLIST" | "PROHIBITED_CONTENT"
        );
        return Err(if blocked {
            FormatError::Blocked(reason)
        } else {
            FormatError::EmptyResponse
        });
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<String, FormatError> {
        response_text(serde_json::from_str(json).unwrap())
    }

    #[test]
    fn endpoint_includes_model() {
        let f = GeminiFormatter::new("https://example.test/", "gemini-x", 5).unwrap();
        assert_eq!(
            f.endpoint(),
            "https://example.test/v1beta/models/gemini-x:generateContent"
        );
    }

    #[test]
    fn request_body_shape() {
        let f = GeminiFormatter::new("https://example.test", "m", 5).unwrap();
        let json = serde_json::to_value(f.build_request("hello world")).unwrap();
        assert_eq!(json["contents"][0]["role"], "user");
        let text = json["contents"][0]["parts"][0]["text"].as_str().unwrap();
        assert!(text.ends_with("Raw text:\nhello world"));
        assert!(json.get("generationConfig").is_none());
    }

    #[test]
    fn request_body_includes_temperature_when_set() {
        let f = GeminiFormatter::new("https://example.test", "m", 5)
            .unwrap()
            .with_temperature(0.5);
        let json = serde_json::to_value(f.build_request("x")).unwrap();
        assert_eq!(json["generationConfig"]["temperature"], 0.5);
    }

    #[test]
    fn response_parts_are_concatenated() {
        let text = parse(
            r##"{"candidates":[{"content":{"parts":[{"text":"# Title\n"},{"text":"Body"}]},"finishReason":"STOP"}]}"##,
        )
        .unwrap();
        assert_eq!(text, "# Title\nBody");
    }

    #[test]
    fn thought_parts_are_skipped() {
        let text = parse(
            r##"{"candidates":[{"content":{"parts":[{"text":"thinking...","thought":true},{"text":"# Out"}]}}]}"##,
        )
        .unwrap();
        assert_eq!(text, "# Out");
    }

    #[test]
    fn blocked_prompt() {
        match parse(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#) {
            Err(FormatError::Blocked(reason)) => assert_eq!(reason, "SAFETY"),
            other => panic!("expected Blocked, got {other:?}"),
        }
    }

    #[test]
    fn empty_candidates() {
        assert!(matches!(parse("{}"), Err(FormatError::EmptyResponse)));
        assert!(matches!(
            parse(r#"{"candidates":[{"finishReason":"MAX_TOKENS"}]}"#),
            Err(FormatError::EmptyResponse)
        ));
    }

    #[test]
    fn api_error_prefers_service_message() {
        let e = api_error(
            400,
            r#"{"error":{"code":400,"message":"API key not valid. Please pass a valid API key.","status":"INVALID_ARGUMENT"}}"#,
        );
        assert_eq!(
            e.to_string(),
            "[400] API key not valid. Please pass a valid API key."
        );
    }

    #[test]
    fn api_error_falls_back_to_body() {
        assert_eq!(api_error(502, "Bad Gateway").to_string(), "[502] Bad Gateway");
        assert_eq!(api_error(500, "").to_string(), "[500] request failed");
    }
}
