use std::sync::Arc;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::services::oracle::{
    GenericRateLimiter, NamingOracle, OracleError, OracleItem, OracleLabel, OracleResult,
};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

pub(crate) const NAMING_SYSTEM_PROMPT: &str = "You are a naming assistant for UI image assets. \
For every item you receive, infer a concise English label, a Simplified Chinese label, and a \
short domain or brand tag from the file name stem. Respond with a JSON array only; each element \
must be an object with the keys `id`, `english`, `chinese`, and `domain`, and every input id \
must appear exactly once.";

/// Naming client backed by the Gemini `generateContent` REST endpoint.
#[derive(Clone)]
pub struct GeminiNamingClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    limiter: Option<Arc<GenericRateLimiter>>,
}

impl GeminiNamingClient {
    pub fn from_env(
        model: impl Into<String>,
        limiter: Option<Arc<GenericRateLimiter>>,
    ) -> Result<Self, OracleError> {
        let api_key = std::env::var("GOOGLE_AI_API_KEY")
            .or_else(|_| std::env::var("GEMINI_API_KEY"))
            .map_err(|_| OracleError::MissingApiKey)?;
        let model = model.into();
        if model.trim().is_empty() {
            return Err(OracleError::Permanent(
                "naming model key must not be empty".to_string(),
            ));
        }
        Ok(Self {
            http: reqwest::Client::new(),
            api_key,
            model,
            limiter,
        })
    }

    fn endpoint(&self) -> String {
        format!("{GEMINI_API_BASE}/{}:generateContent", self.model)
    }

    fn build_request(&self, items: &[OracleItem]) -> Result<GenerateContentRequest, OracleError> {
        let payload = serde_json::to_string(items).map_err(|err| {
            OracleError::Permanent(format!("failed to encode naming request: {err}"))
        })?;
        Ok(GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part {
                    text: format!("Name the following image files:\n{payload}"),
                }],
            }],
            system_instruction: Content {
                role: "user",
                parts: vec![Part {
                    text: NAMING_SYSTEM_PROMPT.to_string(),
                }],
            },
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                temperature: 0.0,
                candidate_count: 1,
            },
        })
    }
}

#[async_trait]
impl NamingOracle for GeminiNamingClient {
    async fn infer(&self, items: &[OracleItem]) -> OracleResult<Vec<OracleLabel>> {
        if items.is_empty() {
            return Ok(Vec::new());
        }
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }

        let request = self.build_request(items)?;
        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(classify_request_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &body));
        }

        let payload: GenerateContentResponse = response.json().await.map_err(|err| {
            OracleError::Permanent(format!("failed to decode naming response: {err}"))
        })?;
        parse_labels(&candidate_text(&payload)?)
    }
}

fn candidate_text(payload: &GenerateContentResponse) -> Result<String, OracleError> {
    let candidate = payload
        .candidates
        .first()
        .ok_or_else(|| OracleError::Permanent("naming response missing candidates".to_string()))?;

    let mut buffer = String::new();
    if let Some(content) = candidate.content.as_ref() {
        for part in &content.parts {
            if let Some(text) = part.text.as_deref() {
                buffer.push_str(text);
            }
        }
    }
    if buffer.trim().is_empty() {
        return Err(OracleError::Permanent(
            "naming response did not include any text output".to_string(),
        ));
    }
    Ok(buffer)
}

pub(crate) fn parse_labels(raw: &str) -> OracleResult<Vec<OracleLabel>> {
    let body = strip_code_fences(raw);
    serde_json::from_str(body)
        .map_err(|err| OracleError::Permanent(format!("failed to parse naming labels JSON: {err}")))
}

/// Models sometimes wrap the JSON payload in markdown code fences despite the
/// JSON response mime type; strip them before parsing.
pub(crate) fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // The opening fence line may carry an info string such as `json`.
    let body = rest.split_once('\n').map_or(rest, |(_, body)| body);
    let body = body.trim_end();
    body.strip_suffix("```").unwrap_or(body).trim()
}

fn classify_request_error(err: reqwest::Error) -> OracleError {
    if err.is_timeout() || err.is_connect() {
        OracleError::Transient(err.to_string())
    } else {
        OracleError::Permanent(err.to_string())
    }
}

pub(crate) fn classify_status(status: StatusCode, body: &str) -> OracleError {
    let detail: String = body.chars().take(200).collect();
    if status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::SERVICE_UNAVAILABLE {
        OracleError::Transient(format!("naming service returned {status}: {detail}"))
    } else {
        OracleError::Permanent(format!("naming service returned {status}: {detail}"))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    system_instruction: Content,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    temperature: f32,
    candidate_count: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}
