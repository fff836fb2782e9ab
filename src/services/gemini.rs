use crate::core::scorer::{render_prompt, MatchInput, MatchModel, ModelError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// Gemini `generateContent` client used as the remote scoring model
///
/// The request pins a JSON response schema so the model answers with
/// `{matchScore, justification}`; the scorer still validates the answer.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
    max_retries: u32,
    backoff_ms: u64,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: Value,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GoogleError {
    error: GoogleErrorBody,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorBody {
    message: String,
}

impl GenerateResponse {
    fn text(&self) -> Option<&str> {
        self.candidates
            .iter()
            .filter_map(|c| c.content.as_ref())
            .flat_map(|c| c.parts.iter())
            .find_map(|p| p.text.as_deref())
    }
}

impl GeminiClient {
    pub fn new(
        base_url: String,
        model: String,
        api_key: String,
        timeout: Duration,
        max_retries: u32,
    ) -> Result<Self, ModelError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            base_url,
            model,
            api_key,
            max_retries,
            backoff_ms: 1000,
        })
    }

    /// Override the base retry delay (doubles per attempt)
    pub fn with_backoff(mut self, backoff_ms: u64) -> Self {
        self.backoff_ms = backoff_ms;
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }

    fn request_body<'a>(prompt: &'a str) -> GenerateRequest<'a> {
        GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: prompt }],
            }],
            generation_config: serde_json::json!({
                "responseMimeType": "application/json",
                "responseSchema": {
                    "type": "OBJECT",
                    "properties": {
                        "matchScore": { "type": "INTEGER" },
                        "justification": { "type": "STRING" }
                    },
                    "required": ["matchScore", "justification"]
                }
            }),
        }
    }
}

#[async_trait]
impl MatchModel for GeminiClient {
    /// Retries on 429 and 5xx with exponential backoff; access errors are final.
    async fn evaluate(&self, input: &MatchInput) -> Result<Value, ModelError> {
        let prompt = render_prompt(input);
        let body = Self::request_body(&prompt);
        let url = self.endpoint();

        let mut last_error: Option<ModelError> = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = backoff_delay(self.backoff_ms, attempt);
                warn!(
                    "Scoring call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = match self
                .client
                .post(&url)
                .header("x-goog-api-key", &self.api_key)
                .json(&body)
                .send()
                .await
            {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(ModelError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let text = response.text().await.unwrap_or_default();
                warn!("Scoring model returned {}: {}", status, text);
                last_error = Some(ModelError::Api {
                    status: status.as_u16(),
                    message: text,
                });
                continue;
            }

            if !status.is_success() {
                let text = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<GoogleError>(&text)
                    .map(|e| e.error.message)
                    .unwrap_or(text);
                return Err(match status.as_u16() {
                    401 | 403 => ModelError::PermissionDenied {
                        status: status.as_u16(),
                        message,
                    },
                    code => ModelError::Api {
                        status: code,
                        message,
                    },
                });
            }

            let parsed: GenerateResponse = response
                .json()
                .await
                .map_err(|e| ModelError::Malformed(e.to_string()))?;
            let text = parsed
                .text()
                .ok_or_else(|| ModelError::Malformed("response has no text part".into()))?;

            debug!("Scoring model answered on attempt {}", attempt + 1);

            return serde_json::from_str(strip_json_fences(text))
                .map_err(|e| ModelError::Malformed(e.to_string()));
        }

        Err(last_error.unwrap_or(ModelError::RateLimited {
            retries: self.max_retries,
        }))
    }
}

/// Delay before retry `attempt` (1-based): `base_ms * 2^(attempt - 1)`,
/// saturating instead of overflowing for large attempt counts
fn backoff_delay(base_ms: u64, attempt: u32) -> Duration {
    let factor = 1u64
        .checked_shl(attempt.saturating_sub(1))
        .unwrap_or(u64::MAX);
    Duration::from_millis(base_ms.saturating_mul(factor))
}

/// Strips ```json ... ``` or ``` ... ``` code fences from model output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    let inner = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"));
    match inner {
        Some(stripped) => {
            let stripped = stripped.trim_start();
            stripped
                .strip_suffix("```")
                .map(|s| s.trim())
                .unwrap_or(stripped)
        }
        None => text,
    }
}
