//! Minimal OpenAI client for the code checker.
//!
//! We only call chat.completions and request a JSON object reply.
//! Calls are instrumented and log model name, latency and response size (not contents).
//!
//! NOTE: We never log the API key.

use std::time::{Duration, Instant};

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

use crate::error::{ClientInitError, EvaluateError};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_TIMEOUT_SECS: u64 = 8;

#[derive(Clone)]
pub struct OpenAI {
  pub client: reqwest::Client,
  pub api_key: String,
  pub base_url: String,
  pub model: String,
}

impl OpenAI {
  pub fn new(api_key: String, base_url: String, model: String, timeout: Duration) -> Result<Self, reqwest::Error> {
    let client = reqwest::Client::builder()
      .timeout(timeout)
      .build()?;
    let base_url = base_url.trim_end_matches('/').to_string();
    Ok(Self { client, api_key, base_url, model })
  }

  /// Construct the client from OPENAI_* env vars. A missing key and a client that
  /// fails to build are reported separately.
  pub fn from_env() -> Result<Self, ClientInitError> {
    let api_key = std::env::var("OPENAI_API_KEY")
      .ok()
      .filter(|k| !k.trim().is_empty())
      .ok_or(ClientInitError::MissingApiKey)?;
    let base_url = std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.into());
    let model = std::env::var("OPENAI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.into());
    let timeout_secs = std::env::var("OPENAI_TIMEOUT_SECS")
      .ok()
      .and_then(|s| s.parse::<u64>().ok())
      .filter(|s| *s > 0)
      .unwrap_or(DEFAULT_TIMEOUT_SECS);

    Ok(Self::new(api_key, base_url, model, Duration::from_secs(timeout_secs))?)
  }

  /// JSON-object chat completion. Returns the raw message content; the caller parses it.
  /// Transport, status and envelope failures are all `Upstream`.
  #[instrument(level = "info", skip(self, system, user), fields(model = %self.model))]
  pub async fn chat_json_text(&self, system: &str, user: &str, temperature: f32) -> Result<String, EvaluateError> {
    let url = format!("{}/chat/completions", self.base_url);
    let req = ChatCompletionRequest {
      model: self.model.clone(),
      messages: vec![
        ChatMessageReq { role: "system".into(), content: system.into() },
        ChatMessageReq { role: "user".into(), content: user.into() },
      ],
      temperature,
      response_format: Some(ResponseFormat { r#type: "json_object".into() }),
    };

    let start = Instant::now();
    let res = self.client.post(&url)
      .header(USER_AGENT, "pep8-arcade-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&req).send().await
      .map_err(|e| {
        let what = if e.is_timeout() { "request timed out" } else { "request failed" };
        error!(target: "evaluator", elapsed = ?start.elapsed(), error = %e, "{what}");
        EvaluateError::Upstream(format!("{what}: {e}"))
      })?;

    let status = res.status();
    if !status.is_success() {
      let body = res.text().await.unwrap_or_default();
      let msg = extract_openai_error(&body).unwrap_or(body);
      error!(target: "evaluator", %status, elapsed = ?start.elapsed(), "OpenAI returned an error status");
      return Err(EvaluateError::Upstream(format!("{}: {}", describe_status(status), msg)));
    }

    let body: ChatCompletionResponse = res
      .json()
      .await
      .map_err(|e| EvaluateError::Upstream(format!("unexpected response envelope: {e}")))?;
    if let Some(usage) = &body.usage {
      info!(target: "evaluator", prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "OpenAI usage");
    }
    let text = body.choices.into_iter().next()
      .and_then(|c| c.message.content)
      .unwrap_or_default();

    info!(target: "evaluator", elapsed = ?start.elapsed(), reply_len = text.len(), "Model response received");
    Ok(text)
  }
}

fn describe_status(status: StatusCode) -> String {
  match status {
    StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => format!("authentication failed (HTTP {})", status.as_u16()),
    StatusCode::TOO_MANY_REQUESTS => "rate limit or quota exceeded (HTTP 429)".into(),
    s => format!("OpenAI HTTP {}", s),
  }
}

// --- Chat DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest {
  model: String,
  messages: Vec<ChatMessageReq>,
  temperature: f32,
  #[serde(skip_serializing_if = "Option::is_none")]
  response_format: Option<ResponseFormat>,
}
#[derive(Serialize)]
struct ChatMessageReq { role: String, content: String }
#[derive(Serialize)]
struct ResponseFormat { #[serde(rename = "type")] r#type: String }

#[derive(Deserialize)]
struct ChatCompletionResponse {
  choices: Vec<ChatChoice>,
  #[serde(default)] usage: Option<Usage>,
}
#[derive(Deserialize)]
struct ChatChoice { message: ChatMessageResp }
#[derive(Deserialize)]
struct ChatMessageResp { content: Option<String> }
#[derive(Deserialize)]
struct Usage {
  #[serde(default)] prompt_tokens: Option<u32>,
  #[serde(default)] completion_tokens: Option<u32>,
  #[serde(default)] total_tokens: Option<u32>,
}

/// Try to extract a clean error message from OpenAI error body.
fn extract_openai_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  serde_json::from_str::<EWrap>(body).ok().map(|w| w.error.message)
}
