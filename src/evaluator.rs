//! Code quality checker: prompt building, the single upstream call, and reply parsing.
//!
//! There is no local scoring. Without a usable client every evaluation fails with
//! `EvaluateError::Upstream` naming the reason; nothing is retried.

use serde::Deserialize;
use tracing::{info, instrument, warn};

use crate::config::Prompts;
use crate::domain::EvaluationResult;
use crate::error::{ClientInitError, EvaluateError};
use crate::openai::OpenAI;
use crate::util::{extract_json_object, fill_template};

#[derive(Clone)]
pub struct Evaluator {
  // Err holds the reason the client is unavailable.
  openai: Result<OpenAI, String>,
  prompts: Prompts,
}

/// Shape the model is asked to reply with.
#[derive(Deserialize)]
struct Reply {
  score: f64,
  observations: Vec<String>,
  issues: Vec<String>,
  recommendations: Vec<String>,
}

impl Evaluator {
  pub fn new(openai: Result<OpenAI, ClientInitError>, prompts: Prompts) -> Self {
    Self { openai: openai.map_err(|e| e.to_string()), prompts }
  }

  pub fn is_configured(&self) -> bool { self.openai.is_ok() }

  #[instrument(level = "info", skip(self, code), fields(code_len = code.len()))]
  pub async fn evaluate(&self, code: &str) -> Result<EvaluationResult, EvaluateError> {
    if code.trim().is_empty() {
      return Err(EvaluateError::EmptyInput);
    }
    let oa = self.openai.as_ref().map_err(|reason| {
      warn!(target: "evaluator", %reason, "Evaluation requested but the OpenAI client is unavailable");
      EvaluateError::Upstream(reason.clone())
    })?;

    let user = fill_template(&self.prompts.evaluate_user_template, &[("code", code)]);
    let text = oa.chat_json_text(&self.prompts.evaluate_system, &user, 0.2).await?;
    let result = parse_reply(&text)?;
    info!(target: "evaluator", score = result.score, issues = result.issues.len(), "Code evaluated");
    Ok(result)
  }
}

/// Turn the model's reply text into a result, or say why it can't be.
pub fn parse_reply(text: &str) -> Result<EvaluationResult, EvaluateError> {
  let json = extract_json_object(text)
    .ok_or_else(|| EvaluateError::MalformedResponse("reply contains no JSON object".into()))?;
  let reply: Reply = serde_json::from_str(json)
    .map_err(|e| EvaluateError::MalformedResponse(e.to_string()))?;

  if !reply.score.is_finite() || !(0.0..=100.0).contains(&reply.score) {
    return Err(EvaluateError::MalformedResponse(format!("score {} is outside 0-100", reply.score)));
  }

  Ok(EvaluationResult {
    score: reply.score.round() as u8,
    observations: reply.observations,
    issues: reply.issues,
    recommendations: reply.recommendations,
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
  };
  use std::time::Duration;

  use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
  use serde_json::{json, Value};

  use crate::openai::DEFAULT_MODEL;

  /// Local stand-in for the completion API. Answers every call with `status` and `body`.
  async fn fake_upstream(status: StatusCode, body: Value) -> (String, Arc<AtomicUsize>) {
    slow_upstream(status, body, Duration::ZERO).await
  }

  /// Like `fake_upstream`, but waits `delay` before answering.
  async fn slow_upstream(status: StatusCode, body: Value, delay: Duration) -> (String, Arc<AtomicUsize>) {
    let hits = Arc::new(AtomicUsize::new(0));
    let app = Router::new()
      .route(
        "/v1/chat/completions",
        post(move |State(hits): State<Arc<AtomicUsize>>, Json(_req): Json<Value>| {
          let body = body.clone();
          async move {
            hits.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(delay).await;
            (status, Json(body))
          }
        }),
      )
      .with_state(hits.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
      axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}/v1", addr), hits)
  }

  fn completion(content: &str) -> Value {
    json!({
      "choices": [{ "message": { "role": "assistant", "content": content } }],
      "usage": { "prompt_tokens": 120, "completion_tokens": 40, "total_tokens": 160 }
    })
  }

  fn evaluator_for(base_url: String) -> Evaluator {
    evaluator_with_timeout(base_url, Duration::from_secs(5))
  }

  fn evaluator_with_timeout(base_url: String, timeout: Duration) -> Evaluator {
    let oa = OpenAI::new("test-key".into(), base_url, DEFAULT_MODEL.into(), timeout);
    Evaluator::new(Ok(oa.unwrap()), Prompts::default())
  }

  #[tokio::test]
  async fn blank_code_fails_before_any_request() {
    let (url, hits) = fake_upstream(StatusCode::OK, completion("{}")).await;
    let ev = evaluator_for(url);
    assert!(matches!(ev.evaluate("").await, Err(EvaluateError::EmptyInput)));
    assert!(matches!(ev.evaluate("   ").await, Err(EvaluateError::EmptyInput)));
    assert!(matches!(ev.evaluate("\n\t").await, Err(EvaluateError::EmptyInput)));
    assert_eq!(hits.load(Ordering::SeqCst), 0);
  }

  #[tokio::test]
  async fn well_formed_reply_is_returned_unchanged() {
    let content = json!({
      "score": 85,
      "observations": ["clear naming"],
      "issues": ["missing docstring"],
      "recommendations": ["add docstrings"]
    })
    .to_string();
    let (url, hits) = fake_upstream(StatusCode::OK, completion(&content)).await;

    let result = evaluator_for(url).evaluate("def f(x):\n    return x").await.unwrap();
    assert_eq!(
      result,
      EvaluationResult {
        score: 85,
        observations: vec!["clear naming".into()],
        issues: vec!["missing docstring".into()],
        recommendations: vec!["add docstrings".into()],
      }
    );
    assert_eq!(hits.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn auth_failure_is_upstream_with_provider_message() {
    let body = json!({ "error": { "message": "Incorrect API key provided", "type": "invalid_request_error" } });
    let (url, hits) = fake_upstream(StatusCode::UNAUTHORIZED, body).await;

    let err = evaluator_for(url).evaluate("x = 1").await.unwrap_err();
    match err {
      EvaluateError::Upstream(msg) => {
        assert!(msg.contains("authentication failed"), "{msg}");
        assert!(msg.contains("Incorrect API key provided"), "{msg}");
      }
      other => panic!("expected Upstream, got {other:?}"),
    }
    assert_eq!(hits.load(Ordering::SeqCst), 1, "no retries");
  }

  #[tokio::test]
  async fn prose_reply_is_malformed() {
    let (url, _) = fake_upstream(StatusCode::OK, completion("Looks fine to me!")).await;
    let err = evaluator_for(url).evaluate("x = 1").await.unwrap_err();
    assert!(matches!(err, EvaluateError::MalformedResponse(_)));
  }

  #[tokio::test]
  async fn unexpected_envelope_is_upstream() {
    let (url, _) = fake_upstream(StatusCode::OK, json!({ "unexpected": true })).await;
    let err = evaluator_for(url).evaluate("x = 1").await.unwrap_err();
    assert!(matches!(err, EvaluateError::Upstream(_)));
  }

  #[tokio::test]
  async fn unreachable_endpoint_is_upstream() {
    // Bind then drop to get a port with nothing listening.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let err = evaluator_for(format!("http://{}/v1", addr)).evaluate("x = 1").await.unwrap_err();
    assert!(matches!(err, EvaluateError::Upstream(_)));
  }

  #[tokio::test]
  async fn slow_upstream_times_out_without_retry() {
    let content = json!({ "score": 90, "observations": [], "issues": [], "recommendations": [] }).to_string();
    let (url, hits) = slow_upstream(StatusCode::OK, completion(&content), Duration::from_secs(3)).await;

    let err = evaluator_with_timeout(url, Duration::from_secs(1)).evaluate("x = 1").await.unwrap_err();
    match err {
      EvaluateError::Upstream(msg) => assert!(msg.starts_with("request timed out"), "{msg}"),
      other => panic!("expected Upstream, got {other:?}"),
    }
    assert_eq!(hits.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn missing_key_surfaces_on_first_use() {
    let ev = Evaluator::new(Err(ClientInitError::MissingApiKey), Prompts::default());
    assert!(!ev.is_configured());
    match ev.evaluate("x = 1").await {
      Err(EvaluateError::Upstream(msg)) => assert!(msg.contains("OPENAI_API_KEY"), "{msg}"),
      other => panic!("expected Upstream, got {other:?}"),
    }
    assert!(matches!(ev.evaluate(" ").await, Err(EvaluateError::EmptyInput)));
  }

  #[tokio::test]
  async fn client_build_failure_is_not_reported_as_missing_key() {
    let build_err = reqwest::Client::new().get("not a url").build().unwrap_err();
    let ev = Evaluator::new(Err(ClientInitError::Client(build_err)), Prompts::default());
    assert!(!ev.is_configured());
    match ev.evaluate("x = 1").await {
      Err(EvaluateError::Upstream(msg)) => {
        assert!(msg.starts_with("HTTP client could not be built"), "{msg}");
        assert!(!msg.contains("OPENAI_API_KEY"), "{msg}");
      }
      other => panic!("expected Upstream, got {other:?}"),
    }
  }

  #[test]
  fn parse_reply_accepts_fenced_json() {
    let text = "```json\n{\"score\": 72.4, \"observations\": [], \"issues\": [\"long lines\"], \"recommendations\": []}\n```";
    let r = parse_reply(text).unwrap();
    assert_eq!(r.score, 72);
    assert_eq!(r.issues, vec!["long lines".to_string()]);
  }

  #[test]
  fn parse_reply_rejects_missing_fields_and_bad_scores() {
    assert!(matches!(
      parse_reply(r#"{"score": 50, "observations": [], "issues": []}"#),
      Err(EvaluateError::MalformedResponse(_))
    ));
    assert!(matches!(
      parse_reply(r#"{"score": 150, "observations": [], "issues": [], "recommendations": []}"#),
      Err(EvaluateError::MalformedResponse(_))
    ));
    assert!(matches!(
      parse_reply(r#"{"score": "high", "observations": [], "issues": [], "recommendations": []}"#),
      Err(EvaluateError::MalformedResponse(_))
    ));
    assert!(matches!(parse_reply(""), Err(EvaluateError::MalformedResponse(_))));
  }
}
