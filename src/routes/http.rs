//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs parameters and basic result info.

use std::sync::Arc;
use axum::{
  extract::{Path, State},
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use tracing::{info, instrument};

use crate::error::{EvaluateError, QuizError};
use crate::logic::{apply_action, QuizAction};
use crate::protocol::*;
use crate::state::AppState;

/// Failures of the HTTP API. Every variant maps to a status and `{error, message}`.
#[derive(Debug)]
pub enum ApiError {
  SessionNotFound(String),
  Quiz(QuizError),
  Evaluate(EvaluateError),
}

impl From<QuizError> for ApiError {
  fn from(e: QuizError) -> Self { ApiError::Quiz(e) }
}

impl From<EvaluateError> for ApiError {
  fn from(e: EvaluateError) -> Self { ApiError::Evaluate(e) }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, error, message) = match self {
      ApiError::SessionNotFound(id) => (StatusCode::NOT_FOUND, "session_not_found", format!("unknown quiz session '{}'", id)),
      ApiError::Quiz(e) => {
        let status = match e {
          QuizError::InvalidState { .. }
          | QuizError::AlreadyOwned(_)
          | QuizError::PowerUpNotOwned(_)
          | QuizError::CosmeticNotOwned(_) => StatusCode::CONFLICT,
          QuizError::InvalidChoice { .. } => StatusCode::BAD_REQUEST,
          QuizError::InsufficientFunds { .. } => StatusCode::PAYMENT_REQUIRED,
          QuizError::UnknownItem(_) => StatusCode::NOT_FOUND,
        };
        (status, e.code(), e.to_string())
      }
      ApiError::Evaluate(e) => {
        let status = match e {
          EvaluateError::EmptyInput => StatusCode::BAD_REQUEST,
          EvaluateError::Upstream(_) | EvaluateError::MalformedResponse(_) => StatusCode::BAD_GATEWAY,
        };
        (status, e.code(), e.to_string())
      }
    };
    (status, Json(ErrorOut { error, message })).into_response()
  }
}

#[instrument(level = "info", skip(state))]
pub async fn http_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(HealthOut { ok: true, evaluator_configured: state.evaluator.is_configured() })
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_guidelines(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(GuidelinesOut { sections: state.guidelines.to_vec() })
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_shop(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(ShopOut { items: state.shop.to_vec() })
}

#[instrument(level = "info", skip(state, body), fields(code_len = body.code.len()))]
pub async fn http_post_evaluate(
  State(state): State<Arc<AppState>>,
  Json(body): Json<EvaluateIn>,
) -> Result<impl IntoResponse, ApiError> {
  let result = state.evaluator.evaluate(&body.code).await?;
  info!(target: "evaluator", score = result.score, quality = result.quality().label(), "HTTP evaluate served");
  Ok(Json(EvaluationOut::from(result)))
}

#[instrument(level = "info", skip(state))]
pub async fn http_create_session(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  let (session_id, session) = state.create_session().await;
  (StatusCode::CREATED, Json(QuizOut { session_id, answer: None, session }))
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_get_session(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<Json<QuizOut>, ApiError> {
  run_action(&state, id, QuizAction::Inspect).await
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_delete_session(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
  if state.end_session(&id).await {
    Ok(StatusCode::NO_CONTENT)
  } else {
    Err(ApiError::SessionNotFound(id))
  }
}

/// Body is optional; without `questions` the whole bank is played in order.
#[instrument(level = "info", skip(state, body), fields(%id))]
pub async fn http_post_start(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
  body: Option<Json<StartIn>>,
) -> Result<Json<QuizOut>, ApiError> {
  let count = body.and_then(|Json(b)| b.questions);
  run_action(&state, id, QuizAction::Start(count)).await
}

#[instrument(level = "info", skip(state, body), fields(%id, choice = body.choice))]
pub async fn http_post_answer(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
  Json(body): Json<AnswerIn>,
) -> Result<Json<QuizOut>, ApiError> {
  run_action(&state, id, QuizAction::Answer(body.choice)).await
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_post_advance(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<Json<QuizOut>, ApiError> {
  run_action(&state, id, QuizAction::Advance).await
}

#[instrument(level = "info", skip(state, body), fields(%id, item_id = %body.item_id))]
pub async fn http_post_purchase(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
  Json(body): Json<PurchaseIn>,
) -> Result<Json<QuizOut>, ApiError> {
  run_action(&state, id, QuizAction::Purchase(body.item_id)).await
}

#[instrument(level = "info", skip(state, body), fields(%id, item_id = %body.item_id))]
pub async fn http_post_select_cosmetic(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
  Json(body): Json<PurchaseIn>,
) -> Result<Json<QuizOut>, ApiError> {
  run_action(&state, id, QuizAction::SelectCosmetic(body.item_id)).await
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_post_hint(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<Json<QuizOut>, ApiError> {
  run_action(&state, id, QuizAction::Hint).await
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_post_skip(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<Json<QuizOut>, ApiError> {
  run_action(&state, id, QuizAction::Skip).await
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_post_fifty_fifty(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<Json<QuizOut>, ApiError> {
  run_action(&state, id, QuizAction::FiftyFifty).await
}

async fn run_action(state: &AppState, id: String, action: QuizAction) -> Result<Json<QuizOut>, ApiError> {
  let applied = state
    .with_session(&id, |session| {
      apply_action(state, session, action).map(|answer| (answer, session.snapshot()))
    })
    .await;
  match applied {
    None => Err(ApiError::SessionNotFound(id)),
    Some(res) => {
      let (answer, session) = res?;
      Ok(Json(QuizOut { session_id: id, answer, session }))
    }
  }
}
