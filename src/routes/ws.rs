//! WebSocket upgrade + message loop. Each client message is parsed as JSON and
//! forwarded to core logic. We reply with a single JSON message per request.
//!
//! The connection owns its own quiz session; it is dropped on disconnect.

use std::sync::Arc;
use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tracing::{debug, error, info, instrument};

use crate::logic::{apply_action, QuizAction};
use crate::protocol::{ClientWsMessage, ServerWsMessage};
use crate::quiz::QuizSession;
use crate::state::AppState;

#[instrument(level = "info", skip(ws, state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "arcade", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  info!(target: "arcade", "WebSocket connected");
  let mut session = state.new_session();
  while let Some(Ok(msg)) = socket.recv().await {
    match msg {
      Message::Text(txt) => {
        // Parse, dispatch, serialize response.
        let reply_msg = match serde_json::from_str::<ClientWsMessage>(&txt) {
          Ok(incoming) => {
            debug!(target: "arcade", "WS received: {:?}", &incoming);
            handle_client_ws(incoming, &state, &mut session).await
          }
          Err(e) => ServerWsMessage::Error { code: "invalid_json".into(), message: format!("Invalid JSON: {}", e) },
        };

        let out = serde_json::to_string(&reply_msg).unwrap_or_else(|e| {
          serde_json::json!({ "type": "error", "code": "serialization", "message": format!("Serialization error: {}", e) }).to_string()
        });

        if let Err(e) = socket.send(Message::Text(out)).await {
          error!(target: "arcade", error = %e, "WS send error");
          break;
        }
      }
      Message::Ping(payload) => {
        if let Err(e) = socket.send(Message::Pong(payload)).await {
          error!(target: "arcade", error = %e, "WS pong send error");
          break;
        }
      }
      Message::Close(_) => break,
      _ => {}
    }
  }
  info!(target: "arcade", score = session.score(), phase = %session.phase(), "WebSocket disconnected");
}

async fn handle_client_ws(msg: ClientWsMessage, state: &AppState, session: &mut QuizSession) -> ServerWsMessage {
  let action = match msg {
    ClientWsMessage::Ping => return ServerWsMessage::Pong,
    ClientWsMessage::Guidelines => return ServerWsMessage::Guidelines { sections: state.guidelines.to_vec() },
    ClientWsMessage::Shop => return ServerWsMessage::Shop { items: state.shop.to_vec() },
    ClientWsMessage::Evaluate { code } => {
      return match state.evaluator.evaluate(&code).await {
        Ok(result) => {
          info!(target: "evaluator", score = result.score, quality = result.quality().label(), "WS evaluate served");
          ServerWsMessage::Evaluation { result: result.into() }
        }
        Err(e) => ServerWsMessage::Error { code: e.code().into(), message: e.to_string() },
      };
    }
    ClientWsMessage::StartQuiz { questions } => QuizAction::Start(questions),
    ClientWsMessage::QuizState => QuizAction::Inspect,
    ClientWsMessage::SubmitAnswer { choice } => QuizAction::Answer(choice),
    ClientWsMessage::Advance => QuizAction::Advance,
    ClientWsMessage::Purchase { item_id } => QuizAction::Purchase(item_id),
    ClientWsMessage::SelectCosmetic { item_id } => QuizAction::SelectCosmetic(item_id),
    ClientWsMessage::UseFiftyFifty => QuizAction::FiftyFifty,
    ClientWsMessage::UseHint => QuizAction::Hint,
    ClientWsMessage::Skip => QuizAction::Skip,
  };

  match apply_action(state, session, action) {
    Ok(answer) => ServerWsMessage::Quiz { answer, session: session.snapshot() },
    Err(e) => ServerWsMessage::Error { code: e.code().into(), message: e.to_string() },
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::ArcadeConfig;
  use crate::error::ClientInitError;
  use serde_json::Value;

  fn state() -> AppState {
    AppState::from_config(ArcadeConfig::default(), Err(ClientInitError::MissingApiKey))
  }

  async fn send(json: &str, state: &AppState, session: &mut QuizSession) -> Value {
    let msg: ClientWsMessage = serde_json::from_str(json).unwrap();
    serde_json::to_value(handle_client_ws(msg, state, session).await).unwrap()
  }

  #[tokio::test]
  async fn quiz_messages_drive_the_connection_session() {
    let state = state();
    let mut session = state.new_session();

    let early = send(r#"{"type":"submit_answer","choice":0}"#, &state, &mut session).await;
    assert_eq!(early["type"], "error");
    assert_eq!(early["code"], "invalid_state");

    let started = send(r#"{"type":"start_quiz"}"#, &state, &mut session).await;
    assert_eq!(started["type"], "quiz");
    assert_eq!(started["session"]["phase"], "presented");

    let correct = state.questions[0].correct;
    let answered = send(&format!(r#"{{"type":"submit_answer","choice":{}}}"#, correct), &state, &mut session).await;
    assert_eq!(answered["answer"]["correct"], true);
    assert_eq!(answered["session"]["score"], state.questions[0].points);

    let broke = send(r#"{"type":"purchase","itemId":"pep8_crown"}"#, &state, &mut session).await;
    assert_eq!(broke["code"], "insufficient_funds");

    let bought = send(r#"{"type":"purchase","itemId":"snake_badge"}"#, &state, &mut session).await;
    assert_eq!(bought["session"]["selectedCosmetic"], "snake_badge");
    assert_eq!(bought["session"]["badges"][0], "monster_collector");

    let not_owned = send(r#"{"type":"select_cosmetic","itemId":"golden_theme"}"#, &state, &mut session).await;
    assert_eq!(not_owned["code"], "cosmetic_not_owned");

    let no_hint = send(r#"{"type":"use_hint"}"#, &state, &mut session).await;
    assert_eq!(no_hint["code"], "invalid_state");
    let advanced = send(r#"{"type":"advance"}"#, &state, &mut session).await;
    assert_eq!(advanced["session"]["phase"], "presented");
    let no_skip = send(r#"{"type":"skip"}"#, &state, &mut session).await;
    assert_eq!(no_skip["code"], "power_up_not_owned");
  }

  #[tokio::test]
  async fn start_quiz_can_sample_a_shorter_game() {
    let state = state();
    let mut session = state.new_session();
    let started = send(r#"{"type":"start_quiz","questions":4}"#, &state, &mut session).await;
    assert_eq!(started["session"]["totalQuestions"], 4);
    assert!(started["session"]["question"]["choices"].is_array());
  }

  #[tokio::test]
  async fn evaluate_without_code_reports_empty_input() {
    let state = state();
    let mut session = state.new_session();
    let reply = send(r#"{"type":"evaluate","code":"  "}"#, &state, &mut session).await;
    assert_eq!(reply["type"], "error");
    assert_eq!(reply["code"], "empty_input");

    let pong = send(r#"{"type":"ping"}"#, &state, &mut session).await;
    assert_eq!(pong["type"], "pong");
  }
}
