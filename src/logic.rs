//! Core behaviors shared by both HTTP and WebSocket handlers.
//!
//! Transports decide where the session lives (store vs. connection); this module
//! decides what a quiz action does to it and logs the outcome.

use rand::thread_rng;
use tracing::{info, instrument, warn};

use crate::error::QuizError;
use crate::quiz::{AnswerOutcome, Phase, QuizSession};
use crate::state::AppState;

#[derive(Debug, Clone)]
pub enum QuizAction {
  /// Full bank in order, or a random sample of the given size.
  Start(Option<usize>),
  Answer(usize),
  Advance,
  Purchase(String),
  SelectCosmetic(String),
  FiftyFifty,
  Hint,
  Skip,
  Inspect,
}

impl QuizAction {
  fn name(&self) -> &'static str {
    match self {
      QuizAction::Start(_) => "start",
      QuizAction::Answer(_) => "answer",
      QuizAction::Advance => "advance",
      QuizAction::Purchase(_) => "purchase",
      QuizAction::SelectCosmetic(_) => "select_cosmetic",
      QuizAction::FiftyFifty => "fifty_fifty",
      QuizAction::Hint => "hint",
      QuizAction::Skip => "skip",
      QuizAction::Inspect => "inspect",
    }
  }
}

/// Apply one action to a session. On error the session is unchanged.
/// Returns answer feedback for `Answer`, `None` otherwise.
#[instrument(level = "debug", skip(state, session, action), fields(action = action.name()))]
pub fn apply_action(
  state: &AppState,
  session: &mut QuizSession,
  action: QuizAction,
) -> Result<Option<AnswerOutcome>, QuizError> {
  let result = match &action {
    QuizAction::Start(count) => {
      match count {
        Some(n) => {
          session.start_sampled(*n, &mut thread_rng());
        }
        None => session.start(),
      }
      info!(target: "quiz", requested = ?count, total = session.total(), bank = state.questions.len(), "Quiz started");
      Ok(None)
    }
    QuizAction::Answer(choice) => session.submit_answer(*choice).map(|out| {
      info!(target: "quiz", index = session.index(), correct = out.correct, points = out.points_awarded, multiplier = ?out.multiplier, streak = out.streak, score = out.score, "Answer submitted");
      Some(out)
    }),
    QuizAction::Advance => session.advance().map(|phase| {
      info!(target: "quiz", index = session.index(), %phase, score = session.score(), "Advanced");
      log_badges(session);
      None
    }),
    QuizAction::Purchase(item_id) => match state.find_item(item_id) {
      None => Err(QuizError::UnknownItem(item_id.clone())),
      Some(item) => session.purchase(item).map(|balance| {
        info!(target: "quiz", item = %item.id, cost = item.cost, balance, "Item purchased");
        None
      }),
    },
    QuizAction::SelectCosmetic(id) => session.select_cosmetic(id).map(|()| {
      info!(target: "quiz", cosmetic = %id, "Cosmetic selected");
      None
    }),
    QuizAction::FiftyFifty => session.use_fifty_fifty(&mut thread_rng()).map(|hidden| {
      info!(target: "quiz", index = session.index(), ?hidden, "Fifty-fifty used");
      None
    }),
    QuizAction::Hint => session.use_hint().map(|topic| {
      info!(target: "quiz", index = session.index(), %topic, "Hint used");
      None
    }),
    QuizAction::Skip => session.skip().map(|phase| {
      info!(target: "quiz", index = session.index(), %phase, "Question skipped");
      log_badges(session);
      None
    }),
    QuizAction::Inspect => Ok(None),
  };

  if let Err(e) = &result {
    warn!(target: "quiz", action = action.name(), code = e.code(), error = %e, "Quiz action rejected");
  }
  result
}

fn log_badges(session: &QuizSession) {
  if session.phase() == Phase::Completed {
    info!(target: "quiz", score = session.score(), badges = ?session.badges(), "Quiz completed");
  }
}
