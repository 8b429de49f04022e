//! Error kinds for the quiz and the code checker.
//!
//! Every variant is recoverable and scoped to a single interaction: the failed
//! operation leaves the session (or the request) exactly as it was.

use crate::quiz::Phase;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QuizError {
  #[error("cannot {op} while the quiz is {phase}")]
  InvalidState { op: &'static str, phase: Phase },

  #[error("choice {choice} is out of range (question has {available} choices)")]
  InvalidChoice { choice: usize, available: usize },

  #[error("not enough points: item costs {cost}, balance is {balance}")]
  InsufficientFunds { cost: u32, balance: u32 },

  #[error("unknown shop item '{0}'")]
  UnknownItem(String),

  #[error("cosmetic '{0}' is already owned")]
  AlreadyOwned(String),

  #[error("no {0} power-up available")]
  PowerUpNotOwned(&'static str),

  #[error("cosmetic '{0}' is not owned")]
  CosmeticNotOwned(String),
}

impl QuizError {
  /// Stable snake_case code sent to clients next to the message.
  pub fn code(&self) -> &'static str {
    match self {
      QuizError::InvalidState { .. } => "invalid_state",
      QuizError::InvalidChoice { .. } => "invalid_choice",
      QuizError::InsufficientFunds { .. } => "insufficient_funds",
      QuizError::UnknownItem(_) => "unknown_item",
      QuizError::AlreadyOwned(_) => "already_owned",
      QuizError::PowerUpNotOwned(_) => "power_up_not_owned",
      QuizError::CosmeticNotOwned(_) => "cosmetic_not_owned",
    }
  }
}

#[derive(Debug, thiserror::Error)]
pub enum EvaluateError {
  #[error("no code submitted")]
  EmptyInput,

  #[error("code checker is unavailable: {0}")]
  Upstream(String),

  #[error("code checker returned an unreadable reply: {0}")]
  MalformedResponse(String),
}

impl EvaluateError {
  pub fn code(&self) -> &'static str {
    match self {
      EvaluateError::EmptyInput => "empty_input",
      EvaluateError::Upstream(_) => "upstream",
      EvaluateError::MalformedResponse(_) => "malformed_response",
    }
  }
}

/// Why the completion client is unavailable. Reported on every evaluation until fixed.
#[derive(Debug, thiserror::Error)]
pub enum ClientInitError {
  #[error("no API key configured (set OPENAI_API_KEY)")]
  MissingApiKey,

  #[error("HTTP client could not be built: {0}")]
  Client(#[from] reqwest::Error),
}
