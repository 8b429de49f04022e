//! Domain models: quiz questions, game rules, shop catalog, power-up effects, badges,
//! guideline sections, and the evaluation result returned by the code checker.

use serde::{Deserialize, Serialize};

/// One multiple-choice question from the bank. Immutable once loaded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Question {
  pub id: String,
  pub prompt: String,
  /// Optional Python snippet shown under the prompt.
  pub code: Option<String>,
  pub choices: Vec<String>,
  pub correct: usize,
  /// Shown after the answer is submitted, right or wrong.
  pub feedback: String,
  /// Revealed by the hint power-up.
  pub topic: String,
  pub points: u32,
}

/// Tunable game rules. Loaded from the `[rules]` TOML section.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct QuizRules {
  /// Bounds for the per-game question count a player may ask for.
  pub min_questions: usize,
  pub max_questions: usize,
  /// Cap on the extra points for a correct-answer streak. 0 disables streak bonuses.
  pub max_streak_bonus: u32,
}

impl Default for QuizRules {
  fn default() -> Self {
    Self { min_questions: 3, max_questions: 10, max_streak_bonus: 0 }
  }
}

/// What a power-up does while it has uses left.
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PowerUpEffect {
  /// Multiply the points of a correct answer.
  ScoreMultiplier { factor: u32 },
  /// Hide two wrong choices of the current question.
  FiftyFifty,
  /// Reveal the topic of the current question.
  Hint,
  /// Move past the current question without scoring. Breaks the streak.
  Skip,
}

impl PowerUpEffect {
  pub fn name(&self) -> &'static str {
    match self {
      PowerUpEffect::ScoreMultiplier { .. } => "score_multiplier",
      PowerUpEffect::FiftyFifty => "fifty_fifty",
      PowerUpEffect::Hint => "hint",
      PowerUpEffect::Skip => "skip",
    }
  }
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ItemKind {
  Cosmetic,
  PowerUp { effect: PowerUpEffect, uses: u32 },
}

/// Shop catalog entry. Prices and effects are configuration data.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct ShopItem {
  pub id: String,
  pub name: String,
  pub cost: u32,
  #[serde(flatten)]
  pub kind: ItemKind,
}

/// A power-up held by a session.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OwnedPowerUp {
  pub item_id: String,
  pub name: String,
  pub effect: PowerUpEffect,
  pub remaining_uses: u32,
}

/// Awarded at the end of a game (and on the first cosmetic purchase).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Badge {
  PepApprentice,
  PepPro,
  StreakMaster,
  NoHintHero,
  FiftyFiftyUser,
  MonsterCollector,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GuidelineSection {
  pub title: String,
  pub summary: String,
  #[serde(default)] pub rules: Vec<String>,
  #[serde(default)] pub good_example: String,
  #[serde(default)] pub bad_example: String,
}

/// Parsed reply of the code checker. Only lives for one request.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct EvaluationResult {
  pub score: u8,
  pub observations: Vec<String>,
  pub issues: Vec<String>,
  pub recommendations: Vec<String>,
}

impl EvaluationResult {
  pub fn quality(&self) -> QualityLevel { QualityLevel::from_score(self.score) }
}

/// Traffic-light band for an evaluation score.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityLevel {
  Poor,
  BelowAverage,
  Acceptable,
  Good,
  Excellent,
}

impl QualityLevel {
  pub fn from_score(score: u8) -> Self {
    match score {
      0..=39 => QualityLevel::Poor,
      40..=59 => QualityLevel::BelowAverage,
      60..=79 => QualityLevel::Acceptable,
      80..=89 => QualityLevel::Good,
      _ => QualityLevel::Excellent,
    }
  }

  pub fn label(&self) -> &'static str {
    match self {
      QualityLevel::Poor => "Poor",
      QualityLevel::BelowAverage => "Below average",
      QualityLevel::Acceptable => "Acceptable",
      QualityLevel::Good => "Good",
      QualityLevel::Excellent => "Excellent",
    }
  }

  pub fn description(&self) -> &'static str {
    match self {
      QualityLevel::Poor => "Code quality is poor. Serious refactoring is strongly recommended before using this code.",
      QualityLevel::BelowAverage => "Code is usable but has significant weaknesses. It should be improved to meet common best practices.",
      QualityLevel::Acceptable => "Code follows some best practices, but there is still clear potential for improvement.",
      QualityLevel::Good => "Code follows most relevant best practices with only minor improvement opportunities.",
      QualityLevel::Excellent => "Code is clear, well-structured and close to what an experienced engineer would write.",
    }
  }

  /// Hex color for the traffic light.
  pub fn color(&self) -> &'static str {
    match self {
      QualityLevel::Poor => "#c0392b",
      QualityLevel::BelowAverage => "#e67e22",
      QualityLevel::Acceptable => "#f1c40f",
      QualityLevel::Good => "#27ae60",
      QualityLevel::Excellent => "#2ecc71",
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn quality_bands_follow_score_thresholds() {
    assert_eq!(QualityLevel::from_score(0), QualityLevel::Poor);
    assert_eq!(QualityLevel::from_score(39), QualityLevel::Poor);
    assert_eq!(QualityLevel::from_score(40), QualityLevel::BelowAverage);
    assert_eq!(QualityLevel::from_score(79), QualityLevel::Acceptable);
    assert_eq!(QualityLevel::from_score(85).label(), "Good");
    assert_eq!(QualityLevel::from_score(90), QualityLevel::Excellent);
    assert_eq!(QualityLevel::from_score(100).color(), "#2ecc71");
  }
}
