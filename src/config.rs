//! Loading arcade configuration (prompts, question bank, shop, guidelines, game
//! rules, session limits) from TOML.
//!
//! Everything is optional: missing sections fall back to the built-in content in
//! `seeds`. Bank and shop entries that make no sense are skipped with an error log.

use serde::Deserialize;
use tracing::{error, info};

use crate::domain::{GuidelineSection, ItemKind, PowerUpEffect, Question, QuizRules, ShopItem};

#[derive(Clone, Debug, Deserialize, Default)]
pub struct ArcadeConfig {
  #[serde(default)]
  pub prompts: Prompts,
  #[serde(default)]
  pub questions: Vec<QuestionCfg>,
  #[serde(default)]
  pub shop: Vec<ShopItemCfg>,
  #[serde(default)]
  pub guidelines: Vec<GuidelineSection>,
  #[serde(default)]
  pub rules: QuizRules,
  #[serde(default)]
  pub sessions: SessionLimits,
}

/// Bounds on the HTTP session store.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SessionLimits {
  /// Sessions untouched for this long are dropped.
  pub idle_ttl_secs: u64,
  /// When full, creating a session evicts the least recently used one.
  pub max_sessions: usize,
}

impl Default for SessionLimits {
  fn default() -> Self {
    Self { idle_ttl_secs: 30 * 60, max_sessions: 10_000 }
  }
}

/// Question entry accepted in TOML configuration.
#[derive(Clone, Debug, Deserialize)]
pub struct QuestionCfg {
  #[serde(default)] pub id: Option<String>,
  pub prompt: String,
  #[serde(default)] pub code: Option<String>,
  pub choices: Vec<String>,
  pub correct: usize,
  #[serde(default)] pub feedback: String,
  #[serde(default)] pub topic: String,
  #[serde(default = "default_points")] pub points: u32,
}

fn default_points() -> u32 { 10 }

/// Shop entry accepted in TOML configuration.
/// `kind` is one of "cosmetic", "score_multiplier", "fifty_fifty", "hint", "skip".
#[derive(Clone, Debug, Deserialize)]
pub struct ShopItemCfg {
  pub id: String,
  pub name: String,
  pub cost: u32,
  pub kind: String,
  #[serde(default)] pub factor: Option<u32>,
  #[serde(default)] pub uses: Option<u32>,
}

/// Prompts used by the code checker. Override them in TOML to tune the rubric wording.
#[derive(Clone, Debug, Deserialize)]
pub struct Prompts {
  pub evaluate_system: String,
  pub evaluate_user_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      evaluate_system: "You are a strict Python code reviewer focused on PEP 8 and general code quality. Respond ONLY with strict JSON.".into(),
      evaluate_user_template: "Review the Python code below. Judge it on:\n\
        1. Readability\n\
        2. Structure and organization\n\
        3. Naming of variables, functions and classes\n\
        4. Documentation (comments and docstrings)\n\
        5. PEP 8 adherence\n\n\
        Return JSON {\"score\": integer 0-100, \"observations\": [string], \"issues\": [string], \"recommendations\": [string]}.\n\
        'observations' lists what the code does well, 'issues' lists concrete problems, 'recommendations' lists fixes. Keep each item to one sentence.\n\n\
        Code:\n```python\n{code}\n```".into(),
    }
  }
}

impl QuestionCfg {
  /// Validate and convert into a bank question. `fallback_id` is used when no id is set.
  pub fn into_question(self, fallback_id: String) -> Option<Question> {
    let id = self.id.unwrap_or(fallback_id);
    if self.choices.len() < 2 {
      error!(target: "arcade", %id, "Skipping question: needs at least two choices.");
      return None;
    }
    if self.correct >= self.choices.len() {
      error!(target: "arcade", %id, correct = self.correct, choices = self.choices.len(), "Skipping question: correct index out of range.");
      return None;
    }
    if self.points == 0 {
      error!(target: "arcade", %id, "Skipping question: zero points.");
      return None;
    }
    Some(Question {
      id,
      prompt: self.prompt,
      code: self.code.filter(|c| !c.trim().is_empty()),
      choices: self.choices,
      correct: self.correct,
      feedback: self.feedback,
      topic: self.topic,
      points: self.points,
    })
  }
}

impl ShopItemCfg {
  pub fn into_item(self) -> Option<ShopItem> {
    let kind = match self.kind.as_str() {
      "cosmetic" => ItemKind::Cosmetic,
      "score_multiplier" => {
        let factor = self.factor.unwrap_or(2);
        if factor < 2 {
          error!(target: "arcade", id = %self.id, factor, "Skipping shop item: multiplier factor must be at least 2.");
          return None;
        }
        ItemKind::PowerUp { effect: PowerUpEffect::ScoreMultiplier { factor }, uses: self.uses.unwrap_or(1) }
      }
      "fifty_fifty" => ItemKind::PowerUp { effect: PowerUpEffect::FiftyFifty, uses: self.uses.unwrap_or(1) },
      "hint" => ItemKind::PowerUp { effect: PowerUpEffect::Hint, uses: self.uses.unwrap_or(1) },
      "skip" => ItemKind::PowerUp { effect: PowerUpEffect::Skip, uses: self.uses.unwrap_or(1) },
      other => {
        error!(target: "arcade", id = %self.id, kind = %other, "Skipping shop item: unknown kind.");
        return None;
      }
    };
    if let ItemKind::PowerUp { uses: 0, .. } = kind {
      error!(target: "arcade", id = %self.id, "Skipping shop item: power-up with zero uses.");
      return None;
    }
    Some(ShopItem { id: self.id, name: self.name, cost: self.cost, kind })
  }
}

/// Attempt to load `ArcadeConfig` from ARCADE_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_arcade_config_from_env() -> Option<ArcadeConfig> {
  let path = std::env::var("ARCADE_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<ArcadeConfig>(&s) {
      Ok(cfg) => {
        info!(target: "arcade", %path, "Loaded arcade config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "arcade", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "arcade", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const SAMPLE: &str = r#"
[prompts]
evaluate_system = "sys"
evaluate_user_template = "Review: {code}"

[rules]
max_questions = 5
max_streak_bonus = 3

[sessions]
max_sessions = 50

[[questions]]
prompt = "Max line length?"
choices = ["79", "120"]
correct = 0
topic = "Line length"

[[questions]]
id = "broken"
prompt = "Bad index"
choices = ["a", "b"]
correct = 5

[[shop]]
id = "triple"
name = "Triple"
cost = 40
kind = "score_multiplier"
factor = 3
uses = 2

[[shop]]
id = "hint"
name = "Hint"
cost = 3
kind = "hint"

[[shop]]
id = "mystery"
name = "Mystery"
cost = 1
kind = "teleport"
"#;

  #[test]
  fn parses_sections_and_drops_invalid_entries() {
    let cfg: ArcadeConfig = toml::from_str(SAMPLE).unwrap();
    assert_eq!(cfg.prompts.evaluate_user_template, "Review: {code}");
    assert_eq!(cfg.rules, QuizRules { min_questions: 3, max_questions: 5, max_streak_bonus: 3 });
    assert_eq!(cfg.sessions, SessionLimits { idle_ttl_secs: 1800, max_sessions: 50 });

    let questions: Vec<Question> = cfg
      .questions
      .into_iter()
      .enumerate()
      .filter_map(|(i, q)| q.into_question(format!("cfg{i}")))
      .collect();
    assert_eq!(questions.len(), 1);
    assert_eq!(questions[0].id, "cfg0");
    assert_eq!(questions[0].points, 10);
    assert_eq!(questions[0].topic, "Line length");
    assert_eq!(questions[0].code, None);

    let shop: Vec<ShopItem> = cfg.shop.into_iter().filter_map(ShopItemCfg::into_item).collect();
    assert_eq!(shop.len(), 2);
    assert_eq!(
      shop[0].kind,
      ItemKind::PowerUp { effect: PowerUpEffect::ScoreMultiplier { factor: 3 }, uses: 2 }
    );
    assert_eq!(shop[1].kind, ItemKind::PowerUp { effect: PowerUpEffect::Hint, uses: 1 });
  }

  #[test]
  fn empty_file_uses_default_prompts() {
    let cfg: ArcadeConfig = toml::from_str("").unwrap();
    assert!(cfg.prompts.evaluate_user_template.contains("{code}"));
    assert!(cfg.questions.is_empty());
    assert_eq!(cfg.rules, QuizRules::default());
    assert_eq!(cfg.sessions, SessionLimits::default());
  }
}
