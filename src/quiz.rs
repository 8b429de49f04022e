//! Quiz state machine: one `QuizSession` per player.
//!
//! Phases:
//!   NotStarted -> Presented -> FeedbackShown -> (Presented | Completed)
//!   Presented --skip--> (Presented | Completed)
//!
//! A game plays either the whole bank in order or a random sample of it.
//! The session owns its score, streak, power-ups, cosmetics and badges. It never
//! talks to the outside world; transports hold it and call into it.

use std::{fmt, sync::Arc};

use rand::{seq::{index, SliceRandom}, Rng};
use serde::Serialize;

use crate::domain::{Badge, ItemKind, OwnedPowerUp, PowerUpEffect, Question, QuizRules, ShopItem};
use crate::error::QuizError;

const APPRENTICE_CORRECT: u32 = 5;
const PRO_CORRECT: u32 = 7;
const STREAK_MASTER: u32 = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
  NotStarted,
  Presented,
  FeedbackShown,
  Completed,
}

impl fmt::Display for Phase {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      Phase::NotStarted => "not started",
      Phase::Presented => "waiting for an answer",
      Phase::FeedbackShown => "showing feedback",
      Phase::Completed => "completed",
    };
    f.write_str(s)
  }
}

/// Result of a submitted answer, rendered as feedback.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AnswerOutcome {
  pub correct: bool,
  pub correct_choice: usize,
  pub points_awarded: u32,
  /// Factor of the multiplier consumed by this answer, if any.
  pub multiplier: Option<u32>,
  /// Part of `points_awarded` that came from the streak.
  pub streak_bonus: u32,
  pub streak: u32,
  pub feedback: String,
  pub score: u32,
  pub last_question: bool,
}

/// Question as shown to the player (no answer key).
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct QuestionView {
  pub id: String,
  pub prompt: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub code: Option<String>,
  pub choices: Vec<String>,
  pub points: u32,
  /// Only present once a hint was used on this question.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub topic: Option<String>,
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
  pub phase: Phase,
  pub question_index: usize,
  pub total_questions: usize,
  pub score: u32,
  pub correct_answers: u32,
  pub streak: u32,
  pub best_streak: u32,
  pub question: Option<QuestionView>,
  pub hidden_choices: Vec<usize>,
  pub power_ups: Vec<OwnedPowerUp>,
  pub cosmetics: Vec<String>,
  pub selected_cosmetic: Option<String>,
  pub badges: Vec<Badge>,
}

#[derive(Clone, Debug)]
pub struct QuizSession {
  questions: Arc<[Question]>,
  rules: QuizRules,
  // Bank indices played this game, in play order.
  order: Vec<usize>,
  phase: Phase,
  index: usize,
  score: u32,
  correct_answers: u32,
  streak: u32,
  best_streak: u32,
  hints_used: u32,
  fifty_used: bool,
  power_ups: Vec<OwnedPowerUp>,
  cosmetics: Vec<String>,
  selected_cosmetic: Option<String>,
  badges: Vec<Badge>,
  // Per-question power-up state, cleared when the question changes.
  hidden: Vec<usize>,
  hinted: bool,
}

impl QuizSession {
  pub fn new(questions: Arc<[Question]>, rules: QuizRules) -> Self {
    Self {
      questions,
      rules,
      order: Vec::new(),
      phase: Phase::NotStarted,
      index: 0,
      score: 0,
      correct_answers: 0,
      streak: 0,
      best_streak: 0,
      hints_used: 0,
      fifty_used: false,
      power_ups: Vec::new(),
      cosmetics: Vec::new(),
      selected_cosmetic: None,
      badges: Vec::new(),
      hidden: Vec::new(),
      hinted: false,
    }
  }

  pub fn phase(&self) -> Phase { self.phase }
  pub fn score(&self) -> u32 { self.score }
  pub fn index(&self) -> usize { self.index }
  pub fn total(&self) -> usize { self.order.len() }
  pub fn streak(&self) -> u32 { self.streak }
  pub fn power_ups(&self) -> &[OwnedPowerUp] { &self.power_ups }
  pub fn cosmetics(&self) -> &[String] { &self.cosmetics }
  pub fn badges(&self) -> &[Badge] { &self.badges }

  /// Reset everything and present the first question of the whole bank, in order.
  pub fn start(&mut self) {
    let order = (0..self.questions.len()).collect();
    self.begin(order);
  }

  /// Like `start`, but plays `count` questions drawn at random from the bank.
  /// `count` is clamped to the configured bounds and to the bank size.
  /// Returns the number of questions in the game.
  pub fn start_sampled<R: Rng + ?Sized>(&mut self, count: usize, rng: &mut R) -> usize {
    let wanted = count.clamp(self.rules.min_questions, self.rules.max_questions.max(self.rules.min_questions));
    let n = wanted.min(self.questions.len());
    let order = index::sample(rng, self.questions.len(), n).into_vec();
    self.begin(order);
    n
  }

  fn begin(&mut self, order: Vec<usize>) {
    self.order = order;
    self.index = 0;
    self.score = 0;
    self.correct_answers = 0;
    self.streak = 0;
    self.best_streak = 0;
    self.hints_used = 0;
    self.fifty_used = false;
    self.power_ups.clear();
    self.cosmetics.clear();
    self.selected_cosmetic = None;
    self.badges.clear();
    self.hidden.clear();
    self.hinted = false;
    self.phase = Phase::Presented;
    if self.order.is_empty() {
      self.finish();
    }
  }

  pub fn submit_answer(&mut self, choice: usize) -> Result<AnswerOutcome, QuizError> {
    self.expect_phase(Phase::Presented, "submit an answer")?;
    let questions = Arc::clone(&self.questions);
    let q = &questions[self.order[self.index]];
    if choice >= q.choices.len() {
      return Err(QuizError::InvalidChoice { choice, available: q.choices.len() });
    }

    let correct = choice == q.correct;
    let mut multiplier = None;
    let mut streak_bonus = 0;
    let mut points_awarded = 0;
    if correct {
      self.correct_answers += 1;
      self.streak += 1;
      self.best_streak = self.best_streak.max(self.streak);
      multiplier = self.consume_multiplier();
      streak_bonus = self.streak.min(self.rules.max_streak_bonus);
      points_awarded = q.points.saturating_mul(multiplier.unwrap_or(1)).saturating_add(streak_bonus);
      self.score = self.score.saturating_add(points_awarded);
    } else {
      self.streak = 0;
    }
    self.phase = Phase::FeedbackShown;

    Ok(AnswerOutcome {
      correct,
      correct_choice: q.correct,
      points_awarded,
      multiplier,
      streak_bonus,
      streak: self.streak,
      feedback: q.feedback.clone(),
      score: self.score,
      last_question: self.index + 1 == self.order.len(),
    })
  }

  pub fn advance(&mut self) -> Result<Phase, QuizError> {
    self.expect_phase(Phase::FeedbackShown, "advance")?;
    Ok(self.next_question())
  }

  /// Buy an item with points. Returns the remaining balance.
  /// The first cosmetic bought is also selected.
  pub fn purchase(&mut self, item: &ShopItem) -> Result<u32, QuizError> {
    if matches!(item.kind, ItemKind::Cosmetic) && self.cosmetics.contains(&item.id) {
      return Err(QuizError::AlreadyOwned(item.id.clone()));
    }
    if item.cost > self.score {
      return Err(QuizError::InsufficientFunds { cost: item.cost, balance: self.score });
    }
    self.score -= item.cost;

    match &item.kind {
      ItemKind::Cosmetic => {
        self.cosmetics.push(item.id.clone());
        self.selected_cosmetic = Some(item.id.clone());
        self.award(Badge::MonsterCollector);
      }
      ItemKind::PowerUp { effect, uses } => {
        match self.power_ups.iter_mut().find(|p| p.item_id == item.id) {
          Some(owned) => owned.remaining_uses = owned.remaining_uses.saturating_add(*uses),
          None => self.power_ups.push(OwnedPowerUp {
            item_id: item.id.clone(),
            name: item.name.clone(),
            effect: *effect,
            remaining_uses: *uses,
          }),
        }
      }
    }
    Ok(self.score)
  }

  /// Show an owned cosmetic. Valid in any phase.
  pub fn select_cosmetic(&mut self, id: &str) -> Result<(), QuizError> {
    if !self.cosmetics.iter().any(|c| c == id) {
      return Err(QuizError::CosmeticNotOwned(id.to_string()));
    }
    self.selected_cosmetic = Some(id.to_string());
    Ok(())
  }

  /// Hide up to two wrong choices of the current question.
  /// Calling it again on the same question returns the same choices for free.
  pub fn use_fifty_fifty<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<Vec<usize>, QuizError> {
    self.expect_phase(Phase::Presented, "use fifty-fifty")?;
    if !self.hidden.is_empty() {
      return Ok(self.hidden.clone());
    }
    let pos = self.owned(PowerUpEffect::FiftyFifty)?;

    let q = &self.questions[self.order[self.index]];
    let wrong: Vec<usize> = (0..q.choices.len()).filter(|&i| i != q.correct).collect();
    let mut hidden: Vec<usize> = wrong.choose_multiple(rng, 2).copied().collect();
    hidden.sort_unstable();

    self.spend_use(pos);
    self.fifty_used = true;
    self.hidden = hidden.clone();
    Ok(hidden)
  }

  /// Reveal the topic of the current question. Free on repeat for the same question.
  pub fn use_hint(&mut self) -> Result<String, QuizError> {
    self.expect_phase(Phase::Presented, "use a hint")?;
    if !self.hinted {
      let pos = self.owned(PowerUpEffect::Hint)?;
      self.spend_use(pos);
      self.hints_used += 1;
      self.hinted = true;
    }
    Ok(self.questions[self.order[self.index]].topic.clone())
  }

  /// Leave the current question unanswered: no points, streak reset.
  pub fn skip(&mut self) -> Result<Phase, QuizError> {
    self.expect_phase(Phase::Presented, "skip")?;
    let pos = self.owned(PowerUpEffect::Skip)?;
    self.spend_use(pos);
    self.streak = 0;
    Ok(self.next_question())
  }

  pub fn snapshot(&self) -> SessionSnapshot {
    let question = match self.phase {
      Phase::Presented | Phase::FeedbackShown => self.order.get(self.index).map(|&i| {
        let q = &self.questions[i];
        QuestionView {
          id: q.id.clone(),
          prompt: q.prompt.clone(),
          code: q.code.clone(),
          choices: q.choices.clone(),
          points: q.points,
          topic: self.hinted.then(|| q.topic.clone()),
        }
      }),
      _ => None,
    };
    SessionSnapshot {
      phase: self.phase,
      question_index: self.index,
      total_questions: self.order.len(),
      score: self.score,
      correct_answers: self.correct_answers,
      streak: self.streak,
      best_streak: self.best_streak,
      question,
      hidden_choices: self.hidden.clone(),
      power_ups: self.power_ups.clone(),
      cosmetics: self.cosmetics.clone(),
      selected_cosmetic: self.selected_cosmetic.clone(),
      badges: self.badges.clone(),
    }
  }

  fn expect_phase(&self, want: Phase, op: &'static str) -> Result<(), QuizError> {
    if self.phase == want { Ok(()) } else { Err(QuizError::InvalidState { op, phase: self.phase }) }
  }

  fn next_question(&mut self) -> Phase {
    self.index += 1;
    self.hidden.clear();
    self.hinted = false;
    if self.index < self.order.len() {
      self.phase = Phase::Presented;
    } else {
      self.finish();
    }
    self.phase
  }

  fn finish(&mut self) {
    self.phase = Phase::Completed;
    if self.correct_answers >= APPRENTICE_CORRECT {
      self.award(Badge::PepApprentice);
    }
    if self.correct_answers >= PRO_CORRECT {
      self.award(Badge::PepPro);
    }
    if self.best_streak >= STREAK_MASTER {
      self.award(Badge::StreakMaster);
    }
    if self.hints_used == 0 && !self.order.is_empty() {
      self.award(Badge::NoHintHero);
    }
    if self.fifty_used {
      self.award(Badge::FiftyFiftyUser);
    }
  }

  fn award(&mut self, badge: Badge) {
    if !self.badges.contains(&badge) {
      self.badges.push(badge);
      self.badges.sort_unstable();
    }
  }

  fn owned(&self, effect: PowerUpEffect) -> Result<usize, QuizError> {
    self.power_ups
      .iter()
      .position(|p| p.effect == effect)
      .ok_or(QuizError::PowerUpNotOwned(effect.name()))
  }

  fn consume_multiplier(&mut self) -> Option<u32> {
    let (pos, factor) = self.power_ups.iter().enumerate().find_map(|(i, p)| match p.effect {
      PowerUpEffect::ScoreMultiplier { factor } => Some((i, factor)),
      _ => None,
    })?;
    self.spend_use(pos);
    Some(factor)
  }

  fn spend_use(&mut self, pos: usize) {
    let p = &mut self.power_ups[pos];
    p.remaining_uses = p.remaining_uses.saturating_sub(1);
    if p.remaining_uses == 0 {
      self.power_ups.remove(pos);
    }
  }
}
