//! Application state: static content, the code checker, and the quiz session store.
//!
//! This module owns:
//!   - the question bank, shop catalog and guideline sections (from TOML or defaults)
//!   - the evaluator (with an OpenAI client when OPENAI_API_KEY is set)
//!   - quiz sessions by id; each session is isolated and lives until ended, idle past
//!     the TTL, or evicted as least recently used when the store is full

use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::{sync::RwLock, time::Instant};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::config::{load_arcade_config_from_env, ArcadeConfig, SessionLimits};
use crate::domain::{GuidelineSection, Question, QuizRules, ShopItem};
use crate::error::ClientInitError;
use crate::evaluator::Evaluator;
use crate::openai::OpenAI;
use crate::quiz::{QuizSession, SessionSnapshot};
use crate::seeds::{seed_guidelines, seed_questions, seed_shop};

#[derive(Clone)]
pub struct AppState {
    pub questions: Arc<[Question]>,
    pub shop: Arc<[ShopItem]>,
    pub guidelines: Arc<[GuidelineSection]>,
    pub evaluator: Evaluator,
    pub rules: QuizRules,
    limits: SessionLimits,
    sessions: Arc<RwLock<HashMap<String, SessionEntry>>>,
}

struct SessionEntry {
    session: QuizSession,
    last_seen: Instant,
}

impl AppState {
    /// Build state from env: load config, fall back to built-in content, init OpenAI.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Self {
        let cfg = load_arcade_config_from_env().unwrap_or_default();
        let openai = OpenAI::from_env();
        match &openai {
            Ok(oa) => info!(target: "arcade", base_url = %oa.base_url, model = %oa.model, "OpenAI enabled."),
            Err(ClientInitError::MissingApiKey) => {
                warn!(target: "arcade", "OpenAI disabled (no OPENAI_API_KEY). Code checks will fail until it is set.")
            }
            Err(e) => error!(target: "arcade", error = %e, "OpenAI disabled. Code checks will fail."),
        }
        Self::from_config(cfg, openai)
    }

    /// Build state from an already-loaded config. Empty sections use built-in content.
    pub fn from_config(cfg: ArcadeConfig, openai: Result<OpenAI, ClientInitError>) -> Self {
        let mut questions: Vec<Question> = cfg
            .questions
            .into_iter()
            .enumerate()
            .filter_map(|(i, q)| q.into_question(format!("cfg{}", i + 1)))
            .collect();
        if questions.is_empty() {
            questions = seed_questions();
        }

        let mut shop: Vec<ShopItem> = Vec::new();
        for item in cfg.shop.into_iter().filter_map(|s| s.into_item()) {
            if shop.iter().any(|s| s.id == item.id) {
                warn!(target: "arcade", id = %item.id, "Skipping duplicate shop item id.");
                continue;
            }
            shop.push(item);
        }
        if shop.is_empty() {
            shop = seed_shop();
        }

        let guidelines = if cfg.guidelines.is_empty() { seed_guidelines() } else { cfg.guidelines };

        info!(
            target: "arcade",
            questions = questions.len(),
            total_points = questions.iter().map(|q| q.points).sum::<u32>(),
            shop_items = shop.len(),
            guideline_sections = guidelines.len(),
            max_sessions = cfg.sessions.max_sessions,
            session_ttl_secs = cfg.sessions.idle_ttl_secs,
            "Startup content inventory"
        );

        Self {
            questions: questions.into(),
            shop: shop.into(),
            guidelines: guidelines.into(),
            evaluator: Evaluator::new(openai, cfg.prompts),
            rules: cfg.rules,
            limits: cfg.sessions,
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// A fresh, unstarted session over the shared bank. Not registered in the store.
    pub fn new_session(&self) -> QuizSession {
        QuizSession::new(Arc::clone(&self.questions), self.rules)
    }

    fn ttl(&self) -> Duration {
        Duration::from_secs(self.limits.idle_ttl_secs)
    }

    pub fn find_item(&self, id: &str) -> Option<&ShopItem> {
        self.shop.iter().find(|i| i.id == id)
    }

    /// Register a new session and return its id.
    /// Expired sessions are swept first; if the store is still full, the least
    /// recently used session is evicted.
    #[instrument(level = "debug", skip(self))]
    pub async fn create_session(&self) -> (String, SessionSnapshot) {
        let id = Uuid::new_v4().to_string();
        let session = self.new_session();
        let snapshot = session.snapshot();
        let now = Instant::now();
        let ttl = self.ttl();

        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, e| now.duration_since(e.last_seen) < ttl);
        if sessions.len() < before {
            debug!(target: "quiz", expired = before - sessions.len(), "Expired quiz sessions dropped");
        }
        while sessions.len() >= self.limits.max_sessions.max(1) {
            let Some(oldest) = sessions.iter().min_by_key(|(_, e)| e.last_seen).map(|(k, _)| k.clone()) else {
                break;
            };
            sessions.remove(&oldest);
            warn!(target: "quiz", session_id = %oldest, "Session store full; evicted least recently used session");
        }
        sessions.insert(id.clone(), SessionEntry { session, last_seen: now });
        drop(sessions);

        info!(target: "quiz", session_id = %id, "Quiz session created");
        (id, snapshot)
    }

    /// Run `f` against the session with exclusive access and mark it as used.
    /// `None` if the id is unknown or the session sat idle past the TTL.
    pub async fn with_session<T>(&self, id: &str, f: impl FnOnce(&mut QuizSession) -> T) -> Option<T> {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        let entry = sessions.get_mut(id)?;
        if now.duration_since(entry.last_seen) >= self.ttl() {
            sessions.remove(id);
            info!(target: "quiz", session_id = %id, "Quiz session expired");
            return None;
        }
        entry.last_seen = now;
        Some(f(&mut entry.session))
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    #[instrument(level = "debug", skip(self), fields(%id))]
    pub async fn end_session(&self, id: &str) -> bool {
        let removed = self.sessions.write().await.remove(id).is_some();
        if removed {
            info!(target: "quiz", session_id = %id, "Quiz session ended");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{QuestionCfg, ShopItemCfg};
    use crate::quiz::Phase;

    fn no_client() -> Result<OpenAI, ClientInitError> {
        Err(ClientInitError::MissingApiKey)
    }

    fn with_limits(idle_ttl_secs: u64, max_sessions: usize) -> AppState {
        let cfg = ArcadeConfig { sessions: SessionLimits { idle_ttl_secs, max_sessions }, ..ArcadeConfig::default() };
        AppState::from_config(cfg, no_client())
    }

    #[test]
    fn empty_config_uses_built_in_content() {
        let st = AppState::from_config(ArcadeConfig::default(), no_client());
        assert_eq!(st.questions.len(), seed_questions().len());
        assert_eq!(st.shop.len(), seed_shop().len());
        assert!(!st.guidelines.is_empty());
        assert!(!st.evaluator.is_configured());
    }

    #[test]
    fn configured_bank_and_shop_replace_defaults() {
        let cfg = ArcadeConfig {
            questions: vec![QuestionCfg {
                id: None,
                prompt: "Tabs or spaces?".into(),
                code: None,
                choices: vec!["Tabs".into(), "Spaces".into()],
                correct: 1,
                feedback: String::new(),
                topic: "Indentation".into(),
                points: 5,
            }],
            shop: vec![
                ShopItemCfg { id: "hat".into(), name: "Hat".into(), cost: 1, kind: "cosmetic".into(), factor: None, uses: None },
                ShopItemCfg { id: "hat".into(), name: "Hat again".into(), cost: 2, kind: "cosmetic".into(), factor: None, uses: None },
            ],
            ..ArcadeConfig::default()
        };
        let st = AppState::from_config(cfg, no_client());
        assert_eq!(st.questions.len(), 1);
        assert_eq!(st.questions[0].id, "cfg1");
        assert_eq!(st.shop.len(), 1);
        assert_eq!(st.find_item("hat").map(|i| i.cost), Some(1));
        assert!(st.find_item("nope").is_none());
    }

    #[tokio::test]
    async fn sessions_are_isolated() {
        let st = AppState::from_config(ArcadeConfig::default(), no_client());
        let (a, _) = st.create_session().await;
        let (b, _) = st.create_session().await;
        assert_ne!(a, b);

        st.with_session(&a, |s| {
            s.start();
            s.submit_answer(0).ok();
        })
        .await
        .unwrap();

        let phase_b = st.with_session(&b, |s| s.phase()).await;
        assert_eq!(phase_b, Some(Phase::NotStarted));
        let phase_a = st.with_session(&a, |s| s.phase()).await;
        assert_eq!(phase_a, Some(Phase::FeedbackShown));

        assert!(st.end_session(&a).await);
        assert!(!st.end_session(&a).await);
        assert!(st.with_session(&a, |s| s.score()).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn idle_sessions_expire_and_used_ones_stay() {
        let st = with_limits(60, 100);
        let (idle, _) = st.create_session().await;
        let (busy, _) = st.create_session().await;

        tokio::time::advance(Duration::from_secs(40)).await;
        assert!(st.with_session(&busy, |s| s.start()).await.is_some());

        tokio::time::advance(Duration::from_secs(30)).await;
        assert!(st.with_session(&idle, |s| s.phase()).await.is_none());
        assert_eq!(st.with_session(&busy, |s| s.phase()).await, Some(Phase::Presented));
        assert_eq!(st.session_count().await, 1);

        // Creating a session sweeps whatever else has gone stale.
        tokio::time::advance(Duration::from_secs(61)).await;
        st.create_session().await;
        assert_eq!(st.session_count().await, 1);
        assert!(st.with_session(&busy, |s| s.phase()).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn full_store_evicts_least_recently_used() {
        let st = with_limits(3600, 3);
        let mut ids = Vec::new();
        for _ in 0..3 {
            ids.push(st.create_session().await.0);
            tokio::time::advance(Duration::from_secs(1)).await;
        }
        // Touch the oldest so the second one becomes least recently used.
        st.with_session(&ids[0], |_| ()).await.unwrap();
        tokio::time::advance(Duration::from_secs(1)).await;

        let (newest, _) = st.create_session().await;
        assert_eq!(st.session_count().await, 3);
        assert!(st.with_session(&ids[1], |_| ()).await.is_none());
        assert!(st.with_session(&ids[0], |_| ()).await.is_some());
        assert!(st.with_session(&ids[2], |_| ()).await.is_some());
        assert!(st.with_session(&newest, |_| ()).await.is_some());
    }
}
