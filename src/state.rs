//! Application state: generation settings, the optional Gemini client, and the
//! per-session store of the last generated text and extracted problems.
//!
//! A session is an opaque id chosen by the browser (or minted by us). Its entry
//! is overwritten wholesale by the next generation and removed by clear.
//! Entries not touched for `session_ttl_secs` are evicted on the next insert
//! and are no longer returned by `get`.

use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::config::{AppConfig, GenerationSettings};
use crate::gemini::{Gemini, TextGenerator};

/// What one session remembers between the generate and download steps.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SessionData {
    pub last_generated: String,
    pub problems: Vec<String>,
}

struct SessionEntry {
    data: SessionData,
    touched: Instant,
}

#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<RwLock<HashMap<String, SessionEntry>>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self { inner: Arc::new(RwLock::new(HashMap::new())), ttl }
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn get(&self, id: &str) -> Option<SessionData> {
        let map = self.inner.read().await;
        map.get(id)
            .filter(|e| e.touched.elapsed() < self.ttl)
            .map(|e| e.data.clone())
    }

    /// Replace whatever the session held with a fresh generation.
    #[instrument(level = "debug", skip(self, text, problems), fields(text_len = text.len(), problems = problems.len()))]
    pub async fn store_generation(&self, id: &str, text: String, problems: Vec<String>) {
        self.store_at(id, SessionData { last_generated: text, problems }, Instant::now()).await;
    }

    async fn store_at(&self, id: &str, data: SessionData, now: Instant) {
        let mut map = self.inner.write().await;
        let before = map.len();
        map.retain(|_, e| now.saturating_duration_since(e.touched) < self.ttl);
        if map.len() < before {
            debug!(target: "problem_forge", evicted = before - map.len(), "Expired sessions evicted");
        }
        map.insert(id.to_string(), SessionEntry { data, touched: now });
    }

    /// Forget the session. Returns true if it held anything.
    #[instrument(level = "debug", skip(self))]
    pub async fn clear(&self, id: &str) -> bool {
        self.inner.write().await.remove(id).is_some()
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.inner.read().await.len()
    }
}

#[derive(Clone)]
pub struct AppState {
    pub settings: GenerationSettings,
    pub generator: Option<Arc<dyn TextGenerator>>,
    pub sessions: SessionStore,
}

impl AppState {
    /// Build state from env: load config, init the Gemini client if a key is present.
    #[instrument(level = "info", skip_all)]
    pub fn from_env() -> Self {
        let cfg = AppConfig::load_from_env();
        let timeout = Duration::from_secs(cfg.generation.request_timeout_secs);

        let generator: Option<Arc<dyn TextGenerator>> = match Gemini::from_env(timeout) {
            Some(g) => {
                info!(target: "problem_forge", base_url = %g.base_url, default_model = %cfg.generation.default_model, "Gemini enabled.");
                Some(Arc::new(g))
            }
            None => {
                info!(target: "problem_forge", "Gemini disabled (no GOOGLE_API_KEY). Generation requests will be answered with a warning.");
                None
            }
        };

        info!(
            target: "problem_forge",
            language = %cfg.generation.language,
            problem_count = cfg.generation.problem_count,
            models = ?cfg.generation.models,
            session_ttl_secs = cfg.generation.session_ttl_secs,
            "Generation settings"
        );

        Self::new(cfg.generation, generator)
    }

    pub fn new(settings: GenerationSettings, generator: Option<Arc<dyn TextGenerator>>) -> Self {
        let sessions = SessionStore::new(Duration::from_secs(settings.session_ttl_secs));
        Self { settings, generator, sessions }
    }

    /// Use the client-supplied session id, or mint one.
    pub fn session_id_or_new(id: Option<String>) -> String {
        id.filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn generation_overwrites_and_clear_removes() {
        let store = SessionStore::new(Duration::from_secs(60));
        store.store_generation("s1", "first".into(), vec!["a".into()]).await;
        store.store_generation("s1", "second".into(), vec!["b".into(), "c".into()]).await;

        let data = store.get("s1").await.expect("session");
        assert_eq!(data.last_generated, "second");
        assert_eq!(data.problems, vec!["b", "c"]);
        assert!(store.get("s2").await.is_none());

        assert!(store.clear("s1").await);
        assert!(!store.clear("s1").await);
        assert!(store.get("s1").await.is_none());
    }

    #[tokio::test]
    async fn stale_sessions_are_evicted_on_insert() {
        let ttl = Duration::from_secs(60);
        let store = SessionStore::new(ttl);
        let start = Instant::now();
        store.store_at("old", SessionData::default(), start).await;
        store.store_at("fresh", SessionData::default(), start + Duration::from_secs(30)).await;
        assert_eq!(store.len().await, 2);

        store.store_at("new", SessionData::default(), start + ttl + Duration::from_secs(1)).await;
        assert_eq!(store.len().await, 2);
        assert!(!store.clear("old").await);
        assert!(store.clear("fresh").await);
    }

    #[test]
    fn blank_session_id_is_replaced() {
        assert_eq!(AppState::session_id_or_new(Some("abc".into())), "abc");
        let minted = AppState::session_id_or_new(Some("  ".into()));
        assert!(Uuid::parse_str(&minted).is_ok());
        assert!(Uuid::parse_str(&AppState::session_id_or_new(None)).is_ok());
    }
}
