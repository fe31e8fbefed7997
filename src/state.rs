//! Application state: generator capability, prompts/settings, and per-session documents.
//!
//! A session holds at most one document (the last successful generation) and a
//! busy flag. The flag is owned by a `BusyGuard`, so it is released on every exit
//! path of a generation, including panics. A session that never got a document
//! is forgotten when its guard drops, and the map holds at most `MAX_SESSIONS`
//! entries; the least recently used idle session is evicted to make room.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard,
    },
};

use tracing::{debug, info, instrument, warn};

use crate::config::{load_app_config_from_env, AppConfig, GenerationSettings, Prompts};
use crate::domain::ExamDocument;
use crate::error::AppError;
use crate::generator::{generator_from_env, ExamGenerator};

/// Upper bound on tracked sessions.
pub const MAX_SESSIONS: usize = 1024;

#[derive(Debug, Default)]
pub struct Session {
    pub busy: bool,
    pub document: Option<ExamDocument>,
    /// Value of the access clock at the last touch; larger is more recent.
    last_access: u64,
}

type Sessions = Arc<Mutex<HashMap<String, Session>>>;

#[derive(Clone)]
pub struct AppState {
    pub generator: Option<Arc<dyn ExamGenerator>>,
    pub prompts: Prompts,
    pub settings: GenerationSettings,
    sessions: Sessions,
    clock: Arc<AtomicU64>,
    max_sessions: usize,
}

impl AppState {
    /// Build state from env: load TOML config, pick the generator provider.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Self {
        let cfg = load_app_config_from_env().unwrap_or_default();
        let generator = generator_from_env();
        if generator.is_none() {
            warn!(target: "examgenius", "No generator configured (GEMINI_API_KEY / OPENAI_API_KEY unset). Generation requests will fail.");
        }
        Self::with_generator(generator, cfg)
    }

    pub fn with_generator(generator: Option<Arc<dyn ExamGenerator>>, cfg: AppConfig) -> Self {
        info!(
            target: "examgenius",
            generator = generator.as_ref().map(|g| g.name()).unwrap_or("disabled"),
            temperature = cfg.generation.temperature,
            timeout_secs = cfg.generation.timeout_secs,
            "Application state ready"
        );
        Self {
            generator,
            prompts: cfg.prompts,
            settings: cfg.generation,
            sessions: Arc::new(Mutex::new(HashMap::new())),
            clock: Arc::new(AtomicU64::new(0)),
            max_sessions: MAX_SESSIONS,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Session>> {
        lock_sessions(&self.sessions)
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Mark the session busy. Fails with `Busy` if a generation is already in flight.
    #[instrument(level = "debug", skip(self))]
    pub fn begin_generation(&self, session_id: &str) -> Result<BusyGuard, AppError> {
        let now = self.tick();
        let mut sessions = self.lock();
        if !sessions.contains_key(session_id) {
            evict_for_insert(&mut sessions, self.max_sessions);
        }
        let session = sessions.entry(session_id.to_string()).or_default();
        session.last_access = now;
        if session.busy {
            return Err(AppError::Busy);
        }
        session.busy = true;
        Ok(BusyGuard { sessions: self.sessions.clone(), session_id: session_id.to_string() })
    }

    /// Replace the session's document wholesale.
    #[instrument(level = "debug", skip(self, doc), fields(questions = doc.questions.len()))]
    pub fn store_document(&self, session_id: &str, doc: ExamDocument) {
        let now = self.tick();
        let mut sessions = self.lock();
        if !sessions.contains_key(session_id) {
            evict_for_insert(&mut sessions, self.max_sessions);
        }
        let session = sessions.entry(session_id.to_string()).or_default();
        session.last_access = now;
        session.document = Some(doc);
    }

    pub fn current_document(&self, session_id: &str) -> Option<ExamDocument> {
        let now = self.tick();
        let mut sessions = self.lock();
        let session = sessions.get_mut(session_id)?;
        session.last_access = now;
        session.document.clone()
    }

    #[allow(dead_code)]
    pub fn session_count(&self) -> usize {
        self.lock().len()
    }

    #[allow(dead_code)]
    pub fn is_busy(&self, session_id: &str) -> bool {
        self.lock().get(session_id).map(|s| s.busy).unwrap_or(false)
    }
}

/// Drop least recently used idle sessions until one more entry fits under `max`.
/// Busy sessions are never evicted, so the map can exceed `max` only while every
/// entry is mid-generation.
fn evict_for_insert(sessions: &mut HashMap<String, Session>, max: usize) {
    while sessions.len() >= max {
        let oldest = sessions
            .iter()
            .filter(|(_, s)| !s.busy)
            .min_by_key(|(_, s)| s.last_access)
            .map(|(id, _)| id.clone());
        match oldest {
            Some(id) => {
                debug!(target: "examgenius", session_id = %id, "Evicting idle session");
                sessions.remove(&id);
            }
            None => break,
        }
    }
}

fn lock_sessions(sessions: &Sessions) -> MutexGuard<'_, HashMap<String, Session>> {
    // Never held across an await; a poisoned map is still consistent.
    sessions.lock().unwrap_or_else(|e| e.into_inner())
}

/// Clears the session's busy flag when dropped. A session left without a
/// document is removed outright.
pub struct BusyGuard {
    sessions: Sessions,
    session_id: String,
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        let mut sessions = lock_sessions(&self.sessions);
        let keep = match sessions.get_mut(&self.session_id) {
            Some(s) => {
                s.busy = false;
                s.document.is_some()
            }
            None => return,
        };
        if !keep {
            sessions.remove(&self.session_id);
        }
    }
}
