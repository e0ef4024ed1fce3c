use super::fsm::{DiagnosisController, SharedController};
use crate::{Error, Result};
use chrono::{DateTime, Duration, Utc};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};
use tracing::{debug, info, warn};

pub const DEFAULT_IDLE_TTL_SECS: u64 = 3600;
pub const DEFAULT_MAX_SESSIONS: usize = 1000;

struct SessionEntry {
    controller: SharedController,
    last_used: DateTime<Utc>,
}

impl SessionEntry {
    /// A session with an attempt in flight, or locked by a handler, is never
    /// evicted.
    fn is_busy(&self) -> bool {
        match self.controller.try_lock() {
            Ok(controller) => controller.is_loading(),
            Err(_) => true,
        }
    }
}

/// In-memory map of session id to controller. Sessions idle for longer than
/// the TTL are evicted, and the least recently used idle session makes room
/// once the capacity is reached.
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, SessionEntry>>,
    idle_ttl: Duration,
    max_sessions: usize,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_IDLE_TTL_SECS, DEFAULT_MAX_SESSIONS)
    }

    pub fn with_limits(idle_ttl_secs: u64, max_sessions: usize) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            idle_ttl: i64::try_from(idle_ttl_secs)
                .ok()
                .and_then(Duration::try_seconds)
                .unwrap_or(Duration::MAX),
            max_sessions: max_sessions.max(1),
        }
    }

    pub fn get_or_create(&self, session_id: &str) -> Result<SharedController> {
        self.get_or_create_at(session_id, Utc::now())
    }

    fn get_or_create_at(&self, session_id: &str, now: DateTime<Utc>) -> Result<SharedController> {
        let mut sessions = self
            .sessions
            .lock()
            .map_err(|e| Error::internal(format!("Mutex lock failed: {e}")))?;

        if let Some(entry) = sessions.get_mut(session_id) {
            entry.last_used = now;
            return Ok(Arc::clone(&entry.controller));
        }

        self.evict_idle(&mut sessions, now);
        if sessions.len() >= self.max_sessions {
            Self::evict_least_recent(&mut sessions);
        }

        debug!("Creating session {}", session_id);
        let controller = Arc::new(tokio::sync::Mutex::new(DiagnosisController::new()));
        sessions.insert(
            session_id.to_string(),
            SessionEntry {
                controller: Arc::clone(&controller),
                last_used: now,
            },
        );
        Ok(controller)
    }

    pub fn get(&self, session_id: &str) -> Result<SharedController> {
        self.get_at(session_id, Utc::now())
    }

    fn get_at(&self, session_id: &str, now: DateTime<Utc>) -> Result<SharedController> {
        let mut sessions = self
            .sessions
            .lock()
            .map_err(|e| Error::internal(format!("Mutex lock failed: {e}")))?;

        self.evict_idle(&mut sessions, now);

        let entry = sessions
            .get_mut(session_id)
            .ok_or_else(|| Error::SessionNotFound {
                session_id: session_id.to_string(),
            })?;
        entry.last_used = now;
        Ok(Arc::clone(&entry.controller))
    }

    fn evict_idle(&self, sessions: &mut HashMap<String, SessionEntry>, now: DateTime<Utc>) {
        let Some(cutoff) = now.checked_sub_signed(self.idle_ttl) else {
            return;
        };
        let before = sessions.len();
        sessions.retain(|_, entry| entry.last_used > cutoff || entry.is_busy());

        let evicted = before - sessions.len();
        if evicted > 0 {
            info!("Evicted {} idle sessions", evicted);
        }
    }

    fn evict_least_recent(sessions: &mut HashMap<String, SessionEntry>) {
        let oldest = sessions
            .iter()
            .filter(|(_, entry)| !entry.is_busy())
            .min_by_key(|(_, entry)| entry.last_used)
            .map(|(id, _)| id.clone());

        match oldest {
            Some(id) => {
                debug!("Session capacity reached, evicting {}", id);
                sessions.remove(&id);
            }
            None => warn!(
                "Session capacity reached with every session busy ({})",
                sessions.len()
            ),
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
