//! Browser sessions kept in memory.
//!
//! A session is created when a run starts on it and dropped once it has been
//! idle for `server.session_idle_secs`, or earlier when `server.max_sessions`
//! is reached and it is the least recently active one. Rendering the page never
//! creates a session.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::config::ServerConfig;
use crate::pipeline::{SessionState, StageResult};

struct Entry {
    state: SessionState,
    last_active: Instant,
}

/// Shared map of session id to stored results.
///
/// The lock is never held across an `.await`.
#[derive(Clone)]
pub struct SessionStore {
    entries: Arc<RwLock<HashMap<Uuid, Entry>>>,
    idle: Duration,
    max_sessions: usize,
}

impl SessionStore {
    pub fn new(config: &ServerConfig) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            idle: config.session_idle(),
            max_sessions: config.max_sessions.max(1),
        }
    }

    /// A copy of the session, unless it is unknown or has expired.
    pub fn get(&self, id: &Uuid) -> Option<SessionState> {
        let now = Instant::now();
        self.read()
            .get(id)
            .filter(|entry| !self.is_expired(entry, now))
            .map(|entry| entry.state.clone())
    }

    /// Text of a succeeded stage together with the session's topic.
    pub fn download(&self, id: &Uuid, key: &str) -> Option<(String, Option<String>)> {
        let now = Instant::now();
        let entries = self.read();
        let entry = entries.get(id).filter(|entry| !self.is_expired(entry, now))?;
        let text = entry.state.succeeded_text(key)?.to_string();
        Some((text, entry.state.topic().map(str::to_string)))
    }

    /// Create or reuse the session for a new run on `topic`.
    pub fn start_run(&self, id: Uuid, topic: &str) {
        let now = Instant::now();
        let mut entries = self.write();
        self.prune(&mut entries, now);

        if !entries.contains_key(&id) && entries.len() >= self.max_sessions {
            let oldest = entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_active)
                .map(|(id, _)| *id);
            if let Some(oldest) = oldest {
                tracing::debug!(session_id = %oldest, "session limit reached, dropping oldest");
                entries.remove(&oldest);
            }
        }

        let entry = entries.entry(id).or_insert_with(|| Entry {
            state: SessionState::new(),
            last_active: now,
        });
        entry.state.set_topic(topic);
        entry.last_active = now;
    }

    /// Store one finished stage, replacing any earlier result for it.
    pub fn record(&self, id: Uuid, result: StageResult) {
        let mut entries = self.write();
        match entries.get_mut(&id) {
            Some(entry) => {
                entry.state.record(result);
                entry.last_active = Instant::now();
            }
            None => {
                tracing::warn!(session_id = %id, stage = %result.key, "session no longer exists, result dropped");
            }
        }
    }

    /// Remove every session idle at `now`. Returns how many were removed.
    pub fn prune_expired(&self, now: Instant) -> usize {
        let mut entries = self.write();
        self.prune(&mut entries, now)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    fn prune(&self, entries: &mut HashMap<Uuid, Entry>, now: Instant) -> usize {
        let before = entries.len();
        entries.retain(|_, entry| !self.is_expired(entry, now));
        let removed = before - entries.len();
        if removed > 0 {
            tracing::debug!(removed, "expired idle sessions");
        }
        removed
    }

    fn is_expired(&self, entry: &Entry, now: Instant) -> bool {
        now.saturating_duration_since(entry.last_active) > self.idle
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<Uuid, Entry>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<Uuid, Entry>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}
