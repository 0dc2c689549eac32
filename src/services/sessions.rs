use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::models::{BookingSession, BookingState};

/// Sessions idle longer than this are forgotten.
pub const SESSION_TTL_MINUTES: i64 = 60;

/// In-memory home for booking sessions between HTTP requests. A handler
/// takes a session out, drives it, and puts it back, so no lock is held
/// while mail is being sent.
#[derive(Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<Uuid, BookingSession>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_map<T>(&self, f: impl FnOnce(&mut HashMap<Uuid, BookingSession>) -> T) -> T {
        let mut map = match self.sessions.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut map)
    }

    pub fn take(&self, id: Uuid) -> Option<BookingSession> {
        self.with_map(|map| map.remove(&id))
    }

    /// Stores the session unless it has reached a terminal state.
    pub fn put(&self, session: BookingSession) {
        if matches!(session.state, BookingState::Confirmed { .. }) {
            return;
        }
        self.with_map(|map| {
            map.insert(session.id, session);
        });
    }

    pub fn remove(&self, id: Uuid) -> bool {
        self.with_map(|map| map.remove(&id).is_some())
    }

    pub fn len(&self) -> usize {
        self.with_map(|map| map.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops abandoned sessions; returns how many went.
    pub fn prune(&self, now: DateTime<Utc>) -> usize {
        let cutoff = now - Duration::minutes(SESSION_TTL_MINUTES);
        let removed = self.with_map(|map| {
            let before = map.len();
            map.retain(|_, session| session.last_activity > cutoff);
            before - map.len()
        });
        if removed > 0 {
            tracing::debug!(removed, "pruned idle booking sessions");
        }
        removed
    }
}
