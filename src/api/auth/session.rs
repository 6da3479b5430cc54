use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use rand::RngCore;

/// Cookie carrying the session token.
pub const SESSION_COOKIE: &str = "ssgg_sid";

/// Result of presenting a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCheck {
    /// Live session; its idle clock was just restarted.
    Active,
    /// The session existed but idled out; it has been dropped.
    Expired,
    /// Never issued, or already dropped.
    Unknown,
}

/// In-process session registry with rolling idle expiry. Single-instance by
/// construction: a second server process would not see these sessions.
pub struct SessionStore {
    idle: Duration,
    sessions: Mutex<HashMap<String, Instant>>,
}

impl SessionStore {
    pub fn new(idle: Duration) -> Self {
        Self {
            idle,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Issue a fresh opaque token.
    pub fn open(&self) -> String {
        let mut raw = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut raw);
        let token = hex::encode(raw);

        self.lock().insert(token.clone(), Instant::now());
        token
    }

    /// Rolling check: touching a live session renews it, an idle one is
    /// removed on the spot.
    pub fn touch(&self, token: &str) -> SessionCheck {
        let now = Instant::now();
        let mut sessions = self.lock();
        match sessions.get(token).copied() {
            None => SessionCheck::Unknown,
            Some(last) if now.duration_since(last) > self.idle => {
                sessions.remove(token);
                SessionCheck::Expired
            }
            Some(_) => {
                sessions.insert(token.to_string(), now);
                SessionCheck::Active
            }
        }
    }

    pub fn close(&self, token: &str) {
        self.lock().remove(token);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Instant>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_touch_close_roundtrip() {
        let store = SessionStore::new(Duration::from_secs(60));
        let token = store.open();
        assert_eq!(token.len(), 64);
        assert_eq!(store.touch(&token), SessionCheck::Active);

        store.close(&token);
        assert_eq!(store.touch(&token), SessionCheck::Unknown);
    }

    #[test]
    fn unknown_token_is_not_expired() {
        let store = SessionStore::new(Duration::from_secs(60));
        assert_eq!(store.touch("deadbeef"), SessionCheck::Unknown);
    }

    #[test]
    fn idle_session_expires_once_then_is_unknown() {
        let store = SessionStore::new(Duration::from_millis(10));
        let token = store.open();
        std::thread::sleep(Duration::from_millis(25));
        assert_eq!(store.touch(&token), SessionCheck::Expired);
        // the expired token was dropped, a retry is a plain miss
        assert_eq!(store.touch(&token), SessionCheck::Unknown);
    }

    #[test]
    fn touching_renews_the_idle_clock() {
        let store = SessionStore::new(Duration::from_millis(40));
        let token = store.open();
        for _ in 0..4 {
            std::thread::sleep(Duration::from_millis(15));
            assert_eq!(store.touch(&token), SessionCheck::Active);
        }
    }

    #[test]
    fn tokens_are_unique() {
        let store = SessionStore::new(Duration::from_secs(60));
        assert_ne!(store.open(), store.open());
    }
}
