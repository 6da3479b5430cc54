use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

#[derive(Debug, Default, Clone, Copy)]
struct AttemptRecord {
    count: u32,
    lock_until: Option<Instant>,
}

/// Per-client login throttling. Reaching `max_attempts` failures locks the
/// key for `lock_for`; the counter restarts when the lock lands or a login
/// succeeds. In-process only, like the session registry.
pub struct LoginLock {
    max_attempts: u32,
    lock_for: Duration,
    attempts: Mutex<HashMap<String, AttemptRecord>>,
}

impl LoginLock {
    pub fn new(max_attempts: u32, lock_for: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            lock_for,
            attempts: Mutex::new(HashMap::new()),
        }
    }

    /// Remaining lock time for `key`, when currently locked.
    pub fn locked_for(&self, key: &str) -> Option<Duration> {
        let attempts = self.lock();
        let until = attempts.get(key)?.lock_until?;
        let now = Instant::now();
        if until > now {
            Some(until - now)
        } else {
            None
        }
    }

    pub fn record_failure(&self, key: &str) {
        let mut attempts = self.lock();
        let record = attempts.entry(key.to_string()).or_default();

        // an elapsed lock starts a fresh window
        if record.lock_until.is_some_and(|until| until <= Instant::now()) {
            record.lock_until = None;
            record.count = 0;
        }

        record.count += 1;
        if record.count >= self.max_attempts {
            record.lock_until = Some(Instant::now() + self.lock_for);
            record.count = 0;
        }
    }

    /// Successful login: forget the key entirely.
    pub fn reset(&self, key: &str) {
        self.lock().remove(key);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, AttemptRecord>> {
        self.attempts.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locks_after_max_failures() {
        let lock = LoginLock::new(3, Duration::from_secs(60));
        lock.record_failure("1.2.3.4");
        lock.record_failure("1.2.3.4");
        assert!(lock.locked_for("1.2.3.4").is_none());

        lock.record_failure("1.2.3.4");
        let remaining = lock.locked_for("1.2.3.4").unwrap();
        assert!(remaining <= Duration::from_secs(60));
        assert!(remaining > Duration::from_secs(55));
    }

    #[test]
    fn keys_are_independent() {
        let lock = LoginLock::new(2, Duration::from_secs(60));
        lock.record_failure("a");
        lock.record_failure("a");
        assert!(lock.locked_for("a").is_some());
        assert!(lock.locked_for("b").is_none());
    }

    #[test]
    fn success_resets_the_counter() {
        let lock = LoginLock::new(2, Duration::from_secs(60));
        lock.record_failure("a");
        lock.reset("a");
        lock.record_failure("a");
        assert!(lock.locked_for("a").is_none());
    }

    #[test]
    fn elapsed_lock_releases_and_counts_restart() {
        let lock = LoginLock::new(2, Duration::from_millis(10));
        lock.record_failure("a");
        lock.record_failure("a");
        assert!(lock.locked_for("a").is_some());

        std::thread::sleep(Duration::from_millis(25));
        assert!(lock.locked_for("a").is_none());

        // one failure after release is not an instant re-lock
        lock.record_failure("a");
        assert!(lock.locked_for("a").is_none());
        lock.record_failure("a");
        assert!(lock.locked_for("a").is_some());
    }
}
