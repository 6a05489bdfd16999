//! Session identity for dictation runs.
//!
//! Audio chunks and transcript events keep arriving for a short while after a
//! session is stopped. Each session gets a token from a shared monotonic
//! counter; a callback holding a token checks `is_current()` before touching
//! the screen or clipboard, so results from a superseded session are dropped
//! instead of landing in whatever the user is doing now.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Shared counter handing out session tokens
#[derive(Debug, Clone, Default)]
pub struct SessionCounter {
    current: Arc<AtomicU64>,
}

/// Identity of one dictation session
#[derive(Debug, Clone)]
pub struct SessionToken {
    id: u64,
    current: Arc<AtomicU64>,
}

impl SessionCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a new session, invalidating every previously issued token
    pub fn begin(&self) -> SessionToken {
        let id = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        SessionToken {
            id,
            current: Arc::clone(&self.current),
        }
    }

    /// Id of the most recently started session (0 before the first)
    pub fn current_id(&self) -> u64 {
        self.current.load(Ordering::SeqCst)
    }
}

impl SessionToken {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Whether this token still names the newest session
    pub fn is_current(&self) -> bool {
        self.current.load(Ordering::SeqCst) == self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_token_is_current() {
        let counter = SessionCounter::new();
        let token = counter.begin();
        assert_eq!(token.id(), 1);
        assert!(token.is_current());
    }

    #[test]
    fn test_new_session_invalidates_old_token() {
        let counter = SessionCounter::new();
        let first = counter.begin();
        let second = counter.begin();

        assert!(!first.is_current());
        assert!(second.is_current());
        assert_eq!(counter.current_id(), 2);
    }

    #[test]
    fn test_cloned_token_shares_identity() {
        let counter = SessionCounter::new();
        let token = counter.begin();
        let clone = token.clone();

        assert!(clone.is_current());
        counter.begin();
        assert!(!token.is_current());
        assert!(!clone.is_current());
    }

    #[test]
    fn test_tokens_survive_counter_clone() {
        let counter = SessionCounter::new();
        let token = counter.begin();

        // A cloned counter hands out ids from the same sequence
        let other_handle = counter.clone();
        let newer = other_handle.begin();

        assert!(!token.is_current());
        assert!(newer.is_current());
        assert_eq!(newer.id(), 2);
    }
}
