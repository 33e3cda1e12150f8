//! Per-caller short-term memory.
//!
//! Callers are keyed by a network-address-derived string, a known-weak
//! identity (shared NAT, proxies) accepted as a limitation. The backing
//! store is a bounded LRU so the process never grows without bound: evicting
//! a quiet caller just loses a few turns of small talk.

use chatpipe_core::ChatMessage;
use lru::LruCache;
use std::collections::VecDeque;
use std::num::NonZeroUsize;
use std::sync::Mutex;

/// Conversation turns kept per caller (user + assistant messages).
pub const DEFAULT_MAX_TURNS: usize = 6;

/// Distinct callers remembered at once.
pub const DEFAULT_MAX_CALLERS: usize = 256;

#[derive(Debug, Default)]
struct CallerMemory {
    turns: VecDeque<ChatMessage>,
    last_question: Option<String>,
}

pub struct MemoryStore {
    inner: Mutex<LruCache<String, CallerMemory>>,
    max_turns: usize,
}

impl MemoryStore {
    pub fn new(max_callers: usize, max_turns: usize) -> Self {
        let cap = NonZeroUsize::new(max_callers.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(LruCache::new(cap)),
            max_turns: max_turns.max(2),
        }
    }

    /// Snapshot of the caller's history, oldest first.
    pub fn history(&self, caller: &str) -> Vec<ChatMessage> {
        let mut g = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        g.get(caller)
            .map(|m| m.turns.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// The most recent substantive (non follow-up) question, if any.
    pub fn last_question(&self, caller: &str) -> Option<String> {
        let mut g = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        g.get(caller).and_then(|m| m.last_question.clone())
    }

    /// Overwrite the stored last-question for this caller.
    pub fn set_last_question(&self, caller: &str, question: &str) {
        let mut g = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let m = g.get_or_insert_mut(caller.to_string(), CallerMemory::default);
        m.last_question = Some(question.to_string());
    }

    /// Append a completed exchange, FIFO-trimming from the oldest end.
    pub fn record_exchange(&self, caller: &str, user: &str, assistant: &str) {
        let mut g = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let m = g.get_or_insert_mut(caller.to_string(), CallerMemory::default);
        m.turns.push_back(ChatMessage::user(user));
        m.turns.push_back(ChatMessage::assistant(assistant));
        while m.turns.len() > self.max_turns {
            m.turns.pop_front();
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CALLERS, DEFAULT_MAX_TURNS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatpipe_core::ChatRole;

    #[test]
    fn history_is_fifo_trimmed_at_the_turn_cap() {
        let store = MemoryStore::new(8, 6);
        for i in 0..5 {
            store.record_exchange("1.2.3.4", &format!("q{i}"), &format!("a{i}"));
        }
        let h = store.history("1.2.3.4");
        assert_eq!(h.len(), 6);
        // Oldest exchanges dropped: history starts at q2.
        assert_eq!(h[0].content, "q2");
        assert_eq!(h[0].role, ChatRole::User);
        assert_eq!(h[5].content, "a4");
        assert_eq!(h[5].role, ChatRole::Assistant);
    }

    #[test]
    fn callers_are_isolated() {
        let store = MemoryStore::default();
        store.record_exchange("a", "qa", "ra");
        store.record_exchange("b", "qb", "rb");
        assert_eq!(store.history("a").len(), 2);
        assert_eq!(store.history("b").len(), 2);
        assert!(store.history("c").is_empty());
    }

    #[test]
    fn last_question_is_overwritten_per_caller() {
        let store = MemoryStore::default();
        assert_eq!(store.last_question("a"), None);
        store.set_last_question("a", "première");
        store.set_last_question("a", "seconde");
        assert_eq!(store.last_question("a").as_deref(), Some("seconde"));
        assert_eq!(store.last_question("b"), None);
    }

    #[test]
    fn caller_count_is_bounded_by_lru_eviction() {
        let store = MemoryStore::new(2, 6);
        store.record_exchange("a", "q", "r");
        store.record_exchange("b", "q", "r");
        store.record_exchange("c", "q", "r");
        // "a" was least recently used and is gone; the store never holds
        // more than the configured number of callers.
        assert!(store.history("a").is_empty());
        assert_eq!(store.history("b").len(), 2);
        assert_eq!(store.history("c").len(), 2);
    }
}
