//! Echo suppression for hosts that notify the writing context.
//!
//! Some hosts deliver a change notification to the same context that made
//! the write. The store records a fingerprint of every write it makes; a
//! native event whose `(key, fingerprint)` pair is in the recent history is
//! treated as an echo of our own write and dropped.
//!
//! Removals are never filtered. A removal only evicts the key's earlier
//! write from the history, so a removal made by another context is never
//! mistaken for our own.

use std::collections::VecDeque;

/// 32-bit string hash over UTF-16 code units (`h = h * 31 + c`, wrapping).
pub fn fingerprint(content: &str) -> i32 {
    content
        .encode_utf16()
        .fold(0i32, |hash, unit| hash.wrapping_mul(31).wrapping_add(i32::from(unit)))
}

/// Bounded history of recently written `(composite key, fingerprint)` pairs.
#[derive(Debug, Clone)]
pub struct EchoFilter {
    capacity: usize,
    recent: VecDeque<(String, i32)>,
}

impl EchoFilter {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            recent: VecDeque::with_capacity(capacity),
        }
    }

    /// Remember a write of `content` under `key`.
    ///
    /// Only the latest write per key is kept; the oldest entries are
    /// evicted once the history is full.
    pub fn record(&mut self, key: &str, content: &str) {
        if self.capacity == 0 {
            return;
        }
        self.recent.retain(|(k, _)| k != key);
        while self.recent.len() >= self.capacity {
            self.recent.pop_front();
        }
        self.recent.push_back((key.to_string(), fingerprint(content)));
    }

    /// Drop whatever was recorded for `key`.
    pub fn forget(&mut self, key: &str) {
        self.recent.retain(|(k, _)| k != key);
    }

    /// Whether a write of `content` under `key` is in the recent history.
    pub fn matches(&self, key: &str, content: &str) -> bool {
        let hash = fingerprint(content);
        self.recent.iter().any(|(k, h)| k == key && *h == hash)
    }

    pub fn reset(&mut self) {
        self.recent.clear();
    }

    pub fn len(&self) -> usize {
        self.recent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recent.is_empty()
    }
}
