//! Reminder deduplication window.
//!
//! The server may push the same reminder more than once, for example when
//! a reconnect replays recent events. An identifier seen within the TTL is
//! suppressed. Expired entries are evicted lazily on every check, so the
//! map never grows past the number of distinct identifiers seen within one
//! TTL.

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;

/// Remembers recently dispatched reminder identifiers.
#[derive(Debug)]
pub struct DedupWindow {
    ttl: Duration,
    seen: HashMap<String, Instant>,
}

impl DedupWindow {
    /// Creates an empty window.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            seen: HashMap::new(),
        }
    }

    /// Returns true the first time `id` is seen within the TTL and records
    /// it; returns false for a duplicate. A duplicate does not extend the
    /// window.
    pub fn remember_once(&mut self, id: &str, now: Instant) -> bool {
        self.evict_expired(now);
        if self.seen.contains_key(id) {
            return false;
        }
        self.seen.insert(id.to_string(), now);
        true
    }

    /// Returns the number of identifiers currently remembered.
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Returns true if nothing is remembered.
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    fn evict_expired(&mut self, now: Instant) {
        let ttl = self.ttl;
        self.seen
            .retain(|_, seen_at| now.saturating_duration_since(*seen_at) <= ttl);
    }
}
