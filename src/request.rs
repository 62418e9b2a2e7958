//! Generation counters for asynchronous requests
//!
//! Every request is stamped with the generation current when it was issued.
//! Issuing again for the same key supersedes everything before it, so a
//! response is applied only while its generation is still the latest.
//! Nothing is cancelled: superseded work runs to completion and its result
//! is dropped.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::hash::Hash;
use std::time::Duration;

/// Monotonic token identifying one issued request
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Generation(u64);

impl Generation {
    pub fn value(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for Generation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "g{}", self.0)
    }
}

/// Per-key generation counters
#[derive(Debug, Clone)]
pub struct RequestCoordinator<K> {
    counters: HashMap<K, Generation>,
}

impl<K: Eq + Hash + Copy> RequestCoordinator<K> {
    pub fn new() -> Self {
        Self {
            counters: HashMap::new(),
        }
    }

    /// Start a new request for `key`, superseding any in flight
    pub fn issue(&mut self, key: K) -> Generation {
        let counter = self.counters.entry(key).or_default();
        counter.0 += 1;
        *counter
    }

    /// Whether `token` is still the latest generation issued for `key`
    pub fn is_current(&self, key: K, token: Generation) -> bool {
        self.current(key) == token
    }

    /// Latest generation issued for `key` (zero if never issued)
    pub fn current(&self, key: K) -> Generation {
        self.counters.get(&key).copied().unwrap_or_default()
    }
}

impl<K: Eq + Hash + Copy> Default for RequestCoordinator<K> {
    fn default() -> Self {
        Self::new()
    }
}

/// A debounce timer armed for one key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebounceTimer<K> {
    pub key: K,
    pub generation: Generation,
    pub delay: Duration,
}

impl<K> DebounceTimer<K> {
    /// Wait out the quiet period
    pub async fn elapsed(self) -> Self {
        tokio::time::sleep(self.delay).await;
        self
    }
}

/// Debounce on top of generation counters
///
/// Each call to [`Debouncer::arm`] supersedes the previous timer for the
/// same key; only the last armed timer [`fires`](Debouncer::fires).
#[derive(Debug, Clone)]
pub struct Debouncer<K> {
    delay: Duration,
    armed: RequestCoordinator<K>,
}

impl<K: Eq + Hash + Copy> Debouncer<K> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            armed: RequestCoordinator::new(),
        }
    }

    /// (Re)arm the timer for `key`
    pub fn arm(&mut self, key: K) -> DebounceTimer<K> {
        DebounceTimer {
            key,
            generation: self.armed.issue(key),
            delay: self.delay,
        }
    }

    /// Disarm without arming a replacement
    pub fn cancel(&mut self, key: K) {
        self.armed.issue(key);
    }

    /// Whether an elapsed timer is still the latest one armed
    pub fn fires(&self, timer: &DebounceTimer<K>) -> bool {
        self.armed.is_current(timer.key, timer.generation)
    }
}
