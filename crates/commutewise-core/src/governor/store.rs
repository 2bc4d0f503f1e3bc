//! Key-value storage for governor state.
//!
//! The governor only needs `get` and `set` with an expiry, so a shared
//! backend (Redis, a database) can replace [`MemoryStore`] without touching
//! the decision logic. The in-memory store is process-local: restarts and
//! multiple instances each start from empty counters.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Per-client counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitEntry {
    pub window_start: DateTime<Utc>,
    pub window_count: u32,
    pub day: NaiveDate,
    pub day_count: u32,
}

impl RateLimitEntry {
    /// Empty counters starting at `now`.
    pub fn fresh(now: DateTime<Utc>) -> Self {
        Self {
            window_start: now,
            window_count: 0,
            day: now.date_naive(),
            day_count: 0,
        }
    }
}

/// Storage seam for [`RequestGovernor`](super::RequestGovernor).
pub trait RateLimitStore: Send + Sync {
    /// Entry for `key`, or `None` if absent or expired at `now`.
    fn get(&self, key: &str, now: DateTime<Utc>) -> Option<RateLimitEntry>;

    /// Store `entry` under `key` until `expires_at`.
    fn set(&self, key: &str, entry: RateLimitEntry, expires_at: DateTime<Utc>);
}

/// In-process store backed by a `HashMap`.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, (RateLimitEntry, DateTime<Utc>)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every entry expired at `now`. Returns how many were removed.
    pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, (_, expires_at)| *expires_at > now);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RateLimitStore for MemoryStore {
    fn get(&self, key: &str, now: DateTime<Utc>) -> Option<RateLimitEntry> {
        let entries = self.entries.read();
        entries
            .get(key)
            .filter(|(_, expires_at)| *expires_at > now)
            .map(|(entry, _)| *entry)
    }

    fn set(&self, key: &str, entry: RateLimitEntry, expires_at: DateTime<Utc>) {
        self.entries
            .write()
            .insert(key.to_string(), (entry, expires_at));
    }
}
