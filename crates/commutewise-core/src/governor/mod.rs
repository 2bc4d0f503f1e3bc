//! Per-client request governor for the provider-facing proxy.
//!
//! Two caps per client identity: a short window (60 requests per 60 s) and
//! a calendar day (1000 requests, UTC dates). The daily cap is evaluated
//! first. Counters move only when a request is allowed, so denied calls
//! never consume quota.

pub mod store;

pub use store::{MemoryStore, RateLimitEntry, RateLimitStore};

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Governor limits.
#[derive(Debug, Clone)]
pub struct GovernorConfig {
    pub window: Duration,
    pub window_limit: u32,
    pub daily_limit: u32,
}

impl Default for GovernorConfig {
    fn default() -> Self {
        Self {
            window: Duration::seconds(60),
            window_limit: 60,
            daily_limit: 1000,
        }
    }
}

/// Which cap refused the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialReason {
    DailyLimit,
    WindowLimit,
}

/// A refused request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Denial {
    pub reason: DenialReason,
    pub limit: u32,
    /// Seconds until the short window reopens; absent for the daily cap.
    pub retry_after_secs: Option<u64>,
}

impl fmt::Display for Denial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.reason, self.retry_after_secs) {
            (DenialReason::DailyLimit, _) => write!(
                f,
                "Daily request limit reached ({} per day). Try again tomorrow.",
                self.limit
            ),
            (DenialReason::WindowLimit, Some(secs)) => write!(
                f,
                "Too many requests ({} per minute). Try again in {secs} seconds.",
                self.limit
            ),
            (DenialReason::WindowLimit, None) => {
                write!(f, "Too many requests ({} per minute).", self.limit)
            }
        }
    }
}

/// Result of [`RequestGovernor::check`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed {
        remaining_window: u32,
        remaining_daily: u32,
    },
    Denied(Denial),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed { .. })
    }
}

/// Gate in front of provider calls.
pub struct RequestGovernor<S: RateLimitStore = MemoryStore> {
    store: S,
    config: GovernorConfig,
    // serializes read-decide-write so two checks can't both pass a boundary
    gate: Mutex<()>,
}

impl RequestGovernor<MemoryStore> {
    pub fn in_memory(config: GovernorConfig) -> Self {
        Self::new(MemoryStore::new(), config)
    }
}

impl<S: RateLimitStore> RequestGovernor<S> {
    pub fn new(store: S, config: GovernorConfig) -> Self {
        Self {
            store,
            config,
            gate: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &GovernorConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Check and count one request for `client_id` at the current time.
    pub fn check(&self, client_id: &str) -> Decision {
        self.check_at(client_id, Utc::now())
    }

    /// Check and count one request for `client_id` at `now`.
    pub fn check_at(&self, client_id: &str, now: DateTime<Utc>) -> Decision {
        let _guard = self.gate.lock();

        let mut entry = self
            .store
            .get(client_id, now)
            .unwrap_or_else(|| RateLimitEntry::fresh(now));

        if now - entry.window_start >= self.config.window {
            entry.window_start = now;
            entry.window_count = 0;
        }
        let today = now.date_naive();
        if entry.day != today {
            entry.day = today;
            entry.day_count = 0;
        }

        let decision = if entry.day_count >= self.config.daily_limit {
            Decision::Denied(Denial {
                reason: DenialReason::DailyLimit,
                limit: self.config.daily_limit,
                retry_after_secs: None,
            })
        } else if entry.window_count >= self.config.window_limit {
            let reopens = entry.window_start + self.config.window;
            let millis = (reopens - now).num_milliseconds().max(1);
            Decision::Denied(Denial {
                reason: DenialReason::WindowLimit,
                limit: self.config.window_limit,
                retry_after_secs: Some((millis as u64).div_ceil(1000)),
            })
        } else {
            entry.window_count += 1;
            entry.day_count += 1;
            Decision::Allowed {
                remaining_window: self.config.window_limit - entry.window_count,
                remaining_daily: self.config.daily_limit - entry.day_count,
            }
        };

        self.store
            .set(client_id, entry, self.expires_at(&entry));

        if let Decision::Denied(denial) = &decision {
            info!(client = client_id, reason = ?denial.reason, retry_after = ?denial.retry_after_secs, "request denied by governor");
        }
        decision
    }

    /// Entries must outlive both the short window and the current day.
    fn expires_at(&self, entry: &RateLimitEntry) -> DateTime<Utc> {
        let window_end = entry.window_start + self.config.window;
        let next_day = entry
            .day
            .succ_opt()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|d| d.and_utc())
            .unwrap_or(window_end);
        window_end.max(next_day)
    }
}
