use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use dashmap::DashMap;

use crate::api_budget::DailyBudget;
use crate::clock::Clock;

/// Rolling window for the per-user limit, in milliseconds
const USER_WINDOW_MS: i64 = 3_600_000;

/// How often idle user histories are dropped
const SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Outcome of an admission check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Request counted; carries the global count after this request
    Admitted { used_today: u32 },
    /// The daily budget is spent
    GlobalExhausted,
    /// The user key hit its hourly ceiling
    UserExhausted,
}

/// In-process request accounting: the daily budget plus a rolling hourly
/// history per user key.
///
/// State is per process and lost on restart. Separate instances do not
/// coordinate.
pub struct UsageLimiter {
    budget: DailyBudget,
    hourly_limit: usize,
    history: DashMap<String, Vec<DateTime<Utc>>>,
}

impl UsageLimiter {
    pub fn new(daily_limit: u32, hourly_limit: u32) -> Self {
        Self {
            budget: DailyBudget::new(daily_limit),
            hourly_limit: hourly_limit as usize,
            history: DashMap::new(),
        }
    }

    /// Check both ceilings for `key` and count the request if it fits.
    ///
    /// The key's history is pruned to the trailing hour whether or not the
    /// request is admitted.
    pub fn admit(&self, key: &str, now: DateTime<Utc>) -> Admission {
        let today = now.date_naive();
        if self.budget.is_exhausted(today) {
            return Admission::GlobalExhausted;
        }

        // The entry guard serializes requests for the same key
        let mut entry = self.history.entry(key.to_string()).or_default();
        let cutoff = now - TimeDelta::milliseconds(USER_WINDOW_MS);
        entry.retain(|t| *t > cutoff);

        if entry.len() >= self.hourly_limit {
            return Admission::UserExhausted;
        }

        // Another key may have taken the last slot since the check above
        let Some(used_today) = self.budget.try_record(today) else {
            return Admission::GlobalExhausted;
        };

        entry.push(now);
        Admission::Admitted { used_today }
    }

    pub fn daily_limit(&self) -> u32 {
        self.budget.daily_limit()
    }

    pub fn used_today(&self, today: NaiveDate) -> u32 {
        self.budget.used_today(today)
    }

    /// Drop keys with no timestamps left inside the window.
    /// Returns the number of keys removed.
    pub fn sweep(&self, now: DateTime<Utc>) -> usize {
        let cutoff = now - TimeDelta::milliseconds(USER_WINDOW_MS);
        let before = self.history.len();
        self.history.retain(|_, stamps| {
            stamps.retain(|t| *t > cutoff);
            !stamps.is_empty()
        });
        before.saturating_sub(self.history.len())
    }

    /// Number of user keys currently tracked
    pub fn tracked_users(&self) -> usize {
        self.history.len()
    }

    #[cfg(test)]
    fn history_len(&self, key: &str) -> usize {
        self.history.get(key).map(|h| h.len()).unwrap_or(0)
    }
}

/// Start a background task that drops idle user histories hourly
pub fn start_quota_sweep_task(limiter: Arc<UsageLimiter>, clock: Arc<dyn Clock>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            let removed = limiter.sweep(clock.now());
            if removed > 0 {
                tracing::debug!(
                    removed = removed,
                    remaining = limiter.tracked_users(),
                    "User quota sweep completed"
                );
            }
        }
    });
}
