use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{Datelike, NaiveDate};

/// Day key stored before the first call; every real date sorts after it.
const NO_DAY: u32 = 0;

/// Tracks accepted requests per UTC day across all users.
///
/// The day and the count share one atomic word (`day << 32 | count`), so a
/// rollover and an increment are a single compare-and-swap. The day only
/// moves forward: a call carrying an older date is counted against the
/// stored day.
pub struct DailyBudget {
    daily_limit: u32,
    state: AtomicU64,
}

impl DailyBudget {
    pub fn new(daily_limit: u32) -> Self {
        Self {
            daily_limit,
            state: AtomicU64::new(pack(NO_DAY, 0)),
        }
    }

    pub fn daily_limit(&self) -> u32 {
        self.daily_limit
    }

    /// Whether the ceiling has been reached for `today`. Does not count a call.
    pub fn is_exhausted(&self, today: NaiveDate) -> bool {
        self.used_today(today) >= self.daily_limit
    }

    /// Count one accepted call if the ceiling allows it.
    ///
    /// Returns the new count, or `None` when the budget was already spent.
    pub fn try_record(&self, today: NaiveDate) -> Option<u32> {
        let key = day_key(today);
        let prev = self
            .state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |state| {
                let (day, used) = current(state, key);
                (used < self.daily_limit).then(|| pack(day, used + 1))
            })
            .ok()?;

        let (prev_day, _) = unpack(prev);
        if prev_day != NO_DAY && prev_day < key {
            tracing::info!(date = %today, "Daily budget reset");
        }
        Some(current(prev, key).1 + 1)
    }

    /// Number of calls used on `today`.
    pub fn used_today(&self, today: NaiveDate) -> u32 {
        current(self.state.load(Ordering::Acquire), day_key(today)).1
    }
}

fn pack(day: u32, used: u32) -> u64 {
    (u64::from(day) << 32) | u64::from(used)
}

fn unpack(state: u64) -> (u32, u32) {
    ((state >> 32) as u32, state as u32)
}

/// Effective (day, count) for a caller on `key`: a later day starts at zero,
/// an earlier one sees the stored day.
fn current(state: u64, key: u32) -> (u32, u32) {
    let (day, used) = unpack(state);
    if key > day {
        (key, 0)
    } else {
        (day, used)
    }
}

fn day_key(date: NaiveDate) -> u32 {
    u32::try_from(date.num_days_from_ce()).unwrap_or(NO_DAY)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[test]
    fn test_record_call_within_budget() {
        let budget = DailyBudget::new(3);
        assert_eq!(budget.try_record(day(1)), Some(1));
        assert_eq!(budget.try_record(day(1)), Some(2));
        assert_eq!(budget.try_record(day(1)), Some(3));
        // 4th call exceeds budget and is not counted
        assert_eq!(budget.try_record(day(1)), None);
        assert_eq!(budget.used_today(day(1)), 3);
    }

    #[test]
    fn test_is_exhausted_does_not_count() {
        let budget = DailyBudget::new(1);
        assert!(!budget.is_exhausted(day(1)));
        assert!(!budget.is_exhausted(day(1)));
        assert_eq!(budget.used_today(day(1)), 0);
        budget.try_record(day(1));
        assert!(budget.is_exhausted(day(1)));
    }

    #[test]
    fn test_new_day_resets_counter() {
        let budget = DailyBudget::new(2);
        budget.try_record(day(1));
        budget.try_record(day(1));
        assert!(budget.is_exhausted(day(1)));

        assert!(!budget.is_exhausted(day(2)));
        assert_eq!(budget.used_today(day(2)), 0);
        assert_eq!(budget.try_record(day(2)), Some(1));
        // Same day again does not reset
        assert_eq!(budget.used_today(day(2)), 1);
    }

    #[test]
    fn test_stale_date_does_not_roll_back() {
        let budget = DailyBudget::new(2);
        assert_eq!(budget.try_record(day(11)), Some(1));
        assert_eq!(budget.try_record(day(11)), Some(2));

        // A late call dated the day before is counted against the stored day
        assert!(budget.is_exhausted(day(10)));
        assert_eq!(budget.try_record(day(10)), None);

        assert_eq!(budget.try_record(day(11)), None);
        assert_eq!(budget.used_today(day(11)), 2);
    }

    #[test]
    fn test_concurrent_records_never_exceed_limit() {
        let budget = std::sync::Arc::new(DailyBudget::new(50));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let budget = budget.clone();
                std::thread::spawn(move || {
                    // Alternate between two dates straddling midnight
                    let date = if i % 2 == 0 { day(10) } else { day(11) };
                    (0..20).filter(|_| budget.try_record(date).is_some()).count()
                })
            })
            .collect();
        let accepted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();

        // At most one full day-10 allowance plus one full day-11 allowance
        assert!(accepted <= 100);
        assert!(budget.used_today(day(11)) <= 50);
    }
}
