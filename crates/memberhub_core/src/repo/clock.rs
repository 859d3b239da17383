//! Wall-clock helpers for update stamps and daily counters.

use std::time::{SystemTime, UNIX_EPOCH};

const SECONDS_PER_DAY: i64 = 86_400;

/// Current unix time in seconds; 0 if the clock is before the epoch.
pub(crate) fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs() as i64)
        .unwrap_or(0)
}

/// Next `update_time` for a record last stamped at `previous`.
///
/// Never returns a value `<= previous`, even when several mutations land in
/// the same second.
pub(crate) fn next_update_time(previous: i64, now: i64) -> i64 {
    now.max(previous.saturating_add(1))
}

/// Seconds left until the next UTC midnight; at least 1.
pub(crate) fn seconds_until_day_end(now: i64) -> u64 {
    let remaining = SECONDS_PER_DAY - now.rem_euclid(SECONDS_PER_DAY);
    remaining.max(1) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_time_strictly_increases_within_one_second() {
        assert_eq!(next_update_time(0, 100), 100);
        assert_eq!(next_update_time(100, 100), 101);
        assert_eq!(next_update_time(150, 100), 151);
    }

    #[test]
    fn day_end_is_relative_to_utc_midnight() {
        assert_eq!(seconds_until_day_end(0), 86_400);
        assert_eq!(seconds_until_day_end(86_399), 1);
        assert_eq!(seconds_until_day_end(86_400 + 3_600), 82_800);
    }
}
