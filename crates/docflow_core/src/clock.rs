//! Wall-clock helpers for audit timestamps.
//!
//! # Invariants
//! - Timestamps are Unix epoch milliseconds (`i64`).
//! - `next_after` never returns a value `<= previous`.

use std::time::{SystemTime, UNIX_EPOCH};

/// Returns the current wall-clock time in Unix epoch milliseconds.
///
/// A clock set before the epoch yields `0` instead of failing.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

/// Returns a timestamp strictly greater than `previous`, preferring `now`.
pub fn next_after(previous: i64, now: i64) -> i64 {
    if now > previous {
        now
    } else {
        previous.saturating_add(1)
    }
}
