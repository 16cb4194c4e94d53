//! Wall-clock source for store timestamps.
//!
//! Repositories take a plain function pointer so tests can pin or advance
//! time without global state in production code.

use std::time::{SystemTime, UNIX_EPOCH};

/// Returns "now" as Unix epoch milliseconds.
pub type Clock = fn() -> i64;

/// Default clock backed by `SystemTime`.
///
/// Clamps to `0` if the system time is before the Unix epoch.
pub fn system_clock() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
