//! Time source for expiry decisions.

use chrono::{DateTime, SecondsFormat, Utc};
use std::fmt::Debug;

/// Source of "now" for the cache and the pipeline.
pub trait Clock: Send + Sync + Debug {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Format an instant the way the cache stores it.
///
/// Always UTC, second precision, `Z` suffix, so string order matches time order.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_timestamp() {
        let ts = Utc.with_ymd_and_hms(2025, 10, 22, 9, 5, 0).unwrap();
        assert_eq!(format_timestamp(&ts), "2025-10-22T09:05:00Z");
    }

    #[test]
    fn test_timestamp_order_matches_string_order() {
        let a = Utc.with_ymd_and_hms(2025, 9, 30, 23, 59, 59).unwrap();
        let b = Utc.with_ymd_and_hms(2025, 10, 1, 0, 0, 0).unwrap();
        assert!(format_timestamp(&a) < format_timestamp(&b));
    }

    #[test]
    fn test_fixed_clock() {
        let ts = Utc.with_ymd_and_hms(2025, 10, 22, 12, 0, 0).unwrap();
        assert_eq!(FixedClock(ts).now(), ts);
    }
}
