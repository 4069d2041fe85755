//! Cache keys and their expiry instants.

use chrono::{DateTime, Local, NaiveDate, NaiveTime, TimeDelta, TimeZone, Utc};
use std::fmt;

use crate::Error;

/// Composite cache key: normalized source URL plus calendar date.
///
/// At most one live row exists per key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub url: String,
    pub date: NaiveDate,
}

impl CacheKey {
    pub fn new(url: impl Into<String>, date: NaiveDate) -> Self {
        Self { url: url.into(), date }
    }

    /// Build a key from an ISO `YYYY-MM-DD` date string.
    pub fn parse(url: impl Into<String>, iso_date: &str) -> Result<Self, Error> {
        let date = parse_iso_date(iso_date)?;
        Ok(Self::new(url, date))
    }

    /// The date as stored in the `menu_date` column.
    pub fn iso_date(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }

    /// When a row for this key stops being served.
    pub fn expires_at(&self) -> DateTime<Utc> {
        local_midnight_after(self.date)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.url, self.date.format("%Y-%m-%d"))
    }
}

/// Parse a strict `YYYY-MM-DD` date.
pub fn parse_iso_date(input: &str) -> Result<NaiveDate, Error> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
        .map_err(|e| Error::InvalidInput(format!("invalid date {input:?}: {e}")))
}

/// The local-time midnight that starts the day after `date`, as UTC.
///
/// When that midnight does not exist locally (a DST jump at 00:00) the first
/// valid local instant of the day is used instead.
pub fn local_midnight_after(date: NaiveDate) -> DateTime<Utc> {
    let next = date.succ_opt().unwrap_or(NaiveDate::MAX);
    let midnight = next.and_time(NaiveTime::default());

    if let Some(t) = Local.from_local_datetime(&midnight).earliest() {
        return t.with_timezone(&Utc);
    }

    (1..=4)
        .filter_map(|h| Local.from_local_datetime(&(midnight + TimeDelta::hours(h))).earliest())
        .next()
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&midnight))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_expires_at_is_next_local_midnight() {
        let key = CacheKey::parse("https://example.com/menu", "2025-10-22").unwrap();
        let expires = key.expires_at().with_timezone(&Local);
        assert_eq!(expires.date_naive(), NaiveDate::from_ymd_opt(2025, 10, 23).unwrap());
        assert_eq!(expires.hour(), 0);
        assert_eq!(expires.minute(), 0);
        assert_eq!(expires.second(), 0);
    }

    #[test]
    fn test_iso_date_round_trip() {
        let key = CacheKey::parse("https://example.com/menu", "2025-01-05").unwrap();
        assert_eq!(key.iso_date(), "2025-01-05");
        assert_eq!(key.to_string(), "https://example.com/menu@2025-01-05");
    }

    #[test]
    fn test_parse_rejects_bad_dates() {
        assert!(matches!(CacheKey::parse("u", "2025-13-01"), Err(Error::InvalidInput(_))));
        assert!(matches!(CacheKey::parse("u", "22.10.2025"), Err(Error::InvalidInput(_))));
        assert!(matches!(CacheKey::parse("u", ""), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_keys_differ_by_url_and_date() {
        let a = CacheKey::parse("https://a.test/menu", "2025-10-22").unwrap();
        let b = CacheKey::parse("https://b.test/menu", "2025-10-22").unwrap();
        let c = CacheKey::parse("https://a.test/menu", "2025-10-23").unwrap();
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(a, CacheKey::parse("https://a.test/menu", "2025-10-22").unwrap());
    }
}
