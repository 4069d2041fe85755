//! SQLite-backed cache for per-day menu results.
//!
//! This module provides a persistent cache using SQLite with async access via
//! tokio-rusqlite. It supports:
//!
//! - Rows keyed by (source URL, calendar date)
//! - Expiry fixed at the local midnight following the cached date
//! - Lazy expiry on read plus explicit sweeps
//! - Automatic schema migrations
//! - WAL mode for concurrent access

pub mod clock;
pub mod connection;
pub mod key;
pub mod menus;
pub mod migrations;

pub use crate::Error;

pub use clock::{Clock, FixedClock, SystemClock};
pub use connection::CacheDb;
pub use key::CacheKey;
