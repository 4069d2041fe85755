//! Core types and shared functionality for lunchbox.
//!
//! This crate provides:
//! - Per-day menu cache with SQLite backend
//! - Unified error types
//! - Configuration structures
//! - The menu data model shared by the pipeline and the server

pub mod cache;
pub mod config;
pub mod error;
pub mod menu;

pub use cache::{CacheDb, CacheKey, Clock, FixedClock, SystemClock};
pub use config::{AppConfig, ConfigError, HeuristicsConfig};
pub use error::Error;
pub use menu::{MenuItem, MenuResult};
