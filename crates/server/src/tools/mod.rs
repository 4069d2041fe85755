//! MCP tool implementations.
//!
//! This module contains all tools exposed by the lunchbox server.

pub mod cache_sweep;
pub mod daily_menu;

pub use cache_sweep::CacheSweepParams;
pub use daily_menu::DailyMenuParams;
