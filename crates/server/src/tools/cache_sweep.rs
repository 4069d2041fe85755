//! cache_sweep tool implementation.
//!
//! Deletes every cached menu whose expiry has passed.

use lunchbox_core::{CacheDb, Error};
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the cache_sweep tool (none).
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CacheSweepParams {}

/// Output from the cache_sweep tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheSweepOutput {
    /// Number of entries deleted.
    pub deleted: u64,
    /// Entries left afterwards.
    pub remaining: u64,
}

/// Implementation of the cache_sweep tool.
///
/// Unlike the startup and periodic sweeps, a failure here is reported to the caller.
pub async fn sweep_impl(cache: &CacheDb, _params: CacheSweepParams) -> Result<CallToolResult, McpError> {
    let deleted = cache.purge_expired_menus().await?;
    let remaining = cache.count_menus().await?;
    tracing::info!(rows = deleted, remaining, "cache sweep requested");

    let output = CacheSweepOutput { deleted, remaining };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
