//! lunchbox server entry point.
//!
//! Boots the MCP server on stdio transport. The composition root owns every
//! long-lived resource: it opens the cache, builds the pipeline, runs the
//! periodic sweep and closes the cache once the client disconnects.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::{Context, Result};
use lunchbox_client::{
    ChatConfig, ChatExtractor, FetchClient, FetchConfig, MenuPipeline, RenderOptions, Renderer, StructuredExtractor,
};
use lunchbox_core::{AppConfig, CacheDb};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tokio::task::JoinHandle;
use tracing_subscriber::EnvFilter;

mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load().context("failed to load configuration")?;
    config.require_llm_api_key()?;

    tracing::info!(db_path = %config.db_path.display(), render = config.render_enabled, "starting lunchbox server on stdio transport");

    let cache = CacheDb::open(&config.db_path)
        .await
        .with_context(|| format!("failed to open cache at {}", config.db_path.display()))?;

    let pipeline = build_pipeline(&config, cache.clone())?;
    let sweeper = spawn_sweeper(&config, cache.clone());

    let outcome = serve(pipeline).await;

    if let Some(task) = sweeper {
        task.abort();
    }
    if let Err(e) = cache.close().await {
        tracing::warn!("cache close failed: {e}");
    }
    tracing::info!("lunchbox server stopped");

    outcome
}

async fn serve(pipeline: MenuPipeline) -> Result<()> {
    let handler = handler::MenuServer::new(pipeline);
    let server = serve_server(handler, stdio()).await?;
    server.waiting().await?;
    Ok(())
}

fn build_pipeline(config: &AppConfig, cache: CacheDb) -> Result<MenuPipeline> {
    let fetcher = Arc::new(FetchClient::new(FetchConfig::from(config))?);
    let extractor: Arc<dyn StructuredExtractor> = Arc::new(ChatExtractor::new(ChatConfig::from_app_config(config)?)?);

    let mut builder = MenuPipeline::builder(cache, fetcher, extractor)
        .render_options(RenderOptions::from(config))
        .heuristics(config.heuristics.clone());

    if let Some(renderer) = renderer(config) {
        builder = builder.renderer(renderer);
    }

    Ok(builder.build()?)
}

#[cfg(feature = "render")]
fn renderer(config: &AppConfig) -> Option<Arc<dyn Renderer>> {
    config
        .render_enabled
        .then(|| Arc::new(lunchbox_client::HeadlessRenderer::new()) as Arc<dyn Renderer>)
}

#[cfg(not(feature = "render"))]
fn renderer(config: &AppConfig) -> Option<Arc<dyn Renderer>> {
    if config.render_enabled {
        tracing::warn!("built without the `render` feature, static fetch only");
    }
    None
}

/// Periodically delete expired cache rows; `None` when disabled.
fn spawn_sweeper(config: &AppConfig, cache: CacheDb) -> Option<JoinHandle<()>> {
    let period = config.sweep_interval()?;
    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        // The first tick completes immediately; opening the cache already swept.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let deleted = cache.sweep().await;
            tracing::debug!(rows = deleted, "periodic cache sweep");
        }
    }))
}
