//! Content acquisition for lunchbox.
//!
//! This crate provides the static and rendered fetchers, menu content
//! extraction and classification, the structured-extraction client and the
//! cache-first pipeline that ties them together.

pub mod extract;
pub mod fetch;
pub mod pipeline;
pub mod render;
pub mod structured;

pub use extract::{FetchResult, MenuClassifier, extract_images, extract_text};
pub use fetch::{FetchClient, FetchConfig, FetchError, PageFetcher};
pub use pipeline::{FetchStrategy, MenuPipeline, MenuPipelineBuilder, SingleFlight};
#[cfg(feature = "render")]
pub use render::HeadlessRenderer;
pub use render::{RenderError, RenderOptions, RenderedPage, Renderer};
pub use structured::{ChatConfig, ChatError, ChatExtractor, MenuRequest, StructuredExtractor};
