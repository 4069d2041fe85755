//! MCP server handler implementation.
//!
//! Routes tool calls to the menu pipeline and the cache.
use crate::tools::{
    CacheSweepParams, DailyMenuParams,
    cache_sweep::sweep_impl,
    daily_menu::menu_impl,
};

use lunchbox_client::MenuPipeline;
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

/// The MCP server handler for lunchbox.
#[derive(Clone)]
pub struct MenuServer {
    pipeline: MenuPipeline,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl MenuServer {
    pub fn new(pipeline: MenuPipeline) -> Self {
        Self { pipeline, tool_router: Self::tool_router() }
    }

    /// Get a restaurant's menu for one day.
    #[tool(
        description = "Get the daily (lunch) menu published on a restaurant web page as structured JSON: restaurant name, date, weekday and line items with category, name, price, allergens and weight. Results are cached per URL and day until local midnight."
    )]
    async fn daily_menu(&self, params: Parameters<DailyMenuParams>) -> Result<CallToolResult, McpError> {
        menu_impl(&self.pipeline, params.0).await
    }

    /// Remove expired cache entries.
    #[tool(description = "Delete cached menus whose day has passed. Returns the number of deleted and remaining entries.")]
    async fn cache_sweep(&self, params: Parameters<CacheSweepParams>) -> Result<CallToolResult, McpError> {
        sweep_impl(self.pipeline.cache(), params.0).await
    }
}

impl ServerHandler for MenuServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "lunchbox".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            instructions: Some(
                "Use daily_menu with a restaurant page URL to read what it serves today (or on a given YYYY-MM-DD date)."
                    .into(),
            ),
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
