//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use std::sync::Arc;

use crate::tools::table_extract::{TableExtractParams, extract_impl};
use crate::tools::table_inspect::{TableInspectParams, inspect_impl};

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
use tabula_client::{FetchClient, FetchConfig, PageSource};
use tabula_core::{AppConfig, Error};

/// The main MCP server handler for mcp-tabula.
#[derive(Clone)]
pub struct McpTabulaServer {
    tool_router: ToolRouter<Self>,
    source: Arc<dyn PageSource>,
    config: Arc<AppConfig>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl McpTabulaServer {
    /// Create a server that fetches pages over HTTP.
    pub fn new(config: AppConfig) -> Result<Self, Error> {
        let client = FetchClient::new(FetchConfig::from(&config))?;
        Ok(Self::with_source(Arc::new(client), config))
    }

    /// Create a server over any page source.
    pub fn with_source(source: Arc<dyn PageSource>, config: AppConfig) -> Self {
        Self { tool_router: Self::tool_router(), source, config: Arc::new(config) }
    }

    /// Extract a table from a paginated listing.
    ///
    /// Pages are requested with an increasing page-number query parameter until one
    /// contains no items; one row is produced per item.
    #[tool(
        description = "Extract a table from a paginated HTML listing. Each item matched by item_xpath becomes a row; \
                       columns are paths relative to the item. Link columns add a <name>Url column. Returns header and rows as JSON."
    )]
    async fn table_extract(&self, params: Parameters<TableExtractParams>) -> Result<CallToolResult, McpError> {
        extract_impl(Arc::clone(&self.source), &self.config, params.0).await
    }

    /// Survey one page for candidate columns.
    #[tool(
        description = "Fetch one page and list the elements under the first item matched by item_xpath, with relative paths \
                       and suggested column definitions for table_extract."
    )]
    async fn table_inspect(&self, params: Parameters<TableInspectParams>) -> Result<CallToolResult, McpError> {
        inspect_impl(self.source.as_ref(), params.0).await
    }
}

impl ServerHandler for McpTabulaServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "mcp-tabula".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
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
