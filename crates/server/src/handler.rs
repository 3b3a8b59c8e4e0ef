//! MCP server handler implementation.
//!
//! Routes tool calls to the documentation service held by the shared
//! [`AppContext`].

use std::sync::Arc;

use augments_core::AppContext;
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

use crate::tools::cache::{CheckUpdatesParams, RefreshCacheParams, cache_stats_impl, refresh_impl, registry_stats_impl, updates_impl};
use crate::tools::context::{CodeCompatibilityParams, FrameworkContextParams, compatibility_impl, context_impl};
use crate::tools::docs::{FrameworkDocsParams, FrameworkExamplesParams, SearchDocumentationParams, docs_impl, examples_impl};
use crate::tools::frameworks::{FrameworkInfoParams, ListFrameworksParams, SearchFrameworksParams, info_impl, list_impl};
use crate::tools::{docs, frameworks};

const INSTRUCTIONS: &str = "Framework documentation for coding tasks. Use list_frameworks or search_frameworks to \
find an identifier, get_framework_docs and get_framework_examples for content, get_framework_context when several \
frameworks are combined, and analyze_code_compatibility to check code against known incompatible patterns.";

/// The MCP server handler for the documentation service.
#[derive(Clone)]
pub struct AugmentsServer {
    ctx: Arc<AppContext>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl AugmentsServer {
    pub fn new(ctx: Arc<AppContext>) -> Self {
        Self { ctx, tool_router: Self::tool_router() }
    }

    #[tool(description = "List registered frameworks, optionally filtered by category (web, backend, mobile, ai-ml, design, tools, other).")]
    async fn list_frameworks(&self, params: Parameters<ListFrameworksParams>) -> Result<CallToolResult, McpError> {
        list_impl(&self.ctx, params.0)
    }

    #[tool(description = "Search frameworks by name, tag or feature. Results are ranked by relevance score.")]
    async fn search_frameworks(&self, params: Parameters<SearchFrameworksParams>) -> Result<CallToolResult, McpError> {
        frameworks::search_impl(&self.ctx, params.0)
    }

    #[tool(description = "Full descriptor of one framework: sources, sections, features and provider binding.")]
    async fn get_framework_info(&self, params: Parameters<FrameworkInfoParams>) -> Result<CallToolResult, McpError> {
        info_impl(&self.ctx, params.0)
    }

    #[tool(description = "Documentation for a framework as Markdown, optionally for one section. Served from cache when fresh.")]
    async fn get_framework_docs(&self, params: Parameters<FrameworkDocsParams>) -> Result<CallToolResult, McpError> {
        docs_impl(&self.ctx, params.0).await
    }

    #[tool(description = "Code examples for a framework, optionally filtered by a pattern such as a hook or component name.")]
    async fn get_framework_examples(&self, params: Parameters<FrameworkExamplesParams>) -> Result<CallToolResult, McpError> {
        examples_impl(&self.ctx, params.0).await
    }

    #[tool(description = "Search within a framework's documentation. Returns ranked excerpts (limit 1-50, default 10).")]
    async fn search_documentation(&self, params: Parameters<SearchDocumentationParams>) -> Result<CallToolResult, McpError> {
        docs::search_impl(&self.ctx, params.0).await
    }

    #[tool(description = "Combined documentation excerpts for several frameworks, focused on a task description.")]
    async fn get_framework_context(&self, params: Parameters<FrameworkContextParams>) -> Result<CallToolResult, McpError> {
        context_impl(&self.ctx, params.0).await
    }

    #[tool(description = "Check code against known incompatible patterns of the given frameworks. Heuristic, line-based.")]
    async fn analyze_code_compatibility(&self, params: Parameters<CodeCompatibilityParams>) -> Result<CallToolResult, McpError> {
        compatibility_impl(&self.ctx, params.0)
    }

    #[tool(description = "Compare the cached documentation of a framework with its upstream source.")]
    async fn check_framework_updates(&self, params: Parameters<CheckUpdatesParams>) -> Result<CallToolResult, McpError> {
        updates_impl(&self.ctx, params.0).await
    }

    #[tool(description = "Refresh cached documentation for one framework or all of them. Stale copies survive failed refreshes.")]
    async fn refresh_framework_cache(&self, params: Parameters<RefreshCacheParams>) -> Result<CallToolResult, McpError> {
        refresh_impl(&self.ctx, params.0).await
    }

    #[tool(description = "Cache hit/miss counters, stored bytes and per-framework entries.")]
    async fn get_cache_stats(&self) -> Result<CallToolResult, McpError> {
        cache_stats_impl(&self.ctx)
    }

    #[tool(description = "Registry totals: frameworks per category and skipped descriptor files.")]
    async fn get_registry_stats(&self) -> Result<CallToolResult, McpError> {
        registry_stats_impl(&self.ctx)
    }
}

impl ServerHandler for AugmentsServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "augments-mcp".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            instructions: Some(INSTRUCTIONS.into()),
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_boundary_call_is_a_tool() {
        let server = AugmentsServer::new(Arc::new(AppContext::new()));
        let mut names: Vec<String> = server.tool_router.list_all().into_iter().map(|t| t.name.to_string()).collect();
        names.sort();
        assert_eq!(names, vec![
            "analyze_code_compatibility",
            "check_framework_updates",
            "get_cache_stats",
            "get_framework_context",
            "get_framework_docs",
            "get_framework_examples",
            "get_framework_info",
            "get_registry_stats",
            "list_frameworks",
            "refresh_framework_cache",
            "search_documentation",
            "search_frameworks",
        ]);
    }

    #[test]
    fn test_server_info() {
        let info = AugmentsServer::new(Arc::new(AppContext::new())).get_info();
        assert_eq!(info.server_info.name, "augments-mcp");
        assert!(info.capabilities.tools.is_some());
    }
}
