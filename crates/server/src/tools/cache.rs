//! Cache maintenance tools: update checks, refresh and statistics.

use augments_core::AppContext;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CheckUpdatesParams {
    pub framework: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct RefreshCacheParams {
    /// Framework to refresh. Omit to refresh every registered framework.
    #[serde(default)]
    pub framework: Option<String>,

    /// Refetch even when the cached copy is still fresh.
    #[serde(default)]
    pub force: bool,
}

pub async fn updates_impl(ctx: &AppContext, params: CheckUpdatesParams) -> Result<CallToolResult, McpError> {
    let report = ctx.check_framework_updates(&params.framework).await?;
    json_result(&report)
}

pub async fn refresh_impl(ctx: &AppContext, params: RefreshCacheParams) -> Result<CallToolResult, McpError> {
    let report = ctx.refresh_framework_cache(params.framework.as_deref(), params.force).await?;
    json_result(&report)
}

pub fn cache_stats_impl(ctx: &AppContext) -> Result<CallToolResult, McpError> {
    json_result(&ctx.get_cache_statistics()?)
}

pub fn registry_stats_impl(ctx: &AppContext) -> Result<CallToolResult, McpError> {
    json_result(&ctx.get_registry_stats()?)
}
