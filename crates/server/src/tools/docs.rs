//! Documentation tools: docs, examples and in-docs search.

use augments_core::AppContext;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{json_result, text_result};

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FrameworkDocsParams {
    /// Framework identifier, e.g. "nextjs".
    pub framework: String,

    /// Documentation section, e.g. "routing". Omit for the default page.
    #[serde(default)]
    pub section: Option<String>,

    /// Serve a fresh cached copy when one exists (default: true).
    #[serde(default = "default_true")]
    pub use_cache: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FrameworkExamplesParams {
    pub framework: String,

    /// Only examples whose code or title mentions this pattern.
    #[serde(default)]
    pub pattern: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SearchDocumentationParams {
    pub framework: String,
    pub query: String,

    /// Maximum hits (default: 10, clamped to 1..=50).
    #[serde(default)]
    pub limit: Option<usize>,
}

pub async fn docs_impl(ctx: &AppContext, params: FrameworkDocsParams) -> Result<CallToolResult, McpError> {
    let docs = ctx
        .get_framework_docs(&params.framework, params.section.as_deref(), params.use_cache)
        .await?;
    Ok(text_result(docs))
}

pub async fn examples_impl(ctx: &AppContext, params: FrameworkExamplesParams) -> Result<CallToolResult, McpError> {
    let examples = ctx.get_framework_examples(&params.framework, params.pattern.as_deref()).await?;
    Ok(text_result(examples))
}

pub async fn search_impl(ctx: &AppContext, params: SearchDocumentationParams) -> Result<CallToolResult, McpError> {
    let hits = ctx.search_documentation(&params.framework, &params.query, params.limit).await?;
    json_result(&hits)
}
