//! Multi-framework tools: task context and code compatibility.

use augments_core::AppContext;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{json_result, text_result};

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FrameworkContextParams {
    /// Frameworks used together, e.g. ["nextjs", "tailwindcss"].
    pub frameworks: Vec<String>,

    /// What you are building; excerpts mentioning its words come first.
    pub task_description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CodeCompatibilityParams {
    /// Source code to check.
    pub code: String,

    /// Frameworks whose known incompatible patterns apply.
    pub frameworks: Vec<String>,
}

pub async fn context_impl(ctx: &AppContext, params: FrameworkContextParams) -> Result<CallToolResult, McpError> {
    let context = ctx.get_framework_context(&params.frameworks, &params.task_description).await?;
    Ok(text_result(context))
}

pub fn compatibility_impl(ctx: &AppContext, params: CodeCompatibilityParams) -> Result<CallToolResult, McpError> {
    let report = ctx.analyze_code_compatibility(&params.code, &params.frameworks)?;
    json_result(&report)
}
