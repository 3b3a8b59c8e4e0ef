//! MCP tool implementations.
//!
//! Argument checks live in [`AppContext`](augments_core::AppContext); the
//! tools only map parameters in and results out.

pub mod cache;
pub mod context;
pub mod docs;
pub mod frameworks;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;

/// Pretty JSON tool result.
pub(crate) fn json_result<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| McpError::internal_error(format!("failed to serialize result: {e}"), None))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

/// Markdown tool result.
pub(crate) fn text_result(text: String) -> CallToolResult {
    CallToolResult::success(vec![Content::text(text)])
}
