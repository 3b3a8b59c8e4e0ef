//! Registry tools: listing, search and framework details.

use augments_core::{AppContext, Error};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ListFrameworksParams {
    /// Restrict to one category: web, backend, mobile, ai-ml, design, tools or other.
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SearchFrameworksParams {
    /// Free-text query matched against names, tags and features.
    pub query: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FrameworkInfoParams {
    /// Framework identifier, e.g. "react".
    pub framework: String,
}

pub fn list_impl(ctx: &AppContext, params: ListFrameworksParams) -> Result<CallToolResult, McpError> {
    let frameworks = ctx.list_frameworks(params.category.as_deref())?;
    json_result(&frameworks)
}

pub fn search_impl(ctx: &AppContext, params: SearchFrameworksParams) -> Result<CallToolResult, McpError> {
    let ranked = ctx.search_frameworks(&params.query)?;
    json_result(&ranked)
}

/// An unknown framework is reported as `FRAMEWORK_NOT_FOUND` rather than `null`.
pub fn info_impl(ctx: &AppContext, params: FrameworkInfoParams) -> Result<CallToolResult, McpError> {
    let detail = ctx
        .get_framework_info(&params.framework)?
        .ok_or_else(|| Error::FrameworkNotFound(params.framework.trim().to_string()))?;
    json_result(&detail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{context, json};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_list_by_category() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir).await;

        let result = list_impl(&ctx, ListFrameworksParams { category: Some("web".into()) }).unwrap();
        let names: Vec<String> = json(&result)
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["react", "tailwindcss"]);
    }

    #[tokio::test]
    async fn test_unknown_category_is_invalid() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir).await;

        let err = list_impl(&ctx, ListFrameworksParams { category: Some("desktop".into()) }).unwrap_err();
        assert_eq!(err.code.0, -32602);
    }

    #[tokio::test]
    async fn test_search_ranks_name_match_first() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir).await;

        let result = search_impl(&ctx, SearchFrameworksParams { query: "tail".into() }).unwrap();
        let ranked = json(&result);
        assert_eq!(ranked[0]["name"], "tailwindcss");
        assert!(ranked[0]["score"].as_u64().unwrap() > 0);
    }

    #[tokio::test]
    async fn test_info_includes_providers() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir).await;

        let result = info_impl(&ctx, FrameworkInfoParams { framework: "Laravel".into() }).unwrap();
        let detail = json(&result);
        assert_eq!(detail["name"], "laravel");
        assert_eq!(detail["providers"], serde_json::json!(["github"]));

        let err = info_impl(&ctx, FrameworkInfoParams { framework: "vue".into() }).unwrap_err();
        assert_eq!(err.code.0, -32001);
    }
}
