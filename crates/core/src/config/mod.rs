//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (AUGMENTS_*)
//! 2. TOML config file (if AUGMENTS_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::cache::ContentKind;

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (AUGMENTS_*)
/// 2. TOML config file (if AUGMENTS_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Root directory of the documentation cache.
    ///
    /// Set via AUGMENTS_CACHE_DIR environment variable.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Directory holding framework descriptor files.
    ///
    /// Set via AUGMENTS_FRAMEWORKS_DIR environment variable.
    #[serde(default = "default_frameworks_dir")]
    pub frameworks_dir: PathBuf,

    /// GitHub API token.
    ///
    /// Set via AUGMENTS_GITHUB_TOKEN, or GITHUB_TOKEN as a fallback.
    /// Unauthenticated requests work but hit much lower rate limits.
    #[serde(default)]
    pub github_token: Option<String>,

    /// Base URL of the GitHub REST API.
    #[serde(default = "default_github_api_url")]
    pub github_api_url: String,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via AUGMENTS_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Website request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// GitHub API request timeout in milliseconds.
    #[serde(default = "default_github_timeout_ms")]
    pub github_timeout_ms: u64,

    /// Maximum bytes to accept per upstream response.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Freshness windows per content kind.
    #[serde(default)]
    pub ttl: TtlConfig,

    /// Whether to pre-warm popular frameworks at startup.
    #[serde(default = "default_true")]
    pub warm_on_start: bool,

    /// Framework identifiers pre-warmed at startup.
    ///
    /// Set via AUGMENTS_WARM_FRAMEWORKS environment variable (comma-separated).
    #[serde(default = "default_warm_frameworks")]
    pub warm_frameworks: Vec<String>,

    /// Upper bound on characters taken from each framework when building
    /// a combined context document.
    #[serde(default = "default_context_excerpt_chars")]
    pub context_excerpt_chars: usize,
}

/// Per-kind cache freshness windows, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TtlConfig {
    #[serde(default = "default_docs_ttl")]
    pub docs_secs: u64,
    #[serde(default = "default_examples_ttl")]
    pub examples_secs: u64,
    #[serde(default = "default_search_index_ttl")]
    pub search_index_secs: u64,
}

impl TtlConfig {
    /// Freshness window for the given content kind.
    pub fn for_kind(&self, kind: ContentKind) -> Duration {
        let secs = match kind {
            ContentKind::Docs => self.docs_secs,
            ContentKind::Examples => self.examples_secs,
            ContentKind::SearchIndex => self.search_index_secs,
        };
        Duration::from_secs(secs)
    }
}

impl Default for TtlConfig {
    fn default() -> Self {
        Self {
            docs_secs: default_docs_ttl(),
            examples_secs: default_examples_ttl(),
            search_index_secs: default_search_index_ttl(),
        }
    }
}

fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .map(|dir| dir.join("augments"))
        .unwrap_or_else(|| PathBuf::from("./.augments-cache"))
}

fn default_frameworks_dir() -> PathBuf {
    PathBuf::from("./frameworks")
}

fn default_github_api_url() -> String {
    "https://api.github.com".into()
}

fn default_user_agent() -> String {
    "augments-mcp/0.1 (documentation fetcher)".into()
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_github_timeout_ms() -> u64 {
    15_000
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_docs_ttl() -> u64 {
    6 * 60 * 60
}

fn default_examples_ttl() -> u64 {
    12 * 60 * 60
}

fn default_search_index_ttl() -> u64 {
    60 * 60
}

fn default_true() -> bool {
    true
}

fn default_warm_frameworks() -> Vec<String> {
    ["nextjs", "react", "tailwindcss", "typescript", "shadcn-ui"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_context_excerpt_chars() -> usize {
    4_000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            frameworks_dir: default_frameworks_dir(),
            github_token: None,
            github_api_url: default_github_api_url(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            github_timeout_ms: default_github_timeout_ms(),
            max_bytes: default_max_bytes(),
            ttl: TtlConfig::default(),
            warm_on_start: true,
            warm_frameworks: default_warm_frameworks(),
            context_excerpt_chars: default_context_excerpt_chars(),
        }
    }
}

impl AppConfig {
    /// Website timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// GitHub API timeout as Duration.
    pub fn github_timeout(&self) -> Duration {
        Duration::from_millis(self.github_timeout_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `AUGMENTS_`
    /// 2. TOML file from `AUGMENTS_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("AUGMENTS_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("AUGMENTS_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let mut config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        if config.github_token.is_none() {
            config.github_token = std::env::var("GITHUB_TOKEN").ok().filter(|t| !t.trim().is_empty());
        }

        config.validate()?;

        Ok(config)
    }

    /// GitHub token, if one was configured.
    pub fn github_token(&self) -> Option<&str> {
        self.github_token.as_deref().filter(|t| !t.is_empty())
    }
}
