//! Unified error types for the documentation service.
//!
//! Each layer has its own enum so callers can match on the classification
//! they care about; [`Error`] is the boundary type every public call returns.

use std::path::PathBuf;
use std::sync::Arc;

use rmcp::model::{ErrorCode, ErrorData as McpError};

use crate::config::ConfigError;

/// Failures while loading the framework registry.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// The descriptor directory does not exist.
    #[error("REGISTRY_NOT_FOUND: descriptor directory {} does not exist", .0.display())]
    NotFound(PathBuf),

    /// The descriptor directory exists but could not be read.
    #[error("REGISTRY_IO: {}: {source}", path.display())]
    Io { path: PathBuf, source: std::io::Error },

    /// A single descriptor file could not be parsed or validated.
    #[error("MALFORMED_DESCRIPTOR: {}: {reason}", path.display())]
    MalformedDescriptor { path: PathBuf, reason: String },
}

/// Failures of the disk-backed documentation cache.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CacheError {
    /// Reading or writing the cache root failed.
    #[error("CACHE_IO: {}: {source}", path.display())]
    Io { path: PathBuf, source: Arc<std::io::Error> },

    /// A cache file exists but does not hold a valid entry for its key.
    #[error("CACHE_CORRUPT: {}: {reason}", path.display())]
    CorruptEntry { path: PathBuf, reason: String },
}

impl CacheError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CacheError::Io { path: path.into(), source: Arc::new(source) }
    }
}

/// Classified upstream failures.
///
/// Cloneable because one coalesced fetch result is handed to every waiter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// The requested resource does not exist upstream.
    #[error("UPSTREAM_NOT_FOUND: {0}")]
    NotFound(String),

    /// The upstream asked us to slow down.
    #[error("UPSTREAM_RATE_LIMITED: {0}")]
    RateLimited(String),

    /// Connection failures and 5xx responses.
    #[error("UPSTREAM_UNAVAILABLE: {0}")]
    TransientNetwork(String),

    /// The upstream answered with something we cannot use.
    #[error("UPSTREAM_FORMAT: {0}")]
    UpstreamFormat(String),

    /// The request exceeded its deadline.
    #[error("UPSTREAM_TIMEOUT: {0}")]
    Timeout(String),
}

impl ProviderError {
    /// Whether a stale cache entry may be served in place of this failure.
    ///
    /// `NotFound` never falls back: the resource genuinely does not exist.
    pub fn allows_stale_fallback(&self) -> bool {
        !matches!(self, ProviderError::NotFound(_))
    }

    /// Short machine-readable label used in logs and reports.
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderError::NotFound(_) => "not_found",
            ProviderError::RateLimited(_) => "rate_limited",
            ProviderError::TransientNetwork(_) => "transient_network",
            ProviderError::UpstreamFormat(_) => "upstream_format",
            ProviderError::Timeout(_) => "timeout",
        }
    }
}

/// Boundary error returned by every public operation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The framework is not present in the registry.
    #[error("FRAMEWORK_NOT_FOUND: {0}")]
    FrameworkNotFound(String),

    /// Every provider failed and no cached copy exists.
    #[error("ALL_SOURCES_FAILED: {framework}: {reason}")]
    AllSourcesFailed { framework: String, reason: String },

    /// Caller supplied an unusable argument.
    #[error("INVALID_ARGUMENT: {0}")]
    InvalidArgument(String),

    /// The shared components are not initialized (or were torn down).
    #[error("UNINITIALIZED: {0}")]
    Uninitialized(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("CONFIG_ERROR: {0}")]
    Config(#[from] ConfigError),
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let code = match &err {
            Error::InvalidArgument(_) => -32602,
            Error::FrameworkNotFound(_) => -32001,
            Error::AllSourcesFailed { .. } => -32002,
            Error::Uninitialized(_) => -32003,
            Error::Provider(ProviderError::NotFound(_)) => -32004,
            Error::Provider(ProviderError::RateLimited(_)) => -32005,
            Error::Provider(ProviderError::Timeout(_)) => -32006,
            Error::Provider(_) => -32007,
            Error::Cache(_) => -32008,
            Error::Registry(_) => -32009,
            Error::Config(_) => -32010,
        };

        McpError { code: ErrorCode(code), message: err.to_string().into(), data: None }
    }
}
