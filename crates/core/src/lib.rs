//! Core of the framework documentation service.
//!
//! This crate provides:
//! - Framework registry loaded from JSON descriptors
//! - Disk-backed documentation cache with fetch coalescing
//! - Provider contract implemented by `augments-client`
//! - Documentation service composing registry, cache and providers
//! - Background cache warmer and the application context
//! - Unified error types and configuration

pub mod app;
pub mod cache;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod provider;
pub mod registry;
pub mod warmer;

#[cfg(test)]
pub(crate) mod testing;

pub use app::AppContext;
pub use cache::{CacheEntry, CacheKey, ContentKind, DocumentationCache};
pub use config::AppConfig;
pub use error::{CacheError, Error, ProviderError, RegistryError};
pub use orchestrator::DocsService;
pub use provider::{DocProvider, FreshnessStatus, ProviderKind, ProviderSet, RawContent};
pub use registry::{Category, FrameworkDescriptor, Registry};
