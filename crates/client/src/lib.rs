//! Upstream providers for the documentation service.
//!
//! This crate provides the HTTP fetch pipeline, readable content extraction,
//! and the two [`DocProvider`](augments_core::DocProvider) implementations:
//! GitHub repositories and documentation websites.

pub mod extract;
pub mod fetch;
pub mod github;
pub mod website;

use std::sync::Arc;

use augments_core::{AppConfig, ProviderError, ProviderSet};

pub use extract::{CodeExample, ExtractConfig, ExtractedDoc, extract_readable, normalize_markdown};
pub use fetch::{FetchClient, FetchConfig, FetchResponse};
pub use github::{GitHubConfig, GitHubProvider};
pub use website::WebsiteProvider;

/// Build both providers from the application config.
pub fn build_providers(config: &AppConfig) -> Result<ProviderSet, ProviderError> {
    let github = GitHubProvider::new(GitHubConfig::from_app_config(config))?;
    let website = WebsiteProvider::from_app_config(config)?;
    Ok(ProviderSet::new().with(Arc::new(github)).with(Arc::new(website)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use augments_core::ProviderKind;

    #[test]
    fn test_build_providers_registers_both_kinds() {
        let set = build_providers(&AppConfig::default()).unwrap();
        assert_eq!(set.kinds(), vec![ProviderKind::GitHub, ProviderKind::Website]);
    }
}
