//! Readable content extraction for documentation pages.
//!
//! ### Primary Algorithm
//! - Lectito's extraction pipeline (Readability.js-inspired) selects the main
//!   content and converts it to Markdown.
//!
//! ### Fallback
//! - Pages Lectito rejects (too short, navigation-heavy reference pages) are
//!   reduced by [`markup::strip_markup`] instead, so a page with any text
//!   still yields a document.
//!
//! ### Output Normalization
//! - Consistent frontmatter header: `title`, `source`, `fetched_at`, `extractor`.

pub mod examples;
pub mod markup;
pub mod normalize;

pub use examples::{CodeExample, fenced_blocks, html_examples, render_examples};
pub use markup::strip_markup;
pub use normalize::{ExtractedDoc, normalize_markdown};

use augments_core::ProviderError;
use lectito_core::{Document, ExtractConfig as LectitoConfig};

pub const LECTITO_VERSION: &str = "lectito-core@0.2.0";
pub const FALLBACK_VERSION: &str = "markup-strip";

/// Configuration for content extraction.
#[derive(Debug, Clone)]
pub struct ExtractConfig {
    /// Minimum character count for content (default: 200)
    pub char_threshold: Option<usize>,

    /// Maximum number of top candidates to consider (default: 5)
    pub max_top_candidates: Option<usize>,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self { char_threshold: Some(200), max_top_candidates: Some(5) }
    }
}

impl ExtractConfig {
    fn to_lectito_config(&self) -> LectitoConfig {
        let mut cfg = LectitoConfig::default();
        if let Some(threshold) = self.char_threshold {
            cfg.char_threshold = threshold;
        }
        if let Some(max) = self.max_top_candidates {
            cfg.max_top_candidates = max;
        }
        cfg
    }
}

fn lectito(html: &str, config: &ExtractConfig) -> Result<ExtractedDoc, String> {
    let doc = Document::parse(html).map_err(|e| format!("failed to parse HTML: {e}"))?;
    let extracted = lectito_core::extract_content(&doc, &config.to_lectito_config()).map_err(|e| format!("extraction failed: {e}"))?;

    let metadata = doc.extract_metadata();
    let markdown = lectito_core::convert_to_markdown(&extracted.content, &metadata, &Default::default())
        .map_err(|e| format!("markdown conversion failed: {e}"))?;

    Ok(ExtractedDoc { title: metadata.title.clone(), markdown, extractor_version: LECTITO_VERSION.to_string() })
}

/// Extract a page's readable content as Markdown.
///
/// # Errors
///
/// `UpstreamFormat` when neither the extractor nor the markup fallback
/// finds any text.
pub fn extract_readable(html: &str, config: &ExtractConfig) -> Result<ExtractedDoc, ProviderError> {
    match lectito(html, config) {
        Ok(doc) if !doc.markdown.trim().is_empty() => return Ok(doc),
        Ok(_) => tracing::debug!("readability extraction produced no text, stripping markup"),
        Err(reason) => tracing::debug!(reason = %reason, "readability extraction failed, stripping markup"),
    }

    let stripped = strip_markup(html);
    if stripped.markdown.trim().is_empty() {
        return Err(ProviderError::UpstreamFormat("page has no extractable text".into()));
    }
    Ok(stripped)
}
