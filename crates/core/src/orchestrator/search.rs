//! Keyword search over cached documentation.

use serde::{Deserialize, Serialize};

use super::DocsService;
use crate::cache::{CacheEntry, CacheKey, ContentKind, signature_of};
use crate::error::Error;
use crate::registry::normalize_query;

pub const MAX_SEARCH_RESULTS: usize = 50;
/// Memoized queries kept per framework.
const MAX_MEMOIZED_QUERIES: usize = 64;
const SNIPPET_CHARS: usize = 320;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub framework: String,
    /// Cached section the hit came from; `None` for the default document.
    pub section: Option<String>,
    /// Nearest heading above the matching block.
    pub heading: Option<String>,
    /// 1-based line where the block starts.
    pub line: usize,
    /// Query-term occurrences per 100 characters of the block.
    pub score: f64,
    pub snippet: String,
}

/// A paragraph-like run of lines, split at blank lines and headings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Block {
    pub heading: Option<String>,
    pub line: usize,
    pub text: String,
}

pub(crate) fn split_blocks(content: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut heading: Option<String> = None;
    let mut current: Vec<&str> = Vec::new();
    let mut start = 0;
    let mut in_fence = false;

    let flush = |current: &mut Vec<&str>, blocks: &mut Vec<Block>, heading: &Option<String>, start: usize| {
        if !current.is_empty() {
            blocks.push(Block { heading: heading.clone(), line: start, text: current.join("\n") });
            current.clear();
        }
    };

    for (idx, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.starts_with("```") {
            in_fence = !in_fence;
        }

        if !in_fence && trimmed.is_empty() {
            // A heading stays attached to the paragraph below it.
            let only_heading = current.len() == 1 && current[0].trim_start().starts_with('#');
            if !only_heading {
                flush(&mut current, &mut blocks, &heading, start);
            }
            continue;
        }

        if !in_fence && trimmed.starts_with('#') {
            flush(&mut current, &mut blocks, &heading, start);
            heading = Some(trimmed.trim_start_matches('#').trim().to_string());
        }

        if current.is_empty() {
            start = idx + 1;
        }
        current.push(line);
    }
    flush(&mut current, &mut blocks, &heading, start);
    blocks
}

/// Occurrences of the query terms per 100 characters of `text`.
pub(crate) fn density(text: &str, terms: &[&str]) -> f64 {
    let lower = text.to_lowercase();
    let occurrences: usize = terms.iter().map(|term| lower.matches(term).count()).sum();
    if occurrences == 0 {
        return 0.0;
    }
    let chars = lower.chars().count().max(1);
    occurrences as f64 * 100.0 / chars as f64
}

pub(crate) fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", text[..idx].trim_end()),
        None => text.to_string(),
    }
}

/// Rank blocks from `(section, content)` documents in document order.
fn rank(framework: &str, documents: &[(Option<String>, String)], query: &str) -> Vec<SearchHit> {
    let terms: Vec<&str> = query.split_whitespace().collect();
    let mut scored = Vec::new();

    for (order, (section, content)) in documents.iter().enumerate() {
        for block in split_blocks(content) {
            let score = density(&block.text, &terms);
            if score == 0.0 {
                continue;
            }
            let hit = SearchHit {
                framework: framework.to_string(),
                section: section.clone(),
                heading: block.heading,
                line: block.line,
                score: (score * 100.0).round() / 100.0,
                snippet: truncate_chars(block.text.trim(), SNIPPET_CHARS),
            };
            scored.push((order, hit));
        }
    }

    scored.sort_by(|(order_a, a), (order_b, b)| {
        b.score.total_cmp(&a.score).then(order_a.cmp(order_b)).then(a.line.cmp(&b.line))
    });
    scored.into_iter().map(|(_, hit)| hit).take(MAX_SEARCH_RESULTS).collect()
}

impl DocsService {
    /// Search cached documentation for a framework.
    ///
    /// The default docs are fetched first (cache-first) so a cold framework
    /// has something to search; a failed fetch is logged and the search runs
    /// over whatever is cached. Results are memoized per query under the
    /// search-index content kind, stamped with the signature of the docs
    /// they were ranked from; a memo whose docs have since changed is
    /// rebuilt.
    ///
    /// # Errors
    ///
    /// `FrameworkNotFound` for unknown frameworks, `InvalidArgument` for a
    /// blank query.
    pub async fn search_documentation(&self, framework: &str, query: &str, limit: usize) -> Result<Vec<SearchHit>, Error> {
        let descriptor = self.resolve(framework)?;
        let query = normalize_query(query).ok_or_else(|| Error::InvalidArgument("query must not be empty".into()))?;
        let limit = limit.clamp(1, MAX_SEARCH_RESULTS);

        if let Err(err) = self.get_framework_docs(&descriptor.name, None, true).await {
            tracing::warn!(framework = %descriptor.name, error = %err, "could not populate docs before search");
        }

        let index_key = CacheKey::search_index(&descriptor.name, &query);
        if let Some(entry) = self.cache.get(&index_key).await {
            let current = self.cache.signature(&descriptor.name, ContentKind::Docs);
            if entry.fingerprint.as_deref() != Some(current.as_str()) {
                tracing::debug!(key = %index_key, "search index built from older docs, rebuilding");
            } else {
                match serde_json::from_str::<Vec<SearchHit>>(&entry.content) {
                    Ok(mut hits) => {
                        hits.truncate(limit);
                        return Ok(hits);
                    }
                    Err(err) => tracing::warn!(key = %index_key, error = %err, "ignoring unreadable search index entry"),
                }
            }
        }

        let mut sources = Vec::new();
        let mut documents = Vec::new();
        for key in self.cache.keys_for(&descriptor.name, ContentKind::Docs) {
            if let Some(entry) = self.cache.peek(&key).await {
                documents.push((key.section().map(str::to_string), entry.content));
                sources.push((key, entry.fetched_at));
            }
        }
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        let mut hits = rank(&descriptor.name, &documents, &query);
        let signature = signature_of(sources.iter().map(|(key, at)| (key, *at)));
        match serde_json::to_string(&hits) {
            Ok(json) => self.store_search_index(&index_key, CacheEntry::new(json, Some(signature))).await,
            Err(err) => tracing::warn!(key = %index_key, error = %err, "failed to encode search index"),
        }

        hits.truncate(limit);
        Ok(hits)
    }

    async fn store_search_index(&self, key: &CacheKey, entry: CacheEntry) {
        if let Err(err) = self.cache.put(key, &entry).await {
            tracing::warn!(key = %key, error = %err, "failed to store search index");
            return;
        }
        if let Err(err) = self.cache.prune_kind(&key.framework, ContentKind::SearchIndex, MAX_MEMOIZED_QUERIES).await {
            tracing::warn!(framework = %key.framework, error = %err, "failed to prune search index");
        }
    }
}
