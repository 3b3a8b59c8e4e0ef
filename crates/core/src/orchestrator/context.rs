//! Combined multi-framework context documents.

use super::search::{Block, split_blocks, truncate_chars};
use super::{DocsService, Retrieved};
use crate::error::Error;
use crate::registry::normalize_identifier;

const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "with", "that", "this", "from", "into", "using", "use", "how", "what", "when", "where",
    "which", "want", "need", "build", "make", "create", "app", "application",
];

/// Lowercased words of the task worth matching against documentation.
fn task_keywords(task: &str) -> Vec<String> {
    let mut words: Vec<String> = task
        .split(|c: char| !c.is_alphanumeric() && c != '-' && c != '_')
        .map(str::to_lowercase)
        .filter(|w| w.chars().count() >= 3 && !STOP_WORDS.contains(&w.as_str()))
        .collect();
    words.sort();
    words.dedup();
    words
}

/// Pick blocks mentioning the task first, then the rest in document order,
/// until `budget` characters are used.
fn excerpt(content: &str, keywords: &[String], budget: usize) -> String {
    let blocks = split_blocks(content);
    let relevant = |b: &Block| {
        let lower = b.text.to_lowercase();
        keywords.iter().any(|k| lower.contains(k.as_str()))
    };

    let (mut ordered, rest): (Vec<usize>, Vec<usize>) = (0..blocks.len()).partition(|&i| relevant(&blocks[i]));
    ordered.extend(rest);

    let mut chosen = Vec::new();
    let mut used = 0;
    for idx in ordered {
        let len = blocks[idx].text.chars().count();
        if used + len > budget {
            if chosen.is_empty() {
                chosen.push((idx, truncate_chars(&blocks[idx].text, budget)));
            }
            break;
        }
        used += len + 2;
        chosen.push((idx, blocks[idx].text.clone()));
    }

    // Reading order reads better than relevance order.
    chosen.sort_by_key(|(idx, _)| *idx);
    chosen.into_iter().map(|(_, text)| text).collect::<Vec<_>>().join("\n\n")
}

impl DocsService {
    /// Build one labeled document from several frameworks' docs.
    ///
    /// Frameworks that cannot be resolved or fetched are skipped and listed
    /// at the end; they never fail the whole call.
    pub async fn get_framework_context(&self, frameworks: &[String], task: &str) -> Result<String, Error> {
        let keywords = task_keywords(task);
        let mut seen = Vec::new();
        let mut sections = Vec::new();
        let mut skipped = Vec::new();

        for framework in frameworks {
            let id = normalize_identifier(framework);
            if id.is_empty() || seen.contains(&id) {
                continue;
            }
            seen.push(id.clone());

            match self.get_framework_docs(&id, None, true).await {
                Ok(retrieved) => sections.push(self.render_section(&retrieved, &keywords)),
                Err(err) => {
                    tracing::warn!(framework = %id, error = %err, "skipping framework in combined context");
                    skipped.push(format!("{id} ({err})"));
                }
            }
        }

        let mut doc = format!("# Framework context\n\nTask: {}\n", task.trim());
        for section in sections {
            doc.push_str("\n---\n\n");
            doc.push_str(&section);
            doc.push('\n');
        }
        if !skipped.is_empty() {
            doc.push_str(&format!("\n> Skipped frameworks: {}\n", skipped.join("; ")));
        }
        Ok(doc)
    }

    fn render_section(&self, retrieved: &Retrieved, keywords: &[String]) -> String {
        let title = self
            .registry
            .get(&retrieved.framework)
            .map(|d| d.display_name.clone())
            .unwrap_or_else(|| retrieved.framework.clone());

        let mut section = format!("## {title} ({})\n\n", retrieved.framework);
        if retrieved.is_stale() {
            section.push_str("> Cached copy; the upstream could not be reached.\n\n");
        }
        section.push_str(&excerpt(&retrieved.content, keywords, self.context_excerpt_chars));
        section
    }
}
