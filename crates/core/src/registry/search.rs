//! Lexical framework ranking.

use std::sync::Arc;

use serde::Serialize;

use super::descriptor::{FrameworkDescriptor, FrameworkSummary};

const MAX_QUERY_CHARS: usize = 200;

const EXACT_IDENTIFIER: u32 = 100;
const NAME_SUBSTRING: u32 = 50;
const NAME_PREFIX_BONUS: u32 = 10;
const TAG_SUBSTRING: u32 = 20;
const CATEGORY_MATCH: u32 = 10;
const TAG_TOKEN: u32 = 5;

/// A framework matched by [`Registry::search`](super::Registry::search).
#[derive(Debug, Clone)]
pub struct SearchMatch {
    pub descriptor: Arc<FrameworkDescriptor>,
    pub score: u32,
    pub matched_fields: Vec<&'static str>,
}

/// Boundary shape of a search match.
#[derive(Debug, Clone, Serialize)]
pub struct RankedFramework {
    #[serde(flatten)]
    pub framework: FrameworkSummary,
    pub score: u32,
    pub matched_fields: Vec<&'static str>,
}

impl From<&SearchMatch> for RankedFramework {
    fn from(m: &SearchMatch) -> Self {
        Self {
            framework: FrameworkSummary::from(m.descriptor.as_ref()),
            score: m.score,
            matched_fields: m.matched_fields.clone(),
        }
    }
}

/// Trim, lowercase and cap a raw query. Returns `None` for blank input.
pub fn normalize_query(query: &str) -> Option<String> {
    let normalized: String = query.trim().to_lowercase().chars().take(MAX_QUERY_CHARS).collect();
    (!normalized.is_empty()).then_some(normalized)
}

/// Score one descriptor against a normalized query; zero means no match.
pub fn score(descriptor: &FrameworkDescriptor, query: &str) -> (u32, Vec<&'static str>) {
    let mut score = 0;
    let mut fields = Vec::new();

    let display = descriptor.display_name.to_lowercase();
    if descriptor.name == query {
        score += EXACT_IDENTIFIER;
        fields.push("name");
    } else if descriptor.name.contains(query) || display.contains(query) {
        score += NAME_SUBSTRING;
        if descriptor.name.starts_with(query) || display.starts_with(query) {
            score += NAME_PREFIX_BONUS;
        }
        fields.push(if descriptor.name.contains(query) { "name" } else { "display_name" });
    }

    let tags: Vec<String> = descriptor.search_tags().collect();
    if tags.iter().any(|t| t.contains(query)) {
        score += TAG_SUBSTRING;
        fields.push("tags");
    }

    if descriptor.category.as_str() == query {
        score += CATEGORY_MATCH;
        fields.push("category");
    }

    let overlap = query.split_whitespace().filter(|token| tags.iter().any(|t| t == token)).count() as u32;
    if overlap > 0 {
        score += TAG_TOKEN * overlap;
        if !fields.contains(&"tags") {
            fields.push("tags");
        }
    }

    (score, fields)
}

/// Rank descriptors by score descending, identifier ascending on ties.
pub fn rank<'a>(descriptors: impl IntoIterator<Item = &'a Arc<FrameworkDescriptor>>, query: &str) -> Vec<SearchMatch> {
    let Some(query) = normalize_query(query) else {
        return Vec::new();
    };

    let mut matches: Vec<SearchMatch> = descriptors
        .into_iter()
        .filter_map(|d| {
            let (score, matched_fields) = score(d, &query);
            (score > 0).then(|| SearchMatch { descriptor: Arc::clone(d), score, matched_fields })
        })
        .collect();

    matches.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.descriptor.name.cmp(&b.descriptor.name)));
    matches
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Category;
    use crate::registry::descriptor::{SourceSpec, Sources};
    use std::collections::BTreeMap;

    fn descriptor(name: &str, category: Category, tags: &[&str]) -> Arc<FrameworkDescriptor> {
        Arc::new(FrameworkDescriptor {
            name: name.into(),
            display_name: name.into(),
            category,
            framework_type: String::new(),
            version: "latest".into(),
            description: String::new(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            sources: Sources {
                documentation: SourceSpec { github: None, website: Some(format!("https://{name}.dev")) },
                examples: None,
            },
            sections: BTreeMap::new(),
            context_files: vec![],
            key_features: vec![],
            common_patterns: vec![],
            priority: 50,
            incompatible_patterns: vec![],
        })
    }

    #[test]
    fn test_normalize_query() {
        assert_eq!(normalize_query("  React "), Some("react".into()));
        assert_eq!(normalize_query("   "), None);
        assert_eq!(normalize_query(&"a".repeat(500)).map(|q| q.len()), Some(200));
    }

    #[test]
    fn test_exact_identifier_beats_substring() {
        let all = [descriptor("react", Category::Web, &[]), descriptor("react-native", Category::Mobile, &[])];
        let ranked = rank(&all, "react");
        assert_eq!(ranked[0].descriptor.name, "react");
        assert_eq!(ranked[0].score, 100);
        assert_eq!(ranked[1].score, 60);
    }

    #[test]
    fn test_identifier_prefix_beats_tag_match() {
        let all = [
            descriptor("laravel", Category::Backend, &["php", "detail"]),
            descriptor("react", Category::Web, &["ui"]),
            descriptor("tailwindcss", Category::Web, &["css", "utility"]),
        ];
        let ranked = rank(&all, "tail");
        assert_eq!(ranked[0].descriptor.name, "tailwindcss");
        assert_eq!(ranked[1].descriptor.name, "laravel");
        assert_eq!(ranked[1].matched_fields, vec!["tags"]);
        assert_eq!(ranked.len(), 2);
    }

    #[test]
    fn test_ties_break_by_identifier() {
        let all = [descriptor("zod", Category::Tools, &["schema"]), descriptor("ajv", Category::Tools, &["schema"])];
        let ranked = rank(&all, "schema");
        let names: Vec<_> = ranked.iter().map(|m| m.descriptor.name.as_str()).collect();
        assert_eq!(names, vec!["ajv", "zod"]);
    }

    #[test]
    fn test_category_and_token_overlap() {
        let all = [descriptor("prisma", Category::Backend, &["orm", "database"])];
        let (score, fields) = super::score(&all[0], "backend");
        assert_eq!(score, 10);
        assert_eq!(fields, vec!["category"]);

        let (score, _) = super::score(&all[0], "orm database");
        assert_eq!(score, 10);
    }

    #[test]
    fn test_no_match_is_empty() {
        let all = [descriptor("react", Category::Web, &["ui"])];
        assert!(rank(&all, "nothing-like-this").is_empty());
        assert!(rank(&all, "  ").is_empty());
    }
}
