//! Heuristic code compatibility checks.
//!
//! This is a line-by-line pattern scan against each framework's known
//! incompatible patterns, not a parser. It cannot see through aliasing,
//! comments or strings, and a clean report does not prove compatibility.

use std::sync::Arc;

use regex::Regex;
use serde::Serialize;

use super::DocsService;
use crate::error::Error;
use crate::registry::{FrameworkDescriptor, IncompatiblePattern, Severity, normalize_identifier};

pub const DISCLAIMER: &str = "Heuristic check: code is scanned line by line for known incompatible patterns. \
     It is not a parser and may miss issues or flag false positives.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompatibilityIssue {
    pub framework: String,
    /// 1-based line number in the analyzed code.
    pub line: usize,
    pub severity: Severity,
    pub pattern: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrameworkCompatibility {
    pub framework: String,
    pub score: u32,
    pub errors: usize,
    pub warnings: usize,
    pub infos: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompatibilityReport {
    pub compatible: bool,
    pub overall_score: u32,
    pub frameworks: Vec<FrameworkCompatibility>,
    pub issues: Vec<CompatibilityIssue>,
    pub unknown_frameworks: Vec<String>,
    pub disclaimer: &'static str,
}

enum Matcher {
    Literal(String),
    Pattern(Regex),
}

impl Matcher {
    fn new(pattern: &IncompatiblePattern) -> Option<Self> {
        if !pattern.regex {
            return Some(Matcher::Literal(pattern.pattern.clone()));
        }
        match Regex::new(&pattern.pattern) {
            Ok(re) => Some(Matcher::Pattern(re)),
            Err(err) => {
                tracing::warn!(pattern = %pattern.pattern, error = %err, "skipping invalid compatibility pattern");
                None
            }
        }
    }

    fn is_match(&self, line: &str) -> bool {
        match self {
            Matcher::Literal(needle) => line.contains(needle.as_str()),
            Matcher::Pattern(re) => re.is_match(line),
        }
    }
}

fn score(errors: usize, warnings: usize, infos: usize) -> u32 {
    let penalty = errors * 25 + warnings * 10 + infos * 2;
    100usize.saturating_sub(penalty) as u32
}

/// Scan `code` against each framework's patterns.
pub fn analyze(code: &str, frameworks: &[Arc<FrameworkDescriptor>], unknown: Vec<String>) -> CompatibilityReport {
    let mut issues = Vec::new();
    let mut summaries = Vec::new();

    for framework in frameworks {
        let matchers: Vec<(&IncompatiblePattern, Matcher)> =
            framework.incompatible_patterns.iter().filter_map(|p| Some((p, Matcher::new(p)?))).collect();

        let mut found = Vec::new();
        for (idx, line) in code.lines().enumerate() {
            for (pattern, matcher) in &matchers {
                if matcher.is_match(line) {
                    found.push(CompatibilityIssue {
                        framework: framework.name.clone(),
                        line: idx + 1,
                        severity: pattern.severity,
                        pattern: pattern.pattern.clone(),
                        message: pattern.message.clone(),
                        suggestion: pattern.suggestion.clone(),
                        code: line.trim().to_string(),
                    });
                }
            }
        }

        let count = |s: Severity| found.iter().filter(|i| i.severity == s).count();
        let (errors, warnings, infos) = (count(Severity::Error), count(Severity::Warning), count(Severity::Info));
        summaries.push(FrameworkCompatibility {
            framework: framework.name.clone(),
            score: score(errors, warnings, infos),
            errors,
            warnings,
            infos,
        });
        issues.extend(found);
    }

    let overall_score = if summaries.is_empty() {
        100
    } else {
        let total: u32 = summaries.iter().map(|s| s.score).sum();
        (total as f64 / summaries.len() as f64).round() as u32
    };

    CompatibilityReport {
        compatible: !issues.iter().any(|i| i.severity == Severity::Error),
        overall_score,
        frameworks: summaries,
        issues,
        unknown_frameworks: unknown,
        disclaimer: DISCLAIMER,
    }
}

impl DocsService {
    /// Flag known incompatible patterns in `code` for the named frameworks.
    ///
    /// # Errors
    ///
    /// `FrameworkNotFound` when none of the names resolve.
    pub fn analyze_code_compatibility(&self, code: &str, frameworks: &[String]) -> Result<CompatibilityReport, Error> {
        let mut known: Vec<Arc<FrameworkDescriptor>> = Vec::new();
        let mut unknown = Vec::new();
        for name in frameworks {
            match self.registry.get(name) {
                Some(d) if !known.iter().any(|k| k.name == d.name) => known.push(d),
                Some(_) => {}
                None => unknown.push(normalize_identifier(name)),
            }
        }

        if known.is_empty() {
            return Err(Error::FrameworkNotFound(unknown.join(", ")));
        }

        let report = analyze(code, &known, unknown);
        tracing::debug!(
            frameworks = known.len(),
            issues = report.issues.len(),
            overall_score = report.overall_score,
            "compatibility analysis complete"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{Category, Registry};
    use crate::testing::{descriptor, pattern};

    fn react() -> Arc<FrameworkDescriptor> {
        let mut d = descriptor("react", Category::Web, &[]);
        d.incompatible_patterns = vec![
            pattern("componentWillMount", Severity::Error, false),
            pattern(r"document\.getElementById\(", Severity::Warning, true),
            pattern("var ", Severity::Info, false),
        ];
        Arc::new(d)
    }

    #[test]
    fn test_score_formula() {
        assert_eq!(score(0, 0, 0), 100);
        assert_eq!(score(1, 2, 3), 100 - 25 - 20 - 6);
        assert_eq!(score(5, 0, 0), 0);
    }

    #[test]
    fn test_analyze_reports_line_numbers() {
        let code = "class A extends React.Component {\n  componentWillMount() {}\n}\nvar el = document.getElementById('root');";
        let report = analyze(code, &[react()], vec![]);

        assert!(!report.compatible);
        assert_eq!(report.issues.len(), 3);
        assert_eq!(report.issues[0].line, 2);
        assert_eq!(report.issues[0].severity, Severity::Error);
        assert_eq!(report.issues[1].line, 4);
        assert_eq!(report.frameworks[0].score, 100 - 25 - 10 - 2);
        assert_eq!(report.overall_score, 63);
        assert_eq!(report.disclaimer, DISCLAIMER);
    }

    #[test]
    fn test_clean_code_is_compatible() {
        let report = analyze("const el = useRef(null);", &[react()], vec![]);
        assert!(report.compatible);
        assert_eq!(report.overall_score, 100);
        assert!(report.issues.is_empty());
    }

    #[test]
    fn test_warnings_alone_stay_compatible() {
        let report = analyze("document.getElementById('x')", &[react()], vec![]);
        assert!(report.compatible);
        assert_eq!(report.overall_score, 90);
    }

    #[test]
    fn test_overall_is_mean_of_frameworks() {
        let clean = Arc::new(descriptor("tailwindcss", Category::Web, &[]));
        let report = analyze("componentWillMount()", &[react(), clean], vec![]);
        assert_eq!(report.overall_score, ((75.0 + 100.0) / 2.0_f64).round() as u32);
    }

    #[test]
    fn test_service_reports_unknown_frameworks() {
        let registry = Arc::new(Registry::from_descriptors([react().as_ref().clone()]));
        let dir = tempfile::TempDir::new().unwrap();
        let cache = crate::cache::DocumentationCache::open(dir.path(), Default::default()).unwrap();
        let svc = DocsService::new(registry, cache, Arc::new(crate::provider::ProviderSet::new()));

        let report = svc.analyze_code_compatibility("var x = 1;", &["React".into(), "Svelte".into()]).unwrap();
        assert_eq!(report.unknown_frameworks, vec!["svelte".to_string()]);
        assert_eq!(report.frameworks.len(), 1);

        let err = svc.analyze_code_compatibility("x", &["svelte".into()]).unwrap_err();
        assert!(matches!(err, Error::FrameworkNotFound(_)));
    }
}
