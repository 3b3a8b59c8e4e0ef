//! Code example harvesting from HTML pages and Markdown files.

use scraper::{ElementRef, Html};
use serde::Serialize;

use super::markup::{code_language, collapse_whitespace};

/// Smallest code body worth reporting as an example.
const MIN_CODE_CHARS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodeExample {
    /// Nearest heading above the code, or the file it came from.
    pub title: String,
    pub language: String,
    pub code: String,
}

impl CodeExample {
    fn matches(&self, pattern: Option<&str>) -> bool {
        match pattern.map(str::trim).filter(|p| !p.is_empty()) {
            Some(p) => {
                let needle = p.to_lowercase();
                self.code.to_lowercase().contains(&needle) || self.title.to_lowercase().contains(&needle)
            }
            None => true,
        }
    }
}

fn is_heading(name: &str) -> bool {
    matches!(name, "h1" | "h2" | "h3" | "h4" | "h5" | "h6")
}

/// `<pre>` blocks in document order, titled by their nearest preceding heading.
pub fn html_examples(html: &str, pattern: Option<&str>) -> Vec<CodeExample> {
    let document = Html::parse_document(html);
    let mut heading: Option<String> = None;
    let mut examples = Vec::new();

    for node in document.root_element().descendants() {
        let Some(el) = ElementRef::wrap(node) else { continue };
        let name = el.value().name();

        if is_heading(name) {
            let text = collapse_whitespace(&el.text().collect::<String>());
            if !text.is_empty() {
                heading = Some(text);
            }
        } else if name == "pre" {
            let code = el.text().collect::<String>().trim_matches('\n').trim_end().to_string();
            if code.chars().count() < MIN_CODE_CHARS {
                continue;
            }
            let title = heading.clone().unwrap_or_else(|| format!("Example {}", examples.len() + 1));
            examples.push(CodeExample { title, language: code_language(el), code });
        }
    }

    examples.retain(|e| e.matches(pattern));
    examples
}

/// Fenced code blocks of a Markdown document, titled by their nearest heading
/// or by `source` when none precedes them.
pub fn fenced_blocks(markdown: &str, source: &str, pattern: Option<&str>) -> Vec<CodeExample> {
    let mut examples = Vec::new();
    let mut heading: Option<String> = None;
    let mut open: Option<(String, Vec<&str>)> = None;

    for line in markdown.lines() {
        let trimmed = line.trim_start();
        match open.take() {
            Some((language, body)) if trimmed.starts_with("```") => {
                let code = body.join("\n");
                if code.trim().chars().count() >= MIN_CODE_CHARS {
                    let title = heading.clone().unwrap_or_else(|| source.to_string());
                    examples.push(CodeExample { title, language, code });
                }
            }
            Some((language, mut body)) => {
                body.push(line);
                open = Some((language, body));
            }
            None if trimmed.starts_with("```") => {
                let language = trimmed.trim_start_matches('`').split_whitespace().next().unwrap_or("").to_string();
                open = Some((language, Vec::new()));
            }
            None if trimmed.starts_with('#') => {
                let text = trimmed.trim_start_matches('#').trim();
                if !text.is_empty() {
                    heading = Some(text.to_string());
                }
            }
            None => {}
        }
    }

    examples.retain(|e| e.matches(pattern));
    examples
}

/// Language tag for a source file, from its extension.
pub fn language_for_path(path: &str) -> &'static str {
    let ext = path.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase()).unwrap_or_default();
    match ext.as_str() {
        "ts" => "typescript",
        "tsx" => "tsx",
        "js" | "mjs" | "cjs" => "javascript",
        "jsx" => "jsx",
        "vue" => "vue",
        "svelte" => "svelte",
        "py" => "python",
        "php" => "php",
        "rs" => "rust",
        "go" => "go",
        "rb" => "ruby",
        "swift" => "swift",
        "kt" => "kotlin",
        "dart" => "dart",
        "css" => "css",
        "scss" => "scss",
        "html" => "html",
        "json" => "json",
        "sh" => "bash",
        _ => "",
    }
}

/// Render examples as one Markdown document.
pub fn render_examples(heading: &str, pattern: Option<&str>, examples: &[CodeExample]) -> String {
    let mut out = format!("# {heading}\n");
    if let Some(pattern) = pattern.map(str::trim).filter(|p| !p.is_empty()) {
        out.push_str(&format!("\n**Pattern:** {pattern}\n"));
    }
    for example in examples {
        out.push_str(&format!("\n## {}\n\n```{}\n{}\n```\n", example.title, example.language, example.code));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><body>
        <pre><code>console.log("before any heading")</code></pre>
        <h2>Using <code>useState</code></h2>
        <p>Declare a state variable.</p>
        <pre><code class="language-jsx">const [count, setCount] = useState(0);</code></pre>
        <h2>Effects</h2>
        <pre class="language-js">useEffect(() => { document.title = count; });</pre>
        <pre>x</pre>
    </body></html>"#;

    #[test]
    fn test_html_examples_titles_and_languages() {
        let examples = html_examples(PAGE, None);
        assert_eq!(examples.len(), 3);
        assert_eq!(examples[0].title, "Example 1");
        assert_eq!(examples[1].title, "Using useState");
        assert_eq!(examples[1].language, "jsx");
        assert_eq!(examples[2].title, "Effects");
        assert_eq!(examples[2].language, "js");
    }

    #[test]
    fn test_html_examples_pattern_filter() {
        let examples = html_examples(PAGE, Some("USESTATE"));
        assert_eq!(examples.len(), 1);
        assert!(examples[0].code.contains("setCount"));
    }

    #[test]
    fn test_fenced_blocks() {
        let md = "# Guide\n\nText.\n\n```tsx\nexport default function Page() {}\n```\n\n## Tiny\n\n```\nx\n```\n";
        let blocks = fenced_blocks(md, "docs/guide.md", None);
        assert_eq!(blocks, vec![CodeExample {
            title: "Guide".into(),
            language: "tsx".into(),
            code: "export default function Page() {}".into(),
        }]);
    }

    #[test]
    fn test_fenced_blocks_without_heading_use_source() {
        let blocks = fenced_blocks("```js\nconsole.log('hello');\n```", "README.md", Some("hello"));
        assert_eq!(blocks[0].title, "README.md");
        assert!(fenced_blocks("```js\nconsole.log('hello');\n```", "README.md", Some("absent")).is_empty());
    }

    #[test]
    fn test_language_for_path() {
        assert_eq!(language_for_path("app/page.tsx"), "tsx");
        assert_eq!(language_for_path("src/Main.PY"), "python");
        assert_eq!(language_for_path("Makefile"), "");
    }

    #[test]
    fn test_render_examples() {
        let examples = vec![CodeExample { title: "Counter".into(), language: "jsx".into(), code: "useState(0)".into() }];
        let md = render_examples("React examples", Some("useState"), &examples);
        assert_eq!(md, "# React examples\n\n**Pattern:** useState\n\n## Counter\n\n```jsx\nuseState(0)\n```\n");
    }
}
