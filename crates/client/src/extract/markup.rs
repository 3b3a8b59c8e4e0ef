//! Markup stripping fallback for pages the readability pass rejects.

use scraper::{ElementRef, Html, Node, Selector};

use super::{ExtractedDoc, FALLBACK_VERSION};

const SKIPPED: &[&str] = &[
    "script", "style", "noscript", "svg", "nav", "header", "footer", "aside", "form", "button", "template", "iframe",
];

const CONTENT_ROOTS: &[&str] = &["main", "article", "[role=main]", "body"];

pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn inline_text(el: ElementRef<'_>) -> String {
    collapse_whitespace(&el.text().collect::<String>())
}

/// Language named by a `language-*` or `lang-*` class on `<pre>` or its `<code>`.
pub(crate) fn code_language(pre: ElementRef<'_>) -> String {
    let own = pre.value().classes();
    let nested = pre
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|c| c.value().name() == "code")
        .flat_map(|c| c.value().classes().collect::<Vec<_>>());

    own.chain(nested)
        .find_map(|class| class.strip_prefix("language-").or_else(|| class.strip_prefix("lang-")))
        .unwrap_or("")
        .to_string()
}

fn heading_level(name: &str) -> Option<usize> {
    match name {
        "h1" => Some(1),
        "h2" => Some(2),
        "h3" => Some(3),
        "h4" => Some(4),
        "h5" => Some(5),
        "h6" => Some(6),
        _ => None,
    }
}

fn walk(el: ElementRef<'_>, out: &mut Vec<String>) {
    let name = el.value().name();
    if SKIPPED.contains(&name) {
        return;
    }

    if let Some(level) = heading_level(name) {
        let text = inline_text(el);
        if !text.is_empty() {
            out.push(format!("{} {text}", "#".repeat(level)));
        }
        return;
    }

    match name {
        "pre" => {
            let code = el.text().collect::<String>();
            if !code.trim().is_empty() {
                out.push(format!("```{}\n{}\n```", code_language(el), code.trim_end()));
            }
        }
        "p" | "blockquote" | "dt" | "dd" | "td" | "th" | "figcaption" => {
            let text = inline_text(el);
            if !text.is_empty() {
                out.push(text);
            }
        }
        "li" => {
            let text = inline_text(el);
            if !text.is_empty() {
                out.push(format!("- {text}"));
            }
        }
        _ => {
            for child in el.children() {
                if let Some(child_el) = ElementRef::wrap(child) {
                    walk(child_el, out);
                } else if let Node::Text(text) = child.value() {
                    let text = collapse_whitespace(text);
                    if !text.is_empty() {
                        out.push(text);
                    }
                }
            }
        }
    }
}

/// Reduce a page to headings, paragraphs, list items and code blocks.
pub fn strip_markup(html: &str) -> ExtractedDoc {
    let document = Html::parse_document(html);

    let title = Selector::parse("title")
        .ok()
        .and_then(|sel| document.select(&sel).next().map(inline_text))
        .filter(|t| !t.is_empty());

    let root = CONTENT_ROOTS
        .iter()
        .filter_map(|css| Selector::parse(css).ok())
        .find_map(|sel| document.select(&sel).next())
        .unwrap_or_else(|| document.root_element());

    let mut blocks = Vec::new();
    walk(root, &mut blocks);

    ExtractedDoc { title, markdown: blocks.join("\n\n"), extractor_version: FALLBACK_VERSION.to_string() }
}
