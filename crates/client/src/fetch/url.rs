//! URL construction for configured documentation sources.

use augments_core::ProviderError;
use url::Url;

/// Placeholder replaced by the requested section in website templates.
pub const SECTION_PLACEHOLDER: &str = "{section}";

/// Parse a configured source URL.
///
/// Only http and https are accepted. The fragment is dropped, the query is
/// kept as written.
pub fn parse_source(input: &str) -> Result<Url, ProviderError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ProviderError::UpstreamFormat("empty source URL".into()));
    }

    let mut url = Url::parse(trimmed).map_err(|e| ProviderError::UpstreamFormat(format!("invalid URL '{trimmed}': {e}")))?;
    match url.scheme() {
        "http" | "https" => {}
        scheme => return Err(ProviderError::UpstreamFormat(format!("unsupported scheme '{scheme}' in '{trimmed}'"))),
    }
    url.set_fragment(None);
    Ok(url)
}

/// Resolve the page URL for an optional section of a website source.
///
/// A template containing `{section}` has it substituted (with nothing when
/// no section is asked for). A template without it gets the section
/// appended as a path segment.
pub fn website_url(template: &str, section: Option<&str>) -> Result<Url, ProviderError> {
    let section = section.map(str::trim).filter(|s| !s.is_empty());

    if template.contains(SECTION_PLACEHOLDER) {
        let encoded = section.map(encode_segment).unwrap_or_default();
        let expanded = template.replace(SECTION_PLACEHOLDER, &encoded);
        return parse_source(&expanded);
    }

    let mut url = parse_source(template)?;
    if let Some(section) = section {
        push_segments(&mut url, [section])?;
    }
    Ok(url)
}

/// Resolve a descriptor `sections` mapping against the source URL.
///
/// Absolute URLs are used as-is; anything else is joined onto the source.
pub fn join_mapped(base: &Url, mapped: &str) -> Result<Url, ProviderError> {
    let mapped = mapped.trim();
    if mapped.starts_with("http://") || mapped.starts_with("https://") {
        return parse_source(mapped);
    }

    let mut base = base.clone();
    if !base.path().ends_with('/') && !mapped.starts_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join(mapped)
        .map_err(|e| ProviderError::UpstreamFormat(format!("cannot join '{mapped}' onto {base}: {e}")))
}

/// Append path segments, percent-encoding each one.
pub fn push_segments<'a>(url: &mut Url, segments: impl IntoIterator<Item = &'a str>) -> Result<(), ProviderError> {
    let display = url.to_string();
    let mut path = url
        .path_segments_mut()
        .map_err(|_| ProviderError::UpstreamFormat(format!("{display} cannot take path segments")))?;
    path.pop_if_empty();
    for segment in segments.into_iter().flat_map(|s| s.split('/')).filter(|s| !s.is_empty() && !is_traversal(s)) {
        path.push(segment);
    }
    Ok(())
}

fn is_traversal(segment: &str) -> bool {
    matches!(segment, "." | "..")
}

/// Percent-encode everything outside the unreserved set, keeping `/`.
fn encode_segment(segment: &str) -> String {
    segment
        .split('/')
        .filter(|s| !s.is_empty() && !is_traversal(s))
        .collect::<Vec<_>>()
        .join("/")
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' | b'/' => (b as char).to_string(),
            _ => format!("%{b:02X}"),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_source_drops_fragment_keeps_query() {
        let url = parse_source("  https://React.dev/reference?lang=en#hooks ").unwrap();
        assert_eq!(url.as_str(), "https://react.dev/reference?lang=en");
    }

    #[test]
    fn test_parse_source_rejects_other_schemes() {
        assert!(matches!(parse_source("file:///etc/passwd"), Err(ProviderError::UpstreamFormat(_))));
        assert!(matches!(parse_source("   "), Err(ProviderError::UpstreamFormat(_))));
        assert!(parse_source("react.dev").is_err());
    }

    #[test]
    fn test_website_url_appends_section() {
        let url = website_url("https://tailwindcss.com/docs", Some("flex box")).unwrap();
        assert_eq!(url.as_str(), "https://tailwindcss.com/docs/flex%20box");

        let url = website_url("https://tailwindcss.com/docs/", Some("installation")).unwrap();
        assert_eq!(url.as_str(), "https://tailwindcss.com/docs/installation");

        let url = website_url("https://tailwindcss.com/docs", None).unwrap();
        assert_eq!(url.as_str(), "https://tailwindcss.com/docs");
    }

    #[test]
    fn test_website_url_template() {
        let url = website_url("https://react.dev/reference/{section}?v=2", Some("useState")).unwrap();
        assert_eq!(url.as_str(), "https://react.dev/reference/useState?v=2");

        let url = website_url("https://react.dev/reference/{section}", None).unwrap();
        assert_eq!(url.as_str(), "https://react.dev/reference/");

        let url = website_url("https://nextjs.org/docs/{section}", Some("app/building your app")).unwrap();
        assert_eq!(url.path(), "/docs/app/building%20your%20app");
    }

    #[test]
    fn test_section_cannot_escape_path() {
        let url = website_url("https://react.dev/docs/{section}", Some("../admin")).unwrap();
        assert_eq!(url.path(), "/docs/admin");

        let url = website_url("https://react.dev/docs", Some("../../admin")).unwrap();
        assert_eq!(url.path(), "/docs/admin");
    }

    #[test]
    fn test_join_mapped() {
        let base = Url::parse("https://laravel.com/docs").unwrap();
        assert_eq!(join_mapped(&base, "routing").unwrap().as_str(), "https://laravel.com/docs/routing");
        assert_eq!(join_mapped(&base, "/api/index").unwrap().as_str(), "https://laravel.com/api/index");
        assert_eq!(join_mapped(&base, "https://other.dev/x").unwrap().as_str(), "https://other.dev/x");
    }
}
