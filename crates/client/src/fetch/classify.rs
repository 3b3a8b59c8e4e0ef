//! Mapping of HTTP outcomes onto provider failure classes.

use augments_core::ProviderError;
use reqwest::{StatusCode, header::HeaderMap};

/// Remaining-request header sent by GitHub and most API gateways.
pub const RATE_LIMIT_REMAINING: &str = "x-ratelimit-remaining";
/// Reset time of the rate-limit window, in epoch seconds.
pub const RATE_LIMIT_RESET: &str = "x-ratelimit-reset";

/// Whether the headers report an exhausted rate-limit window.
pub fn rate_limit_exhausted(headers: &HeaderMap) -> bool {
    headers
        .get(RATE_LIMIT_REMAINING)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .is_some_and(|remaining| remaining == 0)
}

/// Classify a non-success status.
///
/// - 404, 410: `NotFound`
/// - 429, or 403 with an exhausted rate-limit window: `RateLimited`
/// - 408 and 5xx: `TransientNetwork`
/// - anything else: `UpstreamFormat`
pub fn classify_status(status: StatusCode, headers: &HeaderMap, url: &str) -> ProviderError {
    let detail = format!("{url} returned {}", status.as_u16());
    match status {
        StatusCode::NOT_FOUND | StatusCode::GONE => ProviderError::NotFound(detail),
        StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimited(detail),
        StatusCode::FORBIDDEN if rate_limit_exhausted(headers) => ProviderError::RateLimited(detail),
        StatusCode::REQUEST_TIMEOUT => ProviderError::TransientNetwork(detail),
        s if s.is_server_error() => ProviderError::TransientNetwork(detail),
        _ => ProviderError::UpstreamFormat(detail),
    }
}

/// Classify a transport-level reqwest failure.
pub fn classify_transport(err: &reqwest::Error, url: &str) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout(format!("{url}: {err}"))
    } else if err.is_decode() {
        ProviderError::UpstreamFormat(format!("{url}: undecodable body: {err}"))
    } else if err.is_redirect() {
        ProviderError::UpstreamFormat(format!("{url}: redirect loop or limit: {err}"))
    } else {
        ProviderError::TransientNetwork(format!("{url}: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn headers(remaining: &str) -> HeaderMap {
        let mut map = HeaderMap::new();
        map.insert(RATE_LIMIT_REMAINING, HeaderValue::from_str(remaining).unwrap());
        map
    }

    #[test]
    fn test_not_found_statuses() {
        for status in [StatusCode::NOT_FOUND, StatusCode::GONE] {
            assert!(matches!(classify_status(status, &HeaderMap::new(), "u"), ProviderError::NotFound(_)));
        }
    }

    #[test]
    fn test_rate_limit_statuses() {
        let empty = HeaderMap::new();
        assert!(matches!(classify_status(StatusCode::TOO_MANY_REQUESTS, &empty, "u"), ProviderError::RateLimited(_)));
        assert!(matches!(classify_status(StatusCode::FORBIDDEN, &headers("0"), "u"), ProviderError::RateLimited(_)));
        assert!(matches!(classify_status(StatusCode::FORBIDDEN, &headers("12"), "u"), ProviderError::UpstreamFormat(_)));
        assert!(matches!(classify_status(StatusCode::FORBIDDEN, &empty, "u"), ProviderError::UpstreamFormat(_)));
    }

    #[test]
    fn test_transient_statuses() {
        let empty = HeaderMap::new();
        for status in [StatusCode::REQUEST_TIMEOUT, StatusCode::BAD_GATEWAY, StatusCode::SERVICE_UNAVAILABLE] {
            assert!(matches!(classify_status(status, &empty, "u"), ProviderError::TransientNetwork(_)));
        }
    }

    #[test]
    fn test_other_statuses_are_format_errors() {
        let err = classify_status(StatusCode::UNAUTHORIZED, &HeaderMap::new(), "https://x.dev");
        assert_eq!(err, ProviderError::UpstreamFormat("https://x.dev returned 401".into()));
    }

    #[test]
    fn test_rate_limit_exhausted_parsing() {
        assert!(rate_limit_exhausted(&headers("0")));
        assert!(rate_limit_exhausted(&headers(" 0 ")));
        assert!(!rate_limit_exhausted(&headers("1")));
        assert!(!rate_limit_exhausted(&headers("n/a")));
        assert!(!rate_limit_exhausted(&HeaderMap::new()));
    }
}
