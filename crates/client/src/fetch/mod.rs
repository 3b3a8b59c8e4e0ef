//! HTTP fetch pipeline shared by the documentation providers.
//!
//! ### Client
//! - rustls, gzip/brotli/deflate decoding
//! - Max redirects: 5
//! - Max body bytes: 5MB (configurable)
//! - One timeout per client; GitHub and websites get separate clients
//!
//! ### Failure classes
//! Every failure leaves this module as a [`ProviderError`]; see
//! [`classify_status`] and [`classify_transport`].

pub mod classify;
pub mod url;

use augments_core::{AppConfig, ProviderError};
use bytes::Bytes;
use reqwest::{Client, Method, StatusCode, Url, header};
use sha2::{Digest, Sha256};
use std::time::{Duration, Instant};

pub use self::classify::{classify_status, classify_transport, rate_limit_exhausted};
pub use self::url::{join_mapped, parse_source, push_segments, website_url};

pub const HTML_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,text/markdown;q=0.8,*/*;q=0.5";

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: 10s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "augments-mcp/0.1".to_string(),
            max_bytes: 5 * 1024 * 1024,
            timeout: Duration::from_millis(10_000),
            max_redirects: 5,
        }
    }
}

impl FetchConfig {
    /// Website settings from the application config.
    pub fn website(config: &AppConfig) -> Self {
        Self { user_agent: config.user_agent.clone(), max_bytes: config.max_bytes, timeout: config.timeout(), ..Self::default() }
    }

    /// GitHub API settings from the application config.
    pub fn github(config: &AppConfig) -> Self {
        Self { timeout: config.github_timeout(), ..Self::website(config) }
    }
}

/// Response from a fetch operation, whatever its status.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// The URL requested
    pub url: Url,
    /// The final URL after redirects
    pub final_url: Url,
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub bytes: Bytes,
    pub headers: header::HeaderMap,
    /// Time taken to fetch in milliseconds
    pub fetch_ms: u64,
}

impl FetchResponse {
    /// Turn a non-success status into its provider failure class.
    pub fn error_for_status(self) -> Result<Self, ProviderError> {
        if self.status.is_success() {
            Ok(self)
        } else {
            Err(classify_status(self.status, &self.headers, self.url.as_str()))
        }
    }

    pub fn header(&self, name: header::HeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok()).map(str::trim).filter(|v| !v.is_empty())
    }

    /// Body as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }

    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, ProviderError> {
        serde_json::from_slice(&self.bytes)
            .map_err(|e| ProviderError::UpstreamFormat(format!("{}: unexpected JSON: {e}", self.url)))
    }

    /// True for markdown and plain text bodies that need no HTML extraction.
    pub fn is_markdown(&self) -> bool {
        let by_type = self
            .content_type
            .as_deref()
            .is_some_and(|ct| ct.starts_with("text/markdown") || ct.starts_with("text/plain") || ct.starts_with("text/x-markdown"));
        let path = self.final_url.path();
        by_type || path.ends_with(".md") || path.ends_with(".mdx")
    }

    /// Validator-style fingerprint: ETag, then Last-Modified, then a body hash.
    pub fn fingerprint(&self) -> String {
        self.header(header::ETAG)
            .or_else(|| self.header(header::LAST_MODIFIED))
            .map(str::to_string)
            .unwrap_or_else(|| content_hash(&self.bytes))
    }
}

/// `sha256:<hex>` digest of a body.
pub fn content_hash(bytes: &[u8]) -> String {
    format!("sha256:{}", hex::encode(Sha256::digest(bytes)))
}

/// HTTP client with body and redirect limits.
#[derive(Debug, Clone)]
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, ProviderError> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| ProviderError::TransientNetwork(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    /// GET `url` and fail on any non-success status.
    pub async fn get(&self, url: &Url, accept: &str) -> Result<FetchResponse, ProviderError> {
        let mut headers = header::HeaderMap::new();
        if let Ok(value) = header::HeaderValue::from_str(accept) {
            headers.insert(header::ACCEPT, value);
        }
        self.execute(Method::GET, url, headers).await?.error_for_status()
    }

    /// HEAD `url` and fail on any non-success status.
    pub async fn head(&self, url: &Url) -> Result<FetchResponse, ProviderError> {
        self.execute(Method::HEAD, url, header::HeaderMap::new()).await?.error_for_status()
    }

    /// Send a request and read its body, whatever the status.
    ///
    /// Only transport failures and oversized bodies are errors here.
    pub async fn execute(&self, method: Method, url: &Url, headers: header::HeaderMap) -> Result<FetchResponse, ProviderError> {
        let start = Instant::now();
        let is_head = method == Method::HEAD;
        tracing::debug!(method = %method, url = %url, "upstream request");

        let response = self
            .http
            .request(method, url.clone())
            .headers(headers)
            .send()
            .await
            .map_err(|e| classify_transport(&e, url.as_str()))?;

        let status = response.status();
        if !is_head
            && let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(self.too_large(url, len as usize));
        }

        let final_url = response.url().clone();
        let headers = response.headers().clone();

        let bytes = response.bytes().await.map_err(|e| classify_transport(&e, url.as_str()))?;
        if bytes.len() > self.config.max_bytes {
            return Err(self.too_large(url, bytes.len()));
        }

        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let fetch_ms = start.elapsed().as_millis() as u64;
        tracing::debug!(url = %url, final_url = %final_url, status = status.as_u16(), fetch_ms, bytes = bytes.len(), "upstream response");

        Ok(FetchResponse { url: url.clone(), final_url, status, content_type, bytes, headers, fetch_ms })
    }

    fn too_large(&self, url: &Url, len: usize) -> ProviderError {
        ProviderError::UpstreamFormat(format!("{url}: {len} bytes exceeds {}", self.config.max_bytes))
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client() -> FetchClient {
        FetchClient::new(FetchConfig::default()).unwrap()
    }

    fn at(server: &MockServer, p: &str) -> Url {
        Url::parse(&format!("{}{p}", server.uri())).unwrap()
    }

    #[test]
    fn test_fetch_config_from_app_config() {
        let app = AppConfig::default();
        let website = FetchConfig::website(&app);
        assert_eq!(website.timeout, Duration::from_millis(10_000));
        assert_eq!(website.max_bytes, 5_242_880);
        assert_eq!(website.max_redirects, 5);

        let github = FetchConfig::github(&app);
        assert_eq!(github.timeout, Duration::from_millis(15_000));
        assert_eq!(github.user_agent, app.user_agent);
    }

    #[test]
    fn test_content_hash_format() {
        let hash = content_hash(b"hello");
        assert!(hash.starts_with("sha256:"));
        assert_eq!(hash.len(), "sha256:".len() + 64);
        assert_eq!(hash, content_hash(b"hello"));
    }

    #[tokio::test]
    async fn test_get_success_and_fingerprint_prefers_etag() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/docs"))
            .respond_with(ResponseTemplate::new(200).insert_header("etag", "\"abc\"").set_body_string("<p>hi</p>"))
            .mount(&server)
            .await;

        let response = client().get(&at(&server, "/docs"), HTML_ACCEPT).await.unwrap();
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.text(), "<p>hi</p>");
        assert_eq!(response.fingerprint(), "\"abc\"");
    }

    #[tokio::test]
    async fn test_fingerprint_falls_back_to_hash() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("body"))
            .mount(&server)
            .await;

        let response = client().get(&at(&server, "/x"), HTML_ACCEPT).await.unwrap();
        assert_eq!(response.fingerprint(), content_hash(b"body"));
    }

    #[tokio::test]
    async fn test_status_classification() {
        let server = MockServer::start().await;
        Mock::given(path("/missing")).respond_with(ResponseTemplate::new(404)).mount(&server).await;
        Mock::given(path("/busy")).respond_with(ResponseTemplate::new(503)).mount(&server).await;
        Mock::given(path("/slow-down")).respond_with(ResponseTemplate::new(429)).mount(&server).await;

        let c = client();
        assert!(matches!(c.get(&at(&server, "/missing"), HTML_ACCEPT).await, Err(ProviderError::NotFound(_))));
        assert!(matches!(c.get(&at(&server, "/busy"), HTML_ACCEPT).await, Err(ProviderError::TransientNetwork(_))));
        assert!(matches!(c.get(&at(&server, "/slow-down"), HTML_ACCEPT).await, Err(ProviderError::RateLimited(_))));
    }

    #[tokio::test]
    async fn test_execute_keeps_error_status() {
        let server = MockServer::start().await;
        Mock::given(path("/forbidden"))
            .respond_with(ResponseTemplate::new(403).insert_header("x-ratelimit-remaining", "0"))
            .mount(&server)
            .await;

        let response = client().execute(Method::GET, &at(&server, "/forbidden"), header::HeaderMap::new()).await.unwrap();
        assert_eq!(response.status, StatusCode::FORBIDDEN);
        assert!(rate_limit_exhausted(&response.headers));
        assert!(matches!(response.error_for_status(), Err(ProviderError::RateLimited(_))));
    }

    #[tokio::test]
    async fn test_timeout_is_classified() {
        let server = MockServer::start().await;
        Mock::given(path("/slow"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let c = FetchClient::new(FetchConfig { timeout: Duration::from_millis(100), ..FetchConfig::default() }).unwrap();
        assert!(matches!(c.get(&at(&server, "/slow"), HTML_ACCEPT).await, Err(ProviderError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_body_limit() {
        let server = MockServer::start().await;
        Mock::given(path("/big")).respond_with(ResponseTemplate::new(200).set_body_string("x".repeat(64))).mount(&server).await;

        let c = FetchClient::new(FetchConfig { max_bytes: 16, ..FetchConfig::default() }).unwrap();
        assert!(matches!(c.get(&at(&server, "/big"), HTML_ACCEPT).await, Err(ProviderError::UpstreamFormat(_))));
    }

    #[tokio::test]
    async fn test_connection_refused_is_transient() {
        let url = Url::parse("http://127.0.0.1:9/").unwrap();
        assert!(matches!(client().get(&url, HTML_ACCEPT).await, Err(ProviderError::TransientNetwork(_))));
    }
}
