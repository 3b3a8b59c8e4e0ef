//! GitHub documentation provider.
//!
//! Reads Markdown from a repository through the REST contents API.
//!
//! ### API
//!
//! - **Endpoints**: `/repos/{owner}/{repo}/contents/{path}?ref={branch}` and
//!   `/repos/{owner}/{repo}/commits?path=..&sha=..&per_page=1`
//! - **Authentication**: optional bearer token; unauthenticated requests work
//!   under a much smaller rate limit.
//! - **Rate Limiting**:
//!   - Requests are spaced by a minimum interval (100ms).
//!   - `x-ratelimit-*` headers are tracked; an exhausted window fails fast
//!     with `RateLimited` until its reset time.
//! - **Fingerprint**: SHA of the latest commit touching the docs path.

pub mod contents;
pub mod rate_limit;

pub use contents::{CommitSummary, ContentItem, Contents, EntryType};
pub use rate_limit::RateLimiter;

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use augments_core::registry::GithubSource;
use augments_core::{AppConfig, DocProvider, FrameworkDescriptor, FreshnessStatus, ProviderError, ProviderKind, RawContent};
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Method, Url};

use crate::extract::examples::language_for_path;
use crate::extract::{CodeExample, fenced_blocks, render_examples};
use crate::fetch::{FetchClient, FetchConfig, FetchResponse, parse_source, push_segments};
use contents::{is_markdown_path, select_markdown};

/// Default base URL for the GitHub REST API.
const DEFAULT_API_URL: &str = "https://api.github.com";

/// Minimum interval between requests.
const MIN_REQUEST_INTERVAL: Duration = Duration::from_millis(100);

/// Markdown files read from one docs directory.
const MAX_DOC_FILES: usize = 12;

/// Files larger than this are not read as examples.
const MAX_EXAMPLE_FILE_BYTES: u64 = 64 * 1024;

const API_VERSION: &str = "2022-11-28";

/// GitHub provider configuration.
#[derive(Debug, Clone)]
pub struct GitHubConfig {
    /// Base URL (default: https://api.github.com).
    pub api_url: String,
    pub token: Option<String>,
    pub min_interval: Duration,
    pub max_files: usize,
    pub fetch: FetchConfig,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            token: None,
            min_interval: MIN_REQUEST_INTERVAL,
            max_files: MAX_DOC_FILES,
            fetch: FetchConfig { timeout: Duration::from_millis(15_000), ..FetchConfig::default() },
        }
    }
}

impl GitHubConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            api_url: config.github_api_url.clone(),
            token: config.github_token().map(str::to_string),
            fetch: FetchConfig::github(config),
            ..Self::default()
        }
    }
}

/// Repository coordinates resolved from a descriptor source.
#[derive(Debug, Clone, Copy)]
struct Repo<'a> {
    owner: &'a str,
    name: &'a str,
    branch: &'a str,
}

impl<'a> Repo<'a> {
    fn from_source(source: &'a GithubSource) -> Result<Self, ProviderError> {
        let (owner, name) = source
            .owner_repo()
            .ok_or_else(|| ProviderError::UpstreamFormat(format!("'{}' is not an owner/repo pair", source.repo)))?;
        Ok(Self { owner, name, branch: source.branch.as_str() })
    }

    fn tree_url(&self, path: &str) -> String {
        format!("https://github.com/{}/{}/tree/{}/{}", self.owner, self.name, self.branch, path.trim_matches('/'))
    }
}

/// Documentation provider backed by the GitHub REST API.
#[derive(Debug)]
pub struct GitHubProvider {
    client: FetchClient,
    api_base: Url,
    headers: HeaderMap,
    limiter: RateLimiter,
    max_files: usize,
    closed: AtomicBool,
}

impl GitHubProvider {
    pub fn new(config: GitHubConfig) -> Result<Self, ProviderError> {
        let api_base = parse_source(&config.api_url)?;
        let client = FetchClient::new(config.fetch)?;

        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert("x-github-api-version", HeaderValue::from_static(API_VERSION));
        if let Some(token) = config.token.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| ProviderError::UpstreamFormat("GitHub token is not a valid header value".into()))?;
            value.set_sensitive(true);
            headers.insert(header::AUTHORIZATION, value);
        }

        tracing::info!(api_url = %api_base, authenticated = headers.contains_key(header::AUTHORIZATION), "GitHub provider ready");

        Ok(Self {
            client,
            api_base,
            headers,
            limiter: RateLimiter::new(config.min_interval),
            max_files: config.max_files.max(1),
            closed: AtomicBool::new(false),
        })
    }

    fn ensure_open(&self) -> Result<(), ProviderError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ProviderError::TransientNetwork("GitHub provider is closed".into()));
        }
        Ok(())
    }

    async fn api(&self, segments: &[&str], query: &[(&str, &str)]) -> Result<FetchResponse, ProviderError> {
        self.ensure_open()?;
        self.limiter.acquire().await?;

        let mut url = self.api_base.clone();
        push_segments(&mut url, segments.iter().copied())?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (name, value) in query {
                pairs.append_pair(name, value);
            }
        }

        let response = self.client.execute(Method::GET, &url, self.headers.clone()).await?;
        self.limiter.observe(&response.headers);
        response.error_for_status()
    }

    async fn contents(&self, repo: Repo<'_>, path: &str) -> Result<Contents, ProviderError> {
        self.api(&["repos", repo.owner, repo.name, "contents", path], &[("ref", repo.branch)])
            .await?
            .json()
    }

    async fn read_file(&self, repo: Repo<'_>, item: &ContentItem) -> Result<String, ProviderError> {
        if item.is_inline() {
            return item.decode();
        }
        match self.contents(repo, &item.path).await? {
            Contents::File(file) => self.file_text(&file).await,
            Contents::Dir(_) => Err(ProviderError::UpstreamFormat(format!("{} is a directory", item.path))),
        }
    }

    /// Text of a file from a contents response, downloading the raw file
    /// when GitHub did not inline it.
    async fn file_text(&self, file: &ContentItem) -> Result<String, ProviderError> {
        if file.is_inline() {
            return file.decode();
        }
        let Some(raw_url) = file.download_url.as_deref() else {
            return file.decode();
        };

        self.ensure_open()?;
        self.limiter.acquire().await?;
        let url = parse_source(raw_url)?;
        tracing::debug!(path = %file.path, size = file.size, "file not inlined, downloading raw");
        let response = self.client.execute(Method::GET, &url, self.headers.clone()).await?;
        Ok(response.error_for_status()?.text())
    }

    /// SHA of the newest commit touching `path`, if the repository has one.
    async fn latest_commit(&self, repo: Repo<'_>, path: &str) -> Result<Option<String>, ProviderError> {
        let commits: Vec<CommitSummary> = self
            .api(&["repos", repo.owner, repo.name, "commits"], &[("path", path), ("sha", repo.branch), ("per_page", "1")])
            .await?
            .json()?;
        Ok(commits.into_iter().next().map(|c| c.sha))
    }

    async fn with_commit_fingerprint(&self, raw: RawContent, repo: Repo<'_>, path: &str) -> RawContent {
        match self.latest_commit(repo, path).await {
            Ok(Some(sha)) => raw.with_fingerprint(sha),
            Ok(None) => raw,
            Err(err) => {
                tracing::debug!(repo = %repo.name, path, error = %err, "no commit fingerprint");
                raw
            }
        }
    }

    /// Docs paths to try for a section, most specific first.
    fn section_candidates(descriptor: &FrameworkDescriptor, source: &GithubSource, section: Option<&str>) -> Vec<String> {
        let docs_path = source.docs_path.trim_matches('/');
        let Some(section) = section.map(str::trim).filter(|s| !s.is_empty()) else {
            return vec![docs_path.to_string()];
        };

        let mut candidates = Vec::new();
        if let Some(mapped) = descriptor.sections.get(section)
            && !mapped.starts_with("http://")
            && !mapped.starts_with("https://")
        {
            candidates.push(mapped.trim_matches('/').to_string());
        }
        let base = if docs_path.is_empty() { section.to_string() } else { format!("{docs_path}/{section}") };
        candidates.push(format!("{base}.md"));
        candidates.push(format!("{base}.mdx"));
        candidates.push(base);
        candidates.dedup();
        candidates
    }

    async fn markdown_dir(
        &self, descriptor: &FrameworkDescriptor, repo: Repo<'_>, path: &str, items: &[ContentItem],
    ) -> Result<RawContent, ProviderError> {
        let mut raw = RawContent::new(format!(
            "# {} documentation\n\nSource: {}",
            descriptor.display_name,
            repo.tree_url(path)
        ));

        let mut read = 0;
        for item in select_markdown(items, &descriptor.context_files, self.max_files) {
            match self.read_file(repo, item).await {
                Ok(text) if !text.trim().is_empty() => {
                    raw = raw.with_section(item.path.clone(), item.path.clone(), text);
                    read += 1;
                }
                Ok(_) => {}
                Err(ProviderError::NotFound(_)) => tracing::debug!(path = %item.path, "listed file vanished"),
                Err(err) => return Err(err),
            }
        }

        if read == 0 {
            return Err(ProviderError::NotFound(format!("no Markdown files under {}", repo.tree_url(path))));
        }
        Ok(raw)
    }

    /// Example candidates from a listing plus one level of sub-directories.
    async fn example_files(&self, repo: Repo<'_>, items: Vec<ContentItem>) -> Result<Vec<ContentItem>, ProviderError> {
        let is_candidate = |i: &ContentItem| {
            i.kind == EntryType::File
                && i.size <= MAX_EXAMPLE_FILE_BYTES
                && (is_markdown_path(&i.name) || !language_for_path(&i.name).is_empty())
        };

        let (mut dirs, mut files): (Vec<ContentItem>, Vec<ContentItem>) =
            items.into_iter().filter(|i| i.kind == EntryType::Dir || is_candidate(i)).partition(|i| i.kind == EntryType::Dir);
        dirs.sort_by(|a, b| a.path.cmp(&b.path));

        for dir in dirs {
            if files.len() >= self.max_files {
                break;
            }
            match self.contents(repo, &dir.path).await {
                Ok(Contents::Dir(nested)) => files.extend(nested.into_iter().filter(is_candidate)),
                Ok(Contents::File(_)) | Err(ProviderError::NotFound(_)) => {}
                Err(err) => return Err(err),
            }
        }

        files.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(files)
    }
}

#[async_trait]
impl DocProvider for GitHubProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::GitHub
    }

    async fn fetch_docs(&self, framework: &FrameworkDescriptor, section: Option<&str>) -> Result<RawContent, ProviderError> {
        let source = framework
            .sources
            .documentation
            .github
            .as_ref()
            .ok_or_else(|| ProviderError::NotFound(format!("{} has no GitHub documentation source", framework.name)))?;
        let repo = Repo::from_source(source)?;

        for path in Self::section_candidates(framework, source, section) {
            let raw = match self.contents(repo, &path).await {
                Ok(Contents::File(file)) => RawContent::new(self.file_text(&file).await?),
                Ok(Contents::Dir(items)) => self.markdown_dir(framework, repo, &path, &items).await?,
                Err(ProviderError::NotFound(_)) => {
                    tracing::debug!(framework = %framework.name, path = %path, "docs path not found");
                    continue;
                }
                Err(err) => return Err(err),
            };
            tracing::debug!(framework = %framework.name, path = %path, "GitHub docs fetched");
            return Ok(self.with_commit_fingerprint(raw, repo, &source.docs_path).await);
        }

        Err(ProviderError::NotFound(format!(
            "no docs for {}{} in {}",
            framework.name,
            section.map(|s| format!(" section '{s}'")).unwrap_or_default(),
            source.repo
        )))
    }

    async fn fetch_examples(&self, framework: &FrameworkDescriptor, pattern: Option<&str>) -> Result<RawContent, ProviderError> {
        let source = framework
            .examples_source()
            .github
            .as_ref()
            .ok_or_else(|| ProviderError::NotFound(format!("{} has no GitHub examples source", framework.name)))?;
        let repo = Repo::from_source(source)?;
        let path = source.docs_path.trim_matches('/');

        let files = match self.contents(repo, path).await? {
            Contents::File(file) => vec![file],
            Contents::Dir(items) => self.example_files(repo, items).await?,
        };

        let needle = pattern.map(str::trim).filter(|p| !p.is_empty()).map(str::to_lowercase);
        let mut examples: Vec<CodeExample> = Vec::new();
        for item in files.iter().take(self.max_files) {
            let text = match self.read_file(repo, item).await {
                Ok(text) => text,
                Err(ProviderError::NotFound(_)) => continue,
                Err(err) => return Err(err),
            };

            if is_markdown_path(&item.path) {
                examples.extend(fenced_blocks(&text, &item.path, pattern));
                continue;
            }
            let relevant = needle
                .as_deref()
                .is_none_or(|n| item.path.to_lowercase().contains(n) || text.to_lowercase().contains(n));
            if relevant {
                let language = language_for_path(&item.path).to_string();
                examples.push(CodeExample { title: item.path.clone(), language, code: text.trim_end().to_string() });
            }
        }

        if examples.is_empty() {
            return Err(ProviderError::NotFound(format!(
                "no examples{} in {}",
                pattern.map(|p| format!(" matching '{p}'")).unwrap_or_default(),
                repo.tree_url(path)
            )));
        }

        let body = render_examples(&format!("{} examples", framework.display_name), pattern, &examples);
        Ok(self.with_commit_fingerprint(RawContent::new(body), repo, path).await)
    }

    async fn check_freshness(
        &self, framework: &FrameworkDescriptor, known_fingerprint: Option<&str>,
    ) -> Result<FreshnessStatus, ProviderError> {
        let Some(source) = framework.sources.documentation.github.as_ref() else {
            return Ok(FreshnessStatus::Unknown);
        };
        let repo = Repo::from_source(source)?;

        Ok(match self.latest_commit(repo, &source.docs_path).await? {
            Some(sha) if known_fingerprint == Some(sha.as_str()) => FreshnessStatus::Unchanged,
            Some(sha) => FreshnessStatus::Changed(sha),
            None => FreshnessStatus::Unknown,
        })
    }

    async fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            tracing::debug!("GitHub provider closed");
        }
    }
}
