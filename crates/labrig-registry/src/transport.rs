use labrig_core::RegistryConfig;
use serde::Deserialize;
use std::time::Duration;

/// Result of a single tag lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagLookup {
    Found,
    NotFound,
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("failed to build HTTP client")]
    Client { source: reqwest::Error },

    #[error("registry request timed out: {url}")]
    Timeout { url: String },

    #[error("listing tags of {repository} took longer than {secs}s")]
    ListingTimedOut { repository: String, secs: u64 },

    #[error("registry rate limit hit: {url}")]
    RateLimited { url: String },

    #[error("registry returned HTTP {status}: {url}")]
    UnexpectedStatus { url: String, status: u16 },

    #[error("registry request failed: {url}")]
    Http { url: String, source: reqwest::Error },

    #[error("unexpected registry response from {url}: {detail}")]
    Decode { url: String, detail: String },
}

/// Abstraction over registry HTTP calls for testability.
///
/// Production code uses [`HttpTransport`], tests use mockall-generated mocks.
#[allow(async_fn_in_trait)]
pub trait RegistryTransport: Send + Sync {
    /// Whether `repository:tag` exists.
    async fn tag_exists(&self, repository: &str, tag: &str) -> Result<TagLookup, TransportError>;

    /// Every tag name published for `repository`.
    async fn list_tags(&self, repository: &str) -> Result<Vec<String>, TransportError>;
}

/// Docker Hub v2 API transport.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    max_pages: u32,
}

impl HttpTransport {
    pub fn new(config: &RegistryConfig) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .user_agent(concat!("labrig/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TransportError::Client { source: e })?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_owned(),
            max_pages: config.max_tag_pages,
        })
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, TransportError> {
        tracing::debug!(url, "registry request");
        self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout { url: url.to_owned() }
            } else {
                TransportError::Http {
                    url: url.to_owned(),
                    source: e,
                }
            }
        })
    }
}

impl RegistryTransport for HttpTransport {
    async fn tag_exists(&self, repository: &str, tag: &str) -> Result<TagLookup, TransportError> {
        let url = tag_url(&self.base_url, repository, tag);
        let response = self.get(&url).await?;
        let status = response.status();

        if status.is_success() {
            Ok(TagLookup::Found)
        } else if status == reqwest::StatusCode::NOT_FOUND {
            Ok(TagLookup::NotFound)
        } else {
            Err(status_error(url, status))
        }
    }

    async fn list_tags(&self, repository: &str) -> Result<Vec<String>, TransportError> {
        let mut tags = Vec::new();
        let mut next = Some(tags_url(&self.base_url, repository));
        let mut pages = 0;

        while let Some(url) = next.take() {
            if pages >= self.max_pages {
                tracing::debug!(repository, pages, "tag listing truncated at page limit");
                break;
            }
            pages += 1;

            let response = self.get(&url).await?;
            let status = response.status();
            if !status.is_success() {
                return Err(status_error(url, status));
            }
            let page: TagPage = response.json().await.map_err(|e| TransportError::Decode {
                url: url.clone(),
                detail: e.to_string(),
            })?;

            tags.extend(page.results.into_iter().map(|t| t.name));
            next = page.next;
        }

        tracing::debug!(repository, count = tags.len(), "listed registry tags");
        Ok(tags)
    }
}

fn status_error(url: String, status: reqwest::StatusCode) -> TransportError {
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        TransportError::RateLimited { url }
    } else {
        TransportError::UnexpectedStatus {
            url,
            status: status.as_u16(),
        }
    }
}

fn tag_url(base: &str, repository: &str, tag: &str) -> String {
    format!("{base}/v2/repositories/{repository}/tags/{tag}")
}

fn tags_url(base: &str, repository: &str) -> String {
    format!("{base}/v2/repositories/{repository}/tags?page_size=100")
}

/// One page of `GET /v2/repositories/{repo}/tags`.
#[derive(Debug, Deserialize)]
struct TagPage {
    #[serde(default)]
    next: Option<String>,
    #[serde(default)]
    results: Vec<TagEntry>,
}

#[derive(Debug, Deserialize)]
struct TagEntry {
    name: String,
}
