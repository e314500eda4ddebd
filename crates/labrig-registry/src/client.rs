use std::time::Duration;

use crate::transport::{HttpTransport, RegistryTransport, TagLookup, TransportError};
use labrig_core::{RVersion, RegistryConfig};

/// Budget for walking every tag page when none is configured.
pub const DEFAULT_LISTING_TIMEOUT: Duration = Duration::from_secs(5);

/// Registry operations client, parameterized over the transport for testability.
pub struct RegistryClient<T: RegistryTransport = HttpTransport> {
    transport: T,
    repository: String,
    listing_timeout: Duration,
}

impl RegistryClient<HttpTransport> {
    pub fn new(config: &RegistryConfig) -> Result<Self, TransportError> {
        Ok(Self {
            transport: HttpTransport::new(config)?,
            repository: config.version_repository.clone(),
            listing_timeout: Duration::from_secs(config.timeout_secs),
        })
    }
}

impl<T: RegistryTransport> RegistryClient<T> {
    pub fn with_transport(transport: T, repository: impl Into<String>) -> Self {
        Self {
            transport,
            repository: repository.into(),
            listing_timeout: DEFAULT_LISTING_TIMEOUT,
        }
    }

    /// Bound the whole tag listing, across all pages, by `timeout`.
    pub fn with_listing_timeout(mut self, timeout: Duration) -> Self {
        self.listing_timeout = timeout;
        self
    }

    /// Repository whose tags name R versions.
    pub fn repository(&self) -> &str {
        &self.repository
    }

    pub async fn check(&self, version: &str) -> Result<TagLookup, TransportError> {
        let lookup = self.transport.tag_exists(&self.repository, version).await?;
        tracing::debug!(
            repository = %self.repository,
            version,
            ?lookup,
            "checked version tag"
        );
        Ok(lookup)
    }

    /// Highest semantic version among the repository's tags.
    ///
    /// Tags that are not dotted numbers (`latest`, `devel`, `4.4.0-ubuntu`)
    /// are ignored. Fails with [`TransportError::ListingTimedOut`] when the
    /// listing outlasts its budget.
    pub async fn highest_version(&self) -> Result<Option<String>, TransportError> {
        let listing = self.transport.list_tags(&self.repository);
        let tags = match tokio::time::timeout(self.listing_timeout, listing).await {
            Ok(result) => result?,
            Err(elapsed) => {
                tracing::debug!(repository = %self.repository, %elapsed, "tag listing cut off");
                return Err(TransportError::ListingTimedOut {
                    repository: self.repository.clone(),
                    secs: self.listing_timeout.as_secs(),
                });
            }
        };
        Ok(highest(&tags))
    }
}

fn highest(tags: &[String]) -> Option<String> {
    tags.iter()
        .filter_map(|t| RVersion::parse(t).map(|v| (v, t)))
        .max_by(|a, b| a.0.cmp(&b.0))
        .map(|(_, t)| t.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn highest_ignores_non_numeric_tags() {
        let t = tags(&["latest", "devel", "4.3.2", "4.4.0", "4.10.1-ubuntu", "4.3"]);
        assert_eq!(highest(&t).as_deref(), Some("4.4.0"));
    }

    #[test]
    fn highest_compares_numerically() {
        let t = tags(&["4.9.0", "4.10.0", "3.6.3"]);
        assert_eq!(highest(&t).as_deref(), Some("4.10.0"));
    }

    #[test]
    fn highest_of_nothing_is_none() {
        assert!(highest(&tags(&["latest", "release"])).is_none());
        assert!(highest(&[]).is_none());
    }
}
