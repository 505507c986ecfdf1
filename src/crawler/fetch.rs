//! Fetch backend contract
//!
//! Every backend answers one question: given a URL (plus the depth and sibling
//! index it was discovered at), what did the site serve, and where did the
//! request actually end up?

use crate::CloneError;
use async_trait::async_trait;
use url::Url;

/// Content retrieved for one URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    /// Where the backend ended up after redirects
    pub final_url: Url,
    /// HTTP status, when the backend can observe it
    pub status_code: Option<u16>,
    pub content_type: String,
    pub content: Vec<u8>,
    /// Outbound references in document order
    pub links: Vec<Url>,
}

impl FetchedPage {
    /// True when the server answered with a 4xx or 5xx status
    pub fn is_error_status(&self) -> bool {
        matches!(self.status_code, Some(code) if code >= 400)
    }
}

/// Result of a fetch operation
#[derive(Debug)]
pub enum FetchResult {
    /// Content was retrieved (possibly an error page, see `status_code`)
    Success(FetchedPage),

    /// Network, navigation or rendering failure
    Failed {
        /// The requested URL
        url: String,
        /// Underlying error description
        error: String,
    },

    /// The fetch did not finish within the page timeout
    Timeout {
        /// The requested URL
        url: String,
        /// Timeout that elapsed, in seconds
        secs: u64,
    },
}

impl FetchResult {
    pub fn failed(url: &Url, error: impl ToString) -> Self {
        FetchResult::Failed {
            url: url.to_string(),
            error: error.to_string(),
        }
    }

    /// Error message for unsuccessful results
    pub fn error_message(&self) -> Option<String> {
        match self {
            FetchResult::Success(_) => None,
            FetchResult::Failed { error, .. } => Some(error.clone()),
            FetchResult::Timeout { secs, .. } => Some(format!("timed out after {}s", secs)),
        }
    }
}

/// Polymorphic page retrieval
///
/// Backends own whatever session they need (an HTTP client, a browser), so a
/// call only carries the URL and its position in the crawl. Per-page failures
/// come back as `Ok(FetchResult::Failed)` or `Ok(FetchResult::Timeout)`; an
/// `Err` means the backend was used outside its contract.
#[async_trait]
pub trait FetchBackend: Send + Sync {
    /// Short backend name used in logs and errors
    fn name(&self) -> &'static str;

    /// Fetches `url`, discovered at `depth` as the `index`-th link of its parent
    ///
    /// The default body rejects the call; concrete backends override it.
    async fn fetch_data(&self, url: &Url, depth: u32, index: u32) -> Result<FetchResult, CloneError> {
        tracing::trace!(depth, index, "{} backend asked to fetch {}", self.name(), url);
        Err(CloneError::NotImplemented {
            backend: self.name(),
        })
    }
}

/// The bare contract, with no way to retrieve anything
#[derive(Debug, Clone, Copy, Default)]
pub struct BaseFetcher;

impl FetchBackend for BaseFetcher {
    fn name(&self) -> &'static str {
        "base"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_base_fetcher_rejects_every_call() {
        let backend = BaseFetcher;
        for (url, depth, index) in [
            ("http://example.com", 0, 0),
            ("https://example.com/deep/page?q=1", 7, 3),
            ("http://127.0.0.1:8080/", 1, 42),
        ] {
            let url = Url::parse(url).unwrap();
            let result = backend.fetch_data(&url, depth, index).await;
            match result {
                Err(err @ CloneError::NotImplemented { backend: "base" }) => {
                    assert!(err.is_contract_violation());
                }
                other => panic!("expected NotImplemented, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_error_status_detection() {
        let mut page = FetchedPage {
            final_url: Url::parse("http://example.com/").unwrap(),
            status_code: Some(200),
            content_type: "text/html".to_string(),
            content: Vec::new(),
            links: Vec::new(),
        };
        assert!(!page.is_error_status());

        page.status_code = Some(404);
        assert!(page.is_error_status());

        page.status_code = None;
        assert!(!page.is_error_status());
    }

    #[test]
    fn test_error_message() {
        let url = Url::parse("http://example.com/").unwrap();
        assert_eq!(
            FetchResult::failed(&url, "connection refused").error_message(),
            Some("connection refused".to_string())
        );
        let timeout = FetchResult::Timeout {
            url: url.to_string(),
            secs: 30,
        };
        assert_eq!(timeout.error_message(), Some("timed out after 30s".to_string()));
    }
}
