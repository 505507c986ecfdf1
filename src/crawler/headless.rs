//! Rendering fetch backend
//!
//! Each fetch opens its own browser tab, navigates, and reads back the rendered
//! DOM together with the URL the browser settled on. The browser itself sits
//! behind [`BrowserSession`] so the backend can run against any engine.

use crate::crawler::fetch::{FetchBackend, FetchResult, FetchedPage};
use crate::crawler::parser::extract_html_links;
use crate::CloneError;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Content type reported for rendered pages
pub const RENDERED_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// Upper bound on closing a tab once the fetch is done
pub const TAB_CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors raised by a browser session or tab
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("Failed to launch browser: {0}")]
    Launch(String),

    /// Tab-level failure (creating, reading or closing a page)
    #[error("{0}")]
    Page(String),

    #[error("Navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("Tab already closed")]
    Closed,
}

/// A running browser able to open tabs
#[async_trait]
pub trait BrowserSession: Send + Sync {
    async fn new_tab(&self) -> Result<Box<dyn BrowserTab>, BrowserError>;
}

/// One browser tab
#[async_trait]
pub trait BrowserTab: Send + Sync {
    /// Navigates and waits for the page to finish loading
    async fn navigate(&mut self, url: &Url) -> Result<(), BrowserError>;

    /// The URL the tab currently shows, after any redirects
    async fn current_url(&self) -> Result<Option<String>, BrowserError>;

    /// Serialized rendered DOM
    async fn content(&self) -> Result<String, BrowserError>;

    async fn close(&mut self) -> Result<(), BrowserError>;
}

/// Owns a tab for the duration of one fetch
///
/// `close` is the normal exit. If the guard is dropped with the tab still open
/// (an error path, or the fetch future being cancelled) the close is spawned
/// onto the current runtime instead.
struct TabGuard {
    tab: Option<Box<dyn BrowserTab>>,
    url: String,
}

impl TabGuard {
    fn new(tab: Box<dyn BrowserTab>, url: &Url) -> Self {
        Self {
            tab: Some(tab),
            url: url.to_string(),
        }
    }

    fn tab(&mut self) -> Result<&mut (dyn BrowserTab + 'static), BrowserError> {
        self.tab.as_deref_mut().ok_or(BrowserError::Closed)
    }

    async fn close(mut self, limit: Duration) {
        if let Some(mut tab) = self.tab.take() {
            match tokio::time::timeout(limit, tab.close()).await {
                Ok(Ok(())) => tracing::trace!("Closed tab for {}", self.url),
                Ok(Err(e)) => tracing::warn!("Failed to close tab for {}: {}", self.url, e),
                Err(_) => tracing::warn!(
                    "Timed out closing tab for {} after {}ms",
                    self.url,
                    limit.as_millis()
                ),
            }
        }
    }
}

impl Drop for TabGuard {
    fn drop(&mut self) {
        if let Some(mut tab) = self.tab.take() {
            let url = std::mem::take(&mut self.url);
            match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    handle.spawn(async move {
                        if let Err(e) = tab.close().await {
                            tracing::warn!("Failed to close abandoned tab for {}: {}", url, e);
                        }
                    });
                }
                Err(_) => tracing::warn!("No runtime to close abandoned tab for {}", url),
            }
        }
    }
}

/// Fetch backend that renders pages in a headless browser
///
/// Opening the tab and rendering share one `page_timeout` deadline. Closing
/// the tab is bounded separately by `close_timeout`.
pub struct HeadlessFetcher {
    session: Arc<dyn BrowserSession>,
    page_timeout: Duration,
    close_timeout: Duration,
}

impl HeadlessFetcher {
    pub fn new(session: Arc<dyn BrowserSession>, page_timeout: Duration) -> Self {
        Self {
            session,
            page_timeout,
            close_timeout: TAB_CLOSE_TIMEOUT,
        }
    }

    pub fn with_close_timeout(mut self, close_timeout: Duration) -> Self {
        self.close_timeout = close_timeout;
        self
    }

    fn timed_out(&self, url: &Url, stage: &str) -> FetchResult {
        tracing::error!(
            "Timed out {} {} after {}s",
            stage,
            url,
            self.page_timeout.as_secs_f64()
        );
        FetchResult::Timeout {
            url: url.to_string(),
            secs: self.page_timeout.as_secs(),
        }
    }

    async fn render(guard: &mut TabGuard, url: &Url) -> Result<(Url, String), BrowserError> {
        let tab = guard.tab()?;
        tab.navigate(url).await?;

        let final_url = match tab.current_url().await? {
            Some(current) => Url::parse(&current).unwrap_or_else(|_| url.clone()),
            None => url.clone(),
        };
        let html = tab.content().await?;

        Ok((final_url, html))
    }
}

#[async_trait]
impl FetchBackend for HeadlessFetcher {
    fn name(&self) -> &'static str {
        "headless"
    }

    async fn fetch_data(&self, url: &Url, depth: u32, index: u32) -> Result<FetchResult, CloneError> {
        tracing::debug!(depth, index, "Rendering {}", url);

        let deadline = tokio::time::Instant::now() + self.page_timeout;

        let tab = match tokio::time::timeout_at(deadline, self.session.new_tab()).await {
            Ok(Ok(tab)) => tab,
            Ok(Err(e)) => {
                tracing::error!("Failed to open tab for {}: {}", url, e);
                return Ok(FetchResult::failed(url, e));
            }
            Err(_) => return Ok(self.timed_out(url, "opening tab for")),
        };

        let mut guard = TabGuard::new(tab, url);
        let outcome = tokio::time::timeout_at(deadline, Self::render(&mut guard, url)).await;
        guard.close(self.close_timeout).await;

        match outcome {
            Ok(Ok((final_url, html))) => {
                if final_url != *url {
                    tracing::debug!("{} resolved to {}", url, final_url);
                }
                let links = extract_html_links(&html, &final_url);
                Ok(FetchResult::Success(FetchedPage {
                    final_url,
                    status_code: None,
                    content_type: RENDERED_CONTENT_TYPE.to_string(),
                    content: html.into_bytes(),
                    links,
                }))
            }
            Ok(Err(e)) => {
                tracing::error!("Failed to render {}: {}", url, e);
                Ok(FetchResult::failed(url, e))
            }
            Err(_) => Ok(self.timed_out(url, "rendering")),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scripted tab: optionally redirects, fails navigation, or hangs
    pub(crate) struct ScriptedTab {
        redirect_to: Option<String>,
        fail_navigation: bool,
        hang: bool,
        hang_close: bool,
        current: Option<String>,
        closed: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl BrowserTab for ScriptedTab {
        async fn navigate(&mut self, url: &Url) -> Result<(), BrowserError> {
            if self.hang {
                std::future::pending::<()>().await;
            }
            if self.fail_navigation {
                return Err(BrowserError::Navigation {
                    url: url.to_string(),
                    reason: "net::ERR_NAME_NOT_RESOLVED".to_string(),
                });
            }
            self.current = Some(
                self.redirect_to
                    .clone()
                    .unwrap_or_else(|| url.to_string()),
            );
            Ok(())
        }

        async fn current_url(&self) -> Result<Option<String>, BrowserError> {
            Ok(self.current.clone())
        }

        async fn content(&self) -> Result<String, BrowserError> {
            Ok(r#"<html><body><a href="/next">next</a></body></html>"#.to_string())
        }

        async fn close(&mut self) -> Result<(), BrowserError> {
            if self.hang_close {
                std::future::pending::<()>().await;
            }
            self.closed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[derive(Default)]
    pub(crate) struct ScriptedSession {
        pub redirect_to: Option<String>,
        pub fail_tab: bool,
        pub fail_navigation: bool,
        pub hang: bool,
        pub hang_tab: bool,
        pub hang_close: bool,
        pub opened: Arc<AtomicUsize>,
        pub closed: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl BrowserSession for ScriptedSession {
        async fn new_tab(&self) -> Result<Box<dyn BrowserTab>, BrowserError> {
            if self.fail_tab {
                return Err(BrowserError::Page("Failed to create new page".to_string()));
            }
            if self.hang_tab {
                std::future::pending::<()>().await;
            }
            self.opened.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(ScriptedTab {
                redirect_to: self.redirect_to.clone(),
                fail_navigation: self.fail_navigation,
                hang: self.hang,
                hang_close: self.hang_close,
                current: None,
                closed: Arc::clone(&self.closed),
            }))
        }
    }

    fn fetcher(session: ScriptedSession) -> (HeadlessFetcher, Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let opened = Arc::clone(&session.opened);
        let closed = Arc::clone(&session.closed);
        (
            HeadlessFetcher::new(Arc::new(session), Duration::from_millis(200)),
            opened,
            closed,
        )
    }

    #[tokio::test]
    async fn test_redirect_reports_browser_url() {
        let (backend, opened, closed) = fetcher(ScriptedSession {
            redirect_to: Some("http://www.example.com/".to_string()),
            ..Default::default()
        });

        let url = Url::parse("http://example.com").unwrap();
        match backend.fetch_data(&url, 0, 0).await.unwrap() {
            FetchResult::Success(page) => {
                assert_eq!(page.final_url.as_str(), "http://www.example.com/");
                assert_eq!(page.content_type, RENDERED_CONTENT_TYPE);
                assert_eq!(page.links[0].as_str(), "http://www.example.com/next");
            }
            other => panic!("expected success, got {:?}", other),
        }
        assert_eq!(opened.load(Ordering::SeqCst), 1);
        assert_eq!(closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_tab_creation_failure_is_contained() {
        let (backend, _, _) = fetcher(ScriptedSession {
            fail_tab: true,
            ..Default::default()
        });

        let url = Url::parse("http://example.com/").unwrap();
        let result = backend.fetch_data(&url, 0, 0).await.unwrap();
        assert_eq!(
            result.error_message(),
            Some("Failed to create new page".to_string())
        );
    }

    #[tokio::test]
    async fn test_navigation_failure_still_closes_tab() {
        let (backend, opened, closed) = fetcher(ScriptedSession {
            fail_navigation: true,
            ..Default::default()
        });

        let url = Url::parse("http://example.invalid/").unwrap();
        let result = backend.fetch_data(&url, 2, 5).await.unwrap();
        assert!(matches!(result, FetchResult::Failed { .. }));
        assert_eq!(opened.load(Ordering::SeqCst), 1);
        assert_eq!(closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_hanging_navigation_times_out_and_closes_tab() {
        let (backend, _, closed) = fetcher(ScriptedSession {
            hang: true,
            ..Default::default()
        });

        let url = Url::parse("http://example.com/slow").unwrap();
        let result = backend.fetch_data(&url, 0, 0).await.unwrap();
        assert!(matches!(result, FetchResult::Timeout { .. }));
        assert_eq!(closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_hanging_tab_creation_times_out() {
        let (backend, opened, _) = fetcher(ScriptedSession {
            hang_tab: true,
            ..Default::default()
        });

        let url = Url::parse("http://example.com/").unwrap();
        let result = tokio::time::timeout(Duration::from_secs(2), backend.fetch_data(&url, 0, 0))
            .await
            .expect("fetch must respect the page timeout")
            .unwrap();
        assert!(matches!(result, FetchResult::Timeout { .. }));
        assert_eq!(opened.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_hanging_close_is_bounded() {
        let (backend, _, closed) = fetcher(ScriptedSession {
            hang_close: true,
            ..Default::default()
        });
        let backend = backend.with_close_timeout(Duration::from_millis(100));

        let url = Url::parse("http://example.com/").unwrap();
        let result = tokio::time::timeout(Duration::from_secs(2), backend.fetch_data(&url, 0, 0))
            .await
            .expect("tab close must be bounded")
            .unwrap();
        assert!(matches!(result, FetchResult::Success(_)));
        assert_eq!(closed.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_dropped_fetch_closes_tab() {
        let (backend, opened, closed) = fetcher(ScriptedSession {
            hang: true,
            ..Default::default()
        });
        let backend = HeadlessFetcher::new(backend.session, Duration::from_secs(60));

        let url = Url::parse("http://example.com/slow").unwrap();
        let fetch = backend.fetch_data(&url, 0, 0);
        let _ = tokio::time::timeout(Duration::from_millis(50), fetch).await;

        // The drop fallback closes on a spawned task
        for _ in 0..50 {
            if closed.load(Ordering::SeqCst) == 1 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(opened.load(Ordering::SeqCst), 1);
        assert_eq!(closed.load(Ordering::SeqCst), 1);
    }
}
