//! Chromium-backed browser session (requires the `headless` feature)

use crate::crawler::headless::{BrowserError, BrowserSession, BrowserTab};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;
use url::Url;

/// A launched Chromium instance plus its CDP event loop
pub struct ChromiumSession {
    browser: Browser,
    handler: JoinHandle<()>,
}

impl ChromiumSession {
    /// Launches a headless Chromium with the given user agent
    pub async fn launch(user_agent: &str) -> Result<Self, BrowserError> {
        let config = BrowserConfig::builder()
            .args(["--no-first-run", "--disable-gpu", "--disable-dev-shm-usage"])
            .arg(format!("--user-agent={}", user_agent))
            .build()
            .map_err(BrowserError::Launch)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!("Browser handler error: {}", e);
                }
            }
        });

        tracing::info!("Launched headless browser");
        Ok(Self { browser, handler })
    }

    /// Closes the browser and stops its event loop
    pub async fn shutdown(mut self) {
        if let Err(e) = self.browser.close().await {
            tracing::warn!("Failed to close browser: {}", e);
        }
        let _ = self.browser.wait().await;
        self.handler.abort();
    }
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn new_tab(&self) -> Result<Box<dyn BrowserTab>, BrowserError> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| BrowserError::Page(format!("Failed to create new page: {}", e)))?;
        Ok(Box::new(ChromiumTab { page: Some(page) }))
    }
}

struct ChromiumTab {
    page: Option<Page>,
}

impl ChromiumTab {
    fn page(&self) -> Result<&Page, BrowserError> {
        self.page.as_ref().ok_or(BrowserError::Closed)
    }
}

#[async_trait]
impl BrowserTab for ChromiumTab {
    async fn navigate(&mut self, url: &Url) -> Result<(), BrowserError> {
        let page = self.page()?;
        page.goto(url.as_str())
            .await
            .map_err(|e| BrowserError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        page.wait_for_navigation()
            .await
            .map_err(|e| BrowserError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        Ok(())
    }

    async fn current_url(&self) -> Result<Option<String>, BrowserError> {
        self.page()?
            .url()
            .await
            .map_err(|e| BrowserError::Page(e.to_string()))
    }

    async fn content(&self) -> Result<String, BrowserError> {
        self.page()?
            .content()
            .await
            .map_err(|e| BrowserError::Page(e.to_string()))
    }

    async fn close(&mut self) -> Result<(), BrowserError> {
        match self.page.take() {
            Some(page) => page
                .close()
                .await
                .map_err(|e| BrowserError::Page(e.to_string())),
            None => Ok(()),
        }
    }
}
