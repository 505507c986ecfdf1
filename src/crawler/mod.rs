//! Crawler module for page fetching and clone traversal
//!
//! This module contains the core cloning logic, including:
//! - The fetch backend contract and its plain HTTP and headless variants
//! - Link extraction from HTML and CSS
//! - The depth-tagged work queue
//! - Overall clone coordination

#[cfg(feature = "headless")]
mod chromium;
mod coordinator;
mod fetch;
mod frontier;
mod headless;
mod parser;
mod plain;

#[cfg(feature = "headless")]
pub use chromium::ChromiumSession;
pub use coordinator::{CancelHandle, CloneReport, Cloner, StoredPage};
pub use fetch::{BaseFetcher, FetchBackend, FetchResult, FetchedPage};
pub use frontier::{CrawlFrame, Frontier};
pub use headless::{
    BrowserError, BrowserSession, BrowserTab, HeadlessFetcher, RENDERED_CONTENT_TYPE,
    TAB_CLOSE_TIMEOUT,
};
pub use parser::{extract_css_links, extract_html_links, extract_links, is_css, is_html};
pub use plain::{build_http_client, PlainFetcher};

use crate::config::{Config, Renderer};
use crate::CloneError;
use std::sync::Arc;

/// Builds the fetch backend selected by `cloner.renderer`
///
/// The headless renderer launches a browser and is only available when the
/// crate is built with the `headless` feature.
pub async fn build_backend(config: &Config) -> Result<Arc<dyn FetchBackend>, CloneError> {
    match config.cloner.renderer {
        Renderer::Plain => Ok(Arc::new(PlainFetcher::new(&config.http)?)),
        Renderer::Headless => build_headless_backend(config).await,
    }
}

#[cfg(feature = "headless")]
async fn build_headless_backend(config: &Config) -> Result<Arc<dyn FetchBackend>, CloneError> {
    let session = ChromiumSession::launch(&config.http.user_agent).await?;
    Ok(Arc::new(HeadlessFetcher::new(
        Arc::new(session),
        std::time::Duration::from_secs(config.http.page_timeout),
    )))
}

#[cfg(not(feature = "headless"))]
async fn build_headless_backend(_config: &Config) -> Result<Arc<dyn FetchBackend>, CloneError> {
    Err(crate::ConfigError::Validation(
        "the headless renderer requires building with the `headless` feature".to_string(),
    )
    .into())
}
