//! Plain HTTP fetch backend
//!
//! Issues a single GET per URL with reqwest. Redirects are followed by the
//! client up to `max-redirects`; no scripts run, so the content is exactly what
//! the server sent.

use crate::config::HttpConfig;
use crate::crawler::fetch::{FetchBackend, FetchResult, FetchedPage};
use crate::crawler::parser::extract_links;
use crate::CloneError;
use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, redirect::Policy, Client, Response};
use std::time::Duration;
use url::Url;

/// Content type assumed when the server sends none
const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The HTTP section of the configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &HttpConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(Duration::from_secs(config.page_timeout))
        .connect_timeout(Duration::from_secs(config.connect_timeout))
        .redirect(Policy::limited(config.max_redirects))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetch backend backed by a reqwest client
#[derive(Debug, Clone)]
pub struct PlainFetcher {
    client: Client,
    page_timeout: u64,
    max_page_bytes: usize,
}

impl PlainFetcher {
    pub fn new(config: &HttpConfig) -> Result<Self, CloneError> {
        Ok(Self {
            client: build_http_client(config)?,
            page_timeout: config.page_timeout,
            max_page_bytes: config.max_page_bytes,
        })
    }

    /// Reads the body, giving up once it grows past `max_page_bytes`
    async fn read_body(&self, mut response: Response) -> Result<Vec<u8>, String> {
        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| e.to_string())? {
            if body.len() + chunk.len() > self.max_page_bytes {
                return Err(format!(
                    "response body exceeds {} bytes",
                    self.max_page_bytes
                ));
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body)
    }

    fn classify_error(&self, url: &Url, e: reqwest::Error) -> FetchResult {
        if e.is_timeout() {
            FetchResult::Timeout {
                url: url.to_string(),
                secs: self.page_timeout,
            }
        } else if e.is_redirect() {
            FetchResult::failed(url, format!("Redirect error: {}", e))
        } else if e.is_connect() {
            FetchResult::failed(url, format!("Connection failed: {}", e))
        } else {
            FetchResult::failed(url, e)
        }
    }
}

#[async_trait]
impl FetchBackend for PlainFetcher {
    fn name(&self) -> &'static str {
        "plain"
    }

    async fn fetch_data(&self, url: &Url, depth: u32, index: u32) -> Result<FetchResult, CloneError> {
        tracing::debug!(depth, index, "GET {}", url);

        let response = match self.client.get(url.clone()).send().await {
            Ok(response) => response,
            Err(e) => {
                let result = self.classify_error(url, e);
                if let Some(error) = result.error_message() {
                    tracing::error!("Failed to fetch {}: {}", url, error);
                }
                return Ok(result);
            }
        };

        let status = response.status();
        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(FALLBACK_CONTENT_TYPE)
            .to_string();

        let content = match self.read_body(response).await {
            Ok(content) => content,
            Err(error) => {
                tracing::error!("Failed to read body of {}: {}", url, error);
                return Ok(FetchResult::failed(url, error));
            }
        };

        if final_url != *url {
            tracing::debug!("{} resolved to {}", url, final_url);
        }

        let links = if status.is_success() {
            extract_links(&content, &content_type, &final_url)
        } else {
            tracing::warn!("{} answered with HTTP {}", url, status.as_u16());
            Vec::new()
        };

        Ok(FetchResult::Success(FetchedPage {
            final_url,
            status_code: Some(status.as_u16()),
            content_type,
            content,
            links,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher() -> PlainFetcher {
        PlainFetcher::new(&HttpConfig::default()).unwrap()
    }

    #[test]
    fn test_build_http_client() {
        assert!(build_http_client(&HttpConfig::default()).is_ok());
    }

    #[tokio::test]
    async fn test_fetch_html_with_links() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html; charset=utf-8")
                    .set_body_string(r#"<html><body><a href="/a">a</a><img src="/b.png"></body></html>"#),
            )
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/", server.uri())).unwrap();
        let result = fetcher().fetch_data(&url, 0, 0).await.unwrap();

        match result {
            FetchResult::Success(page) => {
                assert_eq!(page.final_url, url);
                assert_eq!(page.status_code, Some(200));
                assert!(page.content_type.starts_with("text/html"));
                let links: Vec<String> = page.links.iter().map(|u| u.path().to_string()).collect();
                assert_eq!(links, vec!["/a", "/b.png"]);
            }
            other => panic!("expected success, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_redirect_reports_final_url() {
        let server = MockServer::start().await;
        let location = format!("{}/new", server.uri());
        Mock::given(method("GET"))
            .and(path("/old"))
            .respond_with(
                ResponseTemplate::new(301).insert_header("location", location.as_str()),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/new"))
            .respond_with(ResponseTemplate::new(200).set_body_string("moved"))
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/old", server.uri())).unwrap();
        match fetcher().fetch_data(&url, 1, 2).await.unwrap() {
            FetchResult::Success(page) => {
                assert_eq!(page.final_url.path(), "/new");
                assert_eq!(page.content, b"moved");
                assert_eq!(page.content_type, FALLBACK_CONTENT_TYPE);
            }
            other => panic!("expected success, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_error_status_kept_without_links() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(404)
                    .insert_header("content-type", "text/html")
                    .set_body_string(r#"<a href="/elsewhere">x</a>"#),
            )
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/missing", server.uri())).unwrap();
        match fetcher().fetch_data(&url, 0, 0).await.unwrap() {
            FetchResult::Success(page) => {
                assert!(page.is_error_status());
                assert!(page.links.is_empty());
            }
            other => panic!("expected error page, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_oversized_body_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![b'x'; 4096]))
            .mount(&server)
            .await;

        let config = HttpConfig {
            max_page_bytes: 1024,
            ..HttpConfig::default()
        };
        let url = Url::parse(&server.uri()).unwrap();
        let result = PlainFetcher::new(&config)
            .unwrap()
            .fetch_data(&url, 0, 0)
            .await
            .unwrap();
        assert!(matches!(result, FetchResult::Failed { .. }));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_failed_result() {
        // Nothing listens on port 9 on loopback
        let url = Url::parse("http://127.0.0.1:9/").unwrap();
        let result = fetcher().fetch_data(&url, 0, 0).await.unwrap();
        assert!(result.error_message().is_some());
    }
}
