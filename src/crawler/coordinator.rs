//! Clone coordinator - main traversal loop
//!
//! The coordinator owns all per-run state (visited set, frontier, manifest
//! handle) and is the only place that mutates it. Fetches run concurrently as
//! futures polled from this single loop, so every visited-set check-and-mark
//! happens between suspension points and can never interleave with another.

use crate::config::Config;
use crate::crawler::fetch::{FetchBackend, FetchResult, FetchedPage};
use crate::crawler::frontier::{CrawlFrame, Frontier};
use crate::state::{PageState, VisitedSet};
use crate::storage::{
    ClonedPage, Manifest, PageEntry, PageMeta, PageStore, PathAllocator, RunStatus,
    UniquePathAllocator,
};
use crate::url::{normalize, normalize_url, LinkScope};
use crate::validate::{MarkupValidator, Validator};
use crate::CloneError;
use chrono::Utc;
use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use url::Url;

type FetchFuture = BoxFuture<'static, (CrawlFrame, Result<FetchResult, CloneError>)>;

/// Stops a running clone from another task
///
/// Cancelling stops dequeuing, drops every in-flight fetch, and ends the run as
/// interrupted. Pages already stored stay on disk.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    sender: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.sender.borrow()
    }
}

/// A page written to disk during the run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredPage {
    pub url: String,
    pub resolved_url: String,
    pub path: PathBuf,
    pub depth: u32,
    pub sibling_index: u32,
}

/// Outcome of one clone run
#[derive(Debug, Clone, Default)]
pub struct CloneReport {
    /// Manifest run id, when a manifest is attached
    pub run_id: Option<i64>,
    pub stored: Vec<StoredPage>,
    pub failed: u64,
    /// Frames dropped by the page limit
    pub skipped: u64,
    /// Links not enqueued because their URL was already visited
    pub duplicates: u64,
    /// Links outside the clone scope
    pub external: u64,
    /// Stored pages the validator rejected
    pub invalid: u64,
    /// Calls that hit a backend without a fetch implementation
    pub contract_violations: u64,
    /// Frames pending or in flight when the run was cancelled
    pub abandoned: u64,
    pub cancelled: bool,
    pub elapsed: Duration,
}

impl CloneReport {
    /// Number of fetches that reached a terminal outcome
    pub fn fetched(&self) -> u64 {
        self.stored.len() as u64 + self.failed
    }
}

/// Mutable state of a single run
struct RunState {
    run_id: Option<i64>,
    visited: VisitedSet,
    frontier: Frontier,
    report: CloneReport,
    started: u64,
}

/// Recursive site cloner
pub struct Cloner {
    backend: Arc<dyn FetchBackend>,
    store: PageStore,
    manifest: Option<Box<dyn Manifest + Send>>,
    config_hash: String,
    validator: Option<Box<dyn Validator>>,
    scope: LinkScope,
    seed: Url,
    max_depth: u32,
    max_concurrent: usize,
    max_pages: Option<u64>,
    cancel: Arc<watch::Sender<bool>>,
}

impl Cloner {
    /// Creates a cloner for the configured target
    ///
    /// Pages are allocated under `output.target-dir`. No manifest is attached;
    /// see [`Cloner::with_manifest`].
    pub fn new(config: &Config, backend: Arc<dyn FetchBackend>) -> Result<Self, CloneError> {
        let seed = normalize_url(&config.cloner.target)?;
        let allocator = UniquePathAllocator::new(&config.output.target_dir)?;
        let validator: Option<Box<dyn Validator>> = if config.cloner.validate {
            Some(Box::new(MarkupValidator))
        } else {
            None
        };
        let (sender, _) = watch::channel(false);

        Ok(Self {
            backend,
            store: PageStore::new(Arc::new(allocator)),
            manifest: None,
            config_hash: String::new(),
            validator,
            scope: LinkScope::new(&seed, &config.cloner.allowed_domains),
            seed,
            max_depth: config.cloner.max_depth,
            max_concurrent: config.cloner.max_concurrent_fetches.max(1) as usize,
            max_pages: config.cloner.max_pages.map(u64::from),
            cancel: Arc::new(sender),
        })
    }

    /// Records the run and every terminal page outcome in `manifest`
    pub fn with_manifest(mut self, manifest: Box<dyn Manifest + Send>, config_hash: &str) -> Self {
        self.manifest = Some(manifest);
        self.config_hash = config_hash.to_string();
        self
    }

    pub fn with_validator(mut self, validator: Box<dyn Validator>) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn with_allocator(mut self, allocator: Arc<dyn PathAllocator>) -> Self {
        self.store = PageStore::new(allocator);
        self
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            sender: Arc::clone(&self.cancel),
        }
    }

    /// Gives the manifest back once the run is over
    pub fn into_manifest(self) -> Option<Box<dyn Manifest + Send>> {
        self.manifest
    }

    /// Runs the clone to completion or cancellation
    ///
    /// Per-page failures never end the run; only manifest errors do, in which
    /// case the run is marked failed.
    pub async fn run(&mut self) -> Result<CloneReport, CloneError> {
        let start_time = Instant::now();

        let run_id = match self.manifest.as_mut() {
            Some(manifest) => Some(manifest.create_run(self.seed.as_str(), &self.config_hash)?),
            None => None,
        };

        tracing::info!(
            "Starting clone of {} (backend: {}, max depth: {})",
            self.seed,
            self.backend.name(),
            self.max_depth
        );

        let mut state = RunState {
            run_id,
            visited: VisitedSet::new(),
            frontier: Frontier::new(),
            report: CloneReport {
                run_id,
                ..CloneReport::default()
            },
            started: 0,
        };

        state.visited.check_and_mark(&self.seed);
        state.frontier.push(CrawlFrame {
            url: self.seed.clone(),
            depth: 0,
            index: 0,
        });

        let outcome = self.run_loop(&mut state).await;

        let status = match &outcome {
            Err(_) => RunStatus::Failed,
            Ok(()) if state.report.cancelled => RunStatus::Interrupted,
            Ok(()) => RunStatus::Completed,
        };
        if let (Some(manifest), Some(run_id)) = (self.manifest.as_mut(), run_id) {
            if let Err(e) = manifest.finish_run(run_id, status) {
                tracing::error!("Failed to finish run {}: {}", run_id, e);
            }
        }
        outcome?;

        state.report.elapsed = start_time.elapsed();
        tracing::info!(
            "Clone {}: {} stored, {} failed, {} skipped in {:?}",
            status,
            state.report.stored.len(),
            state.report.failed,
            state.report.skipped,
            state.report.elapsed
        );

        Ok(state.report)
    }

    async fn run_loop(&mut self, state: &mut RunState) -> Result<(), CloneError> {
        let mut cancel_rx = self.cancel.subscribe();
        let mut in_flight: FuturesUnordered<FetchFuture> = FuturesUnordered::new();

        loop {
            if *cancel_rx.borrow_and_update() {
                let abandoned = in_flight.len() + state.frontier.len();
                // Dropping the futures releases their backend resources
                in_flight.clear();
                state.frontier.drain();
                state.report.abandoned = abandoned as u64;
                state.report.cancelled = true;
                tracing::warn!("Clone cancelled, {} pages abandoned", abandoned);
                return Ok(());
            }

            self.fill(state, &mut in_flight)?;

            if in_flight.is_empty() {
                tracing::info!("Frontier is empty, clone complete");
                return Ok(());
            }

            tokio::select! {
                _ = cancel_rx.changed() => continue,
                Some((frame, result)) = in_flight.next() => {
                    self.handle_result(state, frame, result)?;
                }
            }
        }
    }

    /// Starts fetches until the concurrency limit is reached or the frontier
    /// runs dry
    fn fill(
        &mut self,
        state: &mut RunState,
        in_flight: &mut FuturesUnordered<FetchFuture>,
    ) -> Result<(), CloneError> {
        while in_flight.len() < self.max_concurrent {
            let Some(frame) = state.frontier.pop() else {
                break;
            };

            if self.max_pages.is_some_and(|max| state.started >= max) {
                tracing::debug!("Page limit reached, skipping {}", frame.url);
                state.report.skipped += 1;
                self.record(
                    state.run_id,
                    PageEntry {
                        state: PageState::Skipped,
                        error_message: Some("page limit reached".to_string()),
                        ..PageEntry::failed(frame.url.as_str(), frame.depth, frame.index, "")
                    },
                )?;
                continue;
            }

            state.started += 1;
            tracing::trace!(
                "{} -> {}: {}",
                PageState::Pending,
                PageState::Fetching,
                frame.url
            );
            in_flight.push(self.start_fetch(frame));
        }
        Ok(())
    }

    fn start_fetch(&self, frame: CrawlFrame) -> FetchFuture {
        let backend = Arc::clone(&self.backend);
        Box::pin(async move {
            let result = backend.fetch_data(&frame.url, frame.depth, frame.index).await;
            (frame, result)
        })
    }

    fn handle_result(
        &mut self,
        state: &mut RunState,
        frame: CrawlFrame,
        result: Result<FetchResult, CloneError>,
    ) -> Result<(), CloneError> {
        match result {
            Ok(FetchResult::Success(page)) => self.store_page(state, frame, page),
            Ok(failure) => {
                let error = failure.error_message().unwrap_or_default();
                self.fail(state, &frame, &error)
            }
            Err(e) => {
                if e.is_contract_violation() {
                    state.report.contract_violations += 1;
                }
                tracing::error!("Error processing {}: {}", frame.url, e);
                self.fail(state, &frame, &e.to_string())
            }
        }
    }

    fn fail(&mut self, state: &mut RunState, frame: &CrawlFrame, error: &str) -> Result<(), CloneError> {
        state.report.failed += 1;
        self.record(
            state.run_id,
            PageEntry::failed(frame.url.as_str(), frame.depth, frame.index, error),
        )
    }

    fn store_page(
        &mut self,
        state: &mut RunState,
        frame: CrawlFrame,
        page: FetchedPage,
    ) -> Result<(), CloneError> {
        let verdict = self
            .validator
            .as_ref()
            .map(|v| v.validate(&page.content, &page.content_type));
        if let Some(report) = verdict.as_ref().filter(|r| !r.valid) {
            tracing::warn!(
                "{} failed validation: {}",
                frame.url,
                report.diagnostics.join("; ")
            );
            state.report.invalid += 1;
        }

        let error_page = page.is_error_status();
        let cloned = ClonedPage {
            meta: PageMeta {
                url: frame.url.to_string(),
                resolved_url: page.final_url.to_string(),
                content_type: page.content_type.clone(),
                status_code: page.status_code,
                depth: frame.depth,
                sibling_index: frame.index,
                valid: verdict.as_ref().map(|r| r.valid),
                diagnostics: verdict.map(|r| r.diagnostics).unwrap_or_default(),
                fetched_at: Utc::now().to_rfc3339(),
            },
            content: page.content,
        };

        let path = match self.store.store(&cloned) {
            Ok(path) => path,
            Err(e) => {
                tracing::error!("Failed to store {}: {}", frame.url, e);
                return self.fail(state, &frame, &e.to_string());
            }
        };

        tracing::info!(
            "Stored {} (depth {}) at {}",
            frame.url,
            frame.depth,
            path.display()
        );
        self.record(
            state.run_id,
            PageEntry {
                url: cloned.meta.url.clone(),
                resolved_url: Some(cloned.meta.resolved_url.clone()),
                path: Some(path.to_string_lossy().into_owned()),
                depth: frame.depth,
                sibling_index: frame.index,
                state: PageState::Stored,
                content_type: Some(cloned.meta.content_type.clone()),
                status_code: page.status_code,
                valid: cloned.meta.valid,
                error_message: None,
            },
        )?;
        state.report.stored.push(StoredPage {
            url: cloned.meta.url,
            resolved_url: cloned.meta.resolved_url,
            path,
            depth: frame.depth,
            sibling_index: frame.index,
        });

        if error_page {
            tracing::debug!("Not following links from error page {}", frame.url);
            return Ok(());
        }

        if frame.depth == 0 && self.scope.move_root(&page.final_url) {
            tracing::info!(
                "Seed {} moved to {}, following links on both hosts",
                frame.url,
                page.final_url
            );
        }

        // A redirect onto an already visited URL still gets stored, but its
        // subtree belongs to the page that claimed that URL first
        if let Ok(resolved) = normalize(page.final_url) {
            if resolved != frame.url && !state.visited.check_and_mark(&resolved) {
                tracing::debug!(
                    "{} resolved to already visited {}, not recursing",
                    frame.url,
                    resolved
                );
                return Ok(());
            }
        }

        if frame.depth >= self.max_depth {
            return Ok(());
        }

        self.enqueue_links(state, &frame, page.links);
        Ok(())
    }

    fn enqueue_links(&self, state: &mut RunState, parent: &CrawlFrame, links: Vec<Url>) {
        let mut index = 0;
        for link in links {
            let normalized = match normalize(link) {
                Ok(n) => n,
                Err(e) => {
                    tracing::debug!("Failed to normalize link from {}: {}", parent.url, e);
                    continue;
                }
            };

            if !self.scope.contains(&normalized) {
                tracing::trace!("Ignoring external link {}", normalized);
                state.report.external += 1;
                continue;
            }

            if !state.visited.check_and_mark(&normalized) {
                tracing::debug!("Skipping already visited {}", normalized);
                state.report.duplicates += 1;
                continue;
            }

            state.frontier.push(CrawlFrame {
                url: normalized,
                depth: parent.depth + 1,
                index,
            });
            index += 1;
        }
    }

    fn record(&mut self, run_id: Option<i64>, entry: PageEntry) -> Result<(), CloneError> {
        let from = match entry.state {
            PageState::Skipped => PageState::Pending,
            _ => PageState::Fetching,
        };
        debug_assert!(
            from.can_transition_to(entry.state),
            "illegal transition {} -> {}",
            from,
            entry.state
        );

        if let (Some(manifest), Some(run_id)) = (self.manifest.as_mut(), run_id) {
            manifest.record_page(run_id, &entry)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::fetch::BaseFetcher;
    use crate::storage::SqliteManifest;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory site: path -> (html, optional redirect target path)
    #[derive(Default)]
    struct SiteGraph {
        pages: HashMap<String, String>,
        redirects: HashMap<String, String>,
        broken: Vec<String>,
        fetches: Mutex<Vec<String>>,
    }

    impl SiteGraph {
        fn page(mut self, path: &str, links: &[&str]) -> Self {
            let body: String = links
                .iter()
                .map(|l| format!(r#"<a href="{}">x</a>"#, l))
                .collect();
            self.pages
                .insert(path.to_string(), format!("<html><body>{}</body></html>", body));
            self
        }

        fn redirect(mut self, from: &str, to: &str) -> Self {
            self.redirects.insert(from.to_string(), to.to_string());
            self
        }

        fn broken(mut self, path: &str) -> Self {
            self.broken.push(path.to_string());
            self
        }

        fn fetch_count(&self, path: &str) -> usize {
            self.fetches
                .lock()
                .unwrap()
                .iter()
                .filter(|p| p.as_str() == path)
                .count()
        }

        fn total_fetches(&self) -> usize {
            self.fetches.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl FetchBackend for SiteGraph {
        fn name(&self) -> &'static str {
            "graph"
        }

        async fn fetch_data(&self, url: &Url, _depth: u32, _index: u32) -> Result<FetchResult, CloneError> {
            self.fetches.lock().unwrap().push(url.path().to_string());
            if self.broken.iter().any(|p| p == url.path()) {
                return Ok(FetchResult::failed(url, "connection reset"));
            }

            let mut final_url = url.clone();
            if let Some(target) = self.redirects.get(url.path()) {
                final_url = url.join(target).unwrap();
            }
            let html = match self.pages.get(final_url.path()) {
                Some(html) => html.clone(),
                None => return Ok(FetchResult::failed(url, "not in graph")),
            };
            let links = crate::crawler::parser::extract_html_links(&html, &final_url);
            Ok(FetchResult::Success(FetchedPage {
                final_url,
                status_code: Some(200),
                content_type: "text/html".to_string(),
                content: html.into_bytes(),
                links,
            }))
        }
    }

    fn config(dir: &tempfile::TempDir, max_depth: u32) -> Config {
        let mut config = Config::for_target("http://site.test/");
        config.cloner.max_depth = max_depth;
        config.output.target_dir = dir.path().join("pages").to_string_lossy().into_owned();
        config
    }

    async fn clone_graph(graph: Arc<SiteGraph>, config: &Config) -> CloneReport {
        let mut cloner = Cloner::new(config, graph).unwrap();
        cloner.run().await.unwrap()
    }

    #[tokio::test]
    async fn test_shared_link_fetched_once() {
        let tmp = tempfile::tempdir().unwrap();
        let graph = Arc::new(
            SiteGraph::default()
                .page("/", &["/a", "/b"])
                .page("/a", &["/shared", "/a1"])
                .page("/b", &["/shared", "/"])
                .page("/shared", &[])
                .page("/a1", &[]),
        );

        let report = clone_graph(Arc::clone(&graph), &config(&tmp, 3)).await;

        assert_eq!(report.stored.len(), 5);
        assert_eq!(graph.fetch_count("/shared"), 1);
        assert_eq!(graph.fetch_count("/"), 1);
        assert_eq!(graph.total_fetches(), 5);
        // "/shared" from /b and "/" from /b
        assert_eq!(report.duplicates, 2);
    }

    #[tokio::test]
    async fn test_depth_zero_fetches_only_seed() {
        let tmp = tempfile::tempdir().unwrap();
        let graph = Arc::new(SiteGraph::default().page("/", &["/a", "/b"]));

        let report = clone_graph(Arc::clone(&graph), &config(&tmp, 0)).await;

        assert_eq!(report.stored.len(), 1);
        assert_eq!(graph.total_fetches(), 1);
    }

    #[tokio::test]
    async fn test_depth_bound_is_exact() {
        let tmp = tempfile::tempdir().unwrap();
        let graph = Arc::new(
            SiteGraph::default()
                .page("/", &["/d1"])
                .page("/d1", &["/d2"])
                .page("/d2", &["/d3"])
                .page("/d3", &["/d4"])
                .page("/d4", &[]),
        );

        let report = clone_graph(Arc::clone(&graph), &config(&tmp, 2)).await;

        assert_eq!(graph.total_fetches(), 3);
        assert_eq!(graph.fetch_count("/d3"), 0);
        assert!(report.stored.iter().all(|p| p.depth <= 2));
    }

    #[tokio::test]
    async fn test_cycles_terminate_without_depth_bound() {
        let tmp = tempfile::tempdir().unwrap();
        let graph = Arc::new(
            SiteGraph::default()
                .page("/", &["/a"])
                .page("/a", &["/b", "/"])
                .page("/b", &["/a", "/"]),
        );

        let report = clone_graph(Arc::clone(&graph), &config(&tmp, u32::MAX)).await;

        assert_eq!(report.stored.len(), 3);
        assert_eq!(graph.total_fetches(), 3);
    }

    #[tokio::test]
    async fn test_failure_is_isolated() {
        let tmp = tempfile::tempdir().unwrap();
        let graph = Arc::new(
            SiteGraph::default()
                .page("/", &["/bad", "/good"])
                .page("/good", &["/deeper"])
                .page("/deeper", &[])
                .broken("/bad"),
        );

        let report = clone_graph(Arc::clone(&graph), &config(&tmp, 5)).await;

        assert_eq!(report.failed, 1);
        assert_eq!(report.stored.len(), 3);
    }

    #[tokio::test]
    async fn test_sibling_indexes_follow_document_order() {
        let tmp = tempfile::tempdir().unwrap();
        let graph = Arc::new(
            SiteGraph::default()
                .page("/", &["/x", "https://elsewhere.test/", "/y", "/x", "/z"])
                .page("/x", &[])
                .page("/y", &[])
                .page("/z", &[]),
        );

        let report = clone_graph(graph, &config(&tmp, 1)).await;

        let mut children: Vec<(String, u32)> = report
            .stored
            .iter()
            .filter(|p| p.depth == 1)
            .map(|p| (p.url.clone(), p.sibling_index))
            .collect();
        children.sort_by_key(|(_, index)| *index);
        assert_eq!(
            children,
            vec![
                ("http://site.test/x".to_string(), 0),
                ("http://site.test/y".to_string(), 1),
                ("http://site.test/z".to_string(), 2),
            ]
        );
        assert_eq!(report.external, 1);
    }

    #[tokio::test]
    async fn test_redirect_onto_visited_url_stores_without_recursion() {
        let tmp = tempfile::tempdir().unwrap();
        let graph = Arc::new(
            SiteGraph::default()
                .page("/", &["/a", "/alias"])
                .page("/a", &["/from-a"])
                .page("/from-a", &[])
                .redirect("/alias", "/a"),
        );

        let report = clone_graph(Arc::clone(&graph), &config(&tmp, 3)).await;

        // "/", "/a", "/alias" (content of /a), "/from-a"
        assert_eq!(report.stored.len(), 4);
        assert_eq!(graph.fetch_count("/from-a"), 1);
        let alias = report
            .stored
            .iter()
            .find(|p| p.url == "http://site.test/alias")
            .unwrap();
        assert_eq!(alias.resolved_url, "http://site.test/a");
    }

    #[tokio::test]
    async fn test_seed_redirect_to_other_host_keeps_subtree() {
        let tmp = tempfile::tempdir().unwrap();
        let graph = Arc::new(
            SiteGraph::default()
                .page("/", &["/a", "/b"])
                .page("/a", &[])
                .page("/b", &[])
                .redirect("/", "http://www.site.test/"),
        );

        let report = clone_graph(Arc::clone(&graph), &config(&tmp, 3)).await;

        assert_eq!(report.stored.len(), 3);
        assert_eq!(report.external, 0);
        assert_eq!(report.stored[0].resolved_url, "http://www.site.test/");
        assert!(report
            .stored
            .iter()
            .any(|p| p.url == "http://www.site.test/a"));
    }

    #[tokio::test]
    async fn test_stored_paths_are_unique() {
        let tmp = tempfile::tempdir().unwrap();
        let links: Vec<String> = (0..20).map(|i| format!("/p{}", i)).collect();
        let link_refs: Vec<&str> = links.iter().map(String::as_str).collect();
        let mut graph = SiteGraph::default().page("/", &link_refs);
        for link in &links {
            graph = graph.page(link, &[]);
        }

        let report = clone_graph(Arc::new(graph), &config(&tmp, 1)).await;

        let paths: std::collections::HashSet<_> = report.stored.iter().map(|p| &p.path).collect();
        assert_eq!(report.stored.len(), 21);
        assert_eq!(paths.len(), 21);
    }

    #[tokio::test]
    async fn test_base_backend_fails_every_node() {
        let tmp = tempfile::tempdir().unwrap();
        let mut cloner = Cloner::new(&config(&tmp, 3), Arc::new(BaseFetcher)).unwrap();

        let report = cloner.run().await.unwrap();

        assert!(report.stored.is_empty());
        assert_eq!(report.failed, 1);
        assert_eq!(report.contract_violations, 1);
    }

    #[tokio::test]
    async fn test_page_limit_skips_remaining_frames() {
        let tmp = tempfile::tempdir().unwrap();
        let graph = Arc::new(
            SiteGraph::default()
                .page("/", &["/a", "/b", "/c"])
                .page("/a", &[])
                .page("/b", &[])
                .page("/c", &[]),
        );
        let mut config = config(&tmp, 1);
        config.cloner.max_pages = Some(2);
        config.cloner.max_concurrent_fetches = 1;

        let report = clone_graph(Arc::clone(&graph), &config).await;

        assert_eq!(graph.total_fetches(), 2);
        assert_eq!(report.skipped, 2);
    }

    #[tokio::test]
    async fn test_manifest_records_run() {
        let tmp = tempfile::tempdir().unwrap();
        let graph = Arc::new(
            SiteGraph::default()
                .page("/", &["/ok", "/bad"])
                .page("/ok", &[])
                .broken("/bad"),
        );

        let mut cloner = Cloner::new(&config(&tmp, 1), graph)
            .unwrap()
            .with_manifest(Box::new(SqliteManifest::open_in_memory().unwrap()), "hash");
        let report = cloner.run().await.unwrap();
        let run_id = report.run_id.unwrap();

        let manifest = cloner.into_manifest().unwrap();
        let run = manifest.get_run(run_id).unwrap();
        assert_eq!(run.status, RunStatus::Completed);
        assert_eq!(run.config_hash, "hash");
        assert_eq!(
            manifest
                .count_pages_by_state(run_id, PageState::Stored)
                .unwrap(),
            2
        );
        assert_eq!(manifest.get_failures(run_id).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_cancel_before_run_interrupts() {
        let tmp = tempfile::tempdir().unwrap();
        let graph = Arc::new(SiteGraph::default().page("/", &[]));

        let mut cloner = Cloner::new(&config(&tmp, 1), Arc::clone(&graph) as Arc<dyn FetchBackend>)
            .unwrap()
            .with_manifest(Box::new(SqliteManifest::open_in_memory().unwrap()), "hash");
        let handle = cloner.cancel_handle();
        handle.cancel();
        assert!(handle.is_cancelled());

        let report = cloner.run().await.unwrap();

        assert!(report.cancelled);
        assert_eq!(report.abandoned, 1);
        assert_eq!(graph.total_fetches(), 0);
        let manifest = cloner.into_manifest().unwrap();
        let run = manifest.get_run(report.run_id.unwrap()).unwrap();
        assert_eq!(run.status, RunStatus::Interrupted);
    }

    #[tokio::test]
    async fn test_validation_failure_still_stores() {
        let tmp = tempfile::tempdir().unwrap();

        struct RejectAll;
        impl Validator for RejectAll {
            fn validate(&self, _: &[u8], _: &str) -> crate::validate::ValidationReport {
                crate::validate::ValidationReport {
                    valid: false,
                    diagnostics: vec!["rejected".to_string()],
                }
            }
        }

        let graph = Arc::new(SiteGraph::default().page("/", &["/a"]).page("/a", &[]));
        let mut cloner = Cloner::new(&config(&tmp, 1), graph)
            .unwrap()
            .with_validator(Box::new(RejectAll));
        let report = cloner.run().await.unwrap();

        assert_eq!(report.stored.len(), 2);
        assert_eq!(report.invalid, 2);
        let page = PageStore::read(&report.stored[0].path).unwrap();
        assert_eq!(page.meta.valid, Some(false));
        assert_eq!(page.meta.diagnostics, vec!["rejected".to_string()]);
    }
}
