use serde::{Deserialize, Serialize};

/// Default browser-like user agent sent by both fetch backends
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Main configuration structure for Decoy-Cloner
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub cloner: ClonerConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Which fetch backend performs page retrieval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Renderer {
    /// Direct HTTP requests, no script execution
    #[default]
    Plain,
    /// Full headless-browser render
    Headless,
}

/// Clone traversal configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClonerConfig {
    /// Seed URL the clone starts from
    pub target: String,

    /// Maximum depth to follow links from the seed (seed is depth 0)
    #[serde(rename = "max-depth", default = "default_max_depth")]
    pub max_depth: u32,

    /// Fetch backend to use
    #[serde(default)]
    pub renderer: Renderer,

    /// Run the markup validator over fetched content
    #[serde(default)]
    pub validate: bool,

    /// Maximum number of fetches in flight at once
    #[serde(
        rename = "max-concurrent-fetches",
        default = "default_max_concurrent_fetches"
    )]
    pub max_concurrent_fetches: u32,

    /// Optional cap on the number of pages fetched in one run
    #[serde(rename = "max-pages", default)]
    pub max_pages: Option<u32>,

    /// Extra domain patterns (e.g. "*.example.com") whose links are followed
    #[serde(rename = "allowed-domains", default)]
    pub allowed_domains: Vec<String>,
}

/// HTTP and navigation limits shared by both backends
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpConfig {
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// Page load / request timeout (seconds)
    #[serde(rename = "page-timeout", default = "default_page_timeout")]
    pub page_timeout: u64,

    /// TCP connect timeout (seconds)
    #[serde(rename = "connect-timeout", default = "default_connect_timeout")]
    pub connect_timeout: u64,

    #[serde(rename = "max-redirects", default = "default_max_redirects")]
    pub max_redirects: usize,

    /// Bodies larger than this are treated as failed fetches
    #[serde(rename = "max-page-bytes", default = "default_max_page_bytes")]
    pub max_page_bytes: usize,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    /// Directory under which page directories are allocated
    #[serde(rename = "target-dir", default = "default_target_dir")]
    pub target_dir: String,

    /// Path to the SQLite clone manifest
    #[serde(rename = "manifest-path", default = "default_manifest_path")]
    pub manifest_path: String,

    /// Path to the markdown summary file
    #[serde(rename = "summary-path", default = "default_summary_path")]
    pub summary_path: String,
}

impl Config {
    /// Builds a configuration with defaults for everything but the seed URL
    pub fn for_target(target: &str) -> Self {
        Self {
            cloner: ClonerConfig {
                target: target.to_string(),
                max_depth: default_max_depth(),
                renderer: Renderer::default(),
                validate: false,
                max_concurrent_fetches: default_max_concurrent_fetches(),
                max_pages: None,
                allowed_domains: Vec::new(),
            },
            http: HttpConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            page_timeout: default_page_timeout(),
            connect_timeout: default_connect_timeout(),
            max_redirects: default_max_redirects(),
            max_page_bytes: default_max_page_bytes(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            target_dir: default_target_dir(),
            manifest_path: default_manifest_path(),
            summary_path: default_summary_path(),
        }
    }
}

fn default_max_depth() -> u32 {
    u32::MAX
}

fn default_max_concurrent_fetches() -> u32 {
    8
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_page_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_max_redirects() -> usize {
    10
}

fn default_max_page_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_target_dir() -> String {
    "./pages".to_string()
}

fn default_manifest_path() -> String {
    "./clone.db".to_string()
}

fn default_summary_path() -> String {
    "./clone-summary.md".to_string()
}
