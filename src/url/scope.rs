//! Which discovered links belong to the clone

use url::Url;

/// Extracts the lowercase host from a URL, without the port
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Checks a host against a domain pattern
///
/// `example.com` matches only itself; `*.example.com` matches the bare domain
/// and any subdomain at any depth. Comparison is case-insensitive.
pub fn matches_domain_pattern(pattern: &str, host: &str) -> bool {
    let pattern = pattern.to_ascii_lowercase();
    let host = host.to_ascii_lowercase();

    match pattern.strip_prefix("*.") {
        Some(base) => {
            host == base
                || host
                    .strip_suffix(base)
                    .is_some_and(|prefix| prefix.ends_with('.'))
        }
        None => host == pattern,
    }
}

/// Decides which discovered links belong to the site being cloned
///
/// A link is in scope when its host equals the seed host or matches one of the
/// configured allowed-domain patterns. Everything else is external and is never
/// fetched. A seed that redirects to another host (`example.com` to
/// `www.example.com`) moves the root: the new host is in scope as well.
#[derive(Debug, Clone)]
pub struct LinkScope {
    seed_host: String,
    moved_root: Option<String>,
    allowed: Vec<String>,
}

impl LinkScope {
    pub fn new(seed: &Url, allowed_domains: &[String]) -> Self {
        Self {
            seed_host: extract_domain(seed).unwrap_or_default(),
            moved_root: None,
            allowed: allowed_domains.to_vec(),
        }
    }

    /// Returns true if the URL should be cloned
    pub fn contains(&self, url: &Url) -> bool {
        if url.scheme() != "http" && url.scheme() != "https" {
            return false;
        }

        let Some(host) = extract_domain(url) else {
            return false;
        };

        host == self.seed_host
            || self.moved_root.as_deref() == Some(host.as_str())
            || self
                .allowed
                .iter()
                .any(|pattern| matches_domain_pattern(pattern, &host))
    }

    pub fn seed_host(&self) -> &str {
        &self.seed_host
    }

    /// Records where the seed ended up after redirects
    ///
    /// Returns true if this brought a new host into scope.
    pub fn move_root(&mut self, resolved_seed: &Url) -> bool {
        match extract_domain(resolved_seed) {
            Some(host) if host != self.seed_host => {
                let changed = self.moved_root.as_deref() != Some(host.as_str());
                self.moved_root = Some(host);
                changed
            }
            _ => false,
        }
    }
}
