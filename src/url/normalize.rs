use crate::UrlError;
use url::Url;

/// Normalizes a URL into the identity key used by the visited set
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Accept only http:// and https:// (scheme is preserved, never upgraded)
/// 3. Lowercase the host; the `www.` label is kept because a redirect from
///    `example.com` to `www.example.com` lands on a distinct page
/// 4. Normalize path:
///    - Remove dot segments (. and ..)
///    - Collapse repeated slashes
///    - Keep a trailing slash, it changes how relative links resolve
///    - Empty path becomes /
/// 5. Remove fragment (everything after #)
/// 6. Sort query parameters by key (stable for repeated keys)
/// 7. Remove empty query string (trailing ?)
///
/// # Examples
///
/// ```
/// use decoy_cloner::url::normalize_url;
///
/// let url = normalize_url("http://EXAMPLE.COM/a/../page?b=2&a=1#top").unwrap();
/// assert_eq!(url.as_str(), "http://example.com/page?a=1&b=2");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let url = Url::parse(url_str).map_err(|e| UrlError::Parse(e.to_string()))?;
    normalize(url)
}

/// Normalizes an already parsed URL
pub fn normalize(mut url: Url) -> Result<Url, UrlError> {
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    match url.host_str() {
        Some(host) if !host.is_empty() => {
            let lowered = host.to_lowercase();
            if lowered != host {
                url.set_host(Some(&lowered))
                    .map_err(|e| UrlError::Malformed(format!("Failed to set host: {}", e)))?;
            }
        }
        _ => return Err(UrlError::MissingDomain),
    }

    let normalized_path = normalize_path(url.path());
    url.set_path(&normalized_path);

    url.set_fragment(None);

    if url.query().is_some() {
        let params = sorted_query_params(&url);
        if params.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut()
                .clear()
                .extend_pairs(params.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }
    }

    Ok(url)
}

/// Removes dot segments and repeated slashes from a URL path
fn normalize_path(path: &str) -> String {
    if path.is_empty() {
        return "/".to_string();
    }

    let trailing_slash = path.len() > 1 && path.ends_with('/');
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }

    if segments.is_empty() {
        return "/".to_string();
    }

    let mut result = format!("/{}", segments.join("/"));
    if trailing_slash {
        result.push('/');
    }
    result
}

/// Returns query parameters sorted by key
fn sorted_query_params(url: &Url) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .filter(|(k, v)| !(k.is_empty() && v.is_empty()))
        .collect();

    params.sort_by(|a, b| a.0.cmp(&b.0));
    params
}
