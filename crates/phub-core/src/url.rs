//! URL helper functions
//!
//! Provides functions for building video, API and search URLs.
//! Video URLs are kept root-relative (`view_video.php?viewkey=...`) and only
//! joined onto a site root when a request is made.

use crate::patterns::registry;

/// Canonical root-relative video URL for a view key
///
/// # Example
/// ```
/// use phub_core::url::build_video_path;
/// assert_eq!(build_video_path("ph123"), "view_video.php?viewkey=ph123");
/// ```
pub fn build_video_path(key: &str) -> String {
    format!("view_video.php?viewkey={}", key)
}

/// Structured-API lookup path for a view key
///
/// # Example
/// ```
/// use phub_core::url::build_api_video_path;
/// assert_eq!(build_api_video_path("ph123"), "video_by_id?id=ph123");
/// ```
pub fn build_api_video_path(key: &str) -> String {
    format!("video_by_id?id={}", urlencoding::encode(key))
}

/// Structured-API search path (pages start at 1)
///
/// # Example
/// ```
/// use phub_core::url::build_api_search_path;
/// assert_eq!(build_api_search_path("big cat", 2), "search?search=big%20cat&page=2");
/// ```
pub fn build_api_search_path(query: &str, page: usize) -> String {
    format!("search?search={}&page={}", urlencoding::encode(query), page)
}

/// HTML search page path (pages start at 1)
///
/// # Example
/// ```
/// use phub_core::url::build_search_path;
/// assert_eq!(build_search_path("big cat", 1), "video/search?search=big+cat&page=1");
/// ```
pub fn build_search_path(query: &str, page: usize) -> String {
    let encoded = urlencoding::encode(query).replace("%20", "+");
    format!("video/search?search={}&page={}", encoded, page)
}

/// Joins a path onto a root unless it is already absolute
///
/// # Example
/// ```
/// use phub_core::url::join;
/// assert_eq!(join("https://site/", "/a?b=1"), "https://site/a?b=1");
/// assert_eq!(join("https://site/", "https://cdn/x"), "https://cdn/x");
/// ```
pub fn join(root: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    format!(
        "{}/{}",
        root.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Extracts the view key from a full URL, a root-relative URL or a bare key
///
/// # Returns
/// `Some(key)` if a key is found, `None` otherwise
///
/// # Example
/// ```
/// use phub_core::url::extract_key;
/// let key = extract_key("https://www.pornhub.com/view_video.php?viewkey=ph5f0a");
/// assert_eq!(key, Some("ph5f0a".to_string()));
/// ```
pub fn extract_key(url: &str) -> Option<String> {
    let url = url.trim();

    if let Some(m) = registry().view_key.try_find(url) {
        return Some(m.value().to_string());
    }

    // Bare key
    if !url.is_empty() && url.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Some(url.to_string());
    }

    None
}
