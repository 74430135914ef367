//! Helpers for logging, URL handling and output directories.
//!
//! - String truncation for log previews
//! - Host extraction and URL normalization used by filters and dedup
//! - Output directory validation

use std::fs as stdfs;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};
use url::Url;

use crate::error::ScoutError;

/// Query parameters that only track the click and never change the article.
const TRACKING_PARAMS: &[&str] = &["fbclid", "gclid", "mc_cid", "mc_eid", "ref", "cmpid"];

/// Truncate a string for logging purposes.
///
/// Long strings are cut at the nearest char boundary at or below `max` bytes
/// and suffixed with `"…(+N bytes)"`.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}

/// Extract the host of a link for domain filtering.
///
/// # Arguments
///
/// * `link` - An absolute URL, possibly with surrounding whitespace
///
/// # Returns
///
/// The lower-cased host with a leading `www.` removed, or `None` when
/// `link` does not parse or has no host.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(host_of("https://WWW.TechCrunch.com/x").as_deref(), Some("techcrunch.com"));
/// ```
pub fn host_of(link: &str) -> Option<String> {
    let parsed = Url::parse(link.trim()).ok()?;
    let host = parsed.host_str()?.to_ascii_lowercase();
    Some(host.strip_prefix("www.").unwrap_or(&host).to_string())
}

/// Canonical form of an article URL, used as its identity.
///
/// Scheme and `www.` are dropped, the host is lower-cased, the fragment and
/// tracking parameters (`utm_*` and friends) are removed, remaining parameters
/// are sorted and a trailing slash on the path is trimmed.
///
/// # Arguments
///
/// * `link` - The URL as returned by the search API or stored in a CSV row
///
/// # Returns
///
/// The canonical `host/path?query` string, or `None` for anything that is
/// not an absolute http(s) URL.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(
///     normalize_url("https://www.example.com/a/?utm_source=x#top").as_deref(),
///     Some("example.com/a")
/// );
/// ```
pub fn normalize_url(link: &str) -> Option<String> {
    let parsed = Url::parse(link.trim()).ok()?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return None;
    }
    let host = parsed.host_str()?.to_ascii_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);

    let mut params: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(k, _)| {
            let k = k.to_ascii_lowercase();
            !k.starts_with("utm_") && !TRACKING_PARAMS.contains(&k.as_str())
        })
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    params.sort();

    let mut normalized = host.to_string();
    if let Some(port) = parsed.port() {
        normalized.push_str(&format!(":{}", port));
    }
    normalized.push_str(parsed.path().trim_end_matches('/'));
    if !params.is_empty() {
        let query = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");
        normalized.push('?');
        normalized.push_str(&query);
    }
    Some(normalized)
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if needed, then creates and removes a probe file.
///
/// # Errors
///
/// [`ScoutError::Io`] if the directory cannot be created or written to.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &Path) -> Result<(), ScoutError> {
    fs::create_dir_all(path)
        .await
        .map_err(|e| ScoutError::io(path, e))?;

    let probe_path = path.join("..__probe_write__");
    match stdfs::File::create(&probe_path) {
        Ok(_) => {
            let _ = stdfs::remove_file(&probe_path);
            info!("Output directory is writable");
            Ok(())
        }
        Err(e) => Err(ScoutError::io(path, e)),
    }
}
