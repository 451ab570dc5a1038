//! URL canonicalization and page-number URL construction.

use url::{Url, form_urlencoded};

/// Error type for URL canonicalization failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Canonicalize a listing URL entered by the operator.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Default scheme to https:// if missing
/// 3. Lowercase the host
/// 4. Remove fragment (#...)
/// 5. Keep query string intact (do not reorder)
pub fn canonicalize(input: &str) -> Result<Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let url_str = if trimmed.contains("://") { trimmed.to_string() } else { format!("https://{trimmed}") };

    let mut parsed = Url::parse(&url_str).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    if let Some(host) = parsed.host_str() {
        let host = host.to_lowercase();
        parsed
            .set_host(Some(&host))
            .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    }

    parsed.set_fragment(None);

    Ok(parsed)
}

/// Build the URL of one listing page by setting `param=page` on `base`.
///
/// Only the segment for `param` is touched: every other query segment is kept
/// byte for byte and in order. An existing `param` is replaced in place (later
/// duplicates are dropped); otherwise it is appended.
pub fn page_url(base: &Url, param: &str, page: u32) -> Url {
    let encoded: String = form_urlencoded::byte_serialize(param.as_bytes()).collect();
    let assignment = format!("{encoded}={page}");
    let mut replaced = false;
    let mut segments: Vec<&str> = Vec::new();

    for segment in base.query().unwrap_or_default().split('&') {
        if segment.is_empty() {
            continue;
        }
        if segment_key(segment) == param {
            if !replaced {
                segments.push(&assignment);
                replaced = true;
            }
        } else {
            segments.push(segment);
        }
    }

    if !replaced {
        segments.push(&assignment);
    }

    let mut url = base.clone();
    url.set_query(Some(&segments.join("&")));
    url
}

/// Decoded key of one raw `key=value` query segment.
fn segment_key(segment: &str) -> String {
    let raw = segment.split_once('=').map_or(segment, |(key, _)| key);
    form_urlencoded::parse(raw.as_bytes())
        .next()
        .map(|(key, _)| key.into_owned())
        .unwrap_or_default()
}
