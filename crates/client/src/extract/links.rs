//! Link URL cells: resolution against the run's base URL and percent-decoding.

use std::borrow::Cow;

use url::Url;

/// Resolve an `href` against `base` and percent-decode the result.
///
/// An href that cannot be joined (e.g. `http://[::1`) is decoded as-is.
/// Decoding falls back to the encoded text when the bytes are not UTF-8.
pub fn resolve_href(base: &Url, href: &str) -> String {
    let joined = match base.join(href.trim()) {
        Ok(url) => url.to_string(),
        Err(e) => {
            tracing::debug!("could not resolve href '{}' against {}: {}", href, base, e);
            href.to_string()
        }
    };

    match urlencoding::decode(&joined) {
        Ok(Cow::Borrowed(_)) => joined,
        Ok(Cow::Owned(decoded)) => decoded,
        Err(_) => joined,
    }
}
