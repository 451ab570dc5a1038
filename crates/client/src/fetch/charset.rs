//! Response body decoding for pages served in legacy code pages.

use encoding_rs::{Encoding, UTF_8};

/// How far into the body a `<meta charset>` declaration is looked for.
const SNIFF_LIMIT: usize = 1024;

/// Decode a response body to UTF-8.
///
/// Label precedence: `charset` parameter of the Content-Type header, then a
/// `charset=` declaration near the top of the document, then UTF-8. A byte
/// order mark overrides all of them.
pub fn decode_body(bytes: &[u8], content_type: Option<&str>) -> String {
    let encoding = content_type
        .and_then(charset_label)
        .or_else(|| sniff_meta(bytes))
        .and_then(|label| Encoding::for_label(label.as_bytes()))
        .unwrap_or(UTF_8);

    let (text, used, had_errors) = encoding.decode(bytes);
    if had_errors {
        tracing::debug!("malformed {} sequences replaced while decoding page", used.name());
    }
    text.into_owned()
}

/// Extract the value following `charset=` up to the next delimiter.
fn charset_label(text: &str) -> Option<String> {
    let lower = text.to_ascii_lowercase();
    let start = lower.find("charset=")? + "charset=".len();
    let value = lower[start..].trim_start_matches(['"', '\'', ' ']);
    let end = value
        .find(|c: char| matches!(c, '"' | '\'' | ';' | '>' | '/') || c.is_whitespace())
        .unwrap_or(value.len());
    let label = &value[..end];
    if label.is_empty() { None } else { Some(label.to_string()) }
}

fn sniff_meta(bytes: &[u8]) -> Option<String> {
    let head = &bytes[..bytes.len().min(SNIFF_LIMIT)];
    charset_label(&String::from_utf8_lossy(head))
}
