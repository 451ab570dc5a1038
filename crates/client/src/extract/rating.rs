//! Numeric rating encoded in a class attribute, e.g. `class="rating-45"`.

/// Parse a rating from a `class` attribute value.
///
/// Surrounding whitespace is ignored and `prefix` is removed from the front
/// as many times as it occurs. The remainder must be an integer; the result
/// is that integer divided by `divisor`.
pub fn parse_rating(class: &str, prefix: &str, divisor: f64) -> Option<f64> {
    let mut rest = class.trim();
    if !prefix.is_empty() {
        while let Some(stripped) = rest.strip_prefix(prefix) {
            rest = stripped;
        }
    }
    let value: i64 = rest.parse().ok()?;
    Some(value as f64 / divisor)
}
