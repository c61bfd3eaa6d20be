//! Field normalization shared by adapters and the orchestrator post-pass.
//!
//! Everything here is pure: same input, same output, no I/O.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::RegionCode;

static PRICE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[$€£¥]\s?\d+(?:,\d{3})*(?:\.\d{1,2})?").expect("price pattern is valid")
});

static TRAILING_REGION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i),\s*([a-z]{2})(?:\s+\d{5}(?:-\d{4})?)?\s*$")
        .expect("region pattern is valid")
});

/// Extracts the first currency amount from free text, symbol included.
///
/// ```
/// use sawprice_core::normalize::parse_price;
///
/// assert_eq!(parse_price("Like new $45.00 obo").as_deref(), Some("$45.00"));
/// assert_eq!(parse_price("no price listed"), None);
/// ```
pub fn parse_price(raw: &str) -> Option<String> {
    PRICE_PATTERN
        .find(raw)
        .map(|found| found.as_str().to_owned())
}

/// Matches a trailing `", XX"` region (optionally followed by a ZIP code).
pub fn extract_region(text: &str) -> Option<RegionCode> {
    let captures = TRAILING_REGION_PATTERN.captures(text)?;
    RegionCode::parse(captures.get(1)?.as_str()).ok()
}

/// Returns `maybe_relative` unchanged when absolute, otherwise joins it onto `base`.
pub fn resolve_url(base: &str, maybe_relative: &str) -> String {
    let candidate = maybe_relative.trim();
    if is_absolute(candidate) {
        return candidate.to_owned();
    }

    match Url::parse(base).and_then(|base| base.join(candidate)) {
        Ok(joined) => joined.to_string(),
        Err(_) => format!(
            "{}/{}",
            base.trim_end_matches('/'),
            candidate.trim_start_matches('/')
        ),
    }
}

/// Collapses runs of whitespace; blank text becomes `None`.
pub fn clean_text(raw: &str) -> Option<String> {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    (!collapsed.is_empty()).then_some(collapsed)
}

/// True for urls with a scheme and host.
pub(crate) fn is_absolute(value: &str) -> bool {
    Url::parse(value)
        .map(|parsed| parsed.has_host())
        .unwrap_or(false)
}
