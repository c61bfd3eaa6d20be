use crate::adapter::{MarketplaceProfile, ReadinessPolicy, RetrievalRequest};
use crate::extract::SiteSelectors;
use crate::SourceId;

pub const BASE_URL: &str = "https://www.facebook.com";

const SELECTORS: SiteSelectors = SiteSelectors {
    item: r#"[role="article"]"#,
    title: &[r#"span[dir="auto"]"#, "span"],
    price: &[],
    link: &["a[href]"],
    image: &["img"],
    location: &[r#"span[data-testid="marketplace-location"]"#],
};

/// Facebook Marketplace: scoped by city slug, no reliable readiness marker.
pub fn profile() -> MarketplaceProfile {
    MarketplaceProfile {
        source: SourceId::Facebook,
        base_url: BASE_URL,
        selectors: SELECTORS,
        readiness: ReadinessPolicy::Settle,
        expand_results: true,
        native_region: true,
        search_url,
    }
}

fn search_url(request: &RetrievalRequest) -> String {
    let query = urlencoding::encode(request.query());
    match request.hint().city().and_then(city_slug) {
        Some(slug) => format!("{BASE_URL}/marketplace/{slug}/search/?query={query}"),
        None => format!("{BASE_URL}/marketplace/search/?query={query}"),
    }
}

/// `"San Francisco"` → `"sanfrancisco"`.
fn city_slug(city: &str) -> Option<String> {
    let slug = city
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect::<String>();
    (!slug.is_empty()).then_some(slug)
}
