use crate::adapter::{MarketplaceProfile, ReadinessPolicy, RetrievalRequest};
use crate::extract::SiteSelectors;
use crate::SourceId;

pub const BASE_URL: &str = "https://www.mercari.com";

const ITEM_CELL: &str = r#"li[data-testid="item-cell"]"#;

const SELECTORS: SiteSelectors = SiteSelectors {
    item: ITEM_CELL,
    title: &[r#"[data-testid="item-title"]"#, "p"],
    price: &[r#"[data-testid="item-price"]"#],
    link: &["a[href]"],
    image: &["img"],
    location: &[],
};

pub fn profile() -> MarketplaceProfile {
    MarketplaceProfile {
        source: SourceId::Mercari,
        base_url: BASE_URL,
        selectors: SELECTORS,
        readiness: ReadinessPolicy::Marker(ITEM_CELL),
        expand_results: false,
        native_region: false,
        search_url,
    }
}

fn search_url(request: &RetrievalRequest) -> String {
    format!(
        "{BASE_URL}/search/?keyword={}",
        urlencoding::encode(request.query())
    )
}
