use crate::adapter::{MarketplaceProfile, ReadinessPolicy, RetrievalRequest};
use crate::extract::SiteSelectors;
use crate::SourceId;

pub const BASE_URL: &str = "https://offerup.com";

const SELECTORS: SiteSelectors = SiteSelectors {
    item: "div.Item",
    title: &[".ItemTitle"],
    price: &[".ItemPrice"],
    link: &["a[href]"],
    image: &["img"],
    location: &[".ItemLocation"],
};

pub fn profile() -> MarketplaceProfile {
    MarketplaceProfile {
        source: SourceId::OfferUp,
        base_url: BASE_URL,
        selectors: SELECTORS,
        readiness: ReadinessPolicy::Marker("div.Item"),
        expand_results: false,
        native_region: false,
        search_url,
    }
}

fn search_url(request: &RetrievalRequest) -> String {
    format!(
        "{BASE_URL}/search/?q={}",
        urlencoding::encode(request.query())
    )
}
