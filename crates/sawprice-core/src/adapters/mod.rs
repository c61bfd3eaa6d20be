//! # Marketplace Profiles
//!
//! | Source | Readiness | Scroll | Native region |
//! |--------|-----------|--------|---------------|
//! | Facebook Marketplace | settle pause | yes | city slug |
//! | OfferUp | `div.Item` | no | no |
//! | Mercari | `li[data-testid="item-cell"]` | no | no |

pub mod facebook;
pub mod mercari;
pub mod offerup;

use std::sync::Arc;

use crate::adapter::{MarketplaceAdapter, MarketplaceProfile};
use crate::session::{FixtureLauncher, FixturePage, SessionLauncher};
use crate::{RetrievalConfig, SourceId};

/// Declarative profile for `source`.
pub fn profile(source: SourceId) -> MarketplaceProfile {
    match source {
        SourceId::Facebook => facebook::profile(),
        SourceId::OfferUp => offerup::profile(),
        SourceId::Mercari => mercari::profile(),
    }
}

/// Adapter for `source` sharing `launcher` and `config` with its siblings.
pub fn marketplace_adapter(
    source: SourceId,
    launcher: Arc<dyn SessionLauncher>,
    config: Arc<RetrievalConfig>,
) -> MarketplaceAdapter {
    MarketplaceAdapter::new(profile(source), launcher, config)
}

/// Representative results page for `source`, as served in mock mode.
pub fn sample_page(source: SourceId) -> &'static str {
    match source {
        SourceId::Facebook => FACEBOOK_SAMPLE,
        SourceId::OfferUp => OFFERUP_SAMPLE,
        SourceId::Mercari => MERCARI_SAMPLE,
    }
}

/// Fixture launcher serving [`sample_page`] for every marketplace.
pub fn mock_launcher() -> FixtureLauncher {
    SourceId::ALL
        .into_iter()
        .fold(FixtureLauncher::new(), |launcher, source| {
            let base_url = profile(source).base_url;
            launcher.with_page(base_url, FixturePage::new(sample_page(source)))
        })
}

const FACEBOOK_SAMPLE: &str = r#"<html><body><div role="main">
  <div role="article">
    <a href="/marketplace/item/1001/"><img src="https://scontent.fb.test/1001.jpg"></a>
    <span dir="auto">Stihl MS 271 Farm Boss</span>
    <span>$325</span>
    <span data-testid="marketplace-location">Indianapolis, IN</span>
  </div>
  <div role="article">
    <a href="/marketplace/item/1002/"><img src="https://scontent.fb.test/1002.jpg"></a>
    <span dir="auto">Husqvarna 455 Rancher 20in</span>
    <span>$280</span>
    <span data-testid="marketplace-location">Dayton, OH</span>
  </div>
  <div role="article">
    <span>Sponsored</span>
  </div>
</div></body></html>"#;

const OFFERUP_SAMPLE: &str = r#"<html><body><section>
  <div class="Item">
    <a href="/item/detail/5501"><img src="https://images.offerup.test/5501.jpg"></a>
    <span class="ItemTitle">Echo CS-400 chainsaw</span>
    <span class="ItemPrice">$190</span>
    <span class="ItemLocation">Carmel, IN</span>
  </div>
  <div class="Item">
    <a href="/item/detail/5502"><img data-src="https://images.offerup.test/5502.jpg"></a>
    <span class="ItemTitle">Poulan Pro 42cc</span>
    <span class="ItemPrice">Asking $95 firm</span>
    <span class="ItemLocation">Columbus, OH 43215</span>
  </div>
  <div class="Item">
    <span class="ItemTitle">Chainsaw chain 18in, no link</span>
  </div>
</section></body></html>"#;

const MERCARI_SAMPLE: &str = r#"<html><body><ul>
  <li data-testid="item-cell">
    <a href="/us/item/m7710/"><img src="https://static.mercari.test/m7710.jpg"></a>
    <p data-testid="item-title">Makita 18V cordless chainsaw</p>
    <p data-testid="item-price">$149.99</p>
  </li>
  <li data-testid="item-cell">
    <a href="/us/item/m7711/"><img src="https://static.mercari.test/m7711.jpg"></a>
    <p data-testid="item-title">Oregon replacement chain</p>
  </li>
</ul></body></html>"#;
