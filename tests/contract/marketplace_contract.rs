use std::sync::Arc;
use std::time::Duration;

use sawprice_core::adapters::{marketplace_adapter, sample_page};
use sawprice_core::session::{FixtureLauncher, FixturePage, LaunchStats};
use sawprice_core::{
    MarketplaceAdapter, ReadinessPolicy, RegionHint, RetrievalConfig, RetrievalRequest,
    RetryPolicy, SourceAdapter, SourceErrorKind, SourceId,
};

#[derive(Clone, Copy)]
struct MarketplaceCase {
    id: SourceId,
    base_url: &'static str,
    search_prefix: &'static str,
    uses_marker: bool,
}

fn marketplace_cases() -> Vec<MarketplaceCase> {
    vec![
        MarketplaceCase {
            id: SourceId::Facebook,
            base_url: "https://www.facebook.com",
            search_prefix: "https://www.facebook.com/marketplace/",
            uses_marker: false,
        },
        MarketplaceCase {
            id: SourceId::OfferUp,
            base_url: "https://offerup.com",
            search_prefix: "https://offerup.com/search/?q=",
            uses_marker: true,
        },
        MarketplaceCase {
            id: SourceId::Mercari,
            base_url: "https://www.mercari.com",
            search_prefix: "https://www.mercari.com/search/?keyword=",
            uses_marker: true,
        },
    ]
}

fn fast_config() -> RetrievalConfig {
    RetrievalConfig {
        navigation_timeout: Duration::from_millis(100),
        readiness_timeout: Duration::from_millis(80),
        readiness_poll: Duration::from_millis(5),
        settle: Duration::from_millis(1),
        navigation_retry: RetryPolicy::fixed(Duration::from_millis(5), 1),
        scroll_pause: Duration::from_millis(1),
        close_timeout: Duration::from_millis(50),
        ..RetrievalConfig::default()
    }
}

fn adapter_with(
    case: MarketplaceCase,
    page: FixturePage,
    config: RetrievalConfig,
) -> (MarketplaceAdapter, LaunchStats) {
    let launcher = FixtureLauncher::new().with_page(case.search_prefix, page);
    let stats = launcher.stats();
    (
        marketplace_adapter(case.id, Arc::new(launcher), Arc::new(config)),
        stats,
    )
}

fn request(query: &str) -> RetrievalRequest {
    RetrievalRequest::new(query, RegionHint::nationwide()).expect("valid request")
}

#[tokio::test]
async fn sample_pages_yield_complete_listings_for_all_marketplaces() {
    for case in marketplace_cases() {
        let (adapter, stats) = adapter_with(
            case,
            FixturePage::new(sample_page(case.id)),
            fast_config(),
        );

        let listings = adapter
            .retrieve(&request("chainsaw"))
            .await
            .expect("sample page retrieval succeeds");

        assert!(!listings.is_empty(), "{} returned nothing", case.id);
        for listing in &listings {
            assert_eq!(listing.source(), case.id);
            assert!(!listing.title().is_empty());
            assert!(
                listing.url().starts_with(case.base_url),
                "{} url not resolved: {}",
                case.id,
                listing.url()
            );
            if let Some(image) = listing.image() {
                assert!(image.starts_with("https://"));
            }
        }
        assert_eq!(stats.launched(), 1, "{}", case.id);
        assert_eq!(stats.closed(), 1, "{}", case.id);
    }
}

#[tokio::test]
async fn items_missing_title_or_url_never_surface() {
    let offerup = marketplace_cases()[1];
    let page = r#"
        <div class="Item"><a href="/item/detail/1"></a><span class="ItemPrice">$50</span></div>
        <div class="Item"><span class="ItemTitle">Orphan listing</span></div>
        <div class="Item"><a href="/item/detail/3"><span class="ItemTitle">Complete</span></a></div>"#;
    let (adapter, _) = adapter_with(offerup, FixturePage::new(page), fast_config());

    let listings = adapter
        .retrieve(&request("chainsaw"))
        .await
        .expect("retrieval succeeds");

    assert_eq!(listings.len(), 1);
    assert_eq!(listings[0].title(), "Complete");
    assert_eq!(listings[0].url(), "https://offerup.com/item/detail/3");
    assert_eq!(listings[0].price(), None);
}

#[tokio::test]
async fn search_urls_carry_the_encoded_query() {
    for case in marketplace_cases() {
        let launcher = FixtureLauncher::new().with_page(
            expected_search_url(case.id),
            FixturePage::new(sample_page(case.id)),
        );
        let adapter = marketplace_adapter(case.id, Arc::new(launcher), Arc::new(fast_config()));

        let result = adapter.retrieve(&request("stihl ms 250")).await;

        assert!(result.is_ok(), "{} built an unexpected search url", case.id);
    }
}

fn expected_search_url(id: SourceId) -> &'static str {
    match id {
        SourceId::Facebook => "https://www.facebook.com/marketplace/search/?query=stihl%20ms%20250",
        SourceId::OfferUp => "https://offerup.com/search/?q=stihl%20ms%20250",
        SourceId::Mercari => "https://www.mercari.com/search/?keyword=stihl%20ms%20250",
    }
}

#[tokio::test]
async fn navigation_is_retried_exactly_once() {
    for case in marketplace_cases() {
        let (adapter, stats) = adapter_with(
            case,
            FixturePage::new(sample_page(case.id)).failing_navigations(1),
            fast_config(),
        );

        adapter
            .retrieve(&request("chainsaw"))
            .await
            .expect("second attempt succeeds");

        assert_eq!(stats.navigations(), 2, "{}", case.id);
        assert_eq!(stats.open(), 0, "{}", case.id);
    }
}

#[tokio::test]
async fn a_failed_retry_rejects_with_navigation_failed() {
    for case in marketplace_cases() {
        let (adapter, stats) = adapter_with(
            case,
            FixturePage::new(sample_page(case.id)).failing_navigations(5),
            fast_config(),
        );

        let error = adapter
            .retrieve(&request("chainsaw"))
            .await
            .expect_err("both attempts fail");

        assert_eq!(error.kind(), SourceErrorKind::NavigationFailed, "{}", case.id);
        assert!(error.retryable());
        assert_eq!(stats.navigations(), 2, "{}", case.id);
        assert_eq!(stats.closed(), 1, "{}", case.id);
    }
}

#[tokio::test]
async fn missing_results_marker_is_content_not_ready() {
    for case in marketplace_cases() {
        let (adapter, stats) = adapter_with(
            case,
            FixturePage::new("<html><body><h1>Verify you are human</h1></body></html>"),
            fast_config(),
        );

        let outcome = adapter.retrieve(&request("chainsaw")).await;

        if case.uses_marker {
            let error = outcome.expect_err("marker never appears");
            assert_eq!(error.kind(), SourceErrorKind::ContentNotReady, "{}", case.id);
        } else {
            assert_eq!(
                adapter.profile().readiness,
                ReadinessPolicy::Settle,
                "{}",
                case.id
            );
            assert_eq!(outcome.expect("settle pause never fails"), Vec::new());
        }
        assert_eq!(stats.open(), 0, "{}", case.id);
    }
}

#[tokio::test]
async fn launch_failure_is_session_unavailable() {
    for case in marketplace_cases() {
        let launcher = FixtureLauncher::new().failing_launch();
        let stats = launcher.stats();
        let adapter = marketplace_adapter(case.id, Arc::new(launcher), Arc::new(fast_config()));

        let error = adapter
            .retrieve(&request("chainsaw"))
            .await
            .expect_err("launch fails");

        assert_eq!(error.kind(), SourceErrorKind::SessionUnavailable);
        assert_eq!(error.code(), "source.session_unavailable");
        assert_eq!(stats.launched(), 0);
    }
}

#[tokio::test]
async fn extracted_items_are_capped_by_max_items() {
    for case in marketplace_cases() {
        let config = RetrievalConfig {
            max_items: 1,
            ..fast_config()
        };
        let (adapter, _) = adapter_with(case, FixturePage::new(sample_page(case.id)), config);

        let listings = adapter
            .retrieve(&request("chainsaw"))
            .await
            .expect("retrieval succeeds");

        assert!(listings.len() <= 1, "{} ignored max_items", case.id);
    }
}

#[tokio::test]
async fn invalid_cards_never_consume_the_item_cap() {
    // Given: Three linkless cards ahead of three complete ones, capped at three
    let offerup = marketplace_cases()[1];
    let linkless = r#"<div class="Item"><span class="ItemTitle">Sponsored</span></div>"#.repeat(3);
    let complete = (1..=3)
        .map(|n| {
            format!(
                r#"<div class="Item"><a href="/item/detail/{n}"><span class="ItemTitle">Saw {n}</span></a></div>"#
            )
        })
        .collect::<String>();
    let config = RetrievalConfig {
        max_items: 3,
        ..fast_config()
    };
    let (adapter, _) = adapter_with(offerup, FixturePage::new(linkless + &complete), config);

    // When: The adapter retrieves
    let listings = adapter
        .retrieve(&request("chainsaw"))
        .await
        .expect("retrieval succeeds");

    // Then: Every complete card survives the cap
    let titles = listings.iter().map(|listing| listing.title()).collect::<Vec<_>>();
    assert_eq!(titles, ["Saw 1", "Saw 2", "Saw 3"]);
}

#[test]
fn only_facebook_scopes_results_natively() {
    let launcher: Arc<FixtureLauncher> = Arc::new(FixtureLauncher::new());
    for case in marketplace_cases() {
        let adapter = marketplace_adapter(case.id, launcher.clone(), Arc::new(fast_config()));
        assert_eq!(adapter.id(), case.id);
        assert_eq!(
            adapter.supports_native_region(),
            case.id == SourceId::Facebook
        );
    }
}
