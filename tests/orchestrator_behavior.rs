//! Behavior-driven tests for the retrieval orchestrator
//!
//! These tests verify HOW a request fans out to every marketplace, how
//! partial failures are absorbed and how the merged result is filtered.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use sawprice_core::adapter::RetrieveFuture;
use sawprice_core::adapters::marketplace_adapter;
use sawprice_core::session::{FixtureLauncher, FixturePage};
use sawprice_core::{
    AggregateStatus, Listing, ListingParts, LocationFilter, Orchestrator, RetrievalConfig,
    RetrievalError, RetrievalRequest, RetryPolicy, SourceAdapter, SourceError, SourceId,
    ValidationError,
};

#[derive(Clone)]
enum Behavior {
    Listings(Vec<(&'static str, Option<&'static str>)>),
    Fail(SourceError),
    Panic,
    Foreign(SourceId),
}

struct StubAdapter {
    id: SourceId,
    behavior: Behavior,
    delay: Duration,
    calls: Arc<AtomicUsize>,
    hints: Arc<Mutex<Vec<String>>>,
}

impl StubAdapter {
    fn new(id: SourceId, behavior: Behavior) -> Self {
        Self {
            id,
            behavior,
            delay: Duration::ZERO,
            calls: Arc::new(AtomicUsize::new(0)),
            hints: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn listing(source: SourceId, title: &str, location: Option<&str>) -> Listing {
        Listing::new(
            source,
            ListingParts {
                title: title.to_owned(),
                price: Some(String::from("$100")),
                url: format!("https://{}.test/item/{}", source, title.replace(' ', "-")),
                location: location.map(String::from),
                ..ListingParts::default()
            },
        )
        .expect("valid listing")
    }
}

impl SourceAdapter for StubAdapter {
    fn id(&self) -> SourceId {
        self.id
    }

    fn supports_native_region(&self) -> bool {
        false
    }

    fn retrieve<'a>(&'a self, request: &'a RetrievalRequest) -> RetrieveFuture<'a> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.hints
                .lock()
                .expect("hint log")
                .push(request.hint().to_string());

            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }

            match &self.behavior {
                Behavior::Listings(items) => Ok(items
                    .iter()
                    .map(|(title, location)| Self::listing(self.id, title, *location))
                    .collect()),
                Behavior::Fail(error) => Err(error.clone()),
                Behavior::Panic => panic!("adapter crashed while parsing"),
                Behavior::Foreign(other) => Ok(vec![
                    Self::listing(self.id, "own item", None),
                    Self::listing(*other, "foreign item", None),
                ]),
            }
        })
    }
}

fn orchestrator(adapters: Vec<Arc<dyn SourceAdapter>>) -> Orchestrator {
    Orchestrator::new(adapters).expect("valid adapter set")
}

fn location(city: Option<&str>, region: Option<&str>) -> LocationFilter {
    LocationFilter::new(city.map(String::from), region.map(String::from))
}

// =============================================================================
// Orchestrator: Settle-All Aggregation
// =============================================================================

#[tokio::test]
async fn when_one_source_times_out_the_others_still_contribute() {
    // Given: Two healthy sources and one marketplace whose page never loads
    let launcher = FixtureLauncher::new().with_page(
        "https://www.mercari.com/",
        FixturePage::new("<ul></ul>").hanging(),
    );
    let stats = launcher.stats();
    let config = Arc::new(RetrievalConfig {
        navigation_timeout: Duration::from_millis(50),
        navigation_retry: RetryPolicy::fixed(Duration::from_millis(10), 1),
        close_timeout: Duration::from_millis(50),
        ..RetrievalConfig::default()
    });
    let stalled = marketplace_adapter(SourceId::Mercari, Arc::new(launcher), config);

    let orchestrator = orchestrator(vec![
        Arc::new(StubAdapter::new(
            SourceId::Facebook,
            Behavior::Listings(vec![("stihl 170", None), ("stihl 250", None)]),
        )),
        Arc::new(StubAdapter::new(
            SourceId::OfferUp,
            Behavior::Listings(vec![("echo cs-400", None)]),
        )),
        Arc::new(stalled),
    ]);

    // When: Listings are retrieved
    let result = orchestrator
        .retrieve_listings("chainsaw", None)
        .await
        .expect("partial failure is not a request failure");

    // Then: The aggregate is exactly the union of the two successes
    let titles = result
        .listings
        .iter()
        .map(Listing::title)
        .collect::<Vec<_>>();
    assert_eq!(titles, vec!["stihl 170", "stihl 250", "echo cs-400"]);
    assert_eq!(result.sources_attempted, 3);
    assert_eq!(result.sources_succeeded, 2);

    // And: The timeout is reported as a rejection, not raised
    assert_eq!(result.rejections.len(), 1);
    assert_eq!(result.rejections[0].source, SourceId::Mercari);
    assert_eq!(result.rejections[0].code, "source.navigation_failed");

    // And: The stalled session was still torn down
    assert_eq!(stats.launched(), 1);
    assert_eq!(stats.open(), 0);
}

#[tokio::test]
async fn when_every_source_fails_the_request_fails_instead_of_returning_empty() {
    // Given: Three sources that all reject
    let orchestrator = orchestrator(vec![
        Arc::new(StubAdapter::new(
            SourceId::Facebook,
            Behavior::Fail(SourceError::content_not_ready("no articles")),
        )),
        Arc::new(StubAdapter::new(
            SourceId::OfferUp,
            Behavior::Fail(SourceError::navigation_failed("dns failure")),
        )),
        Arc::new(StubAdapter::new(
            SourceId::Mercari,
            Behavior::Fail(SourceError::session_unavailable("browser missing")),
        )),
    ]);

    // When: Listings are retrieved
    let error = orchestrator
        .retrieve_listings("chainsaw", None)
        .await
        .expect_err("total failure must be distinguishable from empty");

    // Then: The failure carries every rejection
    assert_eq!(error.sources_succeeded(), 0);
    assert_eq!(error.code(), "request.all_sources_failed");
    let RetrievalError::AllSourcesFailed {
        sources_attempted,
        rejections,
        ..
    } = error
    else {
        panic!("expected AllSourcesFailed");
    };
    assert_eq!(sources_attempted, 3);
    assert_eq!(
        rejections.iter().map(|r| r.code).collect::<Vec<_>>(),
        vec![
            "source.content_not_ready",
            "source.navigation_failed",
            "source.session_unavailable"
        ]
    );
}

#[tokio::test]
async fn when_no_source_has_matches_the_result_is_empty_but_valid() {
    // Given: One source with no matches and one that fails
    let orchestrator = orchestrator(vec![
        Arc::new(StubAdapter::new(SourceId::OfferUp, Behavior::Listings(vec![]))),
        Arc::new(StubAdapter::new(
            SourceId::Mercari,
            Behavior::Fail(SourceError::content_not_ready("marker missing")),
        )),
    ]);

    // When: Listings are retrieved
    let result = orchestrator
        .retrieve_listings("husqvarna 372xp", None)
        .await
        .expect("one success is enough");

    // Then: The result is empty, not an error
    assert_eq!(result.status(), AggregateStatus::Empty);
    assert_eq!(result.sources_succeeded, 1);
    assert_eq!(result.rejections.len(), 1);
}

#[tokio::test]
async fn when_an_adapter_panics_it_is_isolated_as_a_rejection() {
    // Given: A source that panics next to a healthy one
    let orchestrator = orchestrator(vec![
        Arc::new(StubAdapter::new(SourceId::Facebook, Behavior::Panic)),
        Arc::new(StubAdapter::new(
            SourceId::OfferUp,
            Behavior::Listings(vec![("poulan 42cc", None)]),
        )),
    ]);

    // When: Listings are retrieved
    let result = orchestrator
        .retrieve_listings("chainsaw", None)
        .await
        .expect("panic must not escape");

    // Then: The healthy listing survives and the panic is an internal rejection
    assert_eq!(result.listings.len(), 1);
    assert_eq!(result.rejections[0].source, SourceId::Facebook);
    assert_eq!(result.rejections[0].code, "source.internal");
}

#[tokio::test]
async fn when_adapters_are_slow_they_run_concurrently() {
    // Given: Three sources that each take 150ms
    let delay = Duration::from_millis(150);
    let orchestrator = orchestrator(
        SourceId::ALL
            .into_iter()
            .map(|id| {
                Arc::new(
                    StubAdapter::new(id, Behavior::Listings(vec![("saw", None)])).with_delay(delay),
                ) as Arc<dyn SourceAdapter>
            })
            .collect(),
    );

    // When: Listings are retrieved
    let started = Instant::now();
    let result = orchestrator
        .retrieve_listings("chainsaw", None)
        .await
        .expect("retrieval succeeds");

    // Then: Total time tracks the slowest source, not the sum
    assert_eq!(result.listings.len(), 3);
    assert!(
        started.elapsed() < delay * 3,
        "adapters ran sequentially: {:?}",
        started.elapsed()
    );
}

#[tokio::test]
async fn when_an_adapter_emits_foreign_listings_they_are_discarded() {
    // Given: A misbehaving adapter tagging a listing with another source
    let orchestrator = orchestrator(vec![Arc::new(StubAdapter::new(
        SourceId::OfferUp,
        Behavior::Foreign(SourceId::Mercari),
    ))]);

    // When: Listings are retrieved
    let result = orchestrator
        .retrieve_listings("chainsaw", None)
        .await
        .expect("retrieval succeeds");

    // Then: Only its own listing is kept
    assert_eq!(result.listings.len(), 1);
    assert_eq!(result.listings[0].source(), SourceId::OfferUp);
}

// =============================================================================
// Orchestrator: Region Hint and Filter
// =============================================================================

#[tokio::test]
async fn when_region_is_requested_only_matching_listings_remain() {
    // Given: Listings located in IN, nowhere and OH
    let orchestrator = orchestrator(vec![Arc::new(StubAdapter::new(
        SourceId::OfferUp,
        Behavior::Listings(vec![
            ("carmel saw", Some("Carmel, IN")),
            ("mystery saw", None),
            ("dayton saw", Some("Dayton, OH 45402")),
        ]),
    ))]);

    // When: Listings are retrieved for region "in"
    let result = orchestrator
        .retrieve_listings("chainsaw", Some(&location(None, Some("in"))))
        .await
        .expect("retrieval succeeds");

    // Then: Only the IN listing remains, with its region back-filled
    assert_eq!(result.listings.len(), 1);
    assert_eq!(result.listings[0].title(), "carmel saw");
    assert_eq!(
        result.listings[0].region().map(|region| region.as_str()),
        Some("IN")
    );
    assert_eq!(
        result.region_filter.as_ref().map(|region| region.as_str()),
        Some("IN")
    );
}

#[tokio::test]
async fn when_only_a_city_is_given_nothing_is_filtered_and_regions_are_backfilled() {
    // Given: Listings from two regions
    let orchestrator = orchestrator(vec![Arc::new(StubAdapter::new(
        SourceId::Mercari,
        Behavior::Listings(vec![("a", Some("Austin, TX")), ("b", Some("Reno, nv"))]),
    ))]);

    // When: Listings are retrieved with a city but no region
    let result = orchestrator
        .retrieve_listings("chainsaw", Some(&location(Some("Austin"), None)))
        .await
        .expect("retrieval succeeds");

    // Then: Everything is returned with derived regions
    let regions = result
        .listings
        .iter()
        .map(|listing| listing.region().map(|region| region.as_str().to_owned()))
        .collect::<Vec<_>>();
    assert_eq!(
        regions,
        vec![Some(String::from("TX")), Some(String::from("NV"))]
    );
    assert!(result.region_filter.is_none());
}

#[tokio::test]
async fn every_adapter_receives_the_same_region_hint() {
    // Given: Three recording adapters
    let adapters = SourceId::ALL
        .into_iter()
        .map(|id| StubAdapter::new(id, Behavior::Listings(vec![])))
        .collect::<Vec<_>>();
    let hint_logs = adapters
        .iter()
        .map(|adapter| Arc::clone(&adapter.hints))
        .collect::<Vec<_>>();
    let orchestrator = orchestrator(
        adapters
            .into_iter()
            .map(|adapter| Arc::new(adapter) as Arc<dyn SourceAdapter>)
            .collect(),
    );

    // When: A city and region are supplied
    orchestrator
        .retrieve_listings("chainsaw", Some(&location(Some("Indianapolis"), Some("IN"))))
        .await
        .expect("retrieval succeeds");

    // Then: Each adapter saw "City Region"
    for log in hint_logs {
        assert_eq!(
            *log.lock().expect("hint log"),
            vec![String::from("Indianapolis IN")]
        );
    }
}

#[tokio::test]
async fn without_location_adapters_receive_the_nationwide_hint() {
    let adapter = StubAdapter::new(SourceId::Facebook, Behavior::Listings(vec![]));
    let hints = Arc::clone(&adapter.hints);
    let orchestrator = orchestrator(vec![Arc::new(adapter)]);

    orchestrator
        .retrieve_listings("chainsaw", None)
        .await
        .expect("retrieval succeeds");

    assert_eq!(
        *hints.lock().expect("hint log"),
        vec![String::from("nationwide")]
    );
}

// =============================================================================
// Orchestrator: Input Validation
// =============================================================================

#[tokio::test]
async fn when_query_is_blank_no_adapter_is_invoked() {
    // Given: A recording adapter
    let adapter = StubAdapter::new(SourceId::OfferUp, Behavior::Listings(vec![]));
    let calls = Arc::clone(&adapter.calls);
    let orchestrator = orchestrator(vec![Arc::new(adapter)]);

    // When: A blank query is submitted
    let error = orchestrator
        .retrieve_listings("   ", None)
        .await
        .expect_err("blank query must fail");

    // Then: The request is rejected before dispatch
    assert_eq!(error, RetrievalError::InvalidInput(ValidationError::EmptyQuery));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn when_region_is_malformed_the_request_is_invalid() {
    let orchestrator = orchestrator(vec![Arc::new(StubAdapter::new(
        SourceId::OfferUp,
        Behavior::Listings(vec![]),
    ))]);

    let error = orchestrator
        .retrieve_listings("chainsaw", Some(&location(None, Some("Indiana"))))
        .await
        .expect_err("malformed region must fail");

    assert!(matches!(
        error,
        RetrievalError::InvalidInput(ValidationError::InvalidRegion { .. })
    ));
}

#[test]
fn orchestrator_construction_rejects_programmer_errors() {
    let empty = Orchestrator::new(Vec::new()).expect_err("no adapters");
    assert_eq!(empty, ValidationError::NoAdapters);

    let duplicate = Orchestrator::new(vec![
        Arc::new(StubAdapter::new(SourceId::Mercari, Behavior::Listings(vec![]))),
        Arc::new(StubAdapter::new(SourceId::Mercari, Behavior::Listings(vec![]))),
    ])
    .expect_err("duplicate source");
    assert_eq!(
        duplicate,
        ValidationError::DuplicateSource {
            source_id: String::from("mercari")
        }
    );
}

// =============================================================================
// Orchestrator: Aggregate Serialization
// =============================================================================

#[tokio::test]
async fn aggregate_serializes_with_metadata() {
    let orchestrator = orchestrator(vec![Arc::new(StubAdapter::new(
        SourceId::OfferUp,
        Behavior::Listings(vec![("echo cs-590", Some("Fishers, IN"))]),
    ))]);

    let result = orchestrator
        .retrieve_listings("chainsaw", None)
        .await
        .expect("retrieval succeeds");
    let json = serde_json::to_value(&result).expect("serialize");

    assert_eq!(json["sources_attempted"], 1);
    assert_eq!(json["listings"][0]["source"], "offerup");
    assert_eq!(json["listings"][0]["region"], "IN");
    assert!(json["listings"][0]["image"].is_null());
    assert!(json["retrieved_at"]
        .as_str()
        .is_some_and(|stamp| stamp.contains('T')));
    assert_eq!(
        json["request_id"].as_str().map(str::len),
        Some(36)
    );
}
