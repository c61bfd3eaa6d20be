//! Source adapter contract and the shared marketplace session lifecycle.
//!
//! Every marketplace goes through the same sequence inside one scoped
//! session:
//!
//! ```text
//! throttle ─▶ launch ─▶ navigate (bounded retry) ─▶ readiness wait
//!          ─▶ scroll expansion (optional) ─▶ DOM snapshot ─▶ close
//!          ─▶ extract + normalize
//! ```
//!
//! Marketplaces differ only in their [`MarketplaceProfile`].

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

use tracing::Instrument;

use crate::extract::{extract_items, RawItem, SiteSelectors};
use crate::normalize::resolve_url;
use crate::session::{with_session, BrowserSession, ScopedFuture, SessionError, SessionLauncher};
use crate::throttling::LaunchThrottle;
use crate::{Listing, ListingParts, RegionHint, RetrievalConfig, SourceId, ValidationError};

/// Adapter-level failure classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceErrorKind {
    NavigationFailed,
    ContentNotReady,
    SessionUnavailable,
    RateLimited,
    ExtractionFailed,
    Internal,
}

/// Structured adapter failure, captured by the orchestrator as a rejection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
    retryable: bool,
}

impl SourceError {
    pub fn navigation_failed(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::NavigationFailed,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn content_not_ready(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::ContentNotReady,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn session_unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::SessionUnavailable,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::RateLimited,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn extraction_failed(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::ExtractionFailed,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Internal,
            message: message.into(),
            retryable: false,
        }
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            SourceErrorKind::NavigationFailed => "source.navigation_failed",
            SourceErrorKind::ContentNotReady => "source.content_not_ready",
            SourceErrorKind::SessionUnavailable => "source.session_unavailable",
            SourceErrorKind::RateLimited => "source.rate_limited",
            SourceErrorKind::ExtractionFailed => "source.extraction_failed",
            SourceErrorKind::Internal => "source.internal",
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for SourceError {}

impl From<SessionError> for SourceError {
    fn from(error: SessionError) -> Self {
        match error {
            SessionError::Launch(_) => Self::session_unavailable(error.to_string()),
            SessionError::Navigation(_) => Self::navigation_failed(error.to_string()),
            SessionError::Script(_) | SessionError::NoDocument => {
                Self::extraction_failed(error.to_string())
            }
        }
    }
}

/// Query and location hint shared by every adapter for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievalRequest {
    query: String,
    hint: RegionHint,
}

impl RetrievalRequest {
    pub fn new(query: impl Into<String>, hint: RegionHint) -> Result<Self, ValidationError> {
        let query = query.into();
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyQuery);
        }
        Ok(Self {
            query: trimmed.to_owned(),
            hint,
        })
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn hint(&self) -> &RegionHint {
        &self.hint
    }
}

/// Boxed future returned by [`SourceAdapter::retrieve`].
pub type RetrieveFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Vec<Listing>, SourceError>> + Send + 'a>>;

/// Marketplace adapter contract.
///
/// An empty `Ok` vector means the marketplace had no matches; failures are
/// reported as [`SourceError`] and never escalate past the orchestrator.
/// Implementations must only emit listings tagged with their own [`id`](SourceAdapter::id).
pub trait SourceAdapter: Send + Sync {
    fn id(&self) -> SourceId;

    /// Whether the marketplace scopes results by the region hint itself.
    fn supports_native_region(&self) -> bool;

    fn retrieve<'a>(&'a self, request: &'a RetrievalRequest) -> RetrieveFuture<'a>;
}

/// How an adapter decides the results page has rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadinessPolicy {
    /// Poll for this selector until the readiness timeout.
    Marker(&'static str),
    /// Pause for the configured settle interval.
    Settle,
}

/// Everything marketplace-specific about a retrieval.
#[derive(Debug, Clone)]
pub struct MarketplaceProfile {
    pub source: SourceId,
    pub base_url: &'static str,
    pub selectors: SiteSelectors,
    pub readiness: ReadinessPolicy,
    /// Scroll to trigger lazy loading before extraction.
    pub expand_results: bool,
    pub native_region: bool,
    pub search_url: fn(&RetrievalRequest) -> String,
}

impl MarketplaceProfile {
    /// Maps raw cards to listings, dropping any without a title or url.
    ///
    /// `limit` caps the listings kept, so invalid cards never consume it.
    pub fn normalize(&self, raw_items: Vec<RawItem>, limit: usize) -> Vec<Listing> {
        let total = raw_items.len();
        let mut listings = raw_items
            .into_iter()
            .filter_map(|raw| {
                let missing = raw_missing_fields(&raw);
                let parts = ListingParts {
                    title: raw.title.unwrap_or_default(),
                    price: raw.price,
                    url: raw
                        .href
                        .map(|href| resolve_url(self.base_url, &href))
                        .unwrap_or_default(),
                    image: raw.image.map(|src| resolve_url(self.base_url, &src)),
                    location: raw.location,
                    region: None,
                };

                match Listing::new(self.source, parts) {
                    Ok(listing) => {
                        if !missing.is_empty() {
                            tracing::trace!(?missing, "optional fields defaulted to null");
                        }
                        Some(listing)
                    }
                    Err(error) => {
                        tracing::debug!(%error, "dropping item");
                        None
                    }
                }
            })
            .collect::<Vec<_>>();

        if listings.len() < total {
            tracing::debug!(
                kept = listings.len(),
                dropped = total - listings.len(),
                "items without title or url were dropped"
            );
        }
        listings.truncate(limit);
        listings
    }
}

fn raw_missing_fields(raw: &RawItem) -> Vec<&'static str> {
    [
        ("price", raw.price.is_none()),
        ("image", raw.image.is_none()),
        ("location", raw.location.is_none()),
    ]
    .into_iter()
    .filter_map(|(field, missing)| missing.then_some(field))
    .collect()
}

/// Adapter driving one marketplace through a rendering session.
#[derive(Clone)]
pub struct MarketplaceAdapter {
    profile: Arc<MarketplaceProfile>,
    launcher: Arc<dyn SessionLauncher>,
    config: Arc<RetrievalConfig>,
    throttle: LaunchThrottle,
}

impl MarketplaceAdapter {
    pub fn new(
        profile: MarketplaceProfile,
        launcher: Arc<dyn SessionLauncher>,
        config: Arc<RetrievalConfig>,
    ) -> Self {
        let throttle = LaunchThrottle::per_minute(config.launches_per_minute);
        Self {
            profile: Arc::new(profile),
            launcher,
            config,
            throttle,
        }
    }

    pub fn profile(&self) -> &MarketplaceProfile {
        &self.profile
    }
}

impl SourceAdapter for MarketplaceAdapter {
    fn id(&self) -> SourceId {
        self.profile.source
    }

    fn supports_native_region(&self) -> bool {
        self.profile.native_region
    }

    fn retrieve<'a>(&'a self, request: &'a RetrievalRequest) -> RetrieveFuture<'a> {
        let span = tracing::info_span!("source", source = %self.profile.source);
        Box::pin(
            async move {
                if !self.throttle.try_acquire() {
                    return Err(SourceError::rate_limited(format!(
                        "launch budget of {} per minute exhausted",
                        self.throttle.limit()
                    )));
                }

                let started = Instant::now();
                let plan = SessionPlan {
                    profile: Arc::clone(&self.profile),
                    config: Arc::clone(&self.config),
                    url: (self.profile.search_url)(request),
                };
                tracing::debug!(
                    url = %plan.url,
                    budget_ms = self.config.worst_case_budget().as_millis() as u64,
                    "starting session"
                );

                let raw_items = with_session(
                    self.launcher.as_ref(),
                    self.config.close_timeout,
                    move |session| drive_session(session, plan),
                )
                .await?;

                let listings = self.profile.normalize(raw_items, self.config.max_items);
                tracing::info!(
                    listings = listings.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "source retrieval finished"
                );
                Ok(listings)
            }
            .instrument(span),
        )
    }
}

/// Owned inputs for one session run.
struct SessionPlan {
    profile: Arc<MarketplaceProfile>,
    config: Arc<RetrievalConfig>,
    url: String,
}

fn drive_session<'s>(
    session: &'s mut Box<dyn BrowserSession>,
    plan: SessionPlan,
) -> ScopedFuture<'s, Vec<RawItem>, SourceError> {
    Box::pin(async move {
        let SessionPlan {
            profile,
            config,
            url,
        } = plan;

        navigate(session, &url, &config).await?;
        await_readiness(session, profile.readiness, &config).await?;
        if profile.expand_results {
            expand_results(session, &config).await;
        }

        let html = session.content().await?;
        extract_items(&html, &profile.selectors)
            .map_err(|error| SourceError::extraction_failed(error.to_string()))
    })
}

async fn navigate(
    session: &mut Box<dyn BrowserSession>,
    url: &str,
    config: &RetrievalConfig,
) -> Result<(), SourceError> {
    let policy = config.navigation_retry;
    let mut attempt = 0;

    loop {
        let failure = match tokio::time::timeout(config.navigation_timeout, session.goto(url)).await
        {
            Ok(Ok(())) => return Ok(()),
            Ok(Err(error)) => error.to_string(),
            Err(_) => format!(
                "navigation timed out after {} ms",
                config.navigation_timeout.as_millis()
            ),
        };

        match policy.delay_after(attempt) {
            Some(delay) => {
                tracing::debug!(attempt, %failure, "navigation failed; retrying");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            None => {
                return Err(SourceError::navigation_failed(format!(
                    "{failure} (gave up after {} attempt(s))",
                    attempt + 1
                )));
            }
        }
    }
}

async fn await_readiness(
    session: &mut Box<dyn BrowserSession>,
    readiness: ReadinessPolicy,
    config: &RetrievalConfig,
) -> Result<(), SourceError> {
    let selector = match readiness {
        ReadinessPolicy::Settle => {
            tokio::time::sleep(config.settle).await;
            return Ok(());
        }
        ReadinessPolicy::Marker(selector) => selector,
    };

    let poll = async {
        loop {
            match session.has_element(selector).await {
                Ok(true) => return,
                Ok(false) => {}
                Err(error) => tracing::trace!(%error, "readiness check failed"),
            }
            tokio::time::sleep(config.readiness_poll).await;
        }
    };

    tokio::time::timeout(config.readiness_timeout, poll)
        .await
        .map_err(|_| {
            SourceError::content_not_ready(format!(
                "'{selector}' did not appear within {} ms",
                config.readiness_timeout.as_millis()
            ))
        })
}

async fn expand_results(session: &mut Box<dyn BrowserSession>, config: &RetrievalConfig) {
    let mut last_height = None;

    for iteration in 0..config.scroll_max_iterations {
        let height =
            match tokio::time::timeout(config.readiness_timeout, session.scroll_to_bottom()).await {
                Ok(Ok(height)) => height,
                Ok(Err(error)) => {
                    tracing::debug!(%error, "scroll failed; extracting what is loaded");
                    return;
                }
                Err(_) => {
                    tracing::debug!("scroll timed out; extracting what is loaded");
                    return;
                }
            };

        if last_height == Some(height) {
            tracing::trace!(iteration, height, "scroll height stabilized");
            return;
        }
        last_height = Some(height);
        tokio::time::sleep(config.scroll_pause).await;
    }
}
