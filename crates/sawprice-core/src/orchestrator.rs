//! Concurrent fan-out across marketplaces with settle-all aggregation.
//!
//! ```text
//! retrieve_listings(query, location)
//!   │ validate, build RegionHint
//!   ├──▶ spawn adapter A ─┐
//!   ├──▶ spawn adapter B ─┼──▶ join_all (never short-circuits)
//!   └──▶ spawn adapter C ─┘
//!   │ partition Fulfilled / Rejected
//!   │ concat ─▶ back-fill region ─▶ region filter
//!   ▼
//! AggregateResult | RetrievalError::AllSourcesFailed
//! ```

use std::collections::BTreeSet;
use std::env;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;
use tokio::task::JoinError;
use tracing::Instrument;
use uuid::Uuid;

use crate::adapter::{RetrievalRequest, SourceAdapter, SourceError};
use crate::adapters::{marketplace_adapter, mock_launcher};
use crate::session::{HttpLauncher, SessionLauncher};
use crate::{
    CoreError, Listing, LocationFilter, RegionCode, RegionHint, RetrievalConfig, SourceId,
    ValidationError,
};

/// Settled result of one adapter invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetrievalOutcome {
    Fulfilled {
        source: SourceId,
        listings: Vec<Listing>,
    },
    Rejected {
        source: SourceId,
        reason: SourceError,
    },
}

impl RetrievalOutcome {
    fn settle(source: SourceId, joined: Result<Result<Vec<Listing>, SourceError>, JoinError>) -> Self {
        match joined {
            Ok(Ok(listings)) => Self::Fulfilled {
                source,
                listings: own_listings(source, listings),
            },
            Ok(Err(reason)) => Self::Rejected { source, reason },
            Err(error) => {
                let what = if error.is_panic() {
                    "panicked"
                } else {
                    "was cancelled"
                };
                Self::Rejected {
                    source,
                    reason: SourceError::internal(format!("adapter task {what}")),
                }
            }
        }
    }
}

fn own_listings(source: SourceId, listings: Vec<Listing>) -> Vec<Listing> {
    let total = listings.len();
    let owned = listings
        .into_iter()
        .filter(|listing| listing.source() == source)
        .collect::<Vec<_>>();
    if owned.len() < total {
        tracing::warn!(
            %source,
            foreign = total - owned.len(),
            "adapter emitted listings tagged with another source; discarded"
        );
    }
    owned
}

/// A source that failed during one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceRejection {
    pub source: SourceId,
    pub code: &'static str,
    pub message: String,
    pub retryable: bool,
}

impl SourceRejection {
    fn new(source: SourceId, reason: &SourceError) -> Self {
        Self {
            source,
            code: reason.code(),
            message: reason.message().to_owned(),
            retryable: reason.retryable(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregateStatus {
    Populated,
    Empty,
}

/// Merged listings from every source that succeeded.
#[derive(Debug, Clone, Serialize)]
pub struct AggregateResult {
    pub request_id: Uuid,
    pub listings: Vec<Listing>,
    pub sources_attempted: usize,
    pub sources_succeeded: usize,
    pub rejections: Vec<SourceRejection>,
    pub region_filter: Option<RegionCode>,
    pub latency_ms: u64,
    #[serde(with = "time::serde::rfc3339")]
    pub retrieved_at: OffsetDateTime,
}

impl AggregateResult {
    /// `Empty` is a valid answer: at least one source responded with no matches.
    pub fn status(&self) -> AggregateStatus {
        if self.listings.is_empty() {
            AggregateStatus::Empty
        } else {
            AggregateStatus::Populated
        }
    }
}

/// Request-level failures of [`Orchestrator::retrieve_listings`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RetrievalError {
    #[error(transparent)]
    InvalidInput(#[from] ValidationError),

    #[error("all {sources_attempted} sources failed")]
    AllSourcesFailed {
        request_id: Uuid,
        sources_attempted: usize,
        rejections: Vec<SourceRejection>,
    },
}

impl RetrievalError {
    pub const fn sources_succeeded(&self) -> usize {
        0
    }

    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "request.invalid_input",
            Self::AllSourcesFailed { .. } => "request.all_sources_failed",
        }
    }
}

/// Fans a query out to every registered adapter.
#[derive(Clone)]
pub struct Orchestrator {
    adapters: Vec<Arc<dyn SourceAdapter>>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("sources", &self.sources())
            .finish()
    }
}

impl Orchestrator {
    pub fn new(adapters: Vec<Arc<dyn SourceAdapter>>) -> Result<Self, ValidationError> {
        if adapters.is_empty() {
            return Err(ValidationError::NoAdapters);
        }

        let mut seen = BTreeSet::new();
        for adapter in &adapters {
            if !seen.insert(adapter.id()) {
                return Err(ValidationError::DuplicateSource {
                    source_id: adapter.id().to_string(),
                });
            }
        }

        Ok(Self { adapters })
    }

    /// Registered sources in dispatch order.
    pub fn sources(&self) -> Vec<SourceId> {
        self.adapters.iter().map(|adapter| adapter.id()).collect()
    }

    /// Retrieves, merges and filters listings from every source.
    ///
    /// Individual source failures are reported in
    /// [`AggregateResult::rejections`]; an error is returned only for invalid
    /// input or when no source succeeded.
    pub async fn retrieve_listings(
        &self,
        query: &str,
        location: Option<&LocationFilter>,
    ) -> Result<AggregateResult, RetrievalError> {
        let started = Instant::now();
        let hint = RegionHint::from_location(location)?;
        let region_filter = location
            .map(LocationFilter::target_region)
            .transpose()?
            .flatten();
        let request = Arc::new(RetrievalRequest::new(query, hint)?);
        let request_id = Uuid::new_v4();

        let span = tracing::info_span!(
            "retrieve_listings",
            %request_id,
            query = request.query(),
            hint = %request.hint()
        );

        async move {
            let sources_attempted = self.adapters.len();
            tracing::info!(sources = sources_attempted, "dispatching to sources");

            let outcomes = self.dispatch(&request).await;

            let mut listings = Vec::new();
            let mut rejections = Vec::new();
            let mut sources_succeeded = 0;
            for outcome in outcomes {
                match outcome {
                    RetrievalOutcome::Fulfilled {
                        source,
                        listings: found,
                    } => {
                        tracing::debug!(%source, listings = found.len(), "source fulfilled");
                        sources_succeeded += 1;
                        listings.extend(found);
                    }
                    RetrievalOutcome::Rejected { source, reason } => {
                        tracing::warn!(
                            %source,
                            code = reason.code(),
                            error = %reason.message(),
                            "source rejected"
                        );
                        rejections.push(SourceRejection::new(source, &reason));
                    }
                }
            }

            if sources_succeeded == 0 {
                tracing::error!(sources = sources_attempted, "every source failed");
                return Err(RetrievalError::AllSourcesFailed {
                    request_id,
                    sources_attempted,
                    rejections,
                });
            }

            let merged = listings.len();
            let listings = filter_by_region(backfill_regions(listings), region_filter.as_ref());
            tracing::info!(
                merged,
                returned = listings.len(),
                succeeded = sources_succeeded,
                rejected = rejections.len(),
                "aggregate ready"
            );

            Ok(AggregateResult {
                request_id,
                listings,
                sources_attempted,
                sources_succeeded,
                rejections,
                region_filter,
                latency_ms: elapsed_ms(started),
                retrieved_at: OffsetDateTime::now_utc(),
            })
        }
        .instrument(span)
        .await
    }

    async fn dispatch(&self, request: &Arc<RetrievalRequest>) -> Vec<RetrievalOutcome> {
        let (sources, tasks): (Vec<_>, Vec<_>) = self
            .adapters
            .iter()
            .map(|adapter| {
                let adapter = Arc::clone(adapter);
                let request = Arc::clone(request);
                let source = adapter.id();
                let task = tokio::spawn(
                    async move { adapter.retrieve(&request).await }.in_current_span(),
                );
                (source, task)
            })
            .unzip();

        sources
            .into_iter()
            .zip(join_all(tasks).await)
            .map(|(source, joined)| RetrievalOutcome::settle(source, joined))
            .collect()
    }
}

/// Fills missing regions from each listing's location text.
pub fn backfill_regions(listings: Vec<Listing>) -> Vec<Listing> {
    listings
        .into_iter()
        .map(Listing::with_backfilled_region)
        .collect()
}

/// Keeps listings in `target`; listings without a region are excluded while a target is set.
pub fn filter_by_region(listings: Vec<Listing>, target: Option<&RegionCode>) -> Vec<Listing> {
    let Some(target) = target else {
        return listings;
    };
    listings
        .into_iter()
        .filter(|listing| {
            listing
                .region()
                .is_some_and(|region| region.matches(target.as_str()))
        })
        .collect()
}

fn elapsed_ms(started: Instant) -> u64 {
    let elapsed = started.elapsed().as_millis();
    if elapsed > u128::from(u64::MAX) {
        u64::MAX
    } else {
        elapsed as u64
    }
}

/// Rendering backend used for real (non-mock) retrievals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Renderer {
    #[default]
    Http,
    Chromium,
}

impl Renderer {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Chromium => "chromium",
        }
    }

    fn launcher(self, config: &RetrievalConfig) -> Result<Arc<dyn SessionLauncher>, CoreError> {
        match self {
            Self::Http => Ok(Arc::new(HttpLauncher::new(&config.user_agent)?)),
            Self::Chromium => chromium_launcher(config),
        }
    }
}

impl Display for Renderer {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Renderer {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "http" => Ok(Self::Http),
            "chromium" | "chrome" => Ok(Self::Chromium),
            _ => Err(ValidationError::InvalidConfig {
                key: "SAWPRICE_RENDERER",
                value: value.to_owned(),
            }),
        }
    }
}

#[cfg(feature = "chromium")]
fn chromium_launcher(config: &RetrievalConfig) -> Result<Arc<dyn SessionLauncher>, CoreError> {
    Ok(Arc::new(crate::session::ChromiumLauncher::new(
        config.user_agent.clone(),
    )))
}

#[cfg(not(feature = "chromium"))]
fn chromium_launcher(_config: &RetrievalConfig) -> Result<Arc<dyn SessionLauncher>, CoreError> {
    Err(ValidationError::UnsupportedRenderer {
        value: String::from(Renderer::Chromium.as_str()),
    }
    .into())
}

/// Builder wiring marketplace adapters to a rendering backend.
///
/// `SAWPRICE_RENDERER` (`http` or `chromium`) selects the backend in
/// [`from_env`](Self::from_env); the remaining `SAWPRICE_*` variables are
/// documented on [`RetrievalConfig`].
///
/// ```rust,ignore
/// use sawprice_core::{OrchestratorBuilder, SourceId};
///
/// let orchestrator = OrchestratorBuilder::new()
///     .with_mock_mode()
///     .with_source_enabled(SourceId::Facebook, false)
///     .build()?;
/// ```
pub struct OrchestratorBuilder {
    use_mock: bool,
    renderer: Renderer,
    config: RetrievalConfig,
    launcher: Option<Arc<dyn SessionLauncher>>,
    enabled: BTreeSet<SourceId>,
}

impl Default for OrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl OrchestratorBuilder {
    /// Every marketplace enabled, HTTP backend, default config.
    pub fn new() -> Self {
        Self {
            use_mock: false,
            renderer: Renderer::default(),
            config: RetrievalConfig::default(),
            launcher: None,
            enabled: SourceId::ALL.into_iter().collect(),
        }
    }

    pub fn from_env() -> Result<Self, ValidationError> {
        let mut builder = Self::new().with_config(RetrievalConfig::from_env()?);
        if let Some(renderer) = env::var("SAWPRICE_RENDERER")
            .ok()
            .filter(|value| !value.trim().is_empty())
        {
            builder.renderer = renderer.parse()?;
        }
        Ok(builder)
    }

    /// Serve built-in sample pages instead of contacting marketplaces.
    pub fn with_mock_mode(mut self) -> Self {
        self.use_mock = true;
        self
    }

    pub fn with_renderer(mut self, renderer: Renderer) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn with_config(mut self, config: RetrievalConfig) -> Self {
        self.config = config;
        self
    }

    /// Overrides the backend entirely; takes precedence over mock mode.
    pub fn with_launcher(mut self, launcher: Arc<dyn SessionLauncher>) -> Self {
        self.launcher = Some(launcher);
        self
    }

    pub fn with_source_enabled(mut self, source: SourceId, enabled: bool) -> Self {
        if enabled {
            self.enabled.insert(source);
        } else {
            self.enabled.remove(&source);
        }
        self
    }

    /// Restricts the orchestrator to exactly `sources`.
    pub fn with_only_sources(mut self, sources: impl IntoIterator<Item = SourceId>) -> Self {
        self.enabled = sources.into_iter().collect();
        self
    }

    pub fn build(self) -> Result<Orchestrator, CoreError> {
        let mut config = self.config;
        if self.use_mock {
            config.settle = Duration::ZERO;
            config.scroll_pause = Duration::ZERO;
        }

        let launcher = match (self.launcher, self.use_mock) {
            (Some(launcher), _) => launcher,
            (None, true) => Arc::new(mock_launcher()) as Arc<dyn SessionLauncher>,
            (None, false) => self.renderer.launcher(&config)?,
        };

        let config = Arc::new(config);
        let adapters = self
            .enabled
            .into_iter()
            .map(|source| {
                Arc::new(marketplace_adapter(
                    source,
                    Arc::clone(&launcher),
                    Arc::clone(&config),
                )) as Arc<dyn SourceAdapter>
            })
            .collect();

        Ok(Orchestrator::new(adapters)?)
    }
}
