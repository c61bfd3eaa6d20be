//! # Sawprice Core
//!
//! Concurrent listing retrieval across second-hand marketplaces, with field
//! normalization and region filtering.
//!
//! ## Overview
//!
//! - **Canonical listing model** with mandatory title and absolute url
//! - **Source adapters** sharing one session lifecycle, configured per marketplace
//! - **Scoped rendering sessions** closed on every exit path
//! - **Orchestrator** that fans out, settles all adapters and merges the results
//!
//! ## Feature Flags
//!
//! | Flag | Description |
//! |------|-------------|
//! | `default` | HTTP and fixture rendering backends |
//! | `chromium` | Headless Chromium backend via `chromiumoxide` |
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapter`] | Source adapter trait, error taxonomy, marketplace lifecycle |
//! | [`adapters`] | Facebook Marketplace, OfferUp and Mercari profiles |
//! | [`config`] | Retrieval timeouts and limits |
//! | [`domain`] | Listing and region types |
//! | [`error`] | Core error types |
//! | [`extract`] | Pure DOM extraction |
//! | [`normalize`] | Price, region and url normalization |
//! | [`orchestrator`] | Fan-out, aggregation and builder |
//! | [`retry`] | Bounded retry policy |
//! | [`session`] | Rendering backends and scoped sessions |
//! | [`source`] | Marketplace identifiers |
//! | [`throttling`] | Launch rate limiting |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sawprice_core::{LocationFilter, OrchestratorBuilder};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let orchestrator = OrchestratorBuilder::from_env()?.build()?;
//!     let location = LocationFilter::new(Some("Indianapolis".into()), Some("IN".into()));
//!
//!     let result = orchestrator.retrieve_listings("chainsaw", Some(&location)).await?;
//!     for listing in &result.listings {
//!         println!("{} {:?} {}", listing.title(), listing.price(), listing.url());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  CLI / Caller   │
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │  Orchestrator   │────▶│ Region filter    │
//! └────────┬────────┘     └──────────────────┘
//!          │ one task per source
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ Source Adapter  │────▶│ Session Launcher │
//! │ (profile-driven)│     │ (http/chromium)  │
//! └────────┬────────┘     └──────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ Extract +       │
//! │ Normalize       │
//! └─────────────────┘
//! ```
//!
//! ## Error Handling
//!
//! Adapter failures are [`SourceError`]s and never escape the orchestrator on
//! their own; they are reported as rejections. [`RetrievalError`] is returned
//! only for invalid input or when every source failed.

pub mod adapter;
pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod extract;
pub mod normalize;
pub mod orchestrator;
pub mod retry;
pub mod session;
pub mod source;
pub mod throttling;

pub use adapter::{
    MarketplaceAdapter, MarketplaceProfile, ReadinessPolicy, RetrievalRequest, SourceAdapter,
    SourceError, SourceErrorKind,
};
pub use config::{RetrievalConfig, DEFAULT_USER_AGENT};
pub use domain::*;
pub use error::{CoreError, ValidationError};
pub use orchestrator::{
    AggregateResult, AggregateStatus, Orchestrator, OrchestratorBuilder, Renderer,
    RetrievalError, RetrievalOutcome, SourceRejection,
};
pub use retry::RetryPolicy;
pub use source::SourceId;
