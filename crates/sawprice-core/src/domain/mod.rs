//! # Domain Models
//!
//! Canonical listing types for sawprice.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Listing`] | Normalized marketplace listing |
//! | [`ListingParts`] | Unvalidated listing fields |
//! | [`RegionCode`] | Two-letter uppercase region code |
//! | [`RegionHint`] | Location hint passed to source adapters |
//! | [`LocationFilter`] | Caller-supplied city/region |
//!
//! `title` and `url` are mandatory: [`Listing::new`] refuses to build a
//! listing without them, so partial records never reach an aggregate.

mod listing;
mod region;

pub use listing::{Listing, ListingParts};
pub use region::{LocationFilter, RegionCode, RegionHint, NATIONWIDE};
