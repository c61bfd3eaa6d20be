use serde::Serialize;

use crate::normalize::{extract_region, is_absolute};
use crate::{RegionCode, SourceId, ValidationError};

/// Field values collected for one listing before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingParts {
    pub title: String,
    pub price: Option<String>,
    pub url: String,
    pub image: Option<String>,
    pub location: Option<String>,
    pub region: Option<RegionCode>,
}

/// Canonical marketplace listing.
///
/// Fields are private: a listing only changes through
/// [`with_backfilled_region`](Listing::with_backfilled_region).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Listing {
    title: String,
    price: Option<String>,
    url: String,
    image: Option<String>,
    location: Option<String>,
    region: Option<RegionCode>,
    source: SourceId,
}

impl Listing {
    pub fn new(source: SourceId, parts: ListingParts) -> Result<Self, ValidationError> {
        let title = parts.title.trim();
        if title.is_empty() {
            return Err(ValidationError::MissingTitle);
        }

        let url = parts.url.trim();
        if url.is_empty() {
            return Err(ValidationError::MissingUrl);
        }
        if !is_absolute(url) {
            return Err(ValidationError::RelativeUrl {
                value: url.to_owned(),
            });
        }

        Ok(Self {
            title: title.to_owned(),
            price: trimmed(parts.price),
            url: url.to_owned(),
            image: trimmed(parts.image).filter(|image| is_absolute(image)),
            location: trimmed(parts.location),
            region: parts.region,
            source,
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn price(&self) -> Option<&str> {
        self.price.as_deref()
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn image(&self) -> Option<&str> {
        self.image.as_deref()
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub fn region(&self) -> Option<&RegionCode> {
        self.region.as_ref()
    }

    pub const fn source(&self) -> SourceId {
        self.source
    }

    /// Derives `region` from `location` when the source did not supply one.
    ///
    /// Applying it again is a no-op.
    pub fn with_backfilled_region(mut self) -> Self {
        if self.region.is_none() {
            self.region = self.location.as_deref().and_then(extract_region);
        }
        self
    }
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}
