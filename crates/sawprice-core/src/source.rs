use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Marketplace identifiers written into every listing's provenance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceId {
    Facebook,
    OfferUp,
    Mercari,
}

impl SourceId {
    pub const ALL: [Self; 3] = [Self::Facebook, Self::OfferUp, Self::Mercari];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Facebook => "facebook",
            Self::OfferUp => "offerup",
            Self::Mercari => "mercari",
        }
    }

    /// Human-facing marketplace name.
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Facebook => "Facebook Marketplace",
            Self::OfferUp => "OfferUp",
            Self::Mercari => "Mercari",
        }
    }
}

impl Display for SourceId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceId {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "facebook" | "fb" => Ok(Self::Facebook),
            "offerup" => Ok(Self::OfferUp),
            "mercari" => Ok(Self::Mercari),
            other => Err(ValidationError::InvalidSource {
                value: other.to_owned(),
            }),
        }
    }
}
