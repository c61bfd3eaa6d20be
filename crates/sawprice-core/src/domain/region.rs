use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Neutral hint used when the caller gives no location at all.
pub const NATIONWIDE: &str = "nationwide";

/// Two-letter region code, always stored uppercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RegionCode(String);

impl RegionCode {
    /// Parse and normalize a region code to uppercase.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        let valid = trimmed.len() == 2 && trimmed.chars().all(|ch| ch.is_ascii_alphabetic());
        if !valid {
            return Err(ValidationError::InvalidRegion {
                value: trimmed.to_owned(),
            });
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn matches(&self, other: &str) -> bool {
        self.0.eq_ignore_ascii_case(other.trim())
    }
}

impl Display for RegionCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for RegionCode {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl TryFrom<&str> for RegionCode {
    type Error = ValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<RegionCode> for String {
    fn from(value: RegionCode) -> Self {
        value.0
    }
}

/// Caller-supplied location, as received from the front-end.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationFilter {
    pub city: Option<String>,
    pub region: Option<String>,
}

impl LocationFilter {
    pub fn new(city: Option<String>, region: Option<String>) -> Self {
        Self {
            city: non_blank(city),
            region: non_blank(region),
        }
    }

    /// Region the aggregate gets filtered to, if the caller asked for one.
    pub fn target_region(&self) -> Result<Option<RegionCode>, ValidationError> {
        non_blank(self.region.clone())
            .map(|region| RegionCode::parse(&region))
            .transpose()
    }
}

/// Location hint handed to every adapter for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionHint {
    text: String,
    city: Option<String>,
    region: Option<RegionCode>,
}

impl RegionHint {
    pub fn nationwide() -> Self {
        Self {
            text: String::from(NATIONWIDE),
            city: None,
            region: None,
        }
    }

    /// Builds `"City Region"`, the bare region, the bare city, or the neutral default.
    pub fn from_location(location: Option<&LocationFilter>) -> Result<Self, ValidationError> {
        let Some(location) = location else {
            return Ok(Self::nationwide());
        };

        let city = non_blank(location.city.clone()).map(|city| city.trim().to_owned());
        let region = location.target_region()?;

        let text = match (&city, &region) {
            (Some(city), Some(region)) => format!("{city} {region}"),
            (None, Some(region)) => region.to_string(),
            (Some(city), None) => city.clone(),
            (None, None) => return Ok(Self::nationwide()),
        };

        Ok(Self { text, city, region })
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn city(&self) -> Option<&str> {
        self.city.as_deref()
    }

    pub fn region(&self) -> Option<&RegionCode> {
        self.region.as_ref()
    }
}

impl Display for RegionHint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}
