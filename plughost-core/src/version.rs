//! Version comparison on `major.minor.patch` triples
//!
//! Comparison is purely numeric, component by component. A malformed version
//! is an error, never a silent `false`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from parsing a version string
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionParseError {
    #[error("Version '{input}' must have exactly three dot-separated components")]
    WrongComponentCount { input: String },

    #[error("Version '{input}' has a non-numeric component '{component}'")]
    NonNumeric { input: String, component: String },
}

/// A parsed `major.minor.patch` version.
///
/// Field order makes the derived `Ord` component-wise numeric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl Version {
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Whether `self` lies within the inclusive bounds; `None` is unconstrained
    pub fn is_within(&self, lower: Option<&Version>, upper: Option<&Version>) -> bool {
        lower.is_none_or(|l| self >= l) && upper.is_none_or(|u| self <= u)
    }
}

impl FromStr for Version {
    type Err = VersionParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = input.split('.').collect();
        if parts.len() != 3 {
            return Err(VersionParseError::WrongComponentCount {
                input: input.to_string(),
            });
        }

        let component = |part: &str| {
            part.parse::<u64>()
                .map_err(|_| VersionParseError::NonNumeric {
                    input: input.to_string(),
                    component: part.to_string(),
                })
        };

        Ok(Self {
            major: component(parts[0])?,
            minor: component(parts[1])?,
            patch: component(parts[2])?,
        })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// `version >= minimum`
pub fn is_at_or_above(version: &str, minimum: &str) -> Result<bool, VersionParseError> {
    Ok(version.parse::<Version>()? >= minimum.parse::<Version>()?)
}

/// `version <= maximum`
pub fn is_at_or_below(version: &str, maximum: &str) -> Result<bool, VersionParseError> {
    Ok(version.parse::<Version>()? <= maximum.parse::<Version>()?)
}

/// `version < bound`
pub fn is_below(version: &str, bound: &str) -> Result<bool, VersionParseError> {
    Ok(version.parse::<Version>()? < bound.parse::<Version>()?)
}
