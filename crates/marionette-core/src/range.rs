//! Version range constraints.
//!
//! Ranges follow the Forge `version_requirement` grammar: whitespace joins
//! comparators into an intersection (`>= 1.0.0 < 2.0.0`), commas join
//! intersections into a union, a bare version means exact equality, and an
//! empty range matches any version. The raw text is preserved for display.

use crate::error::Error;
use once_cell::sync::Lazy;
use regex::Regex;
use semver::{Version, VersionReq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// One comparator: an optional operator followed by a version.
static COMPARATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([<>=~^]{1,2})?\s*([0-9*xX][0-9A-Za-z.*+-]*)").unwrap());

/// A version range constraint.
///
/// Internally a union of `semver::VersionReq` alternatives; an empty union
/// matches every version.
#[derive(Debug, Clone)]
pub struct VersionRange {
    /// Raw range text as written.
    raw: String,
    /// Parsed union alternatives. Empty means "any version".
    alternatives: Vec<VersionReq>,
}

impl VersionRange {
    /// A range matching any version.
    #[must_use]
    pub fn any() -> Self {
        Self {
            raw: String::new(),
            alternatives: Vec::new(),
        }
    }

    /// A range matching exactly one version.
    #[must_use]
    pub fn exact(version: &Version) -> Self {
        let raw = format!("={version}");
        let req = VersionReq::parse(&raw).unwrap_or(VersionReq::STAR);
        Self {
            raw,
            alternatives: vec![req],
        }
    }

    /// Parse a range from Forge `version_requirement` text.
    pub fn parse(text: &str) -> Result<Self, Error> {
        let trimmed = text.trim();
        if trimmed.is_empty() || trimmed == "*" {
            return Ok(Self {
                raw: trimmed.to_string(),
                alternatives: Vec::new(),
            });
        }

        let mut alternatives = Vec::new();
        for alternative in trimmed.split(',') {
            alternatives.push(parse_intersection(text, alternative)?);
        }

        Ok(Self {
            raw: trimmed.to_string(),
            alternatives,
        })
    }

    /// Check whether a version satisfies this range.
    #[must_use]
    pub fn matches(&self, version: &Version) -> bool {
        self.alternatives.is_empty() || self.alternatives.iter().any(|req| req.matches(version))
    }

    /// True if this range matches any version.
    #[must_use]
    pub fn is_any(&self) -> bool {
        self.alternatives.is_empty()
    }

    /// The raw range text as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

/// Parse one whitespace-joined comparator intersection into a `VersionReq`.
fn parse_intersection(full: &str, alternative: &str) -> Result<VersionReq, Error> {
    let alternative = alternative.trim();
    if alternative.is_empty() {
        return Err(Error::InvalidRange {
            range: full.to_string(),
            reason: "empty union alternative".to_string(),
        });
    }

    let mut comparators = Vec::new();
    let mut matched_len = 0;
    for captures in COMPARATOR.captures_iter(alternative) {
        let op = captures.get(1).map_or("", |m| m.as_str());
        let version = &captures[2];
        matched_len += op.len() + version.len();

        if op.is_empty() && !has_wildcard(version) {
            // A bare concrete version means exact equality.
            comparators.push(format!("={version}"));
        } else {
            comparators.push(format!("{op}{version}"));
        }
    }

    // Everything except whitespace must have been consumed by comparators.
    let significant: usize = alternative.split_whitespace().map(str::len).sum();
    if comparators.is_empty() || matched_len != significant {
        return Err(Error::InvalidRange {
            range: full.to_string(),
            reason: format!("unrecognized constraint '{alternative}'"),
        });
    }

    VersionReq::parse(&comparators.join(", ")).map_err(|e| Error::InvalidRange {
        range: full.to_string(),
        reason: e.to_string(),
    })
}

/// True when a version token contains a wildcard component (`*`, `x`, `X`).
fn has_wildcard(version: &str) -> bool {
    version
        .split('.')
        .any(|part| matches!(part, "*" | "x" | "X"))
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.raw.is_empty() {
            write!(f, "*")
        } else {
            write!(f, "{}", self.raw)
        }
    }
}

impl FromStr for VersionRange {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for VersionRange {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for VersionRange {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
