//! Module slugs.
//!
//! A slug is the canonical `author-name` identity of a module. Registry
//! payloads and manifests sometimes spell it `author/name`; both separators
//! are accepted on input, and `author-name` is always emitted.

use crate::error::Error;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::Arc;

/// A validated module slug in `author-name` form.
///
/// Slugs are case-sensitive. When parsed from `author-name` text the split
/// happens at the first `-`, so module names may themselves contain dashes.
#[derive(Clone)]
pub struct Slug {
    /// The canonical text (`author-name`).
    full: Arc<str>,
    /// Index of the `-` separator.
    separator_idx: usize,
}

impl Slug {
    /// Create a slug from author and name parts.
    ///
    /// # Panics
    ///
    /// Panics if author or name is empty.
    #[must_use]
    pub fn new(author: &str, name: &str) -> Self {
        assert!(!author.is_empty(), "author cannot be empty");
        assert!(!name.is_empty(), "name cannot be empty");

        let full = format!("{author}-{name}");
        Self {
            full: Arc::from(full),
            separator_idx: author.len(),
        }
    }

    /// Parse a slug from `author-name` or `author/name` text.
    ///
    /// Returns `None` if the text has no separator or an empty part.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();

        // A slash separator wins when present; registry payloads use it.
        let (author, name) = if let Some(idx) = s.find('/') {
            (&s[..idx], &s[idx + 1..])
        } else {
            let idx = s.find('-')?;
            (&s[..idx], &s[idx + 1..])
        };

        if author.is_empty() || name.is_empty() || name.contains('/') {
            return None;
        }

        Some(Self::new(author, name))
    }

    /// The author part.
    #[must_use]
    #[inline]
    pub fn author(&self) -> &str {
        &self.full[..self.separator_idx]
    }

    /// The name part.
    #[must_use]
    #[inline]
    pub fn name(&self) -> &str {
        &self.full[self.separator_idx + 1..]
    }

    /// The canonical `author-name` text.
    #[must_use]
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.full
    }
}

impl fmt::Debug for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Slug").field(&self.full).finish()
    }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.full)
    }
}

impl PartialEq for Slug {
    fn eq(&self, other: &Self) -> bool {
        self.full == other.full
    }
}

impl Eq for Slug {}

impl Hash for Slug {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.full.hash(state);
    }
}

impl PartialOrd for Slug {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Slug {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.full.cmp(&other.full)
    }
}

impl FromStr for Slug {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| Error::InvalidSlug {
            text: s.to_string(),
        })
    }
}

impl Serialize for Slug {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.full)
    }
}

impl<'de> Deserialize<'de> for Slug {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).ok_or_else(|| serde::de::Error::custom(format!("invalid slug: {s}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_dash_form() {
        let slug = Slug::parse("puppetlabs-stdlib").unwrap();
        assert_eq!(slug.author(), "puppetlabs");
        assert_eq!(slug.name(), "stdlib");
        assert_eq!(slug.as_str(), "puppetlabs-stdlib");
    }

    #[test]
    fn parse_slash_form() {
        let slug = Slug::parse("puppetlabs/stdlib").unwrap();
        assert_eq!(slug.as_str(), "puppetlabs-stdlib");
    }

    #[test]
    fn dash_splits_at_first_separator() {
        let slug = Slug::parse("acme-multi-word-module").unwrap();
        assert_eq!(slug.author(), "acme");
        assert_eq!(slug.name(), "multi-word-module");
    }

    #[test]
    fn slash_keeps_dashes_in_name() {
        let slug = Slug::parse("acme/multi-word-module").unwrap();
        assert_eq!(slug.author(), "acme");
        assert_eq!(slug.name(), "multi-word-module");
    }

    #[test]
    fn parse_is_case_sensitive() {
        let slug = Slug::parse("Acme-Module").unwrap();
        assert_eq!(slug.as_str(), "Acme-Module");
    }

    #[test]
    fn parse_invalid() {
        assert!(Slug::parse("plain").is_none());
        assert!(Slug::parse("-name").is_none());
        assert!(Slug::parse("author-").is_none());
        assert!(Slug::parse("author/").is_none());
        assert!(Slug::parse("a/b/c").is_none());
        assert!(Slug::parse("").is_none());
    }

    #[test]
    fn from_str_reports_error() {
        let err = "nodashes".parse::<Slug>().unwrap_err();
        assert!(err.to_string().contains("nodashes"));
    }
}
