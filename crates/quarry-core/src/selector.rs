//! Selector matchers: category-tagged predicates over context values.
//!
//! A selector category names one attribute of the calling context (for
//! example `category`, `branch`, or `charm`). Matchers for a category are
//! built through a [`SelectorFactory`], so every matcher is permanently
//! tagged with the category that owns it. A matcher accepts either a
//! nonempty set of literal values or the single wildcard, never both.

use crate::{Error, Result};

/// One acceptable value for a category: a literal string or the wildcard
/// that matches anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Match {
    Literal(String),
    Wildcard,
}

impl From<&str> for Match {
    fn from(value: &str) -> Self {
        Match::Literal(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum MatchSet {
    Literals(Vec<String>),
    Wildcard,
}

/// A matcher bound to its owning category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorMatcher {
    category: String,
    set: MatchSet,
}

impl SelectorMatcher {
    /// Build a matcher for `category` from one or more match values.
    ///
    /// The wildcard must be the sole entry; mixing it with literals, or
    /// passing no values at all, is a parameter error.
    pub fn new<I>(category: impl Into<String>, matches: I) -> Result<Self>
    where
        I: IntoIterator<Item = Match>,
    {
        let category = category.into();
        let matches: Vec<Match> = matches.into_iter().collect();
        if matches.is_empty() {
            return Err(Error::Parameter(format!(
                "matcher for category '{category}' has no match values"
            )));
        }
        let wildcards = matches.iter().filter(|m| **m == Match::Wildcard).count();
        let set = if wildcards > 0 {
            if matches.len() != 1 {
                return Err(Error::Parameter(format!(
                    "the wildcard for category '{category}' must be the only match value"
                )));
            }
            MatchSet::Wildcard
        } else {
            MatchSet::Literals(
                matches
                    .into_iter()
                    .filter_map(|m| match m {
                        Match::Literal(s) => Some(s),
                        Match::Wildcard => None,
                    })
                    .collect(),
            )
        };
        Ok(SelectorMatcher { category, set })
    }

    /// The category this matcher belongs to.
    pub fn category(&self) -> &str {
        &self.category
    }

    /// Whether this is the catch-all matcher for its category.
    pub fn is_wildcard(&self) -> bool {
        self.set == MatchSet::Wildcard
    }

    /// True iff `category` is this matcher's own category and `candidate` is
    /// acceptable for it.
    pub fn matches(&self, category: &str, candidate: &str) -> bool {
        if category != self.category {
            return false;
        }
        match &self.set {
            MatchSet::Wildcard => true,
            MatchSet::Literals(values) => values.iter().any(|v| v == candidate),
        }
    }
}

/// Hands out matchers for one registered category.
#[derive(Debug, Clone)]
pub struct SelectorFactory {
    category: String,
}

impl SelectorFactory {
    pub fn new(category: impl Into<String>) -> Self {
        SelectorFactory {
            category: category.into(),
        }
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    /// Build a matcher from arbitrary match values.
    pub fn matcher<I>(&self, matches: I) -> Result<SelectorMatcher>
    where
        I: IntoIterator<Item = Match>,
    {
        SelectorMatcher::new(&self.category, matches)
    }

    /// Build a matcher accepting the given literal values.
    pub fn literals<I, S>(&self, values: I) -> Result<SelectorMatcher>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        SelectorMatcher::new(
            &self.category,
            values.into_iter().map(|v| Match::Literal(v.into())),
        )
    }

    /// The catch-all matcher for this category.
    pub fn wildcard(&self) -> SelectorMatcher {
        SelectorMatcher {
            category: self.category.clone(),
            set: MatchSet::Wildcard,
        }
    }
}
