//! URL handling module for Site-Mirror
//!
//! This module provides the canonical URL key type, link normalization with
//! domain scope checks, and the mapping from canonical URLs to archive paths.

mod domain;
mod normalize;
mod path;

use std::borrow::Borrow;
use std::fmt;
use thiserror::Error;

// Re-export main functions
pub use domain::{extract_authority, extract_domain};
pub use normalize::{normalize, Scope};
pub use path::{map_to_path, PathMappingError};

/// An absolute, query-free URL used as the unique key of a crawl item
///
/// Two links that differ only by query or fragment normalize to the same
/// `CanonicalUrl`. Values produced by [`normalize`] or [`Scope::root`] are
/// always canonical; the `From` conversions trust their input and are meant
/// for values read back from storage.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CanonicalUrl(String);

impl CanonicalUrl {
    /// Returns the URL as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true for the degenerate empty URL
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Consumes the wrapper and returns the inner string
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CanonicalUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for CanonicalUrl {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for CanonicalUrl {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl Borrow<str> for CanonicalUrl {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for CanonicalUrl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Why a discovered link was not accepted into the crawl
///
/// None of these are failures of the crawl itself; they filter links.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RejectReason {
    #[error("Malformed URL: {0}")]
    MalformedUrl(String),

    #[error("Link is a mail link")]
    IsMailLink,

    #[error("Link contains a fragment")]
    IsFragmentOnly,

    #[error("Host {0} is outside the crawl scope")]
    OutOfScope(String),

    #[error("Unsupported URL scheme: {0}")]
    UnsupportedScheme(String),
}

impl RejectReason {
    /// Returns true for rejections that are routine and not worth logging
    pub fn is_expected(&self) -> bool {
        matches!(self, Self::IsMailLink | Self::IsFragmentOnly | Self::OutOfScope(_))
    }
}
