/// Status and kind definitions for tracking crawl progress
///
/// This module defines the lifecycle statuses a frontier item moves through
/// and the two kinds of items the crawler handles.
use std::fmt;

/// Which pipeline an item belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    /// An HTML page: fetched, scanned for links, saved
    Page,

    /// A static resource (stylesheet, script): fetched and saved
    Asset,
}

impl ItemKind {
    /// Converts the kind to its database code
    pub fn to_db_code(&self) -> i64 {
        match self {
            Self::Page => 1,
            Self::Asset => 2,
        }
    }

    /// Parses a kind from its database code
    ///
    /// Returns None if the code doesn't match any known kind.
    pub fn from_db_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Self::Page),
            2 => Some(Self::Asset),
            _ => None,
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Page => write!(f, "page"),
            Self::Asset => write!(f, "asset"),
        }
    }
}

/// Lifecycle status of a frontier item
///
/// The variants are ordered: a URL may only move to a strictly greater
/// status. `Ignored` and `Saved` are both terminal and exclude each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ItemStatus {
    /// Discovered and handed to a worker, not finished yet
    InFlight = 1,

    /// Given up on after an unrecoverable failure
    Ignored = 2,

    /// Written to the archive
    Saved = 3,
}

impl ItemStatus {
    /// Returns true if no further transition is possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ignored | Self::Saved)
    }

    /// Returns true if moving from `self` to `next` is allowed
    ///
    /// Only a non-terminal status can move, and only forward.
    pub fn can_advance_to(&self, next: ItemStatus) -> bool {
        !self.is_terminal() && next > *self
    }

    /// Converts the status to its database code
    pub fn to_db_code(&self) -> i64 {
        *self as i64
    }

    /// Parses a status from its database code
    pub fn from_db_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Self::InFlight),
            2 => Some(Self::Ignored),
            3 => Some(Self::Saved),
            _ => None,
        }
    }

    /// Returns all statuses in lattice order
    pub fn all_statuses() -> [Self; 3] {
        [Self::InFlight, Self::Ignored, Self::Saved]
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InFlight => write!(f, "in-flight"),
            Self::Ignored => write!(f, "ignored"),
            Self::Saved => write!(f, "saved"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_order() {
        assert!(ItemStatus::InFlight < ItemStatus::Ignored);
        assert!(ItemStatus::Ignored < ItemStatus::Saved);
    }

    #[test]
    fn test_can_advance_only_upwards() {
        assert!(ItemStatus::InFlight.can_advance_to(ItemStatus::Saved));
        assert!(ItemStatus::InFlight.can_advance_to(ItemStatus::Ignored));
        assert!(!ItemStatus::InFlight.can_advance_to(ItemStatus::InFlight));
        assert!(!ItemStatus::Saved.can_advance_to(ItemStatus::Ignored));
        assert!(!ItemStatus::Saved.can_advance_to(ItemStatus::InFlight));
        assert!(!ItemStatus::Ignored.can_advance_to(ItemStatus::Saved));
        assert!(!ItemStatus::Ignored.can_advance_to(ItemStatus::InFlight));
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!ItemStatus::InFlight.is_terminal());
        assert!(ItemStatus::Ignored.is_terminal());
        assert!(ItemStatus::Saved.is_terminal());
    }

    #[test]
    fn test_status_db_codes() {
        assert_eq!(ItemStatus::InFlight.to_db_code(), 1);
        assert_eq!(ItemStatus::Ignored.to_db_code(), 2);
        assert_eq!(ItemStatus::Saved.to_db_code(), 3);
        for status in ItemStatus::all_statuses() {
            assert_eq!(ItemStatus::from_db_code(status.to_db_code()), Some(status));
        }
        assert_eq!(ItemStatus::from_db_code(0), None);
        assert_eq!(ItemStatus::from_db_code(4), None);
    }

    #[test]
    fn test_kind_db_codes() {
        assert_eq!(ItemKind::from_db_code(1), Some(ItemKind::Page));
        assert_eq!(ItemKind::from_db_code(2), Some(ItemKind::Asset));
        assert_eq!(ItemKind::from_db_code(7), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(ItemStatus::InFlight.to_string(), "in-flight");
        assert_eq!(ItemKind::Asset.to_string(), "asset");
    }
}
