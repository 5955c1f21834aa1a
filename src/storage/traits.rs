//! Storage traits and error types
//!
//! This module defines the contract a persistence backend has to satisfy for
//! a crawl to be resumable, and the associated error types.

use crate::state::{ItemKind, ItemStatus};
use crate::storage::FrontierRecord;
use crate::url::CanonicalUrl;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// The frontier calls these methods synchronously while holding its own lock,
/// so implementations must be thread-safe and should be quick. Failed writes
/// are never retried by the caller.
pub trait Storage: Send + Sync {
    /// Returns every recorded (url, kind, status) triple
    fn load(&self) -> StorageResult<Vec<FrontierRecord>>;

    /// Records a status transition
    ///
    /// The first transition of a URL inserts it; later ones update its status.
    fn record_transition(
        &self,
        url: &CanonicalUrl,
        kind: ItemKind,
        status: ItemStatus,
    ) -> StorageResult<()>;

    /// Discards every record, for a fresh crawl into a used archive
    fn clear(&self) -> StorageResult<()>;
}
