//! Storage module for persisting crawl progress
//!
//! This module handles everything that makes a crawl resumable:
//! - The `Storage` contract the frontier writes its transitions through
//! - The SQLite implementation of that contract
//! - Schema creation

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::state::{ItemKind, ItemStatus};
use crate::url::CanonicalUrl;

/// A persisted frontier item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierRecord {
    pub url: CanonicalUrl,
    pub kind: ItemKind,
    pub status: ItemStatus,
}
