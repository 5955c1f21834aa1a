//! The crawl frontier: every discovered URL and how far it has progressed
//!
//! All status changes go through [`Frontier::mark_in_flight`],
//! [`Frontier::mark_saved`] and [`Frontier::mark_ignored`]. A change is only
//! accepted when the new status is strictly greater than the recorded one and
//! the recorded one is not terminal. This both deduplicates discovery and
//! keeps `Saved` and `Ignored` final.
//!
//! Alongside the map the frontier keeps an outstanding-work counter equal to
//! the number of entries currently in flight. The crawl is over when it
//! returns to zero, see [`Frontier::await_drain`].

use crate::state::{ItemKind, ItemStatus};
use crate::storage::{FrontierRecord, Storage, StorageError};
use crate::url::CanonicalUrl;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tokio::sync::watch;

/// A URL tracked by the frontier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierEntry {
    pub url: CanonicalUrl,
    pub kind: ItemKind,
    pub status: ItemStatus,
}

/// Errors returned by frontier transitions
#[derive(Debug, Error)]
pub enum FrontierError {
    /// The URL already has this status or a later one; the transition was refused
    #[error("{url} is already {current}")]
    AlreadyAdvanced { url: String, current: ItemStatus },

    /// The transition was applied in memory but could not be recorded
    #[error("Failed to record {status} for {url}: {source}")]
    Persistence {
        url: String,
        status: ItemStatus,
        #[source]
        source: StorageError,
    },
}

impl FrontierError {
    /// Returns true if the in-memory transition went through despite the error
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Persistence { .. })
    }
}

/// Number of frontier items per status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub in_flight: u64,
    pub ignored: u64,
    pub saved: u64,
}

impl StatusCounts {
    /// Adds one item with the given status
    pub fn add(&mut self, status: ItemStatus, count: u64) {
        match status {
            ItemStatus::InFlight => self.in_flight += count,
            ItemStatus::Ignored => self.ignored += count,
            ItemStatus::Saved => self.saved += count,
        }
    }

    /// Number of items with the given status
    pub fn get(&self, status: ItemStatus) -> u64 {
        match status {
            ItemStatus::InFlight => self.in_flight,
            ItemStatus::Ignored => self.ignored,
            ItemStatus::Saved => self.saved,
        }
    }

    /// Total number of items
    pub fn total(&self) -> u64 {
        self.in_flight + self.ignored + self.saved
    }
}

struct Inner {
    entries: HashMap<CanonicalUrl, FrontierEntry>,
    outstanding: usize,
}

/// Shared record of crawl progress
///
/// A `Frontier` is shared between all workers behind an `Arc`. Every
/// accepted transition is forwarded to the optional [`Storage`] while the
/// frontier lock is held, so the persisted history of a URL is written in the
/// same order it happened.
pub struct Frontier {
    inner: Mutex<Inner>,
    outstanding_tx: watch::Sender<usize>,
    storage: Option<Arc<dyn Storage>>,
}

impl Frontier {
    /// Creates an empty frontier
    ///
    /// With `storage` set to None the crawl is purely in memory and cannot be
    /// resumed.
    pub fn new(storage: Option<Arc<dyn Storage>>) -> Self {
        Self::hydrated(storage, Vec::new())
    }

    /// Creates a frontier from previously recorded items
    ///
    /// Items recorded as in flight count as outstanding work. If a URL appears
    /// more than once, the most advanced status wins.
    pub fn hydrated(storage: Option<Arc<dyn Storage>>, records: Vec<FrontierRecord>) -> Self {
        let mut entries: HashMap<CanonicalUrl, FrontierEntry> = HashMap::new();

        for record in records {
            let newer = entries
                .get(&record.url)
                .map_or(true, |existing| existing.status < record.status);
            if newer {
                entries.insert(
                    record.url.clone(),
                    FrontierEntry {
                        url: record.url,
                        kind: record.kind,
                        status: record.status,
                    },
                );
            }
        }

        let outstanding = entries
            .values()
            .filter(|entry| entry.status == ItemStatus::InFlight)
            .count();
        let (outstanding_tx, _) = watch::channel(outstanding);

        Self {
            inner: Mutex::new(Inner {
                entries,
                outstanding,
            }),
            outstanding_tx,
            storage,
        }
    }

    /// Loads a frontier from storage
    pub fn load(storage: Arc<dyn Storage>) -> Result<Self, StorageError> {
        let records = storage.load()?;
        tracing::debug!("Loaded {} frontier records from storage", records.len());
        Ok(Self::hydrated(Some(storage), records))
    }

    /// Marks a URL as in flight
    ///
    /// Returns `AlreadyAdvanced` if the URL was seen before; callers should
    /// skip it silently, since that is what happens to every link found twice.
    pub fn mark_in_flight(&self, url: &CanonicalUrl, kind: ItemKind) -> Result<(), FrontierError> {
        let mut inner = self.lock();

        inner.outstanding += 1;
        if let Err(e) = Self::advance(&mut inner, url, kind, ItemStatus::InFlight) {
            inner.outstanding -= 1;
            return Err(e);
        }
        self.outstanding_tx.send_replace(inner.outstanding);

        self.persist(url, kind, ItemStatus::InFlight)
    }

    /// Marks a URL as written to the archive
    pub fn mark_saved(&self, url: &CanonicalUrl, kind: ItemKind) -> Result<(), FrontierError> {
        self.finish(url, kind, ItemStatus::Saved)
    }

    /// Marks a URL as given up on
    pub fn mark_ignored(&self, url: &CanonicalUrl, kind: ItemKind) -> Result<(), FrontierError> {
        self.finish(url, kind, ItemStatus::Ignored)
    }

    /// Returns true only if the URL's status is exactly `Saved`
    ///
    /// An ignored URL is not considered saved.
    pub fn is_saved(&self, url: &CanonicalUrl) -> bool {
        self.status_of(url) == Some(ItemStatus::Saved)
    }

    /// Returns the current status of a URL, if it is known
    pub fn status_of(&self, url: &CanonicalUrl) -> Option<ItemStatus> {
        self.lock().entries.get(url).map(|entry| entry.status)
    }

    /// Returns every in-flight item, sorted by URL
    pub fn snapshot_in_flight(&self) -> Vec<(CanonicalUrl, ItemKind)> {
        let inner = self.lock();
        let mut items: Vec<_> = inner
            .entries
            .values()
            .filter(|entry| entry.status == ItemStatus::InFlight)
            .map(|entry| (entry.url.clone(), entry.kind))
            .collect();
        items.sort_by(|a, b| a.0.cmp(&b.0));
        items
    }

    /// Waits until no item is in flight any more
    pub async fn await_drain(&self) {
        let mut rx = self.outstanding_tx.subscribe();
        // The sender lives as long as `self`, so the channel cannot close here
        let _ = rx.wait_for(|outstanding| *outstanding == 0).await;
    }

    /// Number of items currently in flight
    pub fn outstanding(&self) -> usize {
        self.lock().outstanding
    }

    /// Number of known URLs
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Returns true if no URL has been recorded yet
    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    /// Counts known URLs per status
    pub fn counts(&self) -> StatusCounts {
        let inner = self.lock();
        let mut counts = StatusCounts::default();
        for entry in inner.entries.values() {
            counts.add(entry.status, 1);
        }
        counts
    }

    fn finish(
        &self,
        url: &CanonicalUrl,
        kind: ItemKind,
        status: ItemStatus,
    ) -> Result<(), FrontierError> {
        let mut inner = self.lock();

        let previous = Self::advance(&mut inner, url, kind, status)?;
        if previous == Some(ItemStatus::InFlight) {
            inner.outstanding = inner.outstanding.saturating_sub(1);
            self.outstanding_tx.send_replace(inner.outstanding);
        }

        self.persist(url, kind, status)
    }

    /// Applies a transition to the map, returning the previous status
    fn advance(
        inner: &mut Inner,
        url: &CanonicalUrl,
        kind: ItemKind,
        status: ItemStatus,
    ) -> Result<Option<ItemStatus>, FrontierError> {
        if let Some(entry) = inner.entries.get(url) {
            if !entry.status.can_advance_to(status) {
                return Err(FrontierError::AlreadyAdvanced {
                    url: url.to_string(),
                    current: entry.status,
                });
            }
        }

        let previous = inner.entries.insert(
            url.clone(),
            FrontierEntry {
                url: url.clone(),
                kind,
                status,
            },
        );
        Ok(previous.map(|entry| entry.status))
    }

    fn persist(
        &self,
        url: &CanonicalUrl,
        kind: ItemKind,
        status: ItemStatus,
    ) -> Result<(), FrontierError> {
        let Some(storage) = &self.storage else {
            return Ok(());
        };

        storage
            .record_transition(url, kind, status)
            .map_err(|source| FrontierError::Persistence {
                url: url.to_string(),
                status,
                source,
            })
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // Every update leaves the map consistent, so a poisoned lock is still usable
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for Frontier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("Frontier")
            .field("entries", &inner.entries.len())
            .field("outstanding", &inner.outstanding)
            .field("persistent", &self.storage.is_some())
            .finish()
    }
}
