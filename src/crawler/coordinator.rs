//! Crawler coordinator - main crawl orchestration logic
//!
//! This module runs a mirror from start to finish:
//! - Opening (and clearing or loading) the progress database
//! - Seeding the frontier with the root, or re-arming in-flight items on resume
//! - Running the page, asset, and save worker pools
//! - Waiting for the outstanding-work counter to drain, or for cancellation
//! - Shutting the pools down and summarizing the run
//!
//! Page and asset queues are unbounded so a page worker never waits to hand
//! off what it discovered. Each pool is a dispatcher that takes one item per
//! free semaphore permit. The save queue is bounded; fetch workers may wait on
//! it, and since save workers never discover anything that wait always ends.

use crate::config::{validate, Config, WorkerConfig};
use crate::crawler::archive::Archive;
use crate::crawler::fetcher::{
    build_http_client, fetch_body, FetchError, FetchedAsset, FetchedItem, FetchedPage,
};
use crate::crawler::parser::extract_links;
use crate::state::{Frontier, FrontierError, ItemKind};
use crate::storage::{SqliteStorage, Storage};
use crate::url::{CanonicalUrl, Scope};
use crate::MirrorError;
use reqwest::Client;
use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Semaphore};
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;

/// A progress line is logged every this many saved items
const PROGRESS_INTERVAL: u64 = 100;

/// Stages a run goes through, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Seeding,
    Running,
    Draining,
    Done,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunPhase::Seeding => "seeding",
            RunPhase::Running => "running",
            RunPhase::Draining => "draining",
            RunPhase::Done => "done",
        };
        f.write_str(name)
    }
}

/// Outcome of a crawl run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlSummary {
    /// The crawl root
    pub root: String,

    /// Items written to the archive, including those from earlier runs
    pub saved: u64,

    /// Items given up on
    pub ignored: u64,

    /// Items left in flight; non-zero only after cancellation
    pub in_flight: u64,

    /// Items re-dispatched from a previous run
    pub rearmed: usize,

    /// True if the run was stopped before the frontier drained
    pub cancelled: bool,

    /// Wall time of the run
    pub elapsed: Duration,
}

impl CrawlSummary {
    /// Returns true if nothing is left to do
    pub fn is_complete(&self) -> bool {
        self.in_flight == 0
    }
}

/// State shared by every worker task
struct Shared {
    scope: Scope,
    frontier: Arc<Frontier>,
    client: Client,
    archive: Archive,
    page_tx: mpsc::UnboundedSender<CanonicalUrl>,
    asset_tx: mpsc::UnboundedSender<CanonicalUrl>,
    save_tx: mpsc::Sender<FetchedItem>,
    saved_this_run: AtomicU64,
}

/// Receiving ends of the work queues, taken by the pools when the run starts
struct Queues {
    pages: mpsc::UnboundedReceiver<CanonicalUrl>,
    assets: mpsc::UnboundedReceiver<CanonicalUrl>,
    saves: mpsc::Receiver<FetchedItem>,
}

/// Main crawler structure
///
/// A `Crawler` is built once and consumed by [`Crawler::run`] or
/// [`Crawler::run_with_cancellation`].
pub struct Crawler {
    shared: Arc<Shared>,
    queues: Queues,
    workers: WorkerConfig,
}

impl Crawler {
    /// Creates a crawler from a configuration
    ///
    /// Opens the progress database if one is configured. A fresh run clears
    /// the records of this site; a resumed run loads them.
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    ///
    /// # Returns
    ///
    /// * `Ok(Crawler)` - Ready to run
    /// * `Err(MirrorError)` - Invalid configuration, storage, archive root or
    ///   HTTP client failure
    pub fn new(config: Config) -> Result<Self, MirrorError> {
        validate(&config)?;
        let scope = build_scope(&config)?;
        let frontier = open_frontier(&config, scope.authority())?;
        Self::assemble(config, scope, Arc::new(frontier))
    }

    /// Creates a crawler around an existing frontier
    ///
    /// The database settings of `config` are not used; the frontier already
    /// carries whatever storage it was built with.
    pub fn with_frontier(config: Config, frontier: Arc<Frontier>) -> Result<Self, MirrorError> {
        validate(&config)?;
        let scope = build_scope(&config)?;
        Self::assemble(config, scope, frontier)
    }

    fn assemble(config: Config, scope: Scope, frontier: Arc<Frontier>) -> Result<Self, MirrorError> {
        let archive = Archive::new(&config.output.archive_root, config.output.gzip);
        archive.prepare()?;
        tracing::info!(
            "Archive root: {} (gzip: {})",
            archive.root().display(),
            archive.gzip()
        );

        let client = build_http_client(&config.http)?;

        let (page_tx, pages) = mpsc::unbounded_channel();
        let (asset_tx, assets) = mpsc::unbounded_channel();
        let (save_tx, saves) = mpsc::channel(config.workers.save_queue_capacity);

        let shared = Arc::new(Shared {
            scope,
            frontier,
            client,
            archive,
            page_tx,
            asset_tx,
            save_tx,
            saved_this_run: AtomicU64::new(0),
        });

        Ok(Self {
            shared,
            queues: Queues {
                pages,
                assets,
                saves,
            },
            workers: config.workers,
        })
    }

    /// Returns the frontier this crawler reports progress to
    pub fn frontier(&self) -> Arc<Frontier> {
        Arc::clone(&self.shared.frontier)
    }

    /// Returns the canonical crawl root
    pub fn root(&self) -> CanonicalUrl {
        self.shared.scope.root()
    }

    /// Runs the crawl until every discovered item is saved or ignored
    pub async fn run(self) -> CrawlSummary {
        self.run_with_cancellation(CancellationToken::new()).await
    }

    /// Runs the crawl until it drains or `cancel` fires
    ///
    /// On cancellation the workers are stopped where they are and their items
    /// stay in flight, so a later run with resume enabled picks them up.
    pub async fn run_with_cancellation(self, cancel: CancellationToken) -> CrawlSummary {
        let started = Instant::now();
        let Crawler {
            shared,
            queues,
            workers,
        } = self;

        enter(RunPhase::Seeding);
        let rearmed = seed(&shared);

        enter(RunPhase::Running);
        tracing::info!(
            "Workers: {} page, {} asset, {} save",
            workers.page_workers,
            workers.asset_workers,
            workers.save_workers
        );

        let stop = cancel.child_token();
        let pools = [
            tokio::spawn(run_pool(
                "page",
                Inbox::Unbounded(queues.pages),
                workers.page_workers,
                stop.clone(),
                {
                    let shared = Arc::clone(&shared);
                    move |url| process_page(Arc::clone(&shared), url)
                },
            )),
            tokio::spawn(run_pool(
                "asset",
                Inbox::Unbounded(queues.assets),
                workers.asset_workers,
                stop.clone(),
                {
                    let shared = Arc::clone(&shared);
                    move |url| process_asset(Arc::clone(&shared), url)
                },
            )),
            tokio::spawn(run_pool(
                "save",
                Inbox::Bounded(queues.saves),
                workers.save_workers,
                stop.clone(),
                {
                    let shared = Arc::clone(&shared);
                    move |item| process_save(Arc::clone(&shared), item)
                },
            )),
        ];

        let cancelled = tokio::select! {
            _ = shared.frontier.await_drain() => false,
            _ = cancel.cancelled() => true,
        };

        enter(RunPhase::Draining);
        if cancelled {
            tracing::warn!(
                "Crawl cancelled with {} items in flight",
                shared.frontier.outstanding()
            );
        }

        stop.cancel();
        for pool in pools {
            if let Err(e) = pool.await {
                report_join_error("dispatcher", e);
            }
        }

        let counts = shared.frontier.counts();
        let summary = CrawlSummary {
            root: shared.scope.root().into_string(),
            saved: counts.saved,
            ignored: counts.ignored,
            in_flight: counts.in_flight,
            rearmed,
            cancelled,
            elapsed: started.elapsed(),
        };

        // Last reference: closes the senders and releases the client and storage
        drop(shared);
        enter(RunPhase::Done);

        summary
    }
}

impl fmt::Debug for Crawler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Crawler")
            .field("root", &self.shared.scope.root())
            .field("include_subdomains", &self.shared.scope.include_subdomains())
            .field("archive", &self.shared.archive)
            .field("frontier", &self.shared.frontier)
            .field("workers", &self.workers)
            .finish()
    }
}

fn enter(phase: RunPhase) {
    tracing::info!("Crawl phase: {}", phase);
}

fn build_scope(config: &Config) -> Result<Scope, MirrorError> {
    Scope::new(&config.crawl.root_url, config.crawl.include_subdomains).map_err(|e| {
        MirrorError::InvalidRoot {
            url: config.crawl.root_url.clone(),
            reason: e.to_string(),
        }
    })
}

/// Opens the configured database and builds the frontier from it
fn open_frontier(config: &Config, site: &str) -> Result<Frontier, MirrorError> {
    let Some(path) = &config.storage.database_path else {
        if config.crawl.resume {
            tracing::warn!("Resume requested without a database, starting fresh");
        } else {
            tracing::info!("No database configured, progress will not be recorded");
        }
        return Ok(Frontier::new(None));
    };

    let storage: Arc<dyn Storage> = Arc::new(SqliteStorage::new(path, site)?);

    if config.crawl.resume {
        let frontier = Frontier::load(storage)?;
        tracing::info!(
            "Resuming {} from {}: {} known URLs, {} in flight",
            site,
            path.display(),
            frontier.len(),
            frontier.outstanding()
        );
        Ok(frontier)
    } else {
        storage.clear()?;
        tracing::info!("Starting fresh crawl of {}", site);
        Ok(Frontier::new(Some(storage)))
    }
}

/// Puts the initial work on the queues, returning how many items were re-armed
fn seed(shared: &Shared) -> usize {
    if shared.frontier.is_empty() {
        let root = shared.scope.root();
        tracing::info!(
            "Seeding frontier with {} (subdomains: {})",
            root,
            shared.scope.include_subdomains()
        );
        shared.discovered(root, ItemKind::Page);
        return 0;
    }

    let pending = shared.frontier.snapshot_in_flight();
    if pending.is_empty() {
        tracing::info!("Nothing left in flight, the mirror is already complete");
        return 0;
    }

    tracing::info!("Re-arming {} in-flight items", pending.len());
    let count = pending.len();
    for (url, kind) in pending {
        rearm(shared, url, kind);
    }
    count
}

/// Re-dispatches an item already recorded as in flight
///
/// This deliberately skips `mark_in_flight`, which would refuse the item
/// since its status cannot advance to the one it already has.
fn rearm(shared: &Shared, url: CanonicalUrl, kind: ItemKind) {
    tracing::debug!("Re-arming {} {}", kind, url);
    shared.dispatch(url, kind);
}

impl Shared {
    /// Normalizes a raw link and dispatches it if it is new
    fn discover(&self, raw: &str, kind: ItemKind) {
        match self.scope.normalize(raw) {
            Ok(url) => self.discovered(url, kind),
            Err(reason) if reason.is_expected() => {}
            Err(reason) => tracing::debug!("Skipping link {:?}: {}", raw, reason),
        }
    }

    fn discovered(&self, url: CanonicalUrl, kind: ItemKind) {
        match self.frontier.mark_in_flight(&url, kind) {
            Ok(()) => {}
            Err(e) if e.is_accepted() => tracing::warn!("{}", e),
            // Seen before
            Err(_) => return,
        }
        self.dispatch(url, kind);
    }

    fn dispatch(&self, url: CanonicalUrl, kind: ItemKind) {
        let queue = match kind {
            ItemKind::Page => &self.page_tx,
            ItemKind::Asset => &self.asset_tx,
        };
        if let Err(e) = queue.send(url) {
            tracing::debug!("{} queue closed, {} stays in flight", kind, e.0);
        }
    }

    async fn enqueue_save(&self, item: FetchedItem) {
        if let Err(e) = self.save_tx.send(item).await {
            tracing::debug!("Save queue closed, {} stays in flight", e.0.url());
        }
    }

    fn fetch_failed(&self, url: &CanonicalUrl, kind: ItemKind, error: &FetchError) {
        if error.is_timeout() {
            tracing::warn!("Timed out fetching {} {}", kind, url);
        } else {
            tracing::warn!("{}", error);
        }
        self.ignore(url, kind);
    }

    fn ignore(&self, url: &CanonicalUrl, kind: ItemKind) {
        match self.frontier.mark_ignored(url, kind) {
            Ok(()) => {}
            Err(e @ FrontierError::Persistence { .. }) => tracing::warn!("{}", e),
            Err(e) => tracing::debug!("Not ignoring: {}", e),
        }
    }

    fn saved(&self, url: &CanonicalUrl, kind: ItemKind, path: PathBuf) {
        match self.frontier.mark_saved(url, kind) {
            Ok(()) => {}
            Err(e @ FrontierError::Persistence { .. }) => tracing::warn!("{}", e),
            Err(e) => {
                tracing::debug!("Not marking saved: {}", e);
                return;
            }
        }

        tracing::debug!("Saved {} to {}", url, path.display());

        let saved = self.saved_this_run.fetch_add(1, Ordering::Relaxed) + 1;
        if saved % PROGRESS_INTERVAL == 0 {
            tracing::info!(
                "Progress: {} saved this run, {} in flight",
                saved,
                self.frontier.outstanding()
            );
        }
    }
}

async fn process_page(shared: Arc<Shared>, url: CanonicalUrl) {
    if url.is_empty() {
        tracing::warn!("Got an empty page URL");
        shared.ignore(&url, ItemKind::Page);
        return;
    }

    let body = match fetch_body(&shared.client, &url).await {
        Ok(body) => body,
        Err(e) => {
            shared.fetch_failed(&url, ItemKind::Page, &e);
            return;
        }
    };

    let links = match extract_links(&body) {
        Ok(links) => links,
        Err(e) => {
            tracing::warn!("Failed to extract links from {}: {}", url, e);
            shared.ignore(&url, ItemKind::Page);
            return;
        }
    };

    // Children must be in flight before this page can be saved, otherwise the
    // counter could reach zero while they are still unregistered
    for link in &links.page_links {
        shared.discover(link, ItemKind::Page);
    }
    for link in &links.asset_links {
        shared.discover(link, ItemKind::Asset);
    }

    tracing::debug!(
        "{}: {} page links, {} asset links",
        url,
        links.page_links.len(),
        links.asset_links.len()
    );

    let page = FetchedPage {
        url,
        body,
        page_links: links.page_links,
        asset_links: links.asset_links,
    };
    shared.enqueue_save(FetchedItem::Page(page)).await;
}

async fn process_asset(shared: Arc<Shared>, url: CanonicalUrl) {
    if url.is_empty() {
        tracing::warn!("Got an empty asset URL");
        shared.ignore(&url, ItemKind::Asset);
        return;
    }

    match fetch_body(&shared.client, &url).await {
        Ok(body) => {
            shared
                .enqueue_save(FetchedItem::Asset(FetchedAsset { url, body }))
                .await;
        }
        Err(e) => {
            shared.fetch_failed(&url, ItemKind::Asset, &e);
        }
    }
}

async fn process_save(shared: Arc<Shared>, item: FetchedItem) {
    let url = item.url().clone();
    let kind = item.kind();

    if shared.frontier.is_saved(&url) {
        tracing::debug!("{} is already saved, skipping", url);
        return;
    }

    let result = shared.archive.write(&url, item.body()).await;
    drop(item);

    match result {
        Ok(path) => shared.saved(&url, kind, path),
        Err(e) => {
            tracing::warn!("Failed to save {}: {}", url, e);
            shared.ignore(&url, kind);
        }
    }
}

/// A queue a pool takes its work from
enum Inbox<T> {
    Unbounded(mpsc::UnboundedReceiver<T>),
    Bounded(mpsc::Receiver<T>),
}

impl<T> Inbox<T> {
    async fn recv(&mut self) -> Option<T> {
        match self {
            Inbox::Unbounded(rx) => rx.recv().await,
            Inbox::Bounded(rx) => rx.recv().await,
        }
    }
}

/// Runs one worker pool until `stop` fires or its queue closes
///
/// At most `workers` handlers run at once. When `stop` fires, handlers still
/// running are aborted; when the queue closes, they are waited for.
async fn run_pool<T, F, Fut>(
    name: &'static str,
    mut inbox: Inbox<T>,
    workers: usize,
    stop: CancellationToken,
    handler: F,
) where
    T: Send + 'static,
    F: Fn(T) -> Fut,
    Fut: Future<Output = ()> + Send + 'static,
{
    let semaphore = Arc::new(Semaphore::new(workers));
    let mut tasks = JoinSet::new();

    loop {
        let permit = tokio::select! {
            biased;
            _ = stop.cancelled() => break,
            Some(result) = tasks.join_next() => {
                if let Err(e) = result {
                    report_join_error(name, e);
                }
                continue;
            }
            permit = Arc::clone(&semaphore).acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => break,
            },
        };

        let item = loop {
            tokio::select! {
                biased;
                _ = stop.cancelled() => break None,
                Some(result) = tasks.join_next() => {
                    if let Err(e) = result {
                        report_join_error(name, e);
                    }
                }
                item = inbox.recv() => break item,
            }
        };

        let Some(item) = item else {
            break;
        };

        let job = handler(item);
        tasks.spawn(async move {
            job.await;
            drop(permit);
        });
    }

    if stop.is_cancelled() {
        let unfinished = tasks.len();
        tasks.shutdown().await;
        tracing::debug!("{} pool stopped, {} workers aborted", name, unfinished);
        return;
    }

    while let Some(result) = tasks.join_next().await {
        if let Err(e) = result {
            report_join_error(name, e);
        }
    }
    tracing::debug!("{} queue closed, pool finished", name);
}

fn report_join_error(name: &str, e: JoinError) {
    if e.is_panic() {
        tracing::error!("A {} worker panicked: {}", name, e);
    }
}
