use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Default size of each worker pool
pub const DEFAULT_WORKERS: usize = 150;

/// Default capacity of the queue between fetch workers and save workers
pub const DEFAULT_SAVE_QUEUE_CAPACITY: usize = 128;

/// Main configuration structure for Site-Mirror
///
/// Every section and field has a default, so a config file only needs to name
/// what it changes. Command-line flags are applied on top.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawl: CrawlConfig,
    pub workers: WorkerConfig,
    pub output: OutputConfig,
    pub storage: StorageConfig,
    pub http: HttpConfig,
}

impl Config {
    /// Creates a default configuration crawling `root_url`
    pub fn for_root(root_url: impl Into<String>) -> Self {
        let mut config = Self::default();
        config.crawl.root_url = root_url.into();
        config
    }
}

/// What to crawl
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlConfig {
    /// The address the crawl starts from
    pub root_url: String,

    /// Follow links to hosts that contain the root host
    pub include_subdomains: bool,

    /// Continue from recorded progress instead of starting over
    pub resume: bool,
}

/// Worker pool sizes
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct WorkerConfig {
    /// Concurrent page fetches
    pub page_workers: usize,

    /// Concurrent asset fetches
    pub asset_workers: usize,

    /// Concurrent archive writes
    pub save_workers: usize,

    /// Fetched items waiting for a save worker before fetchers block
    pub save_queue_capacity: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            page_workers: DEFAULT_WORKERS,
            asset_workers: DEFAULT_WORKERS,
            save_workers: DEFAULT_WORKERS,
            save_queue_capacity: DEFAULT_SAVE_QUEUE_CAPACITY,
        }
    }
}

impl WorkerConfig {
    /// Sets the same size for the page and asset pools
    pub fn set_fetch_workers(&mut self, count: usize) {
        self.page_workers = count;
        self.asset_workers = count;
    }
}

/// Where and how the archive is written
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Root directory of the archive
    pub archive_root: PathBuf,

    /// Gzip every file and add a `.gz` suffix
    pub gzip: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            archive_root: PathBuf::from("./result/"),
            gzip: true,
        }
    }
}

/// Progress persistence
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct StorageConfig {
    /// SQLite database file; without one the crawl runs in memory only
    pub database_path: Option<PathBuf>,
}

/// HTTP client settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct HttpConfig {
    /// User-Agent header sent with every request
    pub user_agent: String,

    /// Connection establishment timeout, in seconds
    pub connect_timeout_secs: u64,

    /// Timeout of a single request including the body, in seconds
    pub request_timeout_secs: u64,

    /// TCP keepalive interval, in seconds
    pub keepalive_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("site-mirror/{}", env!("CARGO_PKG_VERSION")),
            connect_timeout_secs: 15,
            request_timeout_secs: 30,
            keepalive_secs: 180,
        }
    }
}

impl HttpConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn keepalive(&self) -> Duration {
        Duration::from_secs(self.keepalive_secs)
    }
}
