//! Configuration module for Site-Mirror
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use site_mirror::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("mirror.toml")).unwrap();
//! println!("Page workers: {}", config.workers.page_workers);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlConfig, HttpConfig, OutputConfig, StorageConfig, WorkerConfig,
    DEFAULT_SAVE_QUEUE_CAPACITY, DEFAULT_WORKERS,
};

// Re-export parser functions
pub use parser::{load_config, parse_config, read_config};
pub use validation::validate;
