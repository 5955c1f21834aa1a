//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `ItemKind` / `ItemStatus`: what an item is and how far it has progressed
//! - `Frontier`: the shared map of every discovered URL plus the
//!   outstanding-work counter that decides when a crawl is finished

mod frontier;
mod item_status;

// Re-export main types
pub use frontier::{Frontier, FrontierEntry, FrontierError, StatusCounts};
pub use item_status::{ItemKind, ItemStatus};
