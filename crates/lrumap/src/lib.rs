//! # lrumap
//!
//! Bounded key/value cache that evicts by recency of write.
//!
//! ## Architecture
//! - **Index**: `RwLock`-guarded AHash map, read directly by callers (O(1))
//! - **Recency List**: arena-backed doubly-linked list sorted by write timestamp
//! - **Writer**: one thread owns the list and applies queued writes in FIFO order
//!
//! Because only the writer touches the list, no lock guards its traversal or
//! splicing. `set` only enqueues; `flush` waits until earlier writes land.
//!
//! ```rust,no_run
//! use lrumap::LruMap;
//!
//! let cache = LruMap::new(2)?;
//! cache.set("a", 1);
//! cache.set("b", 2);
//! cache.flush()?;
//! assert_eq!(cache.get("a"), Some(1));
//! cache.close();
//! # Ok::<(), lrumap::Error>(())
//! ```

#![warn(missing_docs)]

mod cache;
mod clock;
mod config;
mod error;
mod index;
mod recency;
mod stats;
mod writer;

pub use cache::LruMap;
pub use clock::{Clock, ManualClock, SystemClock, Timestamp};
pub use config::{CacheConfig, EvictionEnd, DEFAULT_CAPACITY, DEFAULT_QUEUE_DEPTH};
pub use error::{Error, Result};
pub use stats::WriterStats;
pub use writer::DumpEntry;
