//! Cache configuration

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default number of live entries
pub const DEFAULT_CAPACITY: usize = 1024;

/// Default number of pending mutation requests before `set` blocks
pub const DEFAULT_QUEUE_DEPTH: usize = 200;

/// Which end of the recency list gives up an entry when the cache is full
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvictionEnd {
    /// Evict the entry with the oldest write timestamp
    #[default]
    Oldest,

    /// Evict the entry with the newest write timestamp
    Newest,
}

/// Configuration for an [`LruMap`](crate::LruMap).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of live entries.
    pub capacity: usize,

    /// Bounded mutation queue depth.
    pub queue_depth: usize,

    /// Eviction end used when a new key arrives at capacity.
    pub eviction: EvictionEnd,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            queue_depth: DEFAULT_QUEUE_DEPTH,
            eviction: EvictionEnd::Oldest,
        }
    }
}

impl CacheConfig {
    /// Default configuration with the given capacity
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    /// Set the mutation queue depth
    pub fn with_queue_depth(mut self, queue_depth: usize) -> Self {
        self.queue_depth = queue_depth;
        self
    }

    /// Set the eviction end
    pub fn with_eviction(mut self, eviction: EvictionEnd) -> Self {
        self.eviction = eviction;
        self
    }

    /// Validate the configuration.
    ///
    /// # Errors
    /// * `Error::InvalidCapacity` if capacity is 0
    /// * `Error::InvalidQueueDepth` if queue depth is 0
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(Error::InvalidCapacity(self.capacity));
        }
        if self.queue_depth == 0 {
            return Err(Error::InvalidQueueDepth(self.queue_depth));
        }
        Ok(())
    }
}
