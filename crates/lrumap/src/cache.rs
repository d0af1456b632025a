//! LruMap: public handle over the index and the writer thread

use std::fmt;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot, Notify};
use tracing::{debug, trace, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::CacheConfig;
use crate::error::{Error, Result};
use crate::index::Index;
use crate::stats::WriterStats;
use crate::writer::{Command, DumpEntry, MutationRequest, Writer};

/// Bounded write-recency cache.
///
/// Reads go straight to a concurrent index. Writes are queued to a dedicated
/// writer thread that owns the recency list, so `set` returns before the
/// write is visible. Use [`flush`](Self::flush) to wait for queued writes.
///
/// # Lifecycle
/// 1. Create with `new()` - starts the writer thread
/// 2. `get` / `set` from any number of threads
/// 3. `close()` (or drop) - stops and joins the writer
///
/// After `close`, `set` is a no-op and `get` always returns `None`.
///
/// `flush`, `snapshot` and `debug_dump` block the calling thread. Inside an
/// async runtime they return [`Error::InsideRuntime`]; use the `*_async`
/// forms there.
pub struct LruMap<V> {
    /// Shared with the writer, which is its only mutator
    index: Arc<Index<V>>,

    /// Queue into the writer; `None` once closed. Submitters only read it.
    sender: RwLock<Option<mpsc::Sender<Command<V>>>>,

    /// Writer thread handle, taken on close
    writer: Mutex<Option<JoinHandle<()>>>,

    shutdown: Arc<Notify>,
    closed: AtomicBool,
    stats: Arc<WriterStats>,
    config: CacheConfig,
}

impl<V> LruMap<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Create a cache holding at most `capacity` entries
    ///
    /// # Errors
    /// * `Error::InvalidCapacity` if capacity is 0
    /// * `Error::Io` if the writer thread cannot be started
    pub fn new(capacity: usize) -> Result<Self> {
        Self::with_config(CacheConfig::new(capacity))
    }

    /// Create a cache from a full configuration
    pub fn with_config(config: CacheConfig) -> Result<Self> {
        Self::with_clock(config, SystemClock)
    }

    /// Create a cache whose writer stamps entries from `clock`
    pub fn with_clock<C: Clock>(config: CacheConfig, clock: C) -> Result<Self> {
        config.validate()?;

        let index = Arc::new(Index::with_capacity(config.capacity));
        let stats = Arc::new(WriterStats::new());
        let shutdown = Arc::new(Notify::new());
        let (sender, receiver) = mpsc::channel(config.queue_depth);

        let writer = Writer::new(
            index.clone(),
            config.capacity,
            config.eviction,
            Box::new(clock),
            stats.clone(),
        );

        let runtime = tokio::runtime::Builder::new_current_thread().build()?;
        let writer_shutdown = shutdown.clone();
        let handle = std::thread::Builder::new()
            .name("lrumap-writer".to_string())
            .spawn(move || runtime.block_on(writer.run(receiver, writer_shutdown)))?;

        Ok(Self {
            index,
            sender: RwLock::new(Some(sender)),
            writer: Mutex::new(Some(handle)),
            shutdown,
            closed: AtomicBool::new(false),
            stats,
            config,
        })
    }

    /// Look up a key without waiting on the writer
    pub fn get(&self, key: &str) -> Option<V> {
        if self.is_closed() {
            return None;
        }
        self.index.lookup(key)
    }

    /// Queue a write. Blocks while the queue is full; no-op after close.
    ///
    /// Inside an async runtime it cannot block, so a full queue drops the
    /// write as `try_set` would. Prefer [`set_async`](Self::set_async) there.
    pub fn set(&self, key: impl Into<String>, value: V) {
        let Some(sender) = self.sender() else {
            trace!("set on closed cache ignored");
            return;
        };

        if in_runtime() {
            if let Err(TrySendError::Full(_)) = sender.try_send(Self::request(key, value)) {
                self.stats.record_rejected();
                warn!(
                    depth = self.config.queue_depth,
                    "set inside runtime on full queue, write dropped"
                );
            }
            return;
        }

        if sender.blocking_send(Self::request(key, value)).is_err() {
            trace!("writer stopped, set dropped");
        }
    }

    /// Queue a write from async code. No-op after close.
    pub async fn set_async(&self, key: impl Into<String>, value: V) {
        let Some(sender) = self.sender() else {
            return;
        };

        if sender.send(Self::request(key, value)).await.is_err() {
            trace!("writer stopped, set dropped");
        }
    }

    /// Queue a write without blocking
    ///
    /// # Errors
    /// * `Error::QueueFull` if the queue is saturated (the write is dropped)
    /// * `Error::Closed` if the cache has been closed
    pub fn try_set(&self, key: impl Into<String>, value: V) -> Result<()> {
        let sender = self.sender().ok_or(Error::Closed)?;

        match sender.try_send(Self::request(key, value)) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                self.stats.record_rejected();
                warn!(depth = self.config.queue_depth, "mutation queue full, write rejected");
                Err(Error::QueueFull)
            }
            Err(TrySendError::Closed(_)) => Err(Error::Closed),
        }
    }

    /// Wait until every write queued before this call has been applied
    ///
    /// # Errors
    /// * `Error::Closed` if the cache is closed before the writer gets there
    /// * `Error::InsideRuntime` if called from async code
    pub fn flush(&self) -> Result<()> {
        let sender = self.blocking_sender()?;
        let (done, applied) = oneshot::channel();

        sender
            .blocking_send(Command::Flush(done))
            .map_err(|_| Error::Closed)?;
        applied.blocking_recv().map_err(|_| Error::Closed)
    }

    /// Async form of [`flush`](Self::flush)
    pub async fn flush_async(&self) -> Result<()> {
        let sender = self.sender().ok_or(Error::Closed)?;
        let (done, applied) = oneshot::channel();

        sender
            .send(Command::Flush(done))
            .await
            .map_err(|_| Error::Closed)?;
        applied.await.map_err(|_| Error::Closed)
    }

    /// Entries from oldest to newest write, as seen by the writer after
    /// every earlier write
    ///
    /// # Errors
    /// * `Error::Closed` if the cache is closed
    /// * `Error::InsideRuntime` if called from async code
    pub fn snapshot(&self) -> Result<Vec<DumpEntry<V>>> {
        let sender = self.blocking_sender()?;
        let (reply, entries) = oneshot::channel();

        sender
            .blocking_send(Command::Snapshot(reply))
            .map_err(|_| Error::Closed)?;
        entries.blocking_recv().map_err(|_| Error::Closed)
    }

    /// Async form of [`snapshot`](Self::snapshot)
    pub async fn snapshot_async(&self) -> Result<Vec<DumpEntry<V>>> {
        let sender = self.sender().ok_or(Error::Closed)?;
        let (reply, entries) = oneshot::channel();

        sender
            .send(Command::Snapshot(reply))
            .await
            .map_err(|_| Error::Closed)?;
        entries.await.map_err(|_| Error::Closed)
    }

    /// Write one `key value timestamp` line per entry, oldest first, then a
    /// blank line. For humans; the format is not stable.
    ///
    /// # Errors
    /// As [`snapshot`](Self::snapshot), plus `Error::Io` from `out`
    pub fn debug_dump<W: Write>(&self, out: W) -> Result<()>
    where
        V: fmt::Debug,
    {
        write_dump(self.snapshot()?, out)
    }

    /// Async form of [`debug_dump`](Self::debug_dump)
    pub async fn debug_dump_async<W: Write>(&self, out: W) -> Result<()>
    where
        V: fmt::Debug,
    {
        write_dump(self.snapshot_async().await?, out)
    }

    /// Number of live entries (0 after close)
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Check if the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn sender(&self) -> Option<mpsc::Sender<Command<V>>> {
        self.sender.read().clone()
    }

    fn blocking_sender(&self) -> Result<mpsc::Sender<Command<V>>> {
        if in_runtime() {
            return Err(Error::InsideRuntime);
        }
        self.sender().ok_or(Error::Closed)
    }

    fn request(key: impl Into<String>, value: V) -> Command<V> {
        Command::Set(MutationRequest {
            key: key.into(),
            value,
        })
    }
}

impl<V> LruMap<V> {
    /// Get cache capacity
    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    /// Active configuration
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Writer counters
    pub fn stats(&self) -> &WriterStats {
        &self.stats
    }

    /// Check if `close` has run
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Stop the writer and drop every entry. Queued writes that the writer
    /// has not reached are discarded. Safe to call more than once.
    pub fn close(&self) {
        let Some(sender) = self.sender.write().take() else {
            return;
        };

        self.closed.store(true, Ordering::Release);
        self.shutdown.notify_one();
        drop(sender);

        if let Some(handle) = self.writer.lock().take() {
            if handle.join().is_err() {
                warn!("writer thread panicked");
                self.index.clear();
            }
        }

        debug!("cache closed");
    }
}

/// True on a thread driving a tokio runtime, where blocking calls panic
fn in_runtime() -> bool {
    tokio::runtime::Handle::try_current().is_ok()
}

fn write_dump<V: fmt::Debug, W: Write>(entries: Vec<DumpEntry<V>>, mut out: W) -> Result<()> {
    for entry in entries {
        writeln!(out, "{} {:?} {}", entry.key, entry.value, entry.timestamp)?;
    }
    writeln!(out)?;
    Ok(())
}

impl<V> Drop for LruMap<V> {
    fn drop(&mut self) {
        self.close();
    }
}
