//! Single writer: the only code that mutates the index and the recency list.
//!
//! Requests arrive over a bounded FIFO channel and are applied one at a time,
//! so both structures are consistent between any two requests.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, Notify};
use tracing::{debug, trace};

use crate::clock::{Clock, Timestamp};
use crate::config::EvictionEnd;
use crate::index::Index;
use crate::recency::{Node, RecencyList};
use crate::stats::WriterStats;

/// A queued write, consumed exactly once
#[derive(Debug)]
pub(crate) struct MutationRequest<V> {
    pub(crate) key: String,
    pub(crate) value: V,
}

/// Messages accepted by the writer
pub(crate) enum Command<V> {
    Set(MutationRequest<V>),
    /// Acknowledged once every earlier command has been applied
    Flush(oneshot::Sender<()>),
    Snapshot(oneshot::Sender<Vec<DumpEntry<V>>>),
}

/// One entry of a recency dump, oldest first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpEntry<V> {
    /// Entry key
    pub key: String,
    /// Current value
    pub value: V,
    /// Last write instant
    pub timestamp: Timestamp,
}

pub(crate) struct Writer<V> {
    index: Arc<Index<V>>,
    list: RecencyList,
    count: usize,
    max: usize,
    eviction: EvictionEnd,
    clock: Box<dyn Clock>,
    stats: Arc<WriterStats>,
}

impl<V> Writer<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub(crate) fn new(
        index: Arc<Index<V>>,
        max: usize,
        eviction: EvictionEnd,
        clock: Box<dyn Clock>,
        stats: Arc<WriterStats>,
    ) -> Self {
        Self {
            index,
            list: RecencyList::with_capacity(max),
            count: 0,
            max,
            eviction,
            clock,
            stats,
        }
    }

    /// Drain commands until shutdown is signalled or every sender is gone.
    /// Commands still queued at that point are dropped.
    pub(crate) async fn run(mut self, mut rx: mpsc::Receiver<Command<V>>, shutdown: Arc<Notify>) {
        debug!(capacity = self.max, eviction = ?self.eviction, "writer started");

        loop {
            tokio::select! {
                biased;

                _ = shutdown.notified() => break,

                command = rx.recv() => match command {
                    Some(command) => self.handle(command),
                    None => break,
                },
            }
        }

        let dropped = rx.len();
        self.index.clear();
        self.list.clear();
        self.count = 0;

        debug!(dropped, "writer stopped");
    }

    fn handle(&mut self, command: Command<V>) {
        match command {
            Command::Set(request) => self.apply(request),
            Command::Flush(done) => {
                let _ = done.send(());
            }
            Command::Snapshot(reply) => {
                let _ = reply.send(self.snapshot());
            }
        }
    }

    /// Apply one write: refresh an existing key or insert a new one,
    /// evicting first when the cache is full.
    pub(crate) fn apply(&mut self, request: MutationRequest<V>) {
        let MutationRequest { key, value } = request;
        let now = self.clock.now();

        if let Some(handle) = self.index.handle(&key) {
            self.index.replace(&key, value);
            self.list.reposition(handle, now);
            self.stats.record_update();
            trace!(%key, timestamp = now, "updated");
        } else {
            let evicted = if self.count >= self.max {
                self.evict()
            } else {
                self.count += 1;
                None
            };

            let handle = self.list.insert(key.clone(), now);
            trace!(%key, timestamp = now, "inserted");
            match evicted {
                // One index step: readers never see the cache one entry short
                Some(node) => {
                    self.index.swap(&node.key, key, handle, value);
                    debug!(key = %node.key, timestamp = node.timestamp, "evicted");
                }
                None => self.index.store(key, handle, value),
            }
            self.stats.record_insert();
        }

        debug_assert!(self.list.is_ordered(), "recency list out of order");
        debug_assert_eq!(self.count, self.list.len());
        debug_assert_eq!(self.count, self.index.len());
    }

    /// Unlink the victim from the list; the caller drops it from the index
    fn evict(&mut self) -> Option<Node> {
        let victim = match self.eviction {
            EvictionEnd::Oldest => self.list.oldest(),
            EvictionEnd::Newest => self.list.newest(),
        };

        let node = victim.and_then(|handle| self.list.remove(handle))?;
        self.stats.record_eviction();
        Some(node)
    }

    /// Oldest-to-newest view of the live entries
    pub(crate) fn snapshot(&self) -> Vec<DumpEntry<V>> {
        self.list
            .iter()
            .filter_map(|(_, node)| {
                self.index.lookup(&node.key).map(|value| DumpEntry {
                    key: node.key.clone(),
                    value,
                    timestamp: node.timestamp,
                })
            })
            .collect()
    }

    #[cfg(test)]
    fn count(&self) -> usize {
        self.count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn writer(max: usize, eviction: EvictionEnd) -> (Writer<i32>, ManualClock) {
        let clock = ManualClock::new(100);
        let writer = Writer::new(
            Arc::new(Index::with_capacity(max)),
            max,
            eviction,
            Box::new(clock.clone()),
            Arc::new(WriterStats::new()),
        );
        (writer, clock)
    }

    fn set(writer: &mut Writer<i32>, clock: &ManualClock, key: &str, value: i32) {
        clock.advance(1);
        writer.apply(MutationRequest {
            key: key.to_string(),
            value,
        });
    }

    fn keys(writer: &Writer<i32>) -> Vec<String> {
        writer.snapshot().into_iter().map(|e| e.key).collect()
    }

    #[test]
    fn test_apply_insert() {
        let (mut w, clock) = writer(4, EvictionEnd::Oldest);

        set(&mut w, &clock, "a", 1);
        set(&mut w, &clock, "b", 2);

        assert_eq!(w.count(), 2);
        assert_eq!(w.index.lookup("a"), Some(1));
        assert_eq!(keys(&w), ["a", "b"]);
        assert_eq!(w.stats.inserts(), 2);
    }

    #[test]
    fn test_apply_update_moves_to_newest() {
        let (mut w, clock) = writer(4, EvictionEnd::Oldest);

        set(&mut w, &clock, "a", 1);
        set(&mut w, &clock, "b", 2);
        set(&mut w, &clock, "a", 3);

        assert_eq!(w.count(), 2);
        assert_eq!(w.index.lookup("a"), Some(3));
        assert_eq!(keys(&w), ["b", "a"]);

        let newest = w.snapshot().pop().unwrap();
        assert_eq!(newest.timestamp, clock.now());
        assert_eq!(w.stats.updates(), 1);
    }

    #[test]
    fn test_evict_oldest() {
        let (mut w, clock) = writer(2, EvictionEnd::Oldest);

        set(&mut w, &clock, "a", 1);
        set(&mut w, &clock, "b", 2);
        set(&mut w, &clock, "a", 3);
        set(&mut w, &clock, "c", 4);

        assert_eq!(w.count(), 2);
        assert_eq!(w.index.lookup("a"), Some(3));
        assert_eq!(w.index.lookup("b"), None);
        assert_eq!(w.index.lookup("c"), Some(4));
        assert_eq!(keys(&w), ["a", "c"]);
        assert_eq!(w.stats.evictions(), 1);
    }

    #[test]
    fn test_evict_newest() {
        let (mut w, clock) = writer(2, EvictionEnd::Newest);

        set(&mut w, &clock, "a", 1);
        set(&mut w, &clock, "b", 2);
        set(&mut w, &clock, "a", 3);
        set(&mut w, &clock, "c", 4);

        // "a" was rewritten last, so it sits at the newest end
        assert_eq!(w.count(), 2);
        assert_eq!(w.index.lookup("a"), None);
        assert_eq!(w.index.lookup("b"), Some(2));
        assert_eq!(keys(&w), ["b", "c"]);
    }

    #[test]
    fn test_apply_with_backwards_clock() {
        let (mut w, clock) = writer(8, EvictionEnd::Oldest);

        set(&mut w, &clock, "a", 1);
        set(&mut w, &clock, "b", 2);
        clock.set(50);
        w.apply(MutationRequest {
            key: "early".into(),
            value: 0,
        });

        assert_eq!(keys(&w), ["early", "a", "b"]);
        assert!(w.list.is_ordered());
    }

    #[test]
    fn test_capacity_one() {
        let (mut w, clock) = writer(1, EvictionEnd::Oldest);

        for (i, key) in ["a", "b", "c"].iter().enumerate() {
            set(&mut w, &clock, key, i as i32);
        }

        assert_eq!(w.count(), 1);
        assert_eq!(keys(&w), ["c"]);
        assert_eq!(w.stats.evictions(), 2);
    }
}
