//! Recency list ordered by write timestamp
//!
//! Nodes live in an arena addressed by [`Handle`]; links are handles, never
//! owning references. Freed slots are recycled through a free list.

use crate::clock::Timestamp;

/// Stable arena position of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct Handle(usize);

/// Node in the recency list
#[derive(Debug)]
pub(crate) struct Node {
    pub(crate) key: String,
    pub(crate) timestamp: Timestamp,
    prev: Option<Handle>,
    next: Option<Handle>,
}

/// Doubly-linked chain, `root` is the oldest write and `last` the newest
#[derive(Debug, Default)]
pub(crate) struct RecencyList {
    nodes: Vec<Option<Node>>,
    free_list: Vec<usize>,
    root: Option<Handle>,
    last: Option<Handle>,
    len: usize,
}

impl RecencyList {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
            ..Self::default()
        }
    }

    /// Create a node and splice it into timestamp order
    pub(crate) fn insert(&mut self, key: String, timestamp: Timestamp) -> Handle {
        let handle = self.alloc_node();
        self.nodes[handle.0] = Some(Node {
            key,
            timestamp,
            prev: None,
            next: None,
        });
        self.link(handle);
        self.len += 1;
        handle
    }

    /// Splice a node out and release its slot
    pub(crate) fn remove(&mut self, handle: Handle) -> Option<Node> {
        self.node(handle)?;
        self.unlink(handle);
        self.len -= 1;
        self.free_list.push(handle.0);
        self.nodes[handle.0].take()
    }

    /// Restamp a node and move it to its new position
    pub(crate) fn reposition(&mut self, handle: Handle, timestamp: Timestamp) {
        if self.node(handle).is_none() {
            return;
        }

        self.unlink(handle);
        if let Some(node) = self.node_mut(handle) {
            node.timestamp = timestamp;
        }
        self.link(handle);
    }

    pub(crate) fn oldest(&self) -> Option<Handle> {
        self.root
    }

    pub(crate) fn newest(&self) -> Option<Handle> {
        self.last
    }

    /// Iterate from oldest to newest
    pub(crate) fn iter(&self) -> Iter<'_> {
        Iter {
            list: self,
            cursor: self.root,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn clear(&mut self) {
        self.nodes.clear();
        self.free_list.clear();
        self.root = None;
        self.last = None;
        self.len = 0;
    }

    /// True when timestamps never decrease from `root` to `last` and the
    /// back links agree with the forward links.
    pub(crate) fn is_ordered(&self) -> bool {
        let mut prev: Option<Handle> = None;
        let mut prev_ts = Timestamp::MIN;
        let mut seen = 0;

        let mut cursor = self.root;
        while let Some(handle) = cursor {
            let Some(node) = self.node(handle) else {
                return false;
            };
            if node.prev != prev || node.timestamp < prev_ts {
                return false;
            }
            prev = Some(handle);
            prev_ts = node.timestamp;
            seen += 1;
            cursor = node.next;
        }

        prev == self.last && seen == self.len
    }

    fn node(&self, handle: Handle) -> Option<&Node> {
        self.nodes.get(handle.0).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, handle: Handle) -> Option<&mut Node> {
        self.nodes.get_mut(handle.0).and_then(Option::as_mut)
    }

    /// Place an unlinked node before the first node with a strictly greater
    /// timestamp, or at `last` if there is none. Walking back from `last`
    /// lands on the same position and stops at once for in-order writes.
    fn link(&mut self, handle: Handle) {
        let Some(timestamp) = self.node(handle).map(|node| node.timestamp) else {
            return;
        };

        let mut after = self.last;
        while let Some(candidate) = after {
            match self.node(candidate) {
                Some(node) if node.timestamp > timestamp => after = node.prev,
                _ => break,
            }
        }

        // `after` is the last node with timestamp <= ours, `before` its successor
        let before = match after {
            Some(prev_handle) => self.node(prev_handle).and_then(|node| node.next),
            None => self.root,
        };

        if let Some(node) = self.node_mut(handle) {
            node.prev = after;
            node.next = before;
        }

        match after {
            Some(prev_handle) => {
                if let Some(prev_node) = self.node_mut(prev_handle) {
                    prev_node.next = Some(handle);
                }
            }
            None => self.root = Some(handle),
        }

        match before {
            Some(next_handle) => {
                if let Some(next_node) = self.node_mut(next_handle) {
                    next_node.prev = Some(handle);
                }
            }
            None => self.last = Some(handle),
        }
    }

    fn unlink(&mut self, handle: Handle) {
        let (prev, next) = match self.node_mut(handle) {
            Some(node) => (node.prev.take(), node.next.take()),
            None => return,
        };

        match prev {
            Some(prev_handle) => {
                if let Some(prev_node) = self.node_mut(prev_handle) {
                    prev_node.next = next;
                }
            }
            None => {
                self.root = next;
            }
        }

        match next {
            Some(next_handle) => {
                if let Some(next_node) = self.node_mut(next_handle) {
                    next_node.prev = prev;
                }
            }
            None => {
                self.last = prev;
            }
        }
    }

    fn alloc_node(&mut self) -> Handle {
        if let Some(idx) = self.free_list.pop() {
            Handle(idx)
        } else {
            let idx = self.nodes.len();
            self.nodes.push(None);
            Handle(idx)
        }
    }
}

/// Oldest-to-newest iterator over `(handle, node)`
pub(crate) struct Iter<'a> {
    list: &'a RecencyList,
    cursor: Option<Handle>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (Handle, &'a Node);

    fn next(&mut self) -> Option<Self::Item> {
        let handle = self.cursor?;
        let node = self.list.node(handle)?;
        self.cursor = node.next;
        Some((handle, node))
    }
}
