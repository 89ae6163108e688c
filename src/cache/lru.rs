//! Bounded least-recently-used cache.

use std::collections::HashMap;
use std::collections::hash_map::RandomState;
use std::fmt;
use std::hash::{BuildHasher, Hash};

use serde::Serialize;
use tracing::trace;

/// Null link in the access-order list.
const NIL: usize = usize::MAX;

/// Slot in the node arena. Free slots hold no entry.
struct Node<K, V> {
    entry: Option<(K, V)>,
    prev: usize,
    next: usize,
}

/// Hit/miss/eviction counters for one cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LruStats {
    pub hits: u64,
    pub misses: u64,
    pub insertions: u64,
    pub updates: u64,
    pub evictions: u64,
    pub removals: u64,
}

impl LruStats {
    /// Fraction of lookups that hit. 0.0 when nothing was looked up.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Fixed-capacity cache evicting the least recently used key.
///
/// A hash index maps each key to a slot in a node arena; the slots form a
/// doubly-linked list ordered from most recently used (head) to least
/// recently used (tail). Every key in the index has exactly one linked node
/// and every linked node has exactly one index entry.
///
/// `get`, `put` and `remove` are O(1) amortized. Access order is the order
/// of calls; there are no ties.
///
/// The hasher is pluggable so that identity-keyed caches can use
/// [`IdentityBuildHasher`](crate::identity::IdentityBuildHasher) and
/// composite-keyed caches can use `FxBuildHasher`.
pub struct BoundedLruCache<K, V, S = RandomState> {
    capacity: usize,
    index: HashMap<K, usize, S>,
    nodes: Vec<Node<K, V>>,
    free: Vec<usize>,
    head: usize,
    tail: usize,
    stats: LruStats,
}

impl<K, V> BoundedLruCache<K, V, RandomState>
where
    K: Hash + Eq + Clone,
{
    /// Create a cache holding at most `capacity` keys.
    ///
    /// A capacity of 0 is treated as 1; `CacheConfig::validate` rejects it
    /// before it gets here.
    pub fn new(capacity: usize) -> Self {
        Self::with_hasher(capacity, RandomState::new())
    }
}

impl<K, V, S> BoundedLruCache<K, V, S>
where
    K: Hash + Eq + Clone,
    S: BuildHasher,
{
    pub fn with_hasher(capacity: usize, hasher: S) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            index: HashMap::with_capacity_and_hasher(capacity + 1, hasher),
            nodes: Vec::with_capacity(capacity + 1),
            free: Vec::new(),
            head: NIL,
            tail: NIL,
            stats: LruStats::default(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn stats(&self) -> LruStats {
        self.stats
    }

    /// Look up `key`, promoting it to most recently used on a hit.
    ///
    /// Absence is `None`, never a default value: a cached `0` is a hit.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        match self.index.get(key) {
            Some(&idx) => {
                self.stats.hits += 1;
                self.move_to_front(idx);
                self.nodes[idx].entry.as_ref().map(|(_, value)| value)
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    /// Look up `key` without touching its recency or the stats.
    pub fn peek(&self, key: &K) -> Option<&V> {
        self.index
            .get(key)
            .and_then(|&idx| self.nodes[idx].entry.as_ref())
            .map(|(_, value)| value)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    /// Insert or overwrite `key`, placing it at the most recently used end.
    ///
    /// When the insertion takes the cache over capacity, the least recently
    /// used entry is evicted and returned.
    pub fn put(&mut self, key: K, value: V) -> Option<(K, V)> {
        if let Some(&idx) = self.index.get(&key) {
            self.nodes[idx].entry = Some((key, value));
            self.move_to_front(idx);
            self.stats.updates += 1;
            return None;
        }

        let idx = self.alloc(key.clone(), value);
        self.index.insert(key, idx);
        self.push_front(idx);
        self.stats.insertions += 1;

        if self.index.len() > self.capacity {
            return self.evict_lru();
        }
        None
    }

    /// Remove `key` if present. Removing an absent key is a no-op.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let idx = self.index.remove(key)?;
        self.unlink(idx);
        self.free.push(idx);
        self.stats.removals += 1;
        self.nodes[idx].entry.take().map(|(_, value)| value)
    }

    /// Drop every entry and reset the stats.
    pub fn clear(&mut self) {
        self.index.clear();
        self.nodes.clear();
        self.free.clear();
        self.head = NIL;
        self.tail = NIL;
        self.stats = LruStats::default();
    }

    /// Entries from most to least recently used.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            nodes: &self.nodes,
            cursor: self.head,
        }
    }

    fn alloc(&mut self, key: K, value: V) -> usize {
        let node = Node {
            entry: Some((key, value)),
            prev: NIL,
            next: NIL,
        };
        match self.free.pop() {
            Some(idx) => {
                self.nodes[idx] = node;
                idx
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        }
    }

    fn evict_lru(&mut self) -> Option<(K, V)> {
        let idx = self.tail;
        if idx == NIL {
            return None;
        }
        self.unlink(idx);
        self.free.push(idx);

        let (key, value) = self.nodes[idx].entry.take()?;
        self.index.remove(&key);
        self.stats.evictions += 1;
        trace!(capacity = self.capacity, "evicted least recently used entry");

        Some((key, value))
    }

    fn move_to_front(&mut self, idx: usize) {
        if self.head == idx {
            return;
        }
        self.unlink(idx);
        self.push_front(idx);
    }

    fn push_front(&mut self, idx: usize) {
        self.nodes[idx].prev = NIL;
        self.nodes[idx].next = self.head;
        if self.head != NIL {
            self.nodes[self.head].prev = idx;
        } else {
            self.tail = idx;
        }
        self.head = idx;
    }

    fn unlink(&mut self, idx: usize) {
        let prev = self.nodes[idx].prev;
        let next = self.nodes[idx].next;

        if prev != NIL {
            self.nodes[prev].next = next;
        } else {
            self.head = next;
        }

        if next != NIL {
            self.nodes[next].prev = prev;
        } else {
            self.tail = prev;
        }

        self.nodes[idx].prev = NIL;
        self.nodes[idx].next = NIL;
    }
}

/// Iterator over cache entries, most recently used first.
pub struct Iter<'a, K, V> {
    nodes: &'a [Node<K, V>],
    cursor: usize,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor == NIL {
            return None;
        }
        let node = &self.nodes[self.cursor];
        self.cursor = node.next;
        node.entry.as_ref().map(|(key, value)| (key, value))
    }
}

impl<K, V, S> fmt::Debug for BoundedLruCache<K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundedLruCache")
            .field("capacity", &self.capacity)
            .field("len", &self.index.len())
            .field("stats", &self.stats)
            .finish()
    }
}
