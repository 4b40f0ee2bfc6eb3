//! Arena-backed LRU bookkeeping.
//!
//! Every entry lives in one slot of a `Vec` and sits on two intrusive,
//! index-linked lists:
//!
//! - **recency**: moved to the front on every `get` hit and every `set`.
//!   The tail is the eviction victim.
//! - **age**: moved to the front only when the entry timestamp is refreshed.
//!   Age order therefore equals timestamp order, so an expiry pass can walk
//!   from the tail and stop at the first unexpired entry.
//!
//! Slots of removed entries go onto a free list and are reused.

use std::collections::HashMap;
use std::time::Duration;

use orderline_core::Order;
use tokio::time::Instant;

use super::stats::CacheStats;

/// Index into the slot arena.
type NodeIdx = usize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Links {
    prev: Option<NodeIdx>,
    next: Option<NodeIdx>,
}

/// Head is the newest end, tail the oldest.
#[derive(Debug, Clone, Copy, Default)]
struct Ends {
    head: Option<NodeIdx>,
    tail: Option<NodeIdx>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Chain {
    Recency,
    Age,
}

#[derive(Debug)]
struct CacheNode {
    key: String,
    value: Order,
    stamped_at: Instant,
    recency: Links,
    age: Links,
}

/// Outcome of a single lookup.
#[derive(Debug)]
pub(crate) enum Lookup {
    Hit(Order),
    Miss,
    Expired,
}

/// Index, arena, and both orderings. Guarded by the cache mutex.
#[derive(Debug)]
pub(crate) struct CacheState {
    capacity: usize,
    slots: Vec<CacheNode>,
    free: Vec<NodeIdx>,
    index: HashMap<String, NodeIdx>,
    recency: Ends,
    age: Ends,
    stats: CacheStats,
}

fn is_expired(stamped_at: Instant, now: Instant, ttl: Option<Duration>) -> bool {
    ttl.is_some_and(|ttl| now.saturating_duration_since(stamped_at) > ttl)
}

impl CacheState {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
            index: HashMap::with_capacity(capacity),
            recency: Ends::default(),
            age: Ends::default(),
            stats: CacheStats {
                capacity: capacity as u64,
                ..CacheStats::default()
            },
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.index.len()
    }

    pub(crate) fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.index.len() as u64,
            ..self.stats.clone()
        }
    }

    /// Look up `key`, dropping it if older than `ttl` and promoting it otherwise.
    pub(crate) fn get(&mut self, key: &str, now: Instant, ttl: Option<Duration>) -> Lookup {
        let Some(&idx) = self.index.get(key) else {
            self.stats.misses += 1;
            return Lookup::Miss;
        };

        if is_expired(self.slots[idx].stamped_at, now, ttl) {
            self.remove(idx);
            self.stats.expirations += 1;
            self.stats.misses += 1;
            return Lookup::Expired;
        }

        self.move_to_front(idx, Chain::Recency);
        self.stats.hits += 1;
        Lookup::Hit(self.slots[idx].value.clone())
    }

    /// Insert or refresh `key`. Returns the key evicted to make room, if any.
    pub(crate) fn insert(&mut self, key: String, value: Order, now: Instant) -> Option<String> {
        self.stats.inserts += 1;

        if let Some(&idx) = self.index.get(&key) {
            let node = &mut self.slots[idx];
            node.value = value;
            node.stamped_at = now;
            self.move_to_front(idx, Chain::Recency);
            self.move_to_front(idx, Chain::Age);
            return None;
        }

        let idx = self.allocate(CacheNode {
            key: key.clone(),
            value,
            stamped_at: now,
            recency: Links::default(),
            age: Links::default(),
        });
        self.index.insert(key, idx);
        self.push_front(idx, Chain::Recency);
        self.push_front(idx, Chain::Age);

        if self.index.len() > self.capacity {
            return self.evict_lru();
        }
        None
    }

    /// Warm-load `orders`, stopping once the cache holds `capacity` entries.
    pub(crate) fn load(&mut self, orders: Vec<Order>, now: Instant) -> usize {
        let mut loaded = 0;
        for order in orders {
            if self.index.len() >= self.capacity {
                break;
            }
            self.insert(order.order_uid.clone(), order, now);
            loaded += 1;
        }
        loaded
    }

    /// Drop every entry older than `ttl`, oldest first.
    pub(crate) fn purge_expired(&mut self, now: Instant, ttl: Option<Duration>) -> usize {
        let mut removed = 0;
        while let Some(idx) = self.age.tail {
            if !is_expired(self.slots[idx].stamped_at, now, ttl) {
                break;
            }
            self.remove(idx);
            removed += 1;
        }
        self.stats.expirations += removed as u64;
        removed
    }

    pub(crate) fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.index.clear();
        self.recency = Ends::default();
        self.age = Ends::default();
    }

    fn evict_lru(&mut self) -> Option<String> {
        let idx = self.recency.tail?;
        let (key, _) = self.remove(idx);
        self.stats.evictions += 1;
        Some(key)
    }

    fn allocate(&mut self, node: CacheNode) -> NodeIdx {
        if let Some(idx) = self.free.pop() {
            self.slots[idx] = node;
            idx
        } else {
            self.slots.push(node);
            self.slots.len() - 1
        }
    }

    /// Unlink `idx` from both lists and the index, returning its contents.
    fn remove(&mut self, idx: NodeIdx) -> (String, Order) {
        self.detach(idx, Chain::Recency);
        self.detach(idx, Chain::Age);
        let node = &mut self.slots[idx];
        let key = std::mem::take(&mut node.key);
        let value = std::mem::take(&mut node.value);
        self.index.remove(&key);
        self.free.push(idx);
        (key, value)
    }

    fn links(&self, idx: NodeIdx, chain: Chain) -> Links {
        match chain {
            Chain::Recency => self.slots[idx].recency,
            Chain::Age => self.slots[idx].age,
        }
    }

    fn links_mut(&mut self, idx: NodeIdx, chain: Chain) -> &mut Links {
        match chain {
            Chain::Recency => &mut self.slots[idx].recency,
            Chain::Age => &mut self.slots[idx].age,
        }
    }

    fn ends(&self, chain: Chain) -> Ends {
        match chain {
            Chain::Recency => self.recency,
            Chain::Age => self.age,
        }
    }

    fn ends_mut(&mut self, chain: Chain) -> &mut Ends {
        match chain {
            Chain::Recency => &mut self.recency,
            Chain::Age => &mut self.age,
        }
    }

    fn push_front(&mut self, idx: NodeIdx, chain: Chain) {
        let old_head = self.ends(chain).head;
        *self.links_mut(idx, chain) = Links {
            prev: None,
            next: old_head,
        };
        if let Some(head) = old_head {
            self.links_mut(head, chain).prev = Some(idx);
        }
        let ends = self.ends_mut(chain);
        ends.head = Some(idx);
        if ends.tail.is_none() {
            ends.tail = Some(idx);
        }
    }

    fn detach(&mut self, idx: NodeIdx, chain: Chain) {
        let Links { prev, next } = self.links(idx, chain);
        match prev {
            Some(p) => self.links_mut(p, chain).next = next,
            None => self.ends_mut(chain).head = next,
        }
        match next {
            Some(n) => self.links_mut(n, chain).prev = prev,
            None => self.ends_mut(chain).tail = prev,
        }
        *self.links_mut(idx, chain) = Links::default();
    }

    fn move_to_front(&mut self, idx: NodeIdx, chain: Chain) {
        if self.ends(chain).head == Some(idx) {
            return;
        }
        self.detach(idx, chain);
        self.push_front(idx, chain);
    }

    /// Keys from most to least recently used.
    #[cfg(test)]
    pub(crate) fn keys_by_recency(&self) -> Vec<String> {
        self.walk(Chain::Recency)
    }

    /// Keys from newest to oldest timestamp.
    #[cfg(test)]
    pub(crate) fn keys_by_age(&self) -> Vec<String> {
        self.walk(Chain::Age)
    }

    #[cfg(test)]
    fn walk(&self, chain: Chain) -> Vec<String> {
        let mut keys = Vec::with_capacity(self.index.len());
        let mut cursor = self.ends(chain).head;
        while let Some(idx) = cursor {
            keys.push(self.slots[idx].key.clone());
            cursor = self.links(idx, chain).next;
        }
        keys
    }
}
