//! State fingerprint and result cache (§4.E).
//!
//! The fingerprint is a 32-byte blake3 digest over the marking's sorted,
//! quantized `(place_id, value)` pairs; near-zero components are omitted so
//! zero-valued and absent places are indistinguishable, and insertion order
//! never affects the result.

use std::collections::{HashMap, VecDeque};

use parking_lot::RwLock;

use crate::problem::Marking;

pub const DEFAULT_QUANTUM: f64 = 1_000_000.0;
const EPSILON: f64 = 1e-9;

/// Fixed-width fingerprint of a (quantized) marking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(pub [u8; 32]);

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

mod hex {
    pub fn encode(bytes: [u8; 32]) -> String {
        bytes.iter().map(|b| format!("{b:02x}")).collect()
    }
}

/// Deterministic fingerprint of `marking` (§4.E / §8 invariant 3).
pub fn fingerprint(marking: &Marking) -> Fingerprint {
    fingerprint_with_quantum(marking, DEFAULT_QUANTUM)
}

pub fn fingerprint_with_quantum(marking: &Marking, quantum: f64) -> Fingerprint {
    let mut pairs: Vec<(&str, i64)> = marking
        .iter()
        .filter(|(_, &v)| v.abs() >= EPSILON)
        .map(|(k, &v)| (k.as_str(), (v * quantum).round() as i64))
        .collect();
    pairs.sort_by(|a, b| a.0.cmp(b.0));

    let mut hasher = blake3::Hasher::new();
    for (id, q) in pairs {
        hasher.update(id.as_bytes());
        hasher.update(&q.to_be_bytes());
    }
    Fingerprint(*hasher.finalize().as_bytes())
}

/// A cached score plus optional full final marking, used by the hypothesis
/// evaluator and the reachability explorer's visited set.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub score: f64,
    pub final_marking: Option<Marking>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub size: usize,
    pub evictions: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Concurrent-safe, unbounded fingerprint → [`CacheEntry`] map. At-most-once
/// `Put` semantics: a racing second insert for the same fingerprint may
/// overwrite or no-op; callers must not depend on which.
#[derive(Default)]
pub struct UnboundedCache {
    inner: RwLock<HashMap<Fingerprint, CacheEntry>>,
    hits: std::sync::atomic::AtomicU64,
    misses: std::sync::atomic::AtomicU64,
}

impl UnboundedCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, fp: &Fingerprint) -> Option<CacheEntry> {
        let found = self.inner.read().get(fp).cloned();
        use std::sync::atomic::Ordering::Relaxed;
        if found.is_some() {
            self.hits.fetch_add(1, Relaxed);
        } else {
            self.misses.fetch_add(1, Relaxed);
        }
        found
    }

    pub fn put(&self, fp: Fingerprint, entry: CacheEntry) {
        self.inner.write().insert(fp, entry);
    }

    pub fn clear(&self) {
        self.inner.write().clear();
        use std::sync::atomic::Ordering::Relaxed;
        self.hits.store(0, Relaxed);
        self.misses.store(0, Relaxed);
    }

    pub fn stats(&self) -> CacheStats {
        use std::sync::atomic::Ordering::Relaxed;
        CacheStats {
            hits: self.hits.load(Relaxed),
            misses: self.misses.load(Relaxed),
            size: self.inner.read().len(),
            evictions: 0,
        }
    }
}

/// LRU cache with O(1) lookup and eviction. `Get` promotes the entry to
/// most-recently-used, so it takes the write lock even on a read — document
/// this contract at every call site rather than pretending `Get` is pure.
pub struct LruCache {
    capacity: usize,
    inner: RwLock<LruInner>,
    hits: std::sync::atomic::AtomicU64,
    misses: std::sync::atomic::AtomicU64,
    evictions: std::sync::atomic::AtomicU64,
}

struct LruInner {
    entries: HashMap<Fingerprint, CacheEntry>,
    // Recency queue, most-recently-used at the back. A fingerprint may
    // appear more than once; staleness is resolved on promotion/pop.
    order: VecDeque<Fingerprint>,
}

impl LruCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: RwLock::new(LruInner { entries: HashMap::new(), order: VecDeque::new() }),
            hits: std::sync::atomic::AtomicU64::new(0),
            misses: std::sync::atomic::AtomicU64::new(0),
            evictions: std::sync::atomic::AtomicU64::new(0),
        }
    }

    pub fn get(&self, fp: &Fingerprint) -> Option<CacheEntry> {
        use std::sync::atomic::Ordering::Relaxed;
        let mut guard = self.inner.write();
        let found = guard.entries.get(fp).cloned();
        if found.is_some() {
            guard.order.retain(|f| f != fp);
            guard.order.push_back(*fp);
            self.hits.fetch_add(1, Relaxed);
        } else {
            self.misses.fetch_add(1, Relaxed);
        }
        found
    }

    pub fn put(&self, fp: Fingerprint, entry: CacheEntry) {
        use std::sync::atomic::Ordering::Relaxed;
        let mut guard = self.inner.write();
        if guard.entries.contains_key(&fp) {
            guard.order.retain(|f| f != &fp);
        }
        guard.entries.insert(fp, entry);
        guard.order.push_back(fp);

        while guard.entries.len() > self.capacity {
            if let Some(evicted) = guard.order.pop_front() {
                guard.entries.remove(&evicted);
                self.evictions.fetch_add(1, Relaxed);
                tracing::debug!(fingerprint = %evicted, "evicted cache entry");
            } else {
                break;
            }
        }
    }

    pub fn clear(&self) {
        use std::sync::atomic::Ordering::Relaxed;
        let mut guard = self.inner.write();
        guard.entries.clear();
        guard.order.clear();
        self.hits.store(0, Relaxed);
        self.misses.store(0, Relaxed);
        self.evictions.store(0, Relaxed);
    }

    pub fn stats(&self) -> CacheStats {
        use std::sync::atomic::Ordering::Relaxed;
        CacheStats {
            hits: self.hits.load(Relaxed),
            misses: self.misses.load(Relaxed),
            size: self.inner.read().entries.len(),
            evictions: self.evictions.load(Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marking(pairs: &[(&str, f64)]) -> Marking {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn fingerprint_is_order_independent() {
        let m1 = marking(&[("A", 1.0), ("B", 2.0)]);
        let m2 = marking(&[("B", 2.0), ("A", 1.0)]);
        assert_eq!(fingerprint(&m1), fingerprint(&m2));
    }

    #[test]
    fn fingerprint_ignores_near_zero_components() {
        let m1 = marking(&[("A", 1.0), ("B", 1e-12)]);
        let m2 = marking(&[("A", 1.0)]);
        assert_eq!(fingerprint(&m1), fingerprint(&m2));
    }

    #[test]
    fn fingerprint_changes_with_a_quantum_difference() {
        let m1 = marking(&[("A", 1.0)]);
        let m2 = marking(&[("A", 1.0 + 2.0 / DEFAULT_QUANTUM)]);
        assert_ne!(fingerprint(&m1), fingerprint(&m2));
    }

    #[test]
    fn unbounded_cache_hit_count() {
        let cache = UnboundedCache::new();
        let fp = fingerprint(&marking(&[("A", 1.0)]));
        assert!(cache.get(&fp).is_none());
        cache.put(fp, CacheEntry { score: 1.0, final_marking: None });
        assert!(cache.get(&fp).is_some());
        assert!(cache.get(&fp).is_some());
        let stats = cache.stats();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.size, 1);
    }

    #[test]
    fn lru_evicts_oldest() {
        let cache = LruCache::new(2);
        let f1 = fingerprint(&marking(&[("A", 1.0)]));
        let f2 = fingerprint(&marking(&[("A", 2.0)]));
        let f3 = fingerprint(&marking(&[("A", 3.0)]));
        cache.put(f1, CacheEntry { score: 1.0, final_marking: None });
        cache.put(f2, CacheEntry { score: 2.0, final_marking: None });
        cache.put(f3, CacheEntry { score: 3.0, final_marking: None });
        let stats = cache.stats();
        assert_eq!(stats.size, 2);
        assert!(cache.get(&f1).is_none());
        assert!(cache.get(&f2).is_some());
        assert!(cache.get(&f3).is_some());
    }

    #[test]
    fn lru_get_promotes_entry() {
        let cache = LruCache::new(2);
        let f1 = fingerprint(&marking(&[("A", 1.0)]));
        let f2 = fingerprint(&marking(&[("A", 2.0)]));
        let f3 = fingerprint(&marking(&[("A", 3.0)]));
        cache.put(f1, CacheEntry { score: 1.0, final_marking: None });
        cache.put(f2, CacheEntry { score: 2.0, final_marking: None });
        // Touch f1 so it becomes most-recently-used.
        assert!(cache.get(&f1).is_some());
        cache.put(f3, CacheEntry { score: 3.0, final_marking: None });
        assert!(cache.get(&f1).is_some(), "f1 should survive eviction after promotion");
        assert!(cache.get(&f2).is_none(), "f2 should have been evicted instead");
    }
}
