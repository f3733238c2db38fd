use parking_lot::Mutex;
use std::{
    collections::{HashMap, VecDeque},
    hash::Hash,
    sync::atomic::{AtomicU64, Ordering},
};
use tracing::debug;

/// Cache acotado con expulsión por orden de inserción (FIFO).
///
/// Las lecturas no reordenan las entradas: la primera clave insertada que
/// siga viva es siempre la próxima en salir. Inserción y expulsión ocurren
/// bajo el mismo lock, así que la capacidad nunca se excede aunque varios
/// guilds escriban a la vez.
#[derive(Debug)]
pub struct BoundedCache<K, V> {
    slots: Mutex<Slots<K, V>>,
    capacity: usize,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

#[derive(Debug)]
struct Slots<K, V> {
    values: HashMap<K, V>,
    order: VecDeque<K>,
}

impl<K, V> BoundedCache<K, V>
where
    K: Clone + Eq + Hash,
    V: Clone,
{
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: Mutex::new(Slots {
                values: HashMap::with_capacity(capacity),
                order: VecDeque::with_capacity(capacity),
            }),
            capacity,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let slots = self.slots.lock();
        match slots.values.get(key) {
            Some(value) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(value.clone())
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Inserta un valor. Devuelve la clave expulsada, si hubo alguna.
    ///
    /// Reemplazar una clave existente conserva su posición original.
    pub fn insert(&self, key: K, value: V) -> Option<K> {
        let mut slots = self.slots.lock();

        if let Some(slot) = slots.values.get_mut(&key) {
            *slot = value;
            return None;
        }

        let mut evicted = None;
        if slots.values.len() >= self.capacity {
            if let Some(oldest) = slots.order.pop_front() {
                slots.values.remove(&oldest);
                self.evictions.fetch_add(1, Ordering::Relaxed);
                debug!("🗑️ Cache lleno, expulsada la entrada más antigua");
                evicted = Some(oldest);
            }
        }

        slots.order.push_back(key.clone());
        slots.values.insert(key, value);
        evicted
    }

    pub fn contains(&self, key: &K) -> bool {
        self.slots.lock().values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.slots.lock().values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Claves en orden de inserción (la más antigua primero).
    pub fn keys(&self) -> Vec<K> {
        self.slots.lock().order.iter().cloned().collect()
    }

    pub fn metrics(&self) -> CacheMetrics {
        CacheMetrics {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}

/// Métricas básicas del cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheMetrics {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

impl CacheMetrics {
    pub fn hit_rate(&self) -> f64 {
        if self.hits + self.misses == 0 {
            0.0
        } else {
            self.hits as f64 / (self.hits + self.misses) as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    #[test]
    fn evicts_oldest_inserted_key_on_overflow() {
        let cache = BoundedCache::new(3);
        cache.insert("a", 1);
        cache.insert("b", 2);
        cache.insert("c", 3);

        let evicted = cache.insert("d", 4);

        assert_eq!(evicted, Some("a"));
        assert_eq!(cache.keys(), vec!["b", "c", "d"]);
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn reads_do_not_reorder_eviction() {
        let cache = BoundedCache::new(2);
        cache.insert("a", 1);
        cache.insert("b", 2);

        // Con LRU esto salvaría a "a"; aquí no.
        assert_eq!(cache.get(&"a"), Some(1));
        cache.insert("c", 3);

        assert!(!cache.contains(&"a"));
        assert!(cache.contains(&"b"));
        assert!(cache.contains(&"c"));
    }

    #[test]
    fn replacing_existing_key_keeps_position_and_size() {
        let cache = BoundedCache::new(2);
        cache.insert("a", 1);
        cache.insert("b", 2);

        assert_eq!(cache.insert("a", 10), None);
        assert_eq!(cache.get(&"a"), Some(10));

        cache.insert("c", 3);
        assert_eq!(cache.keys(), vec!["b", "c"]);
    }

    #[test]
    fn tracks_hits_misses_and_evictions() {
        let cache = BoundedCache::new(1);
        cache.insert(1, "uno");
        cache.get(&1);
        cache.get(&2);
        cache.insert(2, "dos");

        let metrics = cache.metrics();
        assert_eq!(metrics.hits, 1);
        assert_eq!(metrics.misses, 1);
        assert_eq!(metrics.evictions, 1);
        assert!((metrics.hit_rate() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn capacity_holds_under_concurrent_inserts() {
        let cache = Arc::new(BoundedCache::new(50));
        let workers: Vec<_> = (0..8)
            .map(|worker| {
                let cache = cache.clone();
                std::thread::spawn(move || {
                    for i in 0..200 {
                        cache.insert(format!("{worker}-{i}"), i);
                        assert!(cache.len() <= 50);
                    }
                })
            })
            .collect();

        for worker in workers {
            worker.join().unwrap();
        }

        assert_eq!(cache.len(), 50);
        assert_eq!(cache.metrics().evictions, 8 * 200 - 50);
    }
}
