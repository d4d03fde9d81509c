use ahash::RandomState;
use parking_lot::Mutex;
use slab::Slab;
use std::{borrow::Borrow, collections::HashMap, fmt, hash::Hash, sync::Arc};

/// Computes the weight of a cached value, see [`LruCache::with_weigher`].
pub type Weigher<V> = Arc<dyn Fn(&V) -> usize + Send + Sync + 'static>;

/// Callback invoked for every evicted or rejected entry,
/// see [`LruCache::with_eviction_listener`].
pub type EvictionListener<K, V> = Arc<dyn Fn(&K, &V) + Send + Sync + 'static>;

/// A bounded, thread-safe, least-recently-used cache.
///
/// Every entry has a weight (1 by default, or computed by a [`Weigher`]).
/// The sum of all weights never exceeds the capacity of the cache:
/// after every [`put`] entries are evicted from the least recently used end
/// until the cache fits again. An item whose own weight is equal to or larger
/// than the capacity is never stored, it is reported to the eviction listener
/// instead.
///
/// Both [`get`] and [`put`] mark the touched entry as most recently used,
/// [`contains_key`] does not.
///
/// All methods take `&self`, the cache can be shared between threads as-is.
/// Eviction listeners are invoked after the internal lock is released.
///
/// [`get`]: LruCache::get
/// [`put`]: LruCache::put
/// [`contains_key`]: LruCache::contains_key
pub struct LruCache<K, V> {
    state: Mutex<State<K, V>>,
    weigher: Option<Weigher<V>>,
    eviction_listener: Option<EvictionListener<K, V>>,
}

struct State<K, V> {
    map: HashMap<K, usize, RandomState>,
    entries: Slab<Entry<K, V>>,
    /// least recently used
    head: Option<usize>,
    /// most recently used
    tail: Option<usize>,
    used: usize,
    base_capacity: usize,
    capacity: usize,
}

struct Entry<K, V> {
    key: K,
    value: V,
    weight: usize,
    prev: Option<usize>,
    next: Option<usize>,
}

impl<K, V> LruCache<K, V> {
    /// Capacity used when a cache is created with a capacity of `0`.
    pub const DEFAULT_CAPACITY: usize = 30;

    /// Upper bound of the amount of entries allocated up front.
    pub const MAX_INITIAL_CAPACITY: usize = 1024;
}

impl<K, V> LruCache<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    /// Create a new [`LruCache`] which can hold a total weight of `capacity`.
    ///
    /// A `capacity` of `0` is replaced by [`LruCache::DEFAULT_CAPACITY`].
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self::with_initial_capacity(capacity, Self::DEFAULT_CAPACITY)
    }

    /// Create a new [`LruCache`] which can hold a total weight of `capacity`,
    /// pre-allocating room for `initial_capacity` entries.
    ///
    /// The capacity is a weight budget, not an entry count, so the
    /// pre-allocation never exceeds [`LruCache::MAX_INITIAL_CAPACITY`] entries.
    #[must_use]
    pub fn with_initial_capacity(capacity: usize, initial_capacity: usize) -> Self {
        let capacity = if capacity == 0 {
            Self::DEFAULT_CAPACITY
        } else {
            capacity
        };
        let initial_capacity = initial_capacity
            .min(capacity)
            .min(Self::MAX_INITIAL_CAPACITY);
        Self {
            state: Mutex::new(State {
                map: HashMap::with_capacity_and_hasher(initial_capacity, RandomState::new()),
                entries: Slab::with_capacity(initial_capacity),
                head: None,
                tail: None,
                used: 0,
                base_capacity: capacity,
                capacity,
            }),
            weigher: None,
            eviction_listener: None,
        }
    }

    /// Use the given function to compute the weight of each value,
    /// instead of counting every entry as 1.
    #[must_use]
    pub fn with_weigher(mut self, weigher: impl Fn(&V) -> usize + Send + Sync + 'static) -> Self {
        self.weigher = Some(Arc::new(weigher));
        self
    }

    /// Get notified of every entry that is evicted, cleared or rejected by this cache.
    #[must_use]
    pub fn with_eviction_listener(
        mut self,
        listener: impl Fn(&K, &V) + Send + Sync + 'static,
    ) -> Self {
        self.eviction_listener = Some(Arc::new(listener));
        self
    }

    /// Returns a clone of the value cached for `key`,
    /// marking it as the most recently used entry.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut state = self.state.lock();
        let idx = state.map.get(key).copied()?;
        state.touch(idx);
        Some(state.entries[idx].value.clone())
    }

    /// Returns `true` if a value is cached for `key`.
    ///
    /// Unlike [`LruCache::get`] this does not change the eviction order.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.state.lock().map.contains_key(key)
    }

    /// Insert `value` for `key`, returning the value it replaced, if any.
    ///
    /// If the weight of `value` is equal to or larger than the capacity
    /// the value is not stored, any existing value for `key` is kept,
    /// and the pair is passed to the eviction listener.
    pub fn put(&self, key: K, value: V) -> Option<V> {
        let weight = self.weight_of(&value);
        let mut evicted = Vec::new();

        let previous = {
            let mut state = self.state.lock();
            if weight >= state.capacity {
                drop(state);
                self.notify_evicted(std::iter::once((key, value)));
                return None;
            }

            let previous = match state.map.get(&key).copied() {
                Some(idx) => {
                    let entry = &mut state.entries[idx];
                    let old_weight = std::mem::replace(&mut entry.weight, weight);
                    let old_value = std::mem::replace(&mut entry.value, value);
                    state.used = state.used - old_weight + weight;
                    state.touch(idx);
                    Some(old_value)
                }
                None => {
                    let idx = state.entries.insert(Entry {
                        key: key.clone(),
                        value,
                        weight,
                        prev: None,
                        next: None,
                    });
                    state.map.insert(key, idx);
                    state.used += weight;
                    state.push_back(idx);
                    None
                }
            };

            let capacity = state.capacity;
            state.trim_to(capacity, &mut evicted);
            previous
        };

        self.notify_evicted(evicted);
        previous
    }

    /// Remove the entry for `key`, returning its value.
    ///
    /// Removed entries are not reported to the eviction listener.
    pub fn remove<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut state = self.state.lock();
        let idx = state.map.get(key).copied()?;
        Some(state.unlink(idx).value)
    }

    /// Rescale the capacity to `multiplier` times the capacity
    /// this cache was created with, evicting entries that no longer fit.
    ///
    /// Negative (and NaN) multipliers are treated as `0`.
    pub fn set_capacity_multiplier(&self, multiplier: f64) {
        let multiplier = multiplier.max(0.0);
        let mut evicted = Vec::new();
        {
            let mut state = self.state.lock();
            state.capacity = (state.base_capacity as f64 * multiplier).round() as usize;
            let capacity = state.capacity;
            state.trim_to(capacity, &mut evicted);
        }
        self.notify_evicted(evicted);
    }

    /// Evict all entries, passing each of them to the eviction listener.
    pub fn clear(&self) {
        let mut evicted = Vec::new();
        {
            let mut state = self.state.lock();
            while let Some(idx) = state.head {
                let entry = state.unlink(idx);
                evicted.push((entry.key, entry.value));
            }
        }
        self.notify_evicted(evicted);
    }

    /// Amount of entries currently cached.
    pub fn len(&self) -> usize {
        self.state.lock().map.len()
    }

    /// Returns `true` if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.state.lock().map.is_empty()
    }

    /// Sum of the weights of all cached entries.
    pub fn used_size(&self) -> usize {
        self.state.lock().used
    }

    /// Maximum total weight this cache currently accepts.
    pub fn capacity(&self) -> usize {
        self.state.lock().capacity
    }

    fn weight_of(&self, value: &V) -> usize {
        self.weigher.as_ref().map_or(1, |weigher| weigher(value))
    }

    fn notify_evicted(&self, evicted: impl IntoIterator<Item = (K, V)>) {
        if let Some(listener) = self.eviction_listener.as_ref() {
            for (key, value) in evicted {
                listener(&key, &value);
            }
        }
    }
}

impl<K, V> State<K, V>
where
    K: Hash + Eq,
{
    fn detach(&mut self, idx: usize) {
        let (prev, next) = {
            let entry = &self.entries[idx];
            (entry.prev, entry.next)
        };
        match prev {
            Some(prev) => self.entries[prev].next = next,
            None => self.head = next,
        }
        match next {
            Some(next) => self.entries[next].prev = prev,
            None => self.tail = prev,
        }
        let entry = &mut self.entries[idx];
        entry.prev = None;
        entry.next = None;
    }

    fn push_back(&mut self, idx: usize) {
        let tail = self.tail;
        {
            let entry = &mut self.entries[idx];
            entry.prev = tail;
            entry.next = None;
        }
        match tail {
            Some(tail) => self.entries[tail].next = Some(idx),
            None => self.head = Some(idx),
        }
        self.tail = Some(idx);
    }

    fn touch(&mut self, idx: usize) {
        if self.tail != Some(idx) {
            self.detach(idx);
            self.push_back(idx);
        }
    }

    fn unlink(&mut self, idx: usize) -> Entry<K, V> {
        self.detach(idx);
        let entry = self.entries.remove(idx);
        self.map.remove(&entry.key);
        self.used -= entry.weight;
        entry
    }

    fn trim_to(&mut self, size: usize, evicted: &mut Vec<(K, V)>) {
        while self.used > size {
            let Some(idx) = self.head else {
                break;
            };
            let entry = self.unlink(idx);
            evicted.push((entry.key, entry.value));
        }
    }
}

impl<K, V> fmt::Debug for LruCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("LruCache")
            .field("len", &state.map.len())
            .field("used", &state.used)
            .field("capacity", &state.capacity)
            .field("weigher", &self.weigher.is_some())
            .field("eviction_listener", &self.eviction_listener.is_some())
            .finish()
    }
}
