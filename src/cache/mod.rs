//! Memoizing cache store and its context bindings.
//!
//! [`MemoCache`] wraps a single `K -> V` loader function with a concurrent,
//! write-once-per-key result table: the first [`get`](MemoCache::get) for a
//! key runs the loader, every later `get` for that key returns the stored
//! value. There is no capacity bound, expiry, or eviction — entries live as
//! long as the store does, which is typically one request.
//!
//! Stores are usually not handled directly. [`Context::with_cache`] binds a
//! loader into a request context, and [`Context::cached_fn`] /
//! [`Context::cached_fn_or`] recover a [`CachedFn`] handle from anywhere the
//! context (or a descendant of it) is visible:
//!
//! ```
//! use memoctx::Context;
//!
//! let ctx = Context::new().with_cache("square", |n: u64| n * n);
//!
//! let square = ctx.cached_fn::<u64, u64>("square").unwrap();
//! assert_eq!(square.call(12), 144); // computed
//! assert_eq!(square.call(12), 144); // served from the cache
//! ```
//!
//! ## Concurrency
//!
//! One reader/writer lock guards each store. Hits take the lock shared, so
//! concurrent hits proceed in parallel. The entire miss path — presence
//! re-check, loader invocation, insert — runs under the exclusive lock and
//! is serialized across *all* keys of the store, which collapses concurrent
//! misses on the same key into a single loader run but also makes the store
//! a throughput bottleneck under heavy miss concurrency on distinct keys.
//! Callers needing per-key miss throughput should shard work across several
//! stores bound under different ids.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use ahash::RandomState;
use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::context::{BindingId, Context};

/// Hit/miss counters for a single [`MemoCache`].
///
/// Counters are updated with relaxed atomics; readings taken while other
/// threads are actively calling [`MemoCache::get`] are best-effort.
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CacheStats {
    fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of calls answered from the table.
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Number of calls that ran the loader.
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Fraction of calls answered from the table, `0.0` to `1.0`.
    ///
    /// Returns `0.0` before any call has been recorded.
    pub fn hit_ratio(&self) -> f64 {
        let hits = self.hits();
        let total = hits + self.misses();
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }
}

/// A memoizing key-value store backed by a single loader function.
///
/// Every entry in the table was produced by exactly one invocation of the
/// loader for that key, and the table never holds a key without a fully
/// computed value. The first computed value for a key is permanent: if the
/// loader is impure, later behavior for an already-cached key is never
/// observed.
///
/// # Examples
///
/// ```
/// use memoctx::MemoCache;
///
/// let cache = MemoCache::new(|name: String| name.len());
/// assert_eq!(cache.get("hello".to_string()), 5);
/// assert_eq!(cache.get("hello".to_string()), 5);
/// assert_eq!(cache.len(), 1);
/// assert_eq!(cache.stats().misses(), 1);
/// assert_eq!(cache.stats().hits(), 1);
/// ```
pub struct MemoCache<K, V> {
    data: RwLock<HashMap<K, V, RandomState>>,
    loader: Box<dyn Fn(K) -> V + Send + Sync>,
    stats: CacheStats,
}

impl<K, V> MemoCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Creates an empty store that computes missing entries with `loader`.
    ///
    /// The loader is fixed for the lifetime of the store and is assumed
    /// total for the keys it receives; see [`get`](Self::get) for how loader
    /// panics are handled.
    pub fn new<F>(loader: F) -> Self
    where
        F: Fn(K) -> V + Send + Sync + 'static,
    {
        Self {
            data: RwLock::new(HashMap::default()),
            loader: Box::new(loader),
            stats: CacheStats::default(),
        }
    }

    /// Returns the value for `key`, computing and storing it on first use.
    ///
    /// Concurrent calls for the same uncached key collapse into a single
    /// loader invocation: the miss path re-checks presence after acquiring
    /// the exclusive lock, and the loader runs while that lock is held, so
    /// late arrivals find the entry already populated. The loader is invoked
    /// exactly once per key unless a prior invocation panicked.
    ///
    /// # Panics
    ///
    /// A panic raised by the loader propagates unchanged to the caller. The
    /// key is left unpopulated and the lock is released, so a later call
    /// retries the loader.
    ///
    /// Because the exclusive lock is held across the loader and is not
    /// reentrant, the loader must not call back into the same store.
    pub fn get(&self, key: K) -> V {
        if let Some(value) = self.data.read().get(&key) {
            self.stats.record_hit();
            return value.clone();
        }

        let mut data = self.data.write();
        // Another caller may have populated the key while we waited for the
        // exclusive lock.
        if let Some(value) = data.get(&key) {
            self.stats.record_hit();
            return value.clone();
        }

        self.stats.record_miss();
        let value = (self.loader)(key.clone());
        data.insert(key, value.clone());
        value
    }
}

impl<K, V> MemoCache<K, V> {
    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Returns `true` if no entry has been computed yet.
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// Hit/miss counters for this store.
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }
}

// The two shapes a resolved callable can take. `Uncached` only exists on
// the `cached_fn_or` fallback path.
enum Inner<K, V> {
    Cached(Arc<MemoCache<K, V>>),
    Uncached(Arc<dyn Fn(K) -> V + Send + Sync>),
}

/// A callable handle recovered from a [`Context`].
///
/// Produced by [`Context::cached_fn`] (always backed by a bound
/// [`MemoCache`]) or [`Context::cached_fn_or`] (backed by the store when
/// bound, otherwise forwarding straight to the supplied loader with no
/// caching). Clones share the same underlying store, as do handles resolved
/// independently from the same context chain.
///
/// # Examples
///
/// ```
/// use memoctx::Context;
///
/// let ctx = Context::new().with_cache("double", |n: i32| n * 2);
///
/// let double = ctx.cached_fn::<i32, i32>("double").unwrap();
/// assert!(double.is_cached());
/// assert_eq!(double.call(21), 42);
/// ```
pub struct CachedFn<K, V> {
    inner: Inner<K, V>,
}

impl<K, V> CachedFn<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Invokes the handle for `key`.
    ///
    /// Forwards to [`MemoCache::get`] when a store backs this handle;
    /// otherwise invokes the fallback loader directly, recomputing on every
    /// call.
    pub fn call(&self, key: K) -> V {
        match &self.inner {
            Inner::Cached(store) => store.get(key),
            Inner::Uncached(loader) => loader(key),
        }
    }
}

impl<K, V> CachedFn<K, V> {
    /// Returns `true` if this handle is backed by a context-bound store,
    /// `false` if it is an uncached fallback.
    pub fn is_cached(&self) -> bool {
        matches!(self.inner, Inner::Cached(_))
    }
}

impl<K, V> Clone for CachedFn<K, V> {
    fn clone(&self) -> Self {
        let inner = match &self.inner {
            Inner::Cached(store) => Inner::Cached(Arc::clone(store)),
            Inner::Uncached(loader) => Inner::Uncached(Arc::clone(loader)),
        };
        Self { inner }
    }
}

impl Context {
    /// Returns a new context extending `self` with a fresh [`MemoCache`]
    /// built from `loader`, bound under `id`.
    ///
    /// The receiver is not modified. The store starts empty; nothing is
    /// computed until the first [`CachedFn::call`].
    ///
    /// # Examples
    ///
    /// ```
    /// use memoctx::Context;
    ///
    /// let root = Context::new();
    /// let ctx = root.with_cache("users", |id: u64| format!("user-{id}"));
    ///
    /// assert!(ctx.cached_fn::<u64, String>("users").is_some());
    /// // Binding never touches the original context.
    /// assert!(root.cached_fn::<u64, String>("users").is_none());
    /// ```
    pub fn with_cache<K, V, F>(&self, id: impl Into<BindingId>, loader: F) -> Context
    where
        K: Eq + Hash + Clone + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
        F: Fn(K) -> V + Send + Sync + 'static,
    {
        let id = id.into();
        debug!(id = %id, "cache bound into context");
        self.with_value(id, MemoCache::new(loader))
    }

    /// Resolves the cache bound under `id` as a [`CachedFn`] handle.
    ///
    /// Returns `None` when no binding for `id` is visible from this context,
    /// and also when the nearest binding for `id` is not a
    /// `MemoCache<K, V>` of the requested key/value types — a mismatched
    /// binding is indistinguishable from an absent one at this surface.
    pub fn cached_fn<K, V>(&self, id: impl Into<BindingId>) -> Option<CachedFn<K, V>>
    where
        K: Eq + Hash + Clone + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
    {
        let id = id.into();
        match self.value::<MemoCache<K, V>>(id.clone()) {
            Some(store) => Some(CachedFn {
                inner: Inner::Cached(store),
            }),
            None => {
                if self.contains(id.clone()) {
                    trace!(id = %id, "binding present but typed differently, treating as absent");
                }
                None
            }
        }
    }

    /// Resolves the cache bound under `id`, falling back to `loader` when
    /// the binding is absent or typed differently.
    ///
    /// The fallback handle invokes `loader` directly on every call — no
    /// caching happens on that path. Either way the returned handle is
    /// always usable.
    ///
    /// # Examples
    ///
    /// ```
    /// use memoctx::Context;
    ///
    /// let ctx = Context::new();
    /// let f = ctx.cached_fn_or("missing", |n: u32| n + 1);
    ///
    /// assert!(!f.is_cached());
    /// assert_eq!(f.call(1), 2);
    /// ```
    pub fn cached_fn_or<K, V, F>(&self, id: impl Into<BindingId>, loader: F) -> CachedFn<K, V>
    where
        K: Eq + Hash + Clone + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
        F: Fn(K) -> V + Send + Sync + 'static,
    {
        let id = id.into();
        match self.cached_fn(id.clone()) {
            Some(cached) => cached,
            None => {
                debug!(id = %id, "no cache bound, serving loader uncached");
                CachedFn {
                    inner: Inner::Uncached(Arc::new(loader)),
                }
            }
        }
    }
}
