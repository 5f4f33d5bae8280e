use crate::error::LoadError;
use crate::load_handle::LoadHandle;
use crate::metrics::MetricsSnapshot;
use crate::policy::EvictionPolicy;
use crate::shared::{CacheShared, LoadTask};
use crate::store::Admission;

use std::convert::Infallible;
use std::hash::{BuildHasher, Hash};
use std::sync::Arc;

/// A thread-safe memoizing cache built on shared futures.
///
/// Every key maps to a single shared computation: the first caller to ask for
/// a missing key runs the loader, and everyone else asking for that key in the
/// meantime attaches to the same result. Bounded caches evict by FIFO or LRU
/// order when a new key is admitted into a full cache.
///
/// `Cache` is cheap to clone; clones share the same entries.
#[derive(Debug)]
pub struct Cache<K, V, E = Infallible, H = ahash::RandomState> {
  pub(crate) shared: Arc<CacheShared<K, V, E, H>>,
}

impl<K, V, E, H> Clone for Cache<K, V, E, H> {
  fn clone(&self) -> Self {
    Self {
      shared: Arc::clone(&self.shared),
    }
  }
}

impl<K, V, E, H> Cache<K, V, E, H>
where
  K: Eq + Hash + Clone + Send + Sync + 'static,
  V: Send + Sync + 'static,
  E: Send + Sync + 'static,
  H: BuildHasher + Send + Sync + 'static,
{
  /// Returns the value for `key`, computing it if necessary.
  ///
  /// Blocks the calling thread until the value is available. If this call is
  /// the first request for the key, the loader runs on the calling thread;
  /// otherwise the call waits for the computation already in flight.
  ///
  /// A loader failure is returned to this caller and to every other caller
  /// attached to the same computation. The failed entry is dropped, so the
  /// next call for the key retries.
  pub fn get(&self, key: &K) -> Result<Arc<V>, LoadError<E>> {
    match self.shared.attach_or_own(key) {
      Admission::Attached(future) => future.wait(),
      Admission::Owner { future, .. } => self.shared.load(key, &future),
    }
  }

  /// Returns a handle to the value for `key` without blocking.
  ///
  /// If this call is the first request for the key, the computation is handed
  /// to the configured `ComputeSpawner`. All handles returned for the same
  /// computation resolve to the identical value or error.
  pub fn get_async(&self, key: &K) -> LoadHandle<V, E> {
    let future = match self.shared.attach_or_own(key) {
      Admission::Attached(future) => future,
      Admission::Owner { future, .. } => {
        let task = LoadTask::new(Arc::clone(&self.shared), key.clone(), Arc::clone(&future));
        self.shared.spawner.spawn(Box::new(move || task.run()));
        future
      }
    };
    LoadHandle::new(future)
  }

  /// Removes all entries from the cache.
  ///
  /// Computations already in flight keep running and still resolve every
  /// handle attached to them; the cache simply forgets them.
  pub fn clear(&self) {
    self.shared.clear();
  }

  /// Returns `true` if the cache holds an entry for `key`, pending or ready.
  ///
  /// This does not count as an access for the eviction policy.
  pub fn contains_key(&self, key: &K) -> bool {
    self.shared.store.lock().contains_key(key)
  }

  /// Returns the number of entries, including pending ones.
  pub fn len(&self) -> usize {
    self.shared.store.lock().len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

impl<K, V, E, H> Cache<K, V, E, H> {
  /// The maximum number of entries, or `None` for an unbounded cache.
  pub fn capacity(&self) -> Option<usize> {
    self.shared.capacity
  }

  /// The eviction policy, or `None` for an unbounded cache.
  pub fn policy(&self) -> Option<EvictionPolicy> {
    self.shared.policy
  }

  /// Returns a snapshot of the cache's metrics.
  pub fn metrics(&self) -> MetricsSnapshot {
    self.shared.metrics.snapshot()
  }
}
