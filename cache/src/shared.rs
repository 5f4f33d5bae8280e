use crate::error::LoadError;
use crate::loader::{LoadFuture, LoadResult, Loader};
use crate::metrics::Metrics;
use crate::policy::EvictionPolicy;
use crate::runtime::ComputeSpawner;
use crate::store::{Admission, Store};

use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::sync::atomic::Ordering;
use std::sync::Arc;

use parking_lot::Mutex;

/// The internal, thread-safe core of the shared-future cache.
pub(crate) struct CacheShared<K, V, E, H> {
  pub(crate) store: Mutex<Store<K, V, E, H>>,
  pub(crate) loader: Loader<K, V, E>,
  pub(crate) metrics: Metrics,
  pub(crate) spawner: Arc<dyn ComputeSpawner>,
  pub(crate) capacity: Option<usize>,
  pub(crate) policy: Option<EvictionPolicy>,
}

impl<K, V, E, H> fmt::Debug for CacheShared<K, V, E, H> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("CacheShared")
      .field("capacity", &self.capacity)
      .field("policy", &self.policy)
      .field("metrics", &self.metrics.snapshot())
      .finish_non_exhaustive()
  }
}

impl<K, V, E, H> CacheShared<K, V, E, H>
where
  K: Eq + Hash + Clone + Send + 'static,
  H: BuildHasher,
{
  /// Attaches to the slot for `key`, or admits a new one and elects the
  /// caller as its owner. Runs entirely under the store lock.
  pub(crate) fn attach_or_own(&self, key: &K) -> Admission<V, E> {
    let admission = self.store.lock().attach_or_admit(key);

    match &admission {
      Admission::Attached(_) => {
        self.metrics.hits.fetch_add(1, Ordering::Relaxed);
        tracing::trace!("attached to existing slot");
      }
      Admission::Owner { evicted, .. } => {
        self.metrics.misses.fetch_add(1, Ordering::Relaxed);
        if *evicted > 0 {
          self
            .metrics
            .evicted_by_capacity
            .fetch_add(*evicted as u64, Ordering::Relaxed);
          tracing::debug!(
            evicted = *evicted,
            capacity = ?self.capacity,
            policy = ?self.policy,
            "evicted entries to admit a new key"
          );
        }
        tracing::debug!("elected owner of a new computation");
      }
    }
    admission
  }

  /// Runs the loader for an owned slot and publishes the outcome.
  ///
  /// Must be called without the store lock. On failure the slot is dropped
  /// from the store before the future resolves, so a caller that observes
  /// the failure and retries starts a fresh computation.
  pub(crate) fn load(&self, key: &K, future: &Arc<LoadFuture<V, E>>) -> LoadResult<V, E> {
    let mut guard = UnwindGuard {
      shared: self,
      key,
      future,
      armed: true,
    };
    let result = (self.loader)(key)
      .map(Arc::new)
      .map_err(|err| LoadError::Failed(Arc::new(err)));
    guard.armed = false;

    match &result {
      Ok(_) => {
        self.metrics.loads_succeeded.fetch_add(1, Ordering::Relaxed);
        tracing::debug!("computation completed");
      }
      Err(_) => {
        self.metrics.loads_failed.fetch_add(1, Ordering::Relaxed);
        tracing::warn!("loader returned an error; slot released for retry");
        self.forget(key, future);
      }
    }

    future.resolve(result.clone());
    result
  }

  /// Fails a computation that was dropped before it could run.
  pub(crate) fn abandon(&self, key: &K, future: &Arc<LoadFuture<V, E>>) {
    self.forget(key, future);
    if future.resolve(Err(LoadError::Abandoned)) {
      self.metrics.loads_failed.fetch_add(1, Ordering::Relaxed);
      tracing::warn!("computation was dropped before it ran");
    }
  }

  fn forget(&self, key: &K, future: &Arc<LoadFuture<V, E>>) {
    self.store.lock().remove_if_same(key, future);
  }

  pub(crate) fn clear(&self) {
    let mut store = self.store.lock();
    let discarded = store.len();
    store.clear();
    drop(store);

    self.metrics.clears.fetch_add(1, Ordering::Relaxed);
    tracing::debug!(discarded, "cache cleared");
  }
}

/// Fails the owned computation if the loader unwinds.
struct UnwindGuard<'a, K, V, E, H>
where
  K: Eq + Hash + Clone + Send + 'static,
  H: BuildHasher,
{
  shared: &'a CacheShared<K, V, E, H>,
  key: &'a K,
  future: &'a Arc<LoadFuture<V, E>>,
  armed: bool,
}

impl<K, V, E, H> Drop for UnwindGuard<'_, K, V, E, H>
where
  K: Eq + Hash + Clone + Send + 'static,
  H: BuildHasher,
{
  fn drop(&mut self) {
    if !self.armed {
      return;
    }
    self.shared.forget(self.key, self.future);
    self.future.resolve(Err(LoadError::Panicked));
    self
      .shared
      .metrics
      .loads_failed
      .fetch_add(1, Ordering::Relaxed);
    tracing::warn!("loader panicked; waiters released with an error");
  }
}

/// A computation handed to a `ComputeSpawner`.
///
/// Dropping it without calling `run` abandons the computation, so attached
/// handles never wait on a job that will not execute.
pub(crate) struct LoadTask<K, V, E, H>
where
  K: Eq + Hash + Clone + Send + 'static,
  H: BuildHasher,
{
  shared: Arc<CacheShared<K, V, E, H>>,
  key: K,
  future: Arc<LoadFuture<V, E>>,
  finished: bool,
}

impl<K, V, E, H> LoadTask<K, V, E, H>
where
  K: Eq + Hash + Clone + Send + 'static,
  H: BuildHasher,
{
  pub(crate) fn new(shared: Arc<CacheShared<K, V, E, H>>, key: K, future: Arc<LoadFuture<V, E>>) -> Self {
    Self {
      shared,
      key,
      future,
      finished: false,
    }
  }

  pub(crate) fn run(mut self) {
    // The result is delivered through the shared future.
    let _ = self.shared.load(&self.key, &self.future);
    self.finished = true;
  }
}

impl<K, V, E, H> Drop for LoadTask<K, V, E, H>
where
  K: Eq + Hash + Clone + Send + 'static,
  H: BuildHasher,
{
  fn drop(&mut self) {
    if !self.finished {
      self.shared.abandon(&self.key, &self.future);
    }
  }
}
