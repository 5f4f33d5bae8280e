//! A memoizing cache built on a single monitor (mutex + condition variable).
//!
//! This strategy keeps two structures: the map of finished results, guarded
//! by the primary lock, and the set of keys whose computation is in flight,
//! guarded by its own lock. A caller that finds its key in flight waits on the
//! condition variable and re-checks on every wakeup, since one `notify_all`
//! serves every key.

use crate::error::LoadError;
use crate::loader::Loader;
use crate::metrics::{Metrics, MetricsSnapshot};

use std::collections::{HashMap, HashSet};
use std::convert::Infallible;
use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::sync::atomic::Ordering;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

/// Finished results and the number of times they were cleared.
///
/// A winner only publishes if `generation` still matches the value it saw when
/// it claimed its key, so a `clear` during the computation orphans the result.
struct Results<K, V, H> {
  map: HashMap<K, Arc<V>, H>,
  generation: u64,
}

pub(crate) struct MonitorShared<K, V, E, H> {
  /// Finished results. This is the primary lock.
  results: Mutex<Results<K, V, H>>,
  /// Signalled whenever a result is published or a computation gives up.
  ready: Condvar,
  /// Keys with a computation in flight. Never held while acquiring `results`.
  in_flight: Mutex<HashSet<K, H>>,
  loader: Loader<K, V, E>,
  metrics: Metrics,
}

impl<K, V, E, H> MonitorShared<K, V, E, H>
where
  H: Clone,
{
  pub(crate) fn new(loader: Loader<K, V, E>, hasher: H) -> Self {
    Self {
      results: Mutex::new(Results {
        map: HashMap::with_hasher(hasher.clone()),
        generation: 0,
      }),
      ready: Condvar::new(),
      in_flight: Mutex::new(HashSet::with_hasher(hasher)),
      loader,
      metrics: Metrics::new(),
    }
  }
}

/// A thread-safe memoizing cache that coalesces requests with a monitor.
///
/// Unlike [`Cache`](crate::Cache), finished values are stored directly and
/// waiters block on a condition variable rather than on a per-key future. It
/// is unbounded and offers no async access.
///
/// When a loader fails, its caller receives the error and the waiters wake up
/// to retry: the next one in line becomes the new computing caller.
pub struct MonitorCache<K, V, E = Infallible, H = ahash::RandomState> {
  pub(crate) shared: Arc<MonitorShared<K, V, E, H>>,
}

impl<K, V, E, H> Clone for MonitorCache<K, V, E, H> {
  fn clone(&self) -> Self {
    Self {
      shared: Arc::clone(&self.shared),
    }
  }
}

impl<K, V, E, H> fmt::Debug for MonitorCache<K, V, E, H> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("MonitorCache")
      .field("metrics", &self.shared.metrics.snapshot())
      .finish_non_exhaustive()
  }
}

impl<K, V, E, H> MonitorCache<K, V, E, H>
where
  K: Eq + Hash + Clone,
  H: BuildHasher,
{
  /// Returns the value for `key`, computing it if necessary.
  ///
  /// Blocks until the value is available. At most one caller computes a given
  /// key at a time, and the loader always runs without any lock held.
  pub fn get(&self, key: &K) -> Result<Arc<V>, LoadError<E>> {
    let shared = &*self.shared;

    let generation = {
      let mut results = shared.results.lock();
      loop {
        if let Some(value) = results.map.get(key) {
          shared.metrics.hits.fetch_add(1, Ordering::Relaxed);
          return Ok(Arc::clone(value));
        }

        // Check-and-add in one step: `insert` tells us whether someone else
        // already claimed the key.
        let claimed = shared.in_flight.lock().insert(key.clone());
        if claimed {
          break results.generation;
        }

        // Releases `results` while asleep. The wakeup may be spurious or for
        // another key, so loop and re-check.
        shared.ready.wait(&mut results);
      }
    };

    shared.metrics.misses.fetch_add(1, Ordering::Relaxed);
    tracing::debug!("claimed key; computing outside the results lock");

    let mut guard = InFlightGuard {
      shared,
      key,
      published: false,
    };

    match (shared.loader)(key) {
      Ok(value) => {
        let value = Arc::new(value);
        {
          let mut results = shared.results.lock();
          if results.generation == generation {
            results.map.insert(key.clone(), Arc::clone(&value));
          } else {
            tracing::debug!("cache was cleared during the computation; result not stored");
          }
          shared.ready.notify_all();
        }
        guard.published = true;
        shared.metrics.loads_succeeded.fetch_add(1, Ordering::Relaxed);
        Ok(value)
      }
      Err(err) => {
        shared.metrics.loads_failed.fetch_add(1, Ordering::Relaxed);
        tracing::warn!("loader returned an error; waiters will retry");
        Err(LoadError::Failed(Arc::new(err)))
      }
    }
  }

  /// Looks up or computes `key` without coalescing.
  ///
  /// The lock is released while the loader runs, so two callers racing on the
  /// same missing key may both compute it. The first value to be stored wins
  /// and is returned to both. Kept as a baseline for comparing against
  /// [`get`](Self::get).
  pub fn get_naive(&self, key: &K) -> Result<Arc<V>, LoadError<E>> {
    let shared = &*self.shared;

    let generation = {
      let results = shared.results.lock();
      if let Some(value) = results.map.get(key) {
        shared.metrics.hits.fetch_add(1, Ordering::Relaxed);
        return Ok(Arc::clone(value));
      }
      results.generation
    };

    shared.metrics.misses.fetch_add(1, Ordering::Relaxed);
    let value = match (shared.loader)(key) {
      Ok(value) => Arc::new(value),
      Err(err) => {
        shared.metrics.loads_failed.fetch_add(1, Ordering::Relaxed);
        return Err(LoadError::Failed(Arc::new(err)));
      }
    };
    shared.metrics.loads_succeeded.fetch_add(1, Ordering::Relaxed);

    let mut results = shared.results.lock();
    if results.generation != generation {
      return Ok(value);
    }
    let stored = results.map.entry(key.clone()).or_insert(value);
    Ok(Arc::clone(stored))
  }

  /// Removes all finished results.
  ///
  /// Computations in flight still return their value to their callers, but
  /// the value is not stored.
  pub fn clear(&self) {
    let discarded = {
      let mut results = self.shared.results.lock();
      let discarded = results.map.len();
      results.map.clear();
      results.generation += 1;
      discarded
    };
    self.shared.metrics.clears.fetch_add(1, Ordering::Relaxed);
    tracing::debug!(discarded, "monitor cache cleared");
  }

  /// Returns `true` if a finished result for `key` is cached.
  pub fn contains_key(&self, key: &K) -> bool {
    self.shared.results.lock().map.contains_key(key)
  }

  /// Returns the number of finished results.
  pub fn len(&self) -> usize {
    self.shared.results.lock().map.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

impl<K, V, E, H> MonitorCache<K, V, E, H> {
  /// Returns a snapshot of the cache's metrics.
  pub fn metrics(&self) -> MetricsSnapshot {
    self.shared.metrics.snapshot()
  }
}

/// Releases a claimed key once its computation ends, however it ends.
///
/// Runs on success, on a loader error, and while unwinding from a panicking
/// loader, so a key is never left in flight with nobody computing it.
struct InFlightGuard<'a, K, V, E, H>
where
  K: Eq + Hash,
  H: BuildHasher,
{
  shared: &'a MonitorShared<K, V, E, H>,
  key: &'a K,
  published: bool,
}

impl<K, V, E, H> Drop for InFlightGuard<'_, K, V, E, H>
where
  K: Eq + Hash,
  H: BuildHasher,
{
  fn drop(&mut self) {
    self.shared.in_flight.lock().remove(self.key);

    if !self.published && std::thread::panicking() {
      self.shared.metrics.loads_failed.fetch_add(1, Ordering::Relaxed);
      tracing::warn!("loader panicked; waiters will retry");
    }

    // Waiters that slept before the key left the set must wake and re-check.
    // If a `clear` orphaned the result, one of them becomes the next winner.
    let _results = self.shared.results.lock();
    self.shared.ready.notify_all();
  }
}
