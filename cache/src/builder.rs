use crate::error::BuildError;
use crate::handles::Cache;
use crate::loader::Loader;
use crate::metrics::Metrics;
use crate::monitor::{MonitorCache, MonitorShared};
use crate::policy::EvictionPolicy;
use crate::runtime::{ComputeSpawner, ThreadSpawner};
use crate::shared::CacheShared;
use crate::store::Store;

#[cfg(feature = "serde")]
use crate::config::CacheConfig;

use core::fmt;
use std::convert::Infallible;
use std::hash::{BuildHasher, Hash};
use std::sync::Arc;

use parking_lot::Mutex;

/// A builder for creating `Cache` and `MonitorCache` instances.
///
/// ```
/// use fibre_memo::{CacheBuilder, EvictionPolicy};
///
/// let cache = CacheBuilder::new()
///   .capacity(64)
///   .policy(EvictionPolicy::Lru)
///   .loader(|key: &u64| key * 2)
///   .build()
///   .unwrap();
///
/// assert_eq!(*cache.get(&21).unwrap(), 42);
/// ```
pub struct CacheBuilder<K, V, E = Infallible, H = ahash::RandomState> {
  pub(crate) capacity: Option<usize>,
  pub(crate) policy: Option<EvictionPolicy>,
  pub(crate) hasher: H,
  loader: Option<Loader<K, V, E>>,
  spawner: Option<Arc<dyn ComputeSpawner>>,
}

// Manual Debug implementation for CacheBuilder.
impl<K, V, E, H> fmt::Debug for CacheBuilder<K, V, E, H> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("CacheBuilder")
      .field("capacity", &self.capacity)
      .field("policy", &self.policy)
      .field("has_loader", &self.loader.is_some())
      .field("has_spawner", &self.spawner.is_some())
      .finish_non_exhaustive()
  }
}

// --- General Configuration Methods ---
// This impl block has no restrictive bounds on K or V.
impl<K, V, E, H> CacheBuilder<K, V, E, H> {
  /// Sets the maximum number of entries. Must be greater than zero.
  ///
  /// Defaults to LRU eviction unless a policy is set explicitly.
  pub fn capacity(mut self, capacity: usize) -> Self {
    self.capacity = Some(capacity);
    self
  }

  /// Sets the cache to be "unbounded", clearing any configured capacity.
  pub fn unbounded(mut self) -> Self {
    self.capacity = None;
    self
  }

  /// Sets the eviction policy used once the cache is full.
  pub fn policy(mut self, policy: EvictionPolicy) -> Self {
    self.policy = Some(policy);
    self
  }

  /// Applies capacity and policy from a deserialized `CacheConfig`.
  ///
  /// Values are validated by `build()` like any other setting.
  #[cfg(feature = "serde")]
  pub fn config(mut self, config: CacheConfig) -> Self {
    self.capacity = config.capacity;
    self.policy = config.policy;
    self
  }

  /// Sets an infallible loader function.
  ///
  /// The loader is called for keys that are not in the cache. It must be a
  /// deterministic function of the key.
  pub fn loader(mut self, f: impl Fn(&K) -> V + Send + Sync + 'static) -> Self
  where
    K: 'static,
    V: 'static,
    E: 'static,
  {
    let loader: Loader<K, V, E> = Arc::new(move |key: &K| Ok(f(key)));
    self.loader = Some(loader);
    self
  }

  /// Sets the spawner that runs computations started by `get_async`.
  ///
  /// Defaults to [`ThreadSpawner`].
  pub fn spawner(mut self, spawner: Arc<dyn ComputeSpawner>) -> Self {
    self.spawner = Some(spawner);
    self
  }

  /// Sets a fallible loader function, replacing any loader set before.
  ///
  /// An `Err` is reported to every caller waiting on that key, and the key
  /// is left uncached so a later request retries.
  pub fn try_loader<E2>(
    self,
    f: impl Fn(&K) -> Result<V, E2> + Send + Sync + 'static,
  ) -> CacheBuilder<K, V, E2, H>
  where
    K: 'static,
    V: 'static,
    E2: 'static,
  {
    let loader: Loader<K, V, E2> = Arc::new(f);
    CacheBuilder {
      capacity: self.capacity,
      policy: self.policy,
      hasher: self.hasher,
      loader: Some(loader),
      spawner: self.spawner,
    }
  }

  /// Sets the hasher for the cache.
  pub fn hasher<H2>(self, hasher: H2) -> CacheBuilder<K, V, E, H2> {
    CacheBuilder {
      capacity: self.capacity,
      policy: self.policy,
      hasher,
      loader: self.loader,
      spawner: self.spawner,
    }
  }

  /// Validates the builder configuration.
  pub(crate) fn validate(&self) -> Result<(), BuildError> {
    if self.capacity == Some(0) {
      return Err(BuildError::ZeroCapacity);
    }
    if self.policy.is_some() && self.capacity.is_none() {
      return Err(BuildError::PolicyWithoutCapacity);
    }
    if self.loader.is_none() {
      return Err(BuildError::MissingLoader);
    }
    Ok(())
  }
}

// --- Default Constructor ---
impl<K, V> CacheBuilder<K, V> {
  /// Creates a new `CacheBuilder` with default settings: unbounded, no
  /// loader, `ahash` hashing and the default spawner.
  pub fn new() -> Self {
    Self::with_hasher(ahash::RandomState::new())
  }
}

impl<K, V, H> CacheBuilder<K, V, Infallible, H> {
  /// Creates a new `CacheBuilder` that hashes keys with `hasher`.
  pub fn with_hasher(hasher: H) -> Self {
    Self {
      capacity: None,
      policy: None,
      hasher,
      loader: None,
      spawner: None,
    }
  }
}

impl<K, V> Default for CacheBuilder<K, V> {
  fn default() -> Self {
    Self::new()
  }
}

// --- Build Methods ---
impl<K, V, E, H> CacheBuilder<K, V, E, H>
where
  K: Eq + Hash + Clone + Send + Sync + 'static,
  V: Send + Sync + 'static,
  E: Send + Sync + 'static,
  H: BuildHasher + Clone + Send + Sync + 'static,
{
  /// Builds a shared-future `Cache`.
  pub fn build(mut self) -> Result<Cache<K, V, E, H>, BuildError> {
    self.validate()?;
    let loader = self.loader.take().ok_or(BuildError::MissingLoader)?;

    // A bounded cache without an explicit policy evicts by recency.
    let policy = self
      .capacity
      .map(|_| self.policy.unwrap_or(EvictionPolicy::Lru));
    let spawner = self
      .spawner
      .take()
      .unwrap_or_else(|| Arc::new(ThreadSpawner));

    tracing::debug!(capacity = ?self.capacity, policy = ?policy, "building cache");

    let shared = Arc::new(CacheShared {
      store: Mutex::new(Store::new(self.hasher, self.capacity, policy)),
      loader,
      metrics: Metrics::new(),
      spawner,
      capacity: self.capacity,
      policy,
    });
    Ok(Cache { shared })
  }

  /// Builds a monitor-based `MonitorCache`.
  ///
  /// The monitor strategy is unbounded, so a capacity or policy is rejected.
  pub fn build_monitor(mut self) -> Result<MonitorCache<K, V, E, H>, BuildError> {
    self.validate()?;
    if self.capacity.is_some() || self.policy.is_some() {
      return Err(BuildError::EvictionUnsupported);
    }
    let loader = self.loader.take().ok_or(BuildError::MissingLoader)?;

    tracing::debug!("building monitor cache");

    Ok(MonitorCache {
      shared: Arc::new(MonitorShared::new(loader, self.hasher)),
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn validation_order() {
    let builder = CacheBuilder::<i32, i32>::new().capacity(0);
    assert_eq!(builder.validate(), Err(BuildError::ZeroCapacity));

    let builder = CacheBuilder::<i32, i32>::new().policy(EvictionPolicy::Fifo);
    assert_eq!(builder.validate(), Err(BuildError::PolicyWithoutCapacity));

    let builder = CacheBuilder::<i32, i32>::new().capacity(3);
    assert_eq!(builder.validate(), Err(BuildError::MissingLoader));

    let builder = CacheBuilder::<i32, i32>::new().capacity(3).loader(|k| *k);
    assert_eq!(builder.validate(), Ok(()));
  }

  #[test]
  fn unbounded_resets_capacity() {
    let builder = CacheBuilder::<i32, i32>::new().capacity(3).unbounded();
    assert_eq!(builder.capacity, None);
  }
}
