use crate::loader::LoadFuture;
use crate::policy::{CachePolicy, EvictionPolicy};

use core::fmt;
use std::collections::HashMap;
use std::hash::{BuildHasher, Hash};
use std::sync::Arc;

use generational_arena::Index;

/// The per-key state of the shared-future cache.
///
/// Pending and ready entries look the same from the store's point of view:
/// the `LoadFuture` carries the state, so attaching to an in-flight
/// computation and reading a finished one are the same operation.
pub(crate) struct Slot<V, E> {
  pub(crate) future: Arc<LoadFuture<V, E>>,
  /// The entry's node in the policy's recency list, if the cache is bounded.
  pub(crate) node: Option<Index>,
}

/// What a lookup in the store resolved to.
pub(crate) enum Admission<V, E> {
  /// Another caller owns the computation (or it already finished).
  Attached(Arc<LoadFuture<V, E>>),
  /// The caller inserted a fresh pending slot and must run the loader.
  Owner {
    future: Arc<LoadFuture<V, E>>,
    evicted: usize,
  },
}

/// The key-to-slot map together with the eviction bookkeeping for it.
///
/// Lives behind a single mutex, so the map and the recency list always
/// describe the same set of keys.
pub(crate) struct Store<K, V, E, H> {
  map: HashMap<K, Slot<V, E>, H>,
  policy: Option<Box<dyn CachePolicy<K>>>,
  capacity: Option<usize>,
}

impl<K, V, E, H> fmt::Debug for Store<K, V, E, H> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Store")
      .field("len", &self.map.len())
      .field("capacity", &self.capacity)
      .finish_non_exhaustive()
  }
}

impl<K, V, E, H> Store<K, V, E, H>
where
  K: Eq + Hash + Clone + Send + 'static,
  H: BuildHasher,
{
  /// Creates a store. A policy is only installed when a capacity is set.
  pub(crate) fn new(hasher: H, capacity: Option<usize>, policy: Option<EvictionPolicy>) -> Self {
    let policy = capacity.and(policy).map(EvictionPolicy::build);
    Self {
      map: HashMap::with_hasher(hasher),
      policy,
      capacity,
    }
  }

  pub(crate) fn len(&self) -> usize {
    self.map.len()
  }

  pub(crate) fn contains_key(&self, key: &K) -> bool {
    self.map.contains_key(key)
  }

  /// Finds the slot for `key`, or admits a new pending one.
  ///
  /// A hit refreshes the key's recency. A miss first evicts victims until
  /// there is room, then inserts the new slot, so the store never exceeds
  /// its capacity once this returns.
  pub(crate) fn attach_or_admit(&mut self, key: &K) -> Admission<V, E> {
    if let Some(slot) = self.map.get(key) {
      if let (Some(policy), Some(node)) = (self.policy.as_mut(), slot.node) {
        policy.on_hit(node);
      }
      return Admission::Attached(Arc::clone(&slot.future));
    }

    let mut evicted = 0;
    if let (Some(policy), Some(capacity)) = (self.policy.as_mut(), self.capacity) {
      while self.map.len() >= capacity {
        match policy.evict() {
          Some(victim) => {
            // Attached handles keep their own `Arc`, so a pending victim
            // still resolves for them.
            self.map.remove(&victim);
            evicted += 1;
          }
          None => break,
        }
      }
    }

    let future = Arc::new(LoadFuture::new());
    let node = self.policy.as_mut().map(|policy| policy.on_admit(key.clone()));
    self.map.insert(
      key.clone(),
      Slot {
        future: Arc::clone(&future),
        node,
      },
    );

    if let Some(policy) = self.policy.as_ref() {
      debug_assert_eq!(policy.len(), self.map.len(), "store and recency list diverged");
    }

    Admission::Owner { future, evicted }
  }

  /// Removes `key` only if it still maps to `future`.
  ///
  /// Used to drop failed computations. The identity check keeps a slot that
  /// was cleared or evicted and then re-admitted by another caller intact.
  pub(crate) fn remove_if_same(&mut self, key: &K, future: &Arc<LoadFuture<V, E>>) -> bool {
    match self.map.get(key) {
      Some(slot) if Arc::ptr_eq(&slot.future, future) => {}
      _ => return false,
    }

    if let Some(slot) = self.map.remove(key) {
      if let (Some(policy), Some(node)) = (self.policy.as_mut(), slot.node) {
        policy.on_remove(node);
      }
    }
    true
  }

  pub(crate) fn clear(&mut self) {
    self.map.clear();
    if let Some(policy) = self.policy.as_mut() {
      policy.clear();
    }
  }
}
