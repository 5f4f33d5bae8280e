pub(crate) mod fifo;
pub(crate) mod lru;
mod recency_list;

use generational_arena::Index;
use std::fmt;

/// The replacement strategy a bounded cache uses once it is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum EvictionPolicy {
  /// Evicts the entry that was inserted first. Lookups never reorder entries.
  Fifo,
  /// Evicts the entry that was looked up least recently.
  Lru,
}

impl EvictionPolicy {
  pub fn as_str(&self) -> &'static str {
    match self {
      EvictionPolicy::Fifo => "fifo",
      EvictionPolicy::Lru => "lru",
    }
  }

  /// Creates the bookkeeping structure backing this policy.
  pub(crate) fn build<K: Send + 'static>(self) -> Box<dyn CachePolicy<K>> {
    match self {
      EvictionPolicy::Fifo => Box::new(fifo::Fifo::new()),
      EvictionPolicy::Lru => Box::new(lru::Lru::new()),
    }
  }
}

impl fmt::Display for EvictionPolicy {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// A trait for the recency bookkeeping behind an eviction policy.
///
/// Every method is called with the store's lock held, so implementations need
/// no synchronization of their own. The store keeps the `Index` returned by
/// `on_admit` next to the entry and passes it back on hits and removals.
pub(crate) trait CachePolicy<K>: Send {
  /// Starts tracking a newly admitted key.
  fn on_admit(&mut self, key: K) -> Index;

  /// Called when a lookup finds the key's entry.
  fn on_hit(&mut self, node: Index);

  /// Stops tracking an entry removed for a reason other than eviction.
  fn on_remove(&mut self, node: Index);

  /// Picks and untracks the next victim, returning its key.
  fn evict(&mut self) -> Option<K>;

  /// The number of tracked keys.
  fn len(&self) -> usize;

  /// Clears all state from the policy.
  fn clear(&mut self);
}
