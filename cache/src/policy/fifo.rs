use super::recency_list::RecencyList;
use super::CachePolicy;

use generational_arena::Index;

/// An eviction policy that evicts entries in a First-In, First-Out (FIFO) manner.
#[derive(Debug)]
pub(crate) struct Fifo<K> {
  list: RecencyList<K>,
}

impl<K> Fifo<K> {
  pub fn new() -> Self {
    Self {
      list: RecencyList::new(),
    }
  }
}

impl<K: Send> CachePolicy<K> for Fifo<K> {
  /// New items go to the front of the queue.
  fn on_admit(&mut self, key: K) -> Index {
    self.list.push_front(key)
  }

  /// A FIFO policy does not care about access patterns. This is a no-op.
  fn on_hit(&mut self, _node: Index) {}

  fn on_remove(&mut self, node: Index) {
    self.list.remove(node);
  }

  /// The back of the queue holds the oldest item.
  fn evict(&mut self) -> Option<K> {
    self.list.pop_back()
  }

  fn len(&self) -> usize {
    self.list.len()
  }

  fn clear(&mut self) {
    self.list.clear();
  }
}
