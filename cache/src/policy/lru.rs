use super::recency_list::RecencyList;
use super::CachePolicy;

use generational_arena::Index;

/// An eviction policy that evicts the least recently used entries.
#[derive(Debug)]
pub(crate) struct Lru<K> {
  // Front is the most recently used key, back the least.
  list: RecencyList<K>,
}

impl<K> Lru<K> {
  pub fn new() -> Self {
    Self {
      list: RecencyList::new(),
    }
  }
}

impl<K: Send> CachePolicy<K> for Lru<K> {
  /// When an item is inserted, it is the most recently used.
  fn on_admit(&mut self, key: K) -> Index {
    self.list.push_front(key)
  }

  /// When an item is accessed, move it to the front of the usage list.
  fn on_hit(&mut self, node: Index) {
    self.list.move_to_front(node);
  }

  fn on_remove(&mut self, node: Index) {
    self.list.remove(node);
  }

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
