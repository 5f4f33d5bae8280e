use generational_arena::{Arena, Index};

#[derive(Debug)]
struct Node<K> {
  key: K,
  next: Option<Index>,
  prev: Option<Index>,
}

// An arena-backed doubly-linked list of keys.
// Callers keep the `Index` returned by `push_front`, so relinking and removal
// never need to search the list.
#[derive(Debug)]
pub(super) struct RecencyList<K> {
  // Arena stores all nodes contiguously.
  nodes: Arena<Node<K>>,
  // Head is the newest / most-recently-used item.
  head: Option<Index>,
  // Tail is the oldest / least-recently-used item.
  tail: Option<Index>,
}

impl<K> RecencyList<K> {
  pub fn new() -> Self {
    Self {
      nodes: Arena::new(),
      head: None,
      tail: None,
    }
  }

  // Helper to unlink a node from the list.
  // This doesn't remove the node from the arena.
  fn unlink(&mut self, index: Index) {
    let node = &self.nodes[index];
    let prev_node_idx = node.prev;
    let next_node_idx = node.next;

    if let Some(prev_idx) = prev_node_idx {
      self.nodes[prev_idx].next = next_node_idx;
    } else {
      // We are unlinking the head of the list.
      self.head = next_node_idx;
    }

    if let Some(next_idx) = next_node_idx {
      self.nodes[next_idx].prev = prev_node_idx;
    } else {
      // We are unlinking the tail of the list.
      self.tail = prev_node_idx;
    }
  }

  // Helper to push a node to the front (making it the new head).
  // Assumes the node is already in the arena and unlinked.
  fn link_front(&mut self, index: Index) {
    let old_head_idx = self.head;
    self.nodes[index].next = old_head_idx;
    self.nodes[index].prev = None;
    self.head = Some(index);

    if let Some(old_head) = old_head_idx {
      self.nodes[old_head].prev = Some(index);
    }

    if self.tail.is_none() {
      self.tail = Some(index);
    }
  }

  pub fn len(&self) -> usize {
    self.nodes.len()
  }

  /// Inserts a key at the head and returns the handle to its node.
  pub fn push_front(&mut self, key: K) -> Index {
    let index = self.nodes.insert(Node {
      key,
      next: None,
      prev: None,
    });
    self.link_front(index);
    index
  }

  /// Moves a node to the head. Stale handles are ignored.
  pub fn move_to_front(&mut self, index: Index) {
    if !self.nodes.contains(index) {
      return;
    }
    // Only move if it's not already the head.
    if self.head != Some(index) {
      self.unlink(index);
      self.link_front(index);
    }
  }

  pub fn pop_back(&mut self) -> Option<K> {
    let tail_index = self.tail?;
    self.remove(tail_index)
  }

  pub fn remove(&mut self, index: Index) -> Option<K> {
    if !self.nodes.contains(index) {
      return None;
    }
    self.unlink(index);
    self.nodes.remove(index).map(|node| node.key)
  }

  pub fn clear(&mut self) {
    // Removing node by node advances the arena generation, so handles issued
    // before the clear stay stale.
    self.nodes.retain(|_, _| false);
    self.head = None;
    self.tail = None;
  }

  // A helper for tests, to get the order of keys from head to tail.
  #[cfg(test)]
  pub(crate) fn keys_as_vec(&self) -> Vec<K>
  where
    K: Clone,
  {
    let mut keys = Vec::new();
    let mut current = self.head;
    while let Some(index) = current {
      keys.push(self.nodes[index].key.clone());
      current = self.nodes[index].next;
    }
    keys
  }
}
