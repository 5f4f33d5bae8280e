#![allow(dead_code)]

use std::sync::{
  atomic::{AtomicUsize, Ordering},
  Arc,
};
use std::thread;
use std::time::Duration;

use fibre_memo::{Cache, CacheBuilder, EvictionPolicy, MonitorCache};

/// Counts how many times a loader ran, for asserting coalescing.
#[derive(Clone, Default)]
pub struct LoadCounter(Arc<AtomicUsize>);

impl LoadCounter {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn hit(&self) {
    self.0.fetch_add(1, Ordering::SeqCst);
  }

  pub fn get(&self) -> usize {
    self.0.load(Ordering::SeqCst)
  }
}

/// A deterministic "expensive" function: sleeps, then returns `key + 1`.
pub fn slow_increment(counter: &LoadCounter, delay: Duration) -> impl Fn(&i32) -> i32 + Send + Sync + 'static {
  let counter = counter.clone();
  move |key: &i32| {
    counter.hit();
    if !delay.is_zero() {
      thread::sleep(delay);
    }
    key + 1
  }
}

pub fn build_unbounded(counter: &LoadCounter, delay: Duration) -> Cache<i32, i32> {
  CacheBuilder::new()
    .loader(slow_increment(counter, delay))
    .build()
    .unwrap()
}

pub fn build_bounded(counter: &LoadCounter, capacity: usize, policy: EvictionPolicy) -> Cache<i32, i32> {
  CacheBuilder::new()
    .capacity(capacity)
    .policy(policy)
    .loader(slow_increment(counter, Duration::ZERO))
    .build()
    .unwrap()
}

pub fn build_monitor(counter: &LoadCounter, delay: Duration) -> MonitorCache<i32, i32> {
  CacheBuilder::new()
    .loader(slow_increment(counter, delay))
    .build_monitor()
    .unwrap()
}
