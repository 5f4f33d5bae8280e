//! Cache statistics. Only [`MetricsSnapshot`] is public; the live counters
//! stay inside the cache.
//!
//! ```compile_fail
//! use fibre_memo::metrics::Metrics;
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crossbeam_utils::CachePadded;

/// A thread-safe, internal metrics collector for the cache.
/// All fields are atomic to allow for lock-free updates.
#[derive(Debug)]
pub(crate) struct Metrics {
  // --- Hit/Miss Ratios ---
  pub(crate) hits: CachePadded<AtomicU64>,
  pub(crate) misses: CachePadded<AtomicU64>,

  // --- Loader Outcomes ---
  pub(crate) loads_succeeded: CachePadded<AtomicU64>,
  pub(crate) loads_failed: CachePadded<AtomicU64>,

  // --- Eviction Stats ---
  pub(crate) evicted_by_capacity: CachePadded<AtomicU64>,
  pub(crate) clears: CachePadded<AtomicU64>,

  created_at: Instant,
}

// Manual implementation of Default to handle the non-default `Instant`.
impl Default for Metrics {
  fn default() -> Self {
    Self {
      hits: CachePadded::new(AtomicU64::new(0)),
      misses: CachePadded::new(AtomicU64::new(0)),
      loads_succeeded: CachePadded::new(AtomicU64::new(0)),
      loads_failed: CachePadded::new(AtomicU64::new(0)),
      evicted_by_capacity: CachePadded::new(AtomicU64::new(0)),
      clears: CachePadded::new(AtomicU64::new(0)),
      created_at: Instant::now(),
    }
  }
}

impl Metrics {
  pub(crate) fn new() -> Self {
    Self::default()
  }

  /// Creates a point-in-time snapshot of the current metrics.
  pub(crate) fn snapshot(&self) -> MetricsSnapshot {
    let hits = self.hits.load(Ordering::Relaxed);
    let misses = self.misses.load(Ordering::Relaxed);
    let total_lookups = hits + misses;

    MetricsSnapshot {
      hits,
      misses,
      hit_ratio: if total_lookups == 0 {
        0.0
      } else {
        hits as f64 / total_lookups as f64
      },
      loads_succeeded: self.loads_succeeded.load(Ordering::Relaxed),
      loads_failed: self.loads_failed.load(Ordering::Relaxed),
      evicted_by_capacity: self.evicted_by_capacity.load(Ordering::Relaxed),
      clears: self.clears.load(Ordering::Relaxed),
      uptime_secs: self.created_at.elapsed().as_secs(),
    }
  }
}

/// A point-in-time, public-facing snapshot of the cache's metrics.
#[derive(Clone)]
pub struct MetricsSnapshot {
  /// Lookups served by a cached value or by attaching to a computation
  /// already in flight.
  pub hits: u64,
  /// Lookups that started a new computation.
  pub misses: u64,
  /// The cache hit ratio (hits / (hits + misses)).
  pub hit_ratio: f64,
  /// Computations that produced a value.
  pub loads_succeeded: u64,
  /// Computations that returned an error, panicked or never ran.
  pub loads_failed: u64,
  /// The number of entries evicted due to exceeding capacity.
  pub evicted_by_capacity: u64,
  /// The number of times the cache was cleared.
  pub clears: u64,
  /// The number of seconds the cache has been running.
  pub uptime_secs: u64,
}

impl fmt::Debug for MetricsSnapshot {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("MetricsSnapshot")
      .field("hits", &self.hits)
      .field("misses", &self.misses)
      .field("hit_ratio", &format!("{:.2}%", self.hit_ratio * 100.0))
      .field("loads_succeeded", &self.loads_succeeded)
      .field("loads_failed", &self.loads_failed)
      .field("evicted_by_capacity", &self.evicted_by_capacity)
      .field("clears", &self.clears)
      .field("uptime_secs", &self.uptime_secs)
      .finish()
  }
}
