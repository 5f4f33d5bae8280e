mod common;

use fibre_memo::{CacheBuilder, LoadError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

#[derive(Debug, PartialEq, Eq)]
struct Flaky(usize);

impl std::fmt::Display for Flaky {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "attempt {} failed", self.0)
  }
}

impl std::error::Error for Flaky {}

/// A loader that fails its first `failures` calls, then succeeds.
fn flaky_loader(
  failures: usize,
  delay: Duration,
) -> (Arc<AtomicUsize>, impl Fn(&i32) -> Result<i32, Flaky> + Send + Sync + 'static) {
  let attempts = Arc::new(AtomicUsize::new(0));
  let counter = attempts.clone();
  let loader = move |key: &i32| {
    let attempt = counter.fetch_add(1, Ordering::SeqCst);
    thread::sleep(delay);
    if attempt < failures {
      Err(Flaky(attempt))
    } else {
      Ok(key * 10)
    }
  };
  (attempts, loader)
}

#[test]
fn test_failure_is_retried_on_next_get() {
  let (attempts, loader) = flaky_loader(1, Duration::ZERO);
  let cache = CacheBuilder::new().try_loader(loader).build().unwrap();

  match cache.get(&4) {
    Err(LoadError::Failed(err)) => assert_eq!(*err, Flaky(0)),
    other => panic!("expected a failure, got {:?}", other),
  }
  assert!(!cache.contains_key(&4), "A failed slot must not be cached");

  assert_eq!(*cache.get(&4).unwrap(), 40);
  assert_eq!(attempts.load(Ordering::SeqCst), 2);

  let metrics = cache.metrics();
  assert_eq!(metrics.loads_failed, 1);
  assert_eq!(metrics.loads_succeeded, 1);
}

#[test]
fn test_failure_reaches_every_attached_caller() {
  let (attempts, loader) = flaky_loader(1, Duration::from_millis(100));
  let cache = CacheBuilder::new().try_loader(loader).build().unwrap();

  let num_threads = 8;
  let barrier = Arc::new(Barrier::new(num_threads));
  let handles: Vec<_> = (0..num_threads)
    .map(|_| {
      let cache = cache.clone();
      let barrier = barrier.clone();
      thread::spawn(move || {
        barrier.wait();
        cache.get(&1)
      })
    })
    .collect();

  let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

  // One computation ran; everybody saw its failure.
  assert_eq!(attempts.load(Ordering::SeqCst), 1);
  let first = match &results[0] {
    Err(LoadError::Failed(err)) => Arc::clone(err),
    other => panic!("expected a failure, got {:?}", other),
  };
  for result in &results {
    match result {
      Err(LoadError::Failed(err)) => assert!(Arc::ptr_eq(err, &first), "All callers share one error"),
      other => panic!("expected a failure, got {:?}", other),
    }
  }

  // The failure did not poison the key.
  assert_eq!(*cache.get(&1).unwrap(), 10);
}

#[test]
fn test_async_failure_resolves_all_handles() {
  let (_, loader) = flaky_loader(1, Duration::from_millis(50));
  let cache = CacheBuilder::new().try_loader(loader).build().unwrap();

  let handles: Vec<_> = (0..4).map(|_| cache.get_async(&2)).collect();
  for handle in &handles {
    assert!(matches!(handle.wait(), Err(LoadError::Failed(_))));
  }

  let retried = cache.get_async(&2);
  assert!(!retried.same_computation(&handles[0]));
  assert_eq!(*retried.wait().unwrap(), 20);
}

#[test]
fn test_panicking_loader_releases_waiters() {
  let calls = Arc::new(AtomicUsize::new(0));
  let cache = CacheBuilder::new()
    .loader({
      let calls = calls.clone();
      move |key: &i32| {
        if calls.fetch_add(1, Ordering::SeqCst) == 0 {
          thread::sleep(Duration::from_millis(100));
          panic!("loader exploded");
        }
        key + 1
      }
    })
    .build()
    .unwrap();

  // The first handle's computation panics on its compute thread.
  let doomed = cache.get_async(&1);
  thread::sleep(Duration::from_millis(20));
  let waiter = {
    let cache = cache.clone();
    thread::spawn(move || cache.get(&1))
  };

  assert!(matches!(doomed.wait(), Err(LoadError::Panicked)));
  assert!(matches!(waiter.join().unwrap(), Err(LoadError::Panicked)));

  // The key is free again.
  assert_eq!(*cache.get(&1).unwrap(), 2);
  assert_eq!(cache.metrics().loads_failed, 1);
}

#[test]
fn test_error_display_and_source() {
  let err: LoadError<Flaky> = LoadError::Failed(Arc::new(Flaky(3)));
  assert_eq!(err.to_string(), "loader failed: attempt 3 failed");
  assert_eq!(err.source_error(), Some(&Flaky(3)));
  assert!(std::error::Error::source(&err).is_some());

  let panicked: LoadError<Flaky> = LoadError::Panicked;
  assert_eq!(panicked.to_string(), "loader panicked");
  assert!(panicked.source_error().is_none());
}
