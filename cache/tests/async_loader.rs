mod common;

use common::{build_unbounded, LoadCounter};
use fibre_memo::{CacheBuilder, ComputeJob, ComputeSpawner, LoadError};
#[cfg(feature = "tokio")]
use fibre_memo::TokioSpawner;
use futures_util::future::join_all;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::sync::Barrier;

#[tokio::test]
async fn test_async_loader_basic() {
  let counter = LoadCounter::new();
  let cache = build_unbounded(&counter, Duration::ZERO);

  // 1. First call on a missing key.
  let value = cache.get_async(&5).await.unwrap();
  assert_eq!(*value, 6);
  assert_eq!(counter.get(), 1);
  assert_eq!(cache.metrics().misses, 1);

  // 2. Second call on the same key.
  let value = cache.get_async(&5).await.unwrap();
  assert_eq!(*value, 6);
  assert_eq!(counter.get(), 1, "Loader should not be called again");
  assert_eq!(cache.metrics().hits, 1);
}

#[tokio::test]
async fn test_get_async_returns_without_waiting() {
  let counter = LoadCounter::new();
  let cache = build_unbounded(&counter, Duration::from_millis(200));

  let started = std::time::Instant::now();
  let handle = cache.get_async(&1);
  assert!(started.elapsed() < Duration::from_millis(100), "get_async must not block");
  assert!(!handle.is_complete());
  assert!(handle.try_get().is_none());

  assert_eq!(*handle.clone().await.unwrap(), 2);
  assert!(handle.is_complete());
  assert_eq!(*handle.try_get().unwrap().unwrap(), 2);
}

#[tokio::test]
async fn test_async_loader_thundering_herd() {
  let counter = LoadCounter::new();
  let num_tasks = 20;
  let cache = build_unbounded(&counter, Duration::from_millis(100));

  let barrier = Arc::new(Barrier::new(num_tasks));
  let mut tasks = vec![];

  for _ in 0..num_tasks {
    let cache_clone = cache.clone();
    let barrier_clone = barrier.clone();
    tasks.push(tokio::spawn(async move {
      barrier_clone.wait().await;
      cache_clone.get_async(&99).await.unwrap()
    }));
  }

  let values: Vec<_> = join_all(tasks)
    .await
    .into_iter()
    .map(|joined| joined.unwrap())
    .collect();

  assert_eq!(
    counter.get(),
    1,
    "Thundering herd protection failed: loader was called more than once"
  );
  assert_eq!(cache.metrics().misses, 1, "There should be only one initial miss");
  assert_eq!(cache.metrics().hits, (num_tasks - 1) as u64);
  for value in &values {
    assert!(Arc::ptr_eq(value, &values[0]));
  }
}

#[test]
fn test_handles_share_one_computation() {
  let counter = LoadCounter::new();
  let cache = build_unbounded(&counter, Duration::from_millis(50));

  let first = cache.get_async(&3);
  let second = cache.get_async(&3);
  assert!(first.same_computation(&second));

  // A blocking caller attaches to the computation started by `get_async`.
  let blocking = {
    let cache = cache.clone();
    thread::spawn(move || cache.get(&3).unwrap())
  };

  let from_wait = first.wait().unwrap();
  let from_block_on = futures_executor::block_on(second).unwrap();
  let from_thread = blocking.join().unwrap();

  assert!(Arc::ptr_eq(&from_wait, &from_block_on));
  assert!(Arc::ptr_eq(&from_wait, &from_thread));
  assert_eq!(counter.get(), 1);
}

#[cfg(feature = "tokio")]
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_tokio_spawner_runs_computations() {
  let counter = LoadCounter::new();
  let cache = CacheBuilder::new()
    .spawner(Arc::new(TokioSpawner::new()))
    .loader(common::slow_increment(&counter, Duration::from_millis(20)))
    .build()
    .unwrap();

  let handles: Vec<_> = (0..10).map(|i| cache.get_async(&(i % 2))).collect();
  let values: Vec<_> = join_all(handles).await.into_iter().map(|v| *v.unwrap()).collect();

  assert_eq!(values, vec![1, 2, 1, 2, 1, 2, 1, 2, 1, 2]);
  assert_eq!(counter.get(), 2);
}

/// A spawner that drops every job without running it.
struct DroppingSpawner;

impl ComputeSpawner for DroppingSpawner {
  fn spawn(&self, job: ComputeJob) {
    drop(job);
  }
}

#[test]
fn test_dropped_job_resolves_handles_as_abandoned() {
  let counter = LoadCounter::new();
  let cache = CacheBuilder::new()
    .spawner(Arc::new(DroppingSpawner))
    .loader(common::slow_increment(&counter, Duration::ZERO))
    .build()
    .unwrap();

  let handle = cache.get_async(&1);
  assert!(matches!(handle.wait(), Err(LoadError::Abandoned)));
  assert_eq!(counter.get(), 0);
  assert!(!cache.contains_key(&1), "Abandoned slot must be released");

  // A blocking `get` computes inline and is unaffected by the spawner.
  assert_eq!(*cache.get(&1).unwrap(), 2);
  assert_eq!(cache.metrics().loads_failed, 1);
}
