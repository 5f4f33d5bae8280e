//! Hammers a memoizing cache from several threads with random keys, then
//! prints each result next to how many times the expensive function ran.
//!
//! Run with `RUST_LOG=fibre_memo=debug` to watch requests being coalesced.

use fibre_memo::{CacheBuilder, EvictionPolicy};
use rand::Rng;
use std::sync::{
  atomic::{AtomicUsize, Ordering},
  Arc,
};
use std::thread;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

const NUM_THREADS: usize = 8;
const REQUESTS_PER_THREAD: usize = 5;
const KEY_RANGE: u64 = 6;

// A deliberately slow function: it "takes a while" to produce a result.
fn expensive_square(key: &u64, calls: &AtomicUsize) -> u64 {
  calls.fetch_add(1, Ordering::SeqCst);
  thread::sleep(Duration::from_millis(200));
  key * key
}

fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .with_thread_names(true)
    .init();

  let calls = Arc::new(AtomicUsize::new(0));
  let cache = CacheBuilder::new()
    .capacity(4)
    .policy(EvictionPolicy::Lru)
    .loader({
      let calls = calls.clone();
      move |key: &u64| expensive_square(key, &calls)
    })
    .build()
    .expect("Failed to build cache");

  println!("--- Concurrent Memoization Demonstration ---");
  println!(
    "{} threads x {} requests over keys 0..{} (capacity {})\n",
    NUM_THREADS,
    REQUESTS_PER_THREAD,
    KEY_RANGE,
    cache.capacity().unwrap_or_default()
  );

  let start = Instant::now();
  let workers: Vec<_> = (0..NUM_THREADS)
    .map(|id| {
      let cache = cache.clone();
      thread::Builder::new()
        .name(format!("worker-{}", id))
        .spawn(move || {
          let mut rng = rand::rng();
          for _ in 0..REQUESTS_PER_THREAD {
            let key = rng.random_range(0..KEY_RANGE);
            let value = cache.get(&key).expect("loader is infallible");
            println!("[worker-{}] square({}) = {}", id, key, value);
          }
        })
        .expect("Failed to spawn worker")
    })
    .collect();

  for worker in workers {
    worker.join().expect("worker panicked");
  }

  let total = NUM_THREADS * REQUESTS_PER_THREAD;
  let metrics = cache.metrics();
  println!("\n--- Verification ---");
  println!("Requests served:      {}", total);
  println!("Function evaluations: {}", calls.load(Ordering::SeqCst));
  println!("Elapsed:              {:?}", start.elapsed());
  println!("{:#?}", metrics);
}
