//! A concurrent memoizing cache: an expensive, deterministic function runs at
//! most once per key at a time, and every caller asking for that key shares
//! the single result.
//!
//! # Features
//! - **Request Coalescing**: Concurrent requests for one missing key trigger a
//!   single computation; everyone else waits for, or attaches to, its result.
//! - **Sync & Async**: Blocking `get` and non-blocking `get_async`, whose
//!   [`LoadHandle`] can be awaited or waited on from any thread.
//! - **Bounded Variants**: FIFO and LRU eviction with O(1) bookkeeping.
//! - **Failure Safety**: Loader errors and panics are reported to every
//!   attached caller and never leave a key stuck; the next request retries.
//! - **Two Strategies**: [`Cache`] coordinates through shared per-key futures,
//!   [`MonitorCache`] through one mutex and condition variable.
//! - **Observability**: `tracing` events and [`MetricsSnapshot`] counters.

// Public modules that form the API
pub mod builder;
pub mod error;
pub mod handles;
pub mod load_handle;
pub mod metrics;
pub mod monitor;
pub mod policy;
pub mod runtime;

#[cfg(feature = "serde")]
pub mod config;

// Internal, crate-only modules
mod loader;
mod shared;
mod store;

// Re-export the primary user-facing types for convenience
pub use builder::CacheBuilder;
pub use error::{BuildError, LoadError};
pub use handles::Cache;
pub use load_handle::LoadHandle;
pub use metrics::MetricsSnapshot;
pub use monitor::MonitorCache;
pub use policy::EvictionPolicy;
pub use runtime::{ComputeJob, ComputeSpawner, ThreadSpawner};

#[cfg(feature = "tokio")]
pub use runtime::TokioSpawner;

#[cfg(feature = "serde")]
pub use config::CacheConfig;
