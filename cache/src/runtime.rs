/// A unit of work that runs a computation to completion.
pub type ComputeJob = Box<dyn FnOnce() + Send + 'static>;

/// A trait for running the winning computation of a `get_async` call away
/// from the caller's thread.
///
/// If the spawner drops a job without running it, every handle attached to
/// that computation resolves to `LoadError::Abandoned`.
pub trait ComputeSpawner: Send + Sync + 'static {
  fn spawn(&self, job: ComputeJob);
}

/// Runs every computation on a fresh OS thread. This is the default spawner.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSpawner;

impl ComputeSpawner for ThreadSpawner {
  fn spawn(&self, job: ComputeJob) {
    let spawned = std::thread::Builder::new()
      .name("fibre-memo-load".into())
      .spawn(job);
    if let Err(err) = spawned {
      // The job was dropped along with the failed builder call.
      tracing::warn!(error = %err, "failed to spawn a compute thread");
    }
  }
}

/// Runs computations on Tokio's blocking thread pool.
#[cfg(feature = "tokio")]
#[derive(Debug, Clone)]
pub struct TokioSpawner(tokio::runtime::Handle);

#[cfg(feature = "tokio")]
impl TokioSpawner {
  /// Creates a spawner that uses the current Tokio runtime context.
  /// Panics if called outside of a Tokio runtime.
  pub fn new() -> Self {
    Self(tokio::runtime::Handle::current())
  }

  pub fn from_handle(handle: tokio::runtime::Handle) -> Self {
    Self(handle)
  }
}

#[cfg(feature = "tokio")]
impl ComputeSpawner for TokioSpawner {
  fn spawn(&self, job: ComputeJob) {
    // Loaders block, so they run on the blocking pool.
    drop(self.0.spawn_blocking(job));
  }
}
