use std::fmt;
use std::sync::Arc;

/// Errors that can occur when building a cache.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
  /// The cache was configured with a capacity of zero, which is not allowed
  /// for a bounded cache. Use `unbounded()` for an unbounded cache.
  #[error("bounded cache capacity cannot be zero")]
  ZeroCapacity,
  /// No loader function was supplied. A memoizing cache cannot compute
  /// missing values without one.
  #[error("a loader function is required to build the cache")]
  MissingLoader,
  /// An eviction policy was chosen but no capacity was set, so the policy
  /// would never run.
  #[error("an eviction policy requires a capacity")]
  PolicyWithoutCapacity,
  /// The monitor strategy keeps every computed value and cannot evict.
  #[error("the monitor strategy does not support capacity or eviction policies")]
  EvictionUnsupported,
}

/// The outcome of a failed computation, shared by every caller that was
/// waiting on the same key.
///
/// The loader's own error is held in an `Arc` so that all attached callers
/// observe the identical failure without requiring `E: Clone`.
pub enum LoadError<E> {
  /// The loader returned an error.
  Failed(Arc<E>),
  /// The loader panicked while computing the value.
  Panicked,
  /// The computation was dropped by its spawner before it ever ran.
  Abandoned,
}

impl<E> LoadError<E> {
  /// Returns the loader's error, if this failure came from one.
  pub fn source_error(&self) -> Option<&E> {
    match self {
      LoadError::Failed(err) => Some(err.as_ref()),
      LoadError::Panicked | LoadError::Abandoned => None,
    }
  }
}

impl<E> Clone for LoadError<E> {
  fn clone(&self) -> Self {
    match self {
      LoadError::Failed(err) => LoadError::Failed(Arc::clone(err)),
      LoadError::Panicked => LoadError::Panicked,
      LoadError::Abandoned => LoadError::Abandoned,
    }
  }
}

impl<E: fmt::Debug> fmt::Debug for LoadError<E> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      LoadError::Failed(err) => f.debug_tuple("Failed").field(err).finish(),
      LoadError::Panicked => f.write_str("Panicked"),
      LoadError::Abandoned => f.write_str("Abandoned"),
    }
  }
}

impl<E: fmt::Display> fmt::Display for LoadError<E> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      LoadError::Failed(err) => write!(f, "loader failed: {}", err),
      LoadError::Panicked => write!(f, "loader panicked"),
      LoadError::Abandoned => write!(f, "computation was abandoned before it ran"),
    }
  }
}

impl<E: std::error::Error + 'static> std::error::Error for LoadError<E> {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      LoadError::Failed(err) => Some(err.as_ref()),
      LoadError::Panicked | LoadError::Abandoned => None,
    }
  }
}
