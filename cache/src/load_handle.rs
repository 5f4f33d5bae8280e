use crate::error::LoadError;
use crate::loader::LoadFuture;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

/// A handle to the eventual result of a cache computation.
///
/// Every caller that asks for the same key while its computation is in
/// flight (or after it finished, until the entry is evicted or cleared)
/// receives a handle to the same underlying computation. The handle can be
/// `.await`ed, or waited on from synchronous code with [`LoadHandle::wait`].
///
/// Dropping a handle does not cancel the computation.
pub struct LoadHandle<V, E> {
  future: Arc<LoadFuture<V, E>>,
}

impl<V, E> LoadHandle<V, E> {
  pub(crate) fn new(future: Arc<LoadFuture<V, E>>) -> Self {
    Self { future }
  }

  /// Blocks the current thread until the computation resolves.
  pub fn wait(&self) -> Result<Arc<V>, LoadError<E>> {
    self.future.wait()
  }

  /// Returns the outcome if the computation has already resolved.
  pub fn try_get(&self) -> Option<Result<Arc<V>, LoadError<E>>> {
    self.future.try_get()
  }

  pub fn is_complete(&self) -> bool {
    self.future.is_complete()
  }

  /// Returns `true` if both handles observe the same computation.
  pub fn same_computation(&self, other: &Self) -> bool {
    Arc::ptr_eq(&self.future, &other.future)
  }
}

impl<V, E> Clone for LoadHandle<V, E> {
  fn clone(&self) -> Self {
    Self {
      future: Arc::clone(&self.future),
    }
  }
}

impl<V, E> fmt::Debug for LoadHandle<V, E> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("LoadHandle")
      .field("complete", &self.is_complete())
      .finish()
  }
}

impl<V, E> Future for LoadHandle<V, E> {
  type Output = Result<Arc<V>, LoadError<E>>;

  fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
    self.future.poll_outcome(cx)
  }
}
