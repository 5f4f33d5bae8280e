use crate::error::LoadError;

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};
use std::thread::{self, Thread};

/// The user's compute function, type-erased so the cache can store it.
///
/// Infallible loaders registered with `CacheBuilder::loader` are wrapped so
/// that they always return `Ok`.
pub(crate) type Loader<K, V, E> = Arc<dyn Fn(&K) -> Result<V, E> + Send + Sync>;

/// The result every caller attached to one computation receives.
pub(crate) type LoadResult<V, E> = Result<Arc<V>, LoadError<E>>;

/// Represents a waiter in the queue for a `LoadFuture`.
pub(crate) enum Waiter {
  Sync(Thread),
  Async(Waker),
}

impl Waiter {
  fn wake(self) {
    match self {
      Waiter::Sync(thread) => thread.unpark(),
      Waiter::Async(waker) => waker.wake(),
    }
  }
}

/// The internal state of a value being loaded.
pub(crate) enum State<V, E> {
  Computing,
  Complete(Arc<V>),
  Failed(LoadError<E>),
}

impl<V, E> State<V, E> {
  /// Returns a copy of the final outcome, or `None` while still computing.
  fn outcome(&self) -> Option<LoadResult<V, E>> {
    match self {
      State::Computing => None,
      State::Complete(value) => Some(Ok(Arc::clone(value))),
      State::Failed(err) => Some(Err(err.clone())),
    }
  }
}

/// The internal, mutex-protected core of the LoadFuture.
pub(crate) struct Inner<V, E> {
  pub(crate) state: State<V, E>,
  pub(crate) waiters: VecDeque<Waiter>,
}

/// A write-once slot representing a value being computed for the cache.
///
/// It can be awaited by multiple sync threads and async tasks simultaneously.
/// The transition out of `Computing` happens exactly once; later attempts to
/// resolve it are ignored.
pub(crate) struct LoadFuture<V, E> {
  pub(crate) inner: Mutex<Inner<V, E>>,
}

impl<V, E> LoadFuture<V, E> {
  /// Creates a new `LoadFuture` in the "Computing" state.
  pub fn new() -> Self {
    Self {
      inner: Mutex::new(Inner {
        state: State::Computing,
        waiters: VecDeque::new(),
      }),
    }
  }

  /// Resolves the future, waking all waiters.
  ///
  /// Returns `false` if the future had already been resolved, in which case
  /// the stored outcome is left untouched.
  pub fn resolve(&self, result: LoadResult<V, E>) -> bool {
    let waiters = {
      let mut inner = self.inner.lock();
      if !matches!(inner.state, State::Computing) {
        return false;
      }
      inner.state = match result {
        Ok(value) => State::Complete(value),
        Err(err) => State::Failed(err),
      };
      std::mem::take(&mut inner.waiters)
    };

    for waiter in waiters {
      waiter.wake();
    }
    true
  }

  pub fn is_complete(&self) -> bool {
    !matches!(self.inner.lock().state, State::Computing)
  }

  pub fn try_get(&self) -> Option<LoadResult<V, E>> {
    self.inner.lock().state.outcome()
  }

  /// Blocks the current thread until the future is resolved.
  pub fn wait(&self) -> LoadResult<V, E> {
    let mut inner = self.inner.lock();
    loop {
      if let Some(outcome) = inner.state.outcome() {
        return outcome;
      }

      // Register once, then sleep. `park` may return spuriously, so the
      // state is re-checked on every pass.
      let current = thread::current();
      let already_registered = inner
        .waiters
        .iter()
        .any(|w| matches!(w, Waiter::Sync(parked) if parked.id() == current.id()));
      if !already_registered {
        inner.waiters.push_back(Waiter::Sync(current));
      }
      drop(inner);
      thread::park();
      inner = self.inner.lock();
    }
  }

  /// Polls the future from an async context.
  pub fn poll_outcome(&self, cx: &mut Context<'_>) -> Poll<LoadResult<V, E>> {
    let mut inner = self.inner.lock();
    if let Some(outcome) = inner.state.outcome() {
      return Poll::Ready(outcome);
    }

    let already_registered = inner
      .waiters
      .iter()
      .any(|w| matches!(w, Waiter::Async(waker) if waker.will_wake(cx.waker())));
    if !already_registered {
      inner.waiters.push_back(Waiter::Async(cx.waker().clone()));
    }
    Poll::Pending
  }
}
