//! Outcome handle of a write: the single channel of truth.
//!
//! Every failure mode of a write — upstream error, channel I/O error,
//! external cancellation — surfaces here, exactly once. The consumer side
//! is [`Completion`]; the producer side is the crate-internal [`Promise`],
//! whose first resolution wins and whose later resolutions are dropped.

use std::{
  future::Future,
  pin::Pin,
  sync::{
    Arc, Condvar, Mutex,
    atomic::{AtomicBool, Ordering},
  },
  task::{Context, Poll, Waker},
  time::{Duration, Instant},
};

use crate::Error;

struct Slot {
  outcome: Option<Result<(), Error>>,
  waker: Option<Waker>,
}

struct State {
  done: AtomicBool,
  slot: Mutex<Slot>,
  cv: Condvar,
}

impl State {
  fn resolve(&self, outcome: Result<(), Error>) -> bool {
    let mut slot = self.slot.lock().unwrap();
    if self.done.swap(true, Ordering::AcqRel) {
      return false;
    }
    slot.outcome = Some(outcome);
    if let Some(waker) = slot.waker.take() {
      waker.wake();
    }
    drop(slot);
    self.cv.notify_all();
    true
  }
}

/// Resolvable side of a [`Completion`]. First resolution wins.
#[derive(Clone)]
pub(crate) struct Promise {
  state: Arc<State>,
}

impl Promise {
  /// Whether the completion reached its terminal state.
  #[inline]
  pub(crate) fn is_done(&self) -> bool {
    self.state.done.load(Ordering::Acquire)
  }

  /// Resolves the completion, returning whether this call was the first.
  pub(crate) fn resolve(&self, outcome: Result<(), Error>) -> bool {
    self.state.resolve(outcome)
  }
}

/// Cancels the write tracked by a [`Completion`], from any thread.
///
/// Detached from the completion's lifetime: a timeout mechanism can keep
/// a clone around while the completion itself is consumed by
/// [`Completion::wait_timeout`].
#[derive(Clone)]
pub struct AbortHandle {
  state: Arc<State>,
}

impl AbortHandle {
  /// Resolves the completion with [`Error::Cancelled`].
  ///
  /// First resolution wins: returns `false` when the write already
  /// terminated. On success the execution loop observes the terminal
  /// state on its next pass and closes the channel and cancels the
  /// upstream subscription, exactly once.
  pub fn abort(&self) -> bool {
    self.state.resolve(Err(Error::Cancelled))
  }

  /// Whether the write already terminated.
  #[inline]
  #[must_use]
  pub fn is_done(&self) -> bool {
    self.state.done.load(Ordering::Acquire)
  }
}

/// Handle resolved exactly once when a write terminates, successfully or
/// not.
///
/// Can be awaited as a [`Future`] or waited on with [`Completion::wait`].
/// Both consume the handle; the outcome is delivered once.
pub struct Completion {
  state: Arc<State>,
}

impl Completion {
  pub(crate) fn pair() -> (Completion, Promise) {
    let state = Arc::new(State {
      done: AtomicBool::new(false),
      slot: Mutex::new(Slot { outcome: None, waker: None }),
      cv: Condvar::new(),
    });
    (Completion { state: state.clone() }, Promise { state })
  }

  /// Whether the write already terminated.
  #[inline]
  #[must_use]
  pub fn is_done(&self) -> bool {
    self.state.done.load(Ordering::Acquire)
  }

  /// Handle for cancelling the write externally.
  #[must_use]
  pub fn abort_handle(&self) -> AbortHandle {
    AbortHandle { state: self.state.clone() }
  }

  /// Blocks the current thread until the write terminates.
  pub fn wait(self) -> Result<(), Error> {
    let mut slot = self.state.slot.lock().unwrap();
    loop {
      if let Some(outcome) = slot.outcome.take() {
        return outcome;
      }
      slot = self.state.cv.wait(slot).unwrap();
    }
  }

  /// Blocks until the write terminates or `timeout` expires.
  ///
  /// Returns `None` on timeout, leaving the write running; a previously
  /// taken [`AbortHandle`] can still cancel it.
  pub fn wait_timeout(self, timeout: Duration) -> Option<Result<(), Error>> {
    let start = Instant::now();
    let mut slot = self.state.slot.lock().unwrap();
    loop {
      if let Some(outcome) = slot.outcome.take() {
        return Some(outcome);
      }
      let elapsed = start.elapsed();
      if elapsed >= timeout {
        return None;
      }
      // loop handles spurious wakeups
      let (guard, _) =
        self.state.cv.wait_timeout(slot, timeout - elapsed).unwrap();
      slot = guard;
    }
  }
}

impl Future for Completion {
  type Output = Result<(), Error>;

  fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
    let mut slot = self.state.slot.lock().unwrap();
    if let Some(outcome) = slot.outcome.take() {
      return Poll::Ready(outcome);
    }
    slot.waker = Some(cx.waker().clone());
    Poll::Pending
  }
}
