//! Write-side execution loop.
//!
//! The loop is not a dedicated thread: it is a unit of work resubmitted to
//! the executor whenever a request arrives and no instance is active. A
//! compare-and-set `running` flag is the sole mutual exclusion — at most one
//! thread is ever inside [`WriteTaskQueue::run`] for a given destination,
//! which is what guarantees writes are exclusive and in emission order.

use std::{
  io::{self, Write},
  sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
  },
  thread,
};

use bytes::Bytes;
use crossbeam_queue::SegQueue;

use crate::{
  Error,
  completion::Promise,
  exec::Executor,
  greed::WriteGreed,
  stream::Subscription,
  sync::Mutex,
};

/// One unit of work handed to the execution loop.
///
/// Produced by the write-side subscriber on each upstream signal, consumed
/// exactly once by the loop.
pub(crate) enum WriteRequest {
  /// A chunk to write to the channel.
  Data(Bytes),
  /// Upstream finished successfully.
  Complete,
  /// Upstream failed; preempts any queued data.
  Error(Error),
}

/// Shared slot for the upstream subscription.
///
/// Set once by the subscriber, taken exactly once at termination; whichever
/// thread performs the take owns the cancel-once decision.
pub(crate) struct SubscriptionRef {
  slot: Mutex<Option<Arc<dyn Subscription>>>,
}

impl SubscriptionRef {
  pub(crate) fn new() -> Self {
    Self { slot: Mutex::new(None) }
  }

  pub(crate) fn set(&self, sub: Arc<dyn Subscription>) {
    *self.slot.lock() = Some(sub);
  }

  pub(crate) fn get(&self) -> Option<Arc<dyn Subscription>> {
    self.slot.lock().clone()
  }

  pub(crate) fn take(&self) -> Option<Arc<dyn Subscription>> {
    self.slot.lock().take()
  }
}

/// Write subscription task loop.
pub(crate) struct WriteTaskQueue<W> {
  promise: Promise,
  channel: Mutex<Option<W>>,
  sub: SubscriptionRef,
  queue: SegQueue<WriteRequest>,
  greed: Arc<dyn WriteGreed>,
  exec: Arc<dyn Executor>,
  running: AtomicBool,
}

impl<W> WriteTaskQueue<W>
where
  W: Write + Send + 'static,
{
  pub(crate) fn new(
    promise: Promise,
    greed: Arc<dyn WriteGreed>,
    exec: Arc<dyn Executor>,
  ) -> Self {
    Self {
      promise,
      channel: Mutex::new(None),
      sub: SubscriptionRef::new(),
      queue: SegQueue::new(),
      greed,
      exec,
      running: AtomicBool::new(false),
    }
  }

  /// Hands the opened channel to the loop. Called once, before any data
  /// request is enqueued.
  pub(crate) fn attach(&self, channel: W) {
    *self.channel.lock() = Some(channel);
  }

  /// Stores the upstream subscription for demand requests and the final
  /// cancel.
  pub(crate) fn subscribed(&self, sub: Arc<dyn Subscription>) {
    self.sub.set(sub);
  }

  pub(crate) fn promise(&self) -> &Promise {
    &self.promise
  }

  /// Asks the loop to accept a write request.
  ///
  /// Drops the request once the completion is resolved: terminal state is
  /// absorbing. A late signal still schedules a loop pass so an external
  /// abort gets its channel closed and subscription cancelled.
  pub(crate) fn accept(self: &Arc<Self>, req: WriteRequest) {
    if self.promise.is_done() {
      self.schedule();
      return;
    }
    if matches!(req, WriteRequest::Error(_)) {
      // an error preempts pending writes; queued chunks are never delivered
      while self.queue.pop().is_some() {}
    }
    self.queue.push(req);
    self.schedule();
  }

  fn schedule(self: &Arc<Self>) {
    if self
      .running
      .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
      .is_ok()
    {
      let task = Arc::clone(self);
      self.exec.execute(Box::new(move || task.run()));
    }
  }

  /// Loop body. Runs with exclusive ownership of the `running` flag.
  pub(crate) fn run(self: &Arc<Self>) {
    let mut retry = false;
    while !self.promise.is_done() {
      // pull the next batch of demand per greed strategy, except on the
      // pass right after an empty-queue recovery, to avoid duplicates
      let requested = !retry && self.request_more();
      let mut next = self.queue.pop();
      if !requested && next.is_none() {
        // demand is already in flight and nothing is queued yet
        thread::yield_now();
        retry = false;
        continue;
      }
      if next.is_none() {
        // mark this loop as finished
        self.running.store(false, Ordering::Release);
        // recover: a producer may have enqueued between the poll and the
        // flag flip; reclaim the flag and keep draining if so
        if !self.queue.is_empty()
          && self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
          if self.promise.is_done() {
            break;
          }
          next = self.queue.pop();
        } else {
          // idle, or already reclaimed by the next scheduled loop
          return;
        }
      }
      let Some(req) = next else {
        // reclaimed the flag but lost the item to a racing pass
        retry = true;
        continue;
      };
      retry = false;
      self.greed.received();
      self.process(req);
    }
    self.terminate();
  }

  fn request_more(&self) -> bool {
    match self.sub.get() {
      Some(sub) => self.greed.request(sub.as_ref()),
      None => false,
    }
  }

  fn process(&self, req: WriteRequest) {
    match req {
      WriteRequest::Data(chunk) => {
        let result = match self.channel.lock().as_mut() {
          Some(chan) => chan.write_all(&chunk),
          None => Err(io::Error::new(
            io::ErrorKind::NotConnected,
            "channel was never attached",
          )),
        };
        if let Err(err) = result {
          // captured here and surfaced through the completion handle,
          // never unwound across the executor boundary
          self.promise.resolve(Err(Error::Io(err)));
        }
      }
      WriteRequest::Complete => {
        self.promise.resolve(Ok(()));
      }
      WriteRequest::Error(err) => {
        self.promise.resolve(Err(err));
      }
    }
  }

  /// Terminal transition: close the channel once, cancel the subscription
  /// once, release the flag. The completion is already resolved.
  fn terminate(&self) {
    if let Some(mut chan) = self.channel.lock().take() {
      // the primary outcome is already decided; a failing flush is only
      // worth a log line
      if let Err(_err) = chan.flush() {
        #[cfg(feature = "tracing")]
        tracing::warn!(error = %_err, "failed to flush channel on close");
      }
      drop(chan);
    }
    if let Some(sub) = self.sub.take() {
      sub.cancel();
    }
    self.running.store(false, Ordering::Release);
  }
}
