//! Read-side adapter: a blocking reader exposed as a demand-driven
//! publisher.
//!
//! Production is pulled by downstream demand: `request(n)` adds to a demand
//! counter and schedules the read loop through the executor; the loop pulls
//! one chunk per unit of demand and goes idle when demand runs out, with
//! the same flag-flip-and-recheck discipline as the write loop.

use std::{
  io::{self, Read},
  sync::{
    Arc,
    atomic::{AtomicBool, AtomicU64, Ordering},
  },
};

use bytes::Bytes;

use crate::{
  Buffers, Error,
  exec::Executor,
  stream::{Publisher, Subscriber, Subscription},
  sync::Mutex,
};

/// Lazy channel constructor: nothing is opened until demand arrives.
pub(crate) type Source<T> = Box<dyn FnOnce() -> io::Result<T> + Send>;

/// Readable byte channel, adapted into a [`Publisher`] of chunks.
pub struct ReadableChannel<R> {
  source: Source<R>,
}

impl<R> ReadableChannel<R>
where
  R: Read + Send + 'static,
{
  /// New adapter over a lazily opened channel.
  pub fn new<F>(source: F) -> Self
  where
    F: FnOnce() -> io::Result<R> + Send + 'static,
  {
    Self { source: Box::new(source) }
  }

  /// Publisher of the channel's content in chunks of at most the
  /// `buffers` policy size.
  ///
  /// Reads are blocking calls performed on `exec`'s threads; the executor
  /// must run tasks off the caller's thread (a pool, not an inline
  /// executor).
  #[must_use]
  pub fn read(self, buffers: Buffers, exec: Arc<dyn Executor>) -> ReadPublisher<R> {
    ReadPublisher { source: self.source, buffers, exec }
  }
}

/// Demand-driven content publisher of a readable channel.
pub struct ReadPublisher<R> {
  source: Source<R>,
  buffers: Buffers,
  exec: Arc<dyn Executor>,
}

impl<R> Publisher<Bytes> for ReadPublisher<R>
where
  R: Read + Send + 'static,
{
  fn subscribe(self: Box<Self>, subscriber: Box<dyn Subscriber<Bytes>>) {
    let state = Arc::new(ReadState {
      source: Mutex::new(Some(self.source)),
      channel: Mutex::new(None),
      subscriber: Mutex::new(None),
      demand: AtomicU64::new(0),
      running: AtomicBool::new(false),
      done: AtomicBool::new(false),
      buffers: self.buffers,
      exec: self.exec,
    });
    let subscription = Arc::new(ReadSubscription { state: state.clone() });
    // store the subscriber before handing out the subscription, so a
    // synchronous request cannot observe an empty slot; signals stay
    // ordered because the loop needs this same lock to deliver
    let mut slot = state.subscriber.lock();
    *slot = Some(subscriber);
    slot.as_mut().expect("stored above").on_subscribe(subscription);
  }
}

struct ReadState<R> {
  source: Mutex<Option<Source<R>>>,
  channel: Mutex<Option<R>>,
  subscriber: Mutex<Option<Box<dyn Subscriber<Bytes>>>>,
  demand: AtomicU64,
  running: AtomicBool,
  done: AtomicBool,
  buffers: Buffers,
  exec: Arc<dyn Executor>,
}

struct ReadSubscription<R> {
  state: Arc<ReadState<R>>,
}

impl<R> ReadSubscription<R>
where
  R: Read + Send + 'static,
{
  fn schedule(&self) {
    let state = &self.state;
    if state
      .running
      .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
      .is_ok()
    {
      let state = Arc::clone(state);
      let exec = state.exec.clone();
      exec.execute(Box::new(move || run(&state)));
    }
  }
}

impl<R> Subscription for ReadSubscription<R>
where
  R: Read + Send + 'static,
{
  fn request(&self, n: u64) {
    if n == 0 {
      return;
    }
    let _ = self.state.demand.fetch_update(
      Ordering::AcqRel,
      Ordering::Acquire,
      |d| Some(d.saturating_add(n)),
    );
    if !self.state.done.load(Ordering::Acquire) {
      self.schedule();
    }
  }

  fn cancel(&self) {
    if self.state.done.swap(true, Ordering::AcqRel) {
      return;
    }
    // cleanup belongs to whichever loop instance owns the flag; if none
    // does, claim it and run the terminal pass ourselves
    self.schedule();
  }
}

enum Pulled {
  Chunk(Bytes),
  Eof,
  Fail(Error),
}

/// Read loop body; exclusive via the `running` flag.
fn run<R>(state: &Arc<ReadState<R>>)
where
  R: Read + Send + 'static,
{
  loop {
    if state.done.load(Ordering::Acquire) {
      cleanup(state);
      return;
    }
    if state.demand.load(Ordering::Acquire) == 0 {
      // go idle, then re-check for demand that raced the flag flip
      state.running.store(false, Ordering::Release);
      if (state.demand.load(Ordering::Acquire) > 0
        || state.done.load(Ordering::Acquire))
        && state
          .running
          .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
          .is_ok()
      {
        continue;
      }
      return;
    }
    match pull(state) {
      Pulled::Chunk(chunk) => {
        state.demand.fetch_sub(1, Ordering::AcqRel);
        if let Some(sub) = state.subscriber.lock().as_mut() {
          sub.on_next(chunk);
        }
      }
      Pulled::Eof => {
        state.done.store(true, Ordering::Release);
        if let Some(sub) = state.subscriber.lock().as_mut() {
          sub.on_complete();
        }
      }
      Pulled::Fail(err) => {
        state.done.store(true, Ordering::Release);
        if let Some(sub) = state.subscriber.lock().as_mut() {
          sub.on_error(err);
        }
      }
    }
  }
}

/// Opens the channel on first use and reads one chunk.
fn pull<R>(state: &ReadState<R>) -> Pulled
where
  R: Read + Send + 'static,
{
  let mut slot = state.channel.lock();
  if slot.is_none() {
    let Some(open) = state.source.lock().take() else {
      return Pulled::Fail(Error::Io(io::Error::new(
        io::ErrorKind::NotConnected,
        "channel already closed",
      )));
    };
    match open() {
      Ok(chan) => *slot = Some(chan),
      Err(err) => return Pulled::Fail(Error::Io(err)),
    }
  }
  let chan = slot.as_mut().expect("attached above");
  let mut buf = vec![0u8; state.buffers.size()];
  loop {
    match chan.read(&mut buf) {
      Ok(0) => return Pulled::Eof,
      Ok(n) => {
        buf.truncate(n);
        return Pulled::Chunk(Bytes::from(buf));
      }
      Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
      Err(err) => return Pulled::Fail(Error::Io(err)),
    }
  }
}

/// Terminal pass: close the channel exactly once, drop the subscriber,
/// release the flag.
fn cleanup<R>(state: &ReadState<R>) {
  if let Some(chan) = state.channel.lock().take() {
    drop(chan);
  }
  // never-opened sources are released too
  state.source.lock().take();
  state.subscriber.lock().take();
  state.running.store(false, Ordering::Release);
}
