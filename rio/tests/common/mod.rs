//! Shared test doubles: a demand-honoring publisher, a collecting
//! subscriber, a manually pumped executor and an in-memory channel.
#![allow(dead_code)]

use std::{
  collections::VecDeque,
  io,
  path::PathBuf,
  sync::{
    Arc, Mutex,
    atomic::{AtomicBool, AtomicU64, Ordering},
  },
  time::{Duration, Instant},
};

use bytes::Bytes;
use rio::{
  Error,
  exec::{Executor, Task},
  stream::{Publisher, Subscriber, Subscription},
};

/// Unique path under the system temp dir.
pub fn temp_path(tag: &str) -> PathBuf {
  std::env::temp_dir().join(format!("rio_test_{tag}_{:x}", fastrand::u64(..)))
}

/// Terminal signal a [`SeqPublisher`] ends with.
pub enum Terminal {
  Complete,
  Error(String),
}

/// Publisher emitting a fixed chunk sequence, honoring requested demand,
/// then a terminal signal. `trailing` chunks, when set, are emitted right
/// after the terminal signal to simulate a protocol-violating producer.
pub struct SeqPublisher {
  pub chunks: Vec<Bytes>,
  pub terminal: Terminal,
  pub trailing: Vec<Bytes>,
}

impl SeqPublisher {
  pub fn complete(chunks: Vec<Bytes>) -> Self {
    Self { chunks, terminal: Terminal::Complete, trailing: Vec::new() }
  }

  pub fn failing(chunks: Vec<Bytes>, msg: &str) -> Self {
    Self {
      chunks,
      terminal: Terminal::Error(msg.into()),
      trailing: Vec::new(),
    }
  }
}

struct SeqState {
  items: Mutex<VecDeque<Bytes>>,
  terminal: Mutex<Option<Terminal>>,
  trailing: Mutex<Vec<Bytes>>,
  demand: AtomicU64,
  emitting: AtomicBool,
  cancelled: AtomicBool,
  subscriber: Mutex<Option<Box<dyn Subscriber<Bytes>>>>,
}

#[derive(Debug)]
struct Boom(String);

impl std::fmt::Display for Boom {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(&self.0)
  }
}

impl std::error::Error for Boom {}

impl Publisher<Bytes> for SeqPublisher {
  fn subscribe(self: Box<Self>, mut subscriber: Box<dyn Subscriber<Bytes>>) {
    let state = Arc::new(SeqState {
      items: Mutex::new(self.chunks.into()),
      terminal: Mutex::new(Some(self.terminal)),
      trailing: Mutex::new(self.trailing),
      demand: AtomicU64::new(0),
      emitting: AtomicBool::new(false),
      cancelled: AtomicBool::new(false),
      subscriber: Mutex::new(None),
    });
    subscriber.on_subscribe(Arc::new(SeqSubscription { state: state.clone() }));
    *state.subscriber.lock().unwrap() = Some(subscriber);
    drain(&state);
  }
}

struct SeqSubscription {
  state: Arc<SeqState>,
}

impl Subscription for SeqSubscription {
  fn request(&self, n: u64) {
    if n == 0 {
      return;
    }
    let _ = self.state.demand.fetch_update(
      Ordering::SeqCst,
      Ordering::SeqCst,
      |d| Some(d.saturating_add(n)),
    );
    drain(&self.state);
  }

  fn cancel(&self) {
    self.state.cancelled.store(true, Ordering::SeqCst);
  }
}

fn drain(state: &Arc<SeqState>) {
  if state
    .emitting
    .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
    .is_err()
  {
    return;
  }
  loop {
    // demand requested from inside on_subscribe lands before the
    // subscriber slot is filled; subscribe() drains again afterwards
    if state.subscriber.lock().unwrap().is_none() {
      state.emitting.store(false, Ordering::SeqCst);
      return;
    }
    while !state.cancelled.load(Ordering::SeqCst)
      && state.demand.load(Ordering::SeqCst) > 0
    {
      let Some(chunk) = state.items.lock().unwrap().pop_front() else {
        break;
      };
      state.demand.fetch_sub(1, Ordering::SeqCst);
      if let Some(sub) = state.subscriber.lock().unwrap().as_mut() {
        sub.on_next(chunk);
      }
    }
    if !state.cancelled.load(Ordering::SeqCst)
      && state.items.lock().unwrap().is_empty()
    {
      if let Some(terminal) = state.terminal.lock().unwrap().take() {
        let mut guard = state.subscriber.lock().unwrap();
        if let Some(sub) = guard.as_mut() {
          match terminal {
            Terminal::Complete => sub.on_complete(),
            Terminal::Error(msg) => sub.on_error(Error::upstream(Boom(msg))),
          }
          // a well-behaved producer stops here; `trailing` deliberately
          // violates the protocol
          for late in state.trailing.lock().unwrap().drain(..) {
            sub.on_next(late);
          }
        }
      }
    }
    state.emitting.store(false, Ordering::SeqCst);
    // recheck: a request may have landed while we were finishing up
    let more = !state.cancelled.load(Ordering::SeqCst)
      && state.demand.load(Ordering::SeqCst) > 0
      && !state.items.lock().unwrap().is_empty();
    if !(more
      && state
        .emitting
        .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
        .is_ok())
    {
      return;
    }
  }
}

/// Collects everything a publisher emits.
pub struct Collector {
  state: Arc<CollectorState>,
  /// Demand requested on subscribe.
  pub initial: u64,
  /// Demand requested after each received chunk (0 = none).
  pub per_chunk: u64,
}

pub struct CollectorState {
  pub chunks: Mutex<Vec<Bytes>>,
  pub completed: AtomicBool,
  pub error: Mutex<Option<Error>>,
  pub subscription: Mutex<Option<Arc<dyn Subscription>>>,
}

impl Collector {
  pub fn unbounded() -> (Self, Arc<CollectorState>) {
    Self::with_demand(u64::MAX, 0)
  }

  pub fn with_demand(initial: u64, per_chunk: u64) -> (Self, Arc<CollectorState>) {
    let state = Arc::new(CollectorState {
      chunks: Mutex::new(Vec::new()),
      completed: AtomicBool::new(false),
      error: Mutex::new(None),
      subscription: Mutex::new(None),
    });
    (Self { state: state.clone(), initial, per_chunk }, state)
  }
}

impl CollectorState {
  pub fn bytes(&self) -> Vec<u8> {
    let mut out = Vec::new();
    for chunk in self.chunks.lock().unwrap().iter() {
      out.extend_from_slice(chunk);
    }
    out
  }

  pub fn is_terminal(&self) -> bool {
    self.completed.load(Ordering::SeqCst)
      || self.error.lock().unwrap().is_some()
  }

  /// Spins until a terminal signal arrives; panics after `timeout`.
  pub fn await_terminal(&self, timeout: Duration) {
    let deadline = Instant::now() + timeout;
    while !self.is_terminal() {
      assert!(Instant::now() < deadline, "no terminal signal in time");
      std::thread::yield_now();
    }
  }
}

impl Subscriber<Bytes> for Collector {
  fn on_subscribe(&mut self, subscription: Arc<dyn Subscription>) {
    *self.state.subscription.lock().unwrap() = Some(subscription.clone());
    subscription.request(self.initial);
  }

  fn on_next(&mut self, item: Bytes) {
    self.state.chunks.lock().unwrap().push(item);
    if self.per_chunk > 0 {
      if let Some(sub) = self.state.subscription.lock().unwrap().as_ref() {
        sub.request(self.per_chunk);
      }
    }
  }

  fn on_complete(&mut self) {
    self.state.completed.store(true, Ordering::SeqCst);
  }

  fn on_error(&mut self, err: Error) {
    *self.state.error.lock().unwrap() = Some(err);
  }
}

/// Executor collecting tasks until the test pumps them.
#[derive(Default)]
pub struct Deferred {
  tasks: Mutex<VecDeque<Task>>,
}

impl Deferred {
  pub fn pump(&self) {
    loop {
      let Some(task) = self.tasks.lock().unwrap().pop_front() else {
        return;
      };
      task();
    }
  }

  pub fn pending(&self) -> usize {
    self.tasks.lock().unwrap().len()
  }
}

impl Executor for Deferred {
  fn execute(&self, task: Task) {
    self.tasks.lock().unwrap().push_back(task);
  }
}

/// In-memory write channel backed by a shared byte vector.
#[derive(Clone, Default)]
pub struct MemChannel {
  buf: Arc<Mutex<Vec<u8>>>,
}

impl MemChannel {
  pub fn bytes(&self) -> Vec<u8> {
    self.buf.lock().unwrap().clone()
  }
}

impl io::Write for MemChannel {
  fn write(&mut self, data: &[u8]) -> io::Result<usize> {
    self.buf.lock().unwrap().extend_from_slice(data);
    Ok(data.len())
  }

  fn flush(&mut self) -> io::Result<()> {
    Ok(())
  }
}
