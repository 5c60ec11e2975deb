//! Task scheduling seam.
//!
//! Execution loops are not dedicated threads: they are units of work
//! resubmitted to an [`Executor`] whenever new work arrives and no instance
//! is active. Channel reads and writes block the executor thread for their
//! duration, so the supplied executor needs enough threads that one stalled
//! channel does not starve the others.

use std::{
  sync::{Arc, OnceLock},
  thread::{self, JoinHandle},
};

use crossbeam_channel::{Receiver, Sender, unbounded};

/// A task submitted to an executor.
pub type Task = Box<dyn FnOnce() + Send>;

/// Schedules loop bodies onto worker threads.
pub trait Executor: Send + Sync {
  /// Runs `task` at some point, on some thread.
  fn execute(&self, task: Task);
}

/// Fixed pool of named worker threads draining a shared work queue.
pub struct Pool {
  work_tx: Sender<Task>,
  _workers: Vec<JoinHandle<()>>,
}

impl Pool {
  /// Pool sized to the machine's available parallelism.
  #[must_use]
  pub fn new() -> Self {
    let workers = thread::available_parallelism().map(|n| n.get()).unwrap_or(4);
    Self::with_threads(workers)
  }

  /// Pool with exactly `workers` threads.
  ///
  /// # Panics
  ///
  /// Panics if `workers` is zero or a worker thread cannot be spawned.
  #[must_use]
  pub fn with_threads(workers: usize) -> Self {
    assert!(workers > 0, "pool needs at least one worker");
    let (work_tx, work_rx) = unbounded::<Task>();
    let handles = (0..workers)
      .map(|id| {
        let work_rx: Receiver<Task> = work_rx.clone();
        thread::Builder::new()
          .name(format!("rio-worker-{id}"))
          .spawn(move || {
            // exits when the pool is dropped and the channel disconnects
            while let Ok(task) = work_rx.recv() {
              task();
            }
          })
          .expect("failed to spawn worker thread")
      })
      .collect();
    Self { work_tx, _workers: handles }
  }
}

impl Default for Pool {
  fn default() -> Self {
    Self::new()
  }
}

impl Executor for Pool {
  fn execute(&self, task: Task) {
    self.work_tx.send(task).expect("worker threads died");
  }
}

/// Process-wide default pool, created on first use and never torn down.
#[must_use]
pub fn shared() -> Arc<dyn Executor> {
  static SHARED: OnceLock<Arc<Pool>> = OnceLock::new();
  SHARED.get_or_init(|| Arc::new(Pool::new())).clone()
}
