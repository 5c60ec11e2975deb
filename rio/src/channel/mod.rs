//! Byte-channel adapters between demand-driven streams and blocking I/O.
//!
//! [`WritableChannel`] bridges a push-based producer into ordered,
//! exclusive blocking writes; [`ReadableChannel`] exposes a blocking reader
//! as a demand-driven chunk publisher. Channels are opened lazily and
//! closed exactly once.

mod read;
mod write;

pub use read::{ReadPublisher, ReadableChannel};

use std::{
  io::{self, Write},
  sync::Arc,
};

use bytes::Bytes;

use crate::{
  Completion, Error,
  exec::Executor,
  greed::WriteGreed,
  stream::{Publisher, Subscriber, Subscription},
};

use self::write::{WriteRequest, WriteTaskQueue};

/// Writable byte channel, adapted into a backpressured consumer of chunk
/// publishers.
pub struct WritableChannel<W> {
  source: read::Source<W>,
}

impl<W> WritableChannel<W>
where
  W: Write + Send + 'static,
{
  /// New adapter over a lazily opened channel.
  ///
  /// The channel is acquired only once the stream subscribes and demand is
  /// about to flow; an open failure resolves the returned completion.
  pub fn new<F>(source: F) -> Self
  where
    F: FnOnce() -> io::Result<W> + Send + 'static,
  {
    Self { source: Box::new(source) }
  }

  /// Writes the chunks emitted by `data` to the channel, pulling demand
  /// according to `greed` and running blocking writes on `exec`.
  ///
  /// Chunks are written in emission order, by at most one thread at a
  /// time. The returned [`Completion`] resolves once: on upstream
  /// completion, on the first error, or on the first failed write —
  /// whichever comes first. Queued but unwritten chunks are discarded on
  /// error.
  pub fn write<P>(
    self,
    data: P,
    greed: Arc<dyn WriteGreed>,
    exec: Arc<dyn Executor>,
  ) -> Completion
  where
    P: Publisher<Bytes> + 'static,
  {
    let (completion, promise) = Completion::pair();
    let queue =
      Arc::new(WriteTaskQueue::new(promise, greed.clone(), exec));
    Box::new(data).subscribe(Box::new(WriteSubscriber {
      queue,
      source: Some(self.source),
      greed,
    }));
    completion
  }
}

/// Bridges upstream signals into [`WriteRequest`]s on the task queue.
struct WriteSubscriber<W> {
  queue: Arc<WriteTaskQueue<W>>,
  source: Option<read::Source<W>>,
  greed: Arc<dyn WriteGreed>,
}

impl<W> Subscriber<Bytes> for WriteSubscriber<W>
where
  W: Write + Send + 'static,
{
  fn on_subscribe(&mut self, subscription: Arc<dyn Subscription>) {
    let Some(open) = self.source.take() else {
      // subscribed twice; refuse the second stream
      subscription.cancel();
      return;
    };
    // deferred open: the channel is acquired here, right before the first
    // demand is requested
    match open() {
      Ok(chan) => {
        self.queue.attach(chan);
        self.queue.subscribed(subscription.clone());
        // first batch; the loop takes over the cadence from here, sharing
        // this strategy's counter
        self.greed.request(subscription.as_ref());
      }
      Err(err) => {
        self.queue.promise().resolve(Err(Error::Io(err)));
        subscription.cancel();
      }
    }
  }

  fn on_next(&mut self, item: Bytes) {
    self.queue.accept(WriteRequest::Data(item));
  }

  fn on_complete(&mut self) {
    self.queue.accept(WriteRequest::Complete);
  }

  fn on_error(&mut self, err: Error) {
    self.queue.accept(WriteRequest::Error(err));
  }
}
