//! Minimal reactive-streams contract: demand-driven producers and consumers.
//!
//! Items are delivered only after the consumer has requested them through a
//! [`Subscription`], at most one terminal signal is ever delivered, and
//! signals for one subscription are never delivered concurrently. These are
//! obligations on implementors; nothing in this module enforces them at
//! runtime.

use std::sync::Arc;

use crate::Error;

/// Link between a producer and a consumer, held by the consumer to pull
/// demand upstream or abort the stream.
pub trait Subscription: Send + Sync {
  /// Authorizes the producer to emit up to `n` more items.
  ///
  /// Requests are additive. `request(0)` is a no-op.
  fn request(&self, n: u64);

  /// Asks the producer to stop emitting and release its resources.
  ///
  /// Idempotent; signals already in flight may still arrive.
  fn cancel(&self);
}

/// Consumer of a demand-driven stream.
pub trait Subscriber<T>: Send {
  /// Called once, before any other signal, with the subscription used to
  /// request demand.
  fn on_subscribe(&mut self, subscription: Arc<dyn Subscription>);

  /// Called once per previously requested item.
  fn on_next(&mut self, item: T);

  /// Terminal signal: the producer finished successfully.
  fn on_complete(&mut self);

  /// Terminal signal: the producer failed.
  fn on_error(&mut self, err: Error);
}

/// Producer of a demand-driven stream.
///
/// `subscribe` consumes the publisher: each publisher drives exactly one
/// subscriber, which keeps the single-producer queue assumption downstream
/// true by construction.
pub trait Publisher<T>: Send {
  /// Attaches `subscriber` and begins the demand protocol.
  fn subscribe(self: Box<Self>, subscriber: Box<dyn Subscriber<T>>);
}
