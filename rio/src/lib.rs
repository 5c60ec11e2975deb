#![cfg_attr(docsrs, feature(doc_cfg))]

//! # Rio - Reactive byte-channel I/O with backpressure
//!
//! Rio exposes file-like byte channels as demand-driven streams: a source
//! that lazily emits chunks to a consumer, and a sink that writes chunks
//! delivered by a producer, with demand flowing upstream the whole way.
//!
//! ## Guarantees
//!
//! For every write destination, under any interleaving of producer and
//! consumer activity:
//! - at most one thread performs a write at a time,
//! - chunks are written in exactly the order they were emitted,
//! - termination (success, error, or cancellation) happens exactly once
//!   and always closes the underlying channel.
//!
//! ## Quick Start
//!
//! ```no_run
//! use rio::File;
//!
//! fn copy() -> Result<(), rio::Error> {
//!   let source = File::new("/tmp/source.bin");
//!   let target = File::new("/tmp/target.bin");
//!   target.write(source.content()).wait()
//! }
//! ```
//!
//! ## Demand and greed
//!
//! How aggressively the write side pulls chunks from the producer is the
//! *greed* level: `amount` chunks per request, issued `shift` chunks before
//! the previous batch runs out. The process default is `(3, 1)` and can be
//! overridden with the `RIO_WRITE_GREED_AMOUNT` / `RIO_WRITE_GREED_SHIFT`
//! environment variables, or per write through
//! [`File::write_with`] / [`WritableChannel::write`].
//!
//! ## Threading
//!
//! Loops are cooperative tasks resubmitted to an [`exec::Executor`]; no
//! thread is dedicated to a destination. Blocking reads and writes occupy
//! an executor thread for their duration, so size the pool accordingly.

pub mod buffers;
pub mod channel;
pub mod completion;
pub mod error;
pub mod exec;
pub mod greed;
pub mod stream;

mod file;
mod sync;

pub use buffers::Buffers;
pub use channel::{ReadableChannel, WritableChannel};
pub use completion::{AbortHandle, Completion};
pub use error::Error;
pub use file::File;
pub use greed::WriteGreed;
