//! Reactive file API: plumbing over channel construction.

use std::{fs, path::PathBuf, sync::Arc};

use bytes::Bytes;

use crate::{
  Buffers, Completion,
  channel::{ReadPublisher, ReadableChannel, WritableChannel},
  exec::{self, Executor},
  greed::{self, WriteGreed},
  stream::Publisher,
};

/// A file addressed by path, read and written as chunk streams.
///
/// Nothing is opened until a stream subscribes and demand flows.
pub struct File {
  path: PathBuf,
}

impl File {
  /// New file facade; the path does not have to exist yet.
  pub fn new<P: Into<PathBuf>>(path: P) -> Self {
    Self { path: path.into() }
  }

  /// The file's content, in chunks of the default policy
  /// ([`Buffers::K8`]), read on the shared executor.
  #[must_use]
  pub fn content(&self) -> ReadPublisher<fs::File> {
    self.content_with(Buffers::K8)
  }

  /// The file's content with an explicit chunk-size policy.
  #[must_use]
  pub fn content_with(&self, buffers: Buffers) -> ReadPublisher<fs::File> {
    self.content_with_on(buffers, exec::shared())
  }

  /// The file's content, read on a caller-supplied executor.
  #[must_use]
  pub fn content_on(&self, exec: Arc<dyn Executor>) -> ReadPublisher<fs::File> {
    self.content_with_on(Buffers::K8, exec)
  }

  /// The file's content with both an explicit chunk-size policy and an
  /// explicit executor.
  #[must_use]
  pub fn content_with_on(
    &self,
    buffers: Buffers,
    exec: Arc<dyn Executor>,
  ) -> ReadPublisher<fs::File> {
    self.reader().read(buffers, exec)
  }

  /// Writes the chunks emitted by `data` to this file with the
  /// process-default greed, creating the file when absent.
  pub fn write<P>(&self, data: P) -> Completion
  where
    P: Publisher<Bytes> + 'static,
  {
    self.write_with(data, greed::system(), None)
  }

  /// Writes with an explicit greed strategy and, optionally, explicit open
  /// options.
  ///
  /// When `options` is `None`, the file is opened for writing and created
  /// when absent (existing content past the written range is left alone).
  pub fn write_with<P>(
    &self,
    data: P,
    greed: Arc<dyn WriteGreed>,
    options: Option<fs::OpenOptions>,
  ) -> Completion
  where
    P: Publisher<Bytes> + 'static,
  {
    let opts = options.unwrap_or_else(|| {
      let mut opts = fs::OpenOptions::new();
      opts.write(true).create(true);
      opts
    });
    let path = self.path.clone();
    WritableChannel::new(move || opts.open(path))
      .write(data, greed, exec::shared())
  }

  fn reader(&self) -> ReadableChannel<fs::File> {
    let path = self.path.clone();
    ReadableChannel::new(move || fs::File::open(path))
  }
}
