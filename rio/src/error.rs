use std::{error, fmt, io};

/// Failure surfaced through a write [`Completion`] or a read
/// subscriber's `on_error` signal.
///
/// [`Completion`]: crate::Completion
#[derive(Debug)]
pub enum Error {
  /// Invalid configuration, detected before any I/O is attempted.
  Config(String),
  /// The underlying channel failed to open, read or write.
  Io(io::Error),
  /// The upstream producer signalled an error.
  Upstream(Box<dyn error::Error + Send + Sync>),
  /// The write was cancelled through its completion handle.
  Cancelled,
}

impl Error {
  /// Wraps an arbitrary upstream cause.
  pub fn upstream<E>(cause: E) -> Self
  where
    E: error::Error + Send + Sync + 'static,
  {
    Self::Upstream(Box::new(cause))
  }
}

impl fmt::Display for Error {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Config(msg) => write!(f, "invalid configuration: {msg}"),
      Self::Io(err) => err.fmt(f),
      Self::Upstream(cause) => write!(f, "upstream error: {cause}"),
      Self::Cancelled => f.write_str("write cancelled"),
    }
  }
}

impl error::Error for Error {
  fn source(&self) -> Option<&(dyn error::Error + 'static)> {
    match self {
      Self::Config(_) => None,
      Self::Io(err) => Some(err),
      Self::Upstream(cause) => Some(cause.as_ref()),
      Self::Cancelled => None,
    }
  }
}

impl From<io::Error> for Error {
  fn from(err: io::Error) -> Self {
    Self::Io(err)
  }
}
