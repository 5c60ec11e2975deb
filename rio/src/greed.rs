//! Greed level of the write consumer.
//!
//! Greed decides how aggressively demand is pulled from the upstream
//! producer: how many chunks to request per cycle (`amount`) and how many
//! chunks before the previous batch runs out the next request is issued
//! (`shift`). `shift = 0` requests only once the batch is exhausted; a shift
//! close to `amount` requests almost immediately, overlapping upstream
//! production with channel I/O.

use std::sync::{
  Arc, OnceLock,
  atomic::{AtomicU64, Ordering},
};

use crate::{Error, stream::Subscription};

/// Environment variable holding the default request amount.
pub const AMOUNT_ENV: &str = "RIO_WRITE_GREED_AMOUNT";
/// Environment variable holding the default request shift.
pub const SHIFT_ENV: &str = "RIO_WRITE_GREED_SHIFT";

const DEFAULT_AMOUNT: u64 = 3;
const DEFAULT_SHIFT: u64 = 1;

/// Demand strategy of a write consumer.
pub trait WriteGreed: Send + Sync {
  /// Called once per received-item notification; issues a new demand
  /// request on `sub` when the strategy decides it is time.
  ///
  /// Returns whether a request was issued by this call.
  fn request(&self, sub: &dyn Subscription) -> bool;

  /// Notifies the strategy that an item was actually processed.
  fn received(&self) {}

  /// Converts into adaptive mode, when the strategy supports it.
  ///
  /// The default implementation returns the strategy unchanged.
  fn adaptive(self: Arc<Self>) -> Arc<dyn WriteGreed>
  where
    Self: Sized + 'static,
  {
    self
  }
}

/// Strategy requesting a constant amount on a fixed cadence.
pub struct Constant {
  amount: u64,
  shift: u64,
  cnt: AtomicU64,
}

impl Constant {
  /// New constant greed level.
  ///
  /// # Errors
  ///
  /// Fails with [`Error::Config`] when `amount` is zero or `shift` is not
  /// strictly less than `amount`. Nothing is constructed on failure.
  pub fn new(amount: u64, shift: u64) -> Result<Self, Error> {
    if amount == 0 {
      return Err(Error::Config("greed amount must be at least 1".into()));
    }
    if shift >= amount {
      return Err(Error::Config(format!(
        "greed shift ({shift}) must be less than amount ({amount})"
      )));
    }
    Ok(Self { amount, shift, cnt: AtomicU64::new(0) })
  }

  /// One chunk per request, no overlap.
  #[must_use]
  pub fn single() -> Self {
    Self { amount: 1, shift: 0, cnt: AtomicU64::new(0) }
  }

  /// Adaptive variant of this strategy with a caller-supplied tuning
  /// policy.
  #[must_use]
  pub fn adaptive_with(&self, policy: Box<dyn AdaptivePolicy>) -> Adaptive {
    Adaptive {
      amount: AtomicU64::new(self.amount),
      shift: self.shift,
      cnt: AtomicU64::new(0),
      policy,
    }
  }
}

impl WriteGreed for Constant {
  fn request(&self, sub: &dyn Subscription) -> bool {
    let pos = self.cnt.fetch_add(1, Ordering::Relaxed);
    // a new batch of `amount` is due `shift` items before the previous
    // batch is fully consumed
    let due = pos == 0 || pos % (self.amount - self.shift + 1) == 0;
    if due {
      sub.request(self.amount);
    }
    due
  }

  fn adaptive(self: Arc<Self>) -> Arc<dyn WriteGreed> {
    Arc::new(self.adaptive_with(Box::new(Steady)))
  }
}

/// Tuning hook consulted by [`Adaptive`] after every processed item.
///
/// The adaptation heuristic is deliberately not fixed by this crate; plug
/// one in through [`Constant::adaptive_with`].
pub trait AdaptivePolicy: Send + Sync {
  /// Returns the request amount to use from the next cycle on, or `None`
  /// to keep the current one. Amounts below 1 are clamped to 1.
  fn adjust(&self, current: u64) -> Option<u64>;
}

/// Default policy: keep the configured amount.
struct Steady;

impl AdaptivePolicy for Steady {
  fn adjust(&self, _current: u64) -> Option<u64> {
    None
  }
}

/// Strategy derived from a [`Constant`] whose effective request amount may
/// vary over the life of the stream.
pub struct Adaptive {
  amount: AtomicU64,
  shift: u64,
  cnt: AtomicU64,
  policy: Box<dyn AdaptivePolicy>,
}

impl WriteGreed for Adaptive {
  fn request(&self, sub: &dyn Subscription) -> bool {
    let amount = self.amount.load(Ordering::Relaxed);
    // the configured shift may exceed an adapted amount; keep the
    // cadence divisor positive
    let shift = self.shift.min(amount - 1);
    let pos = self.cnt.fetch_add(1, Ordering::Relaxed);
    let due = pos == 0 || pos % (amount - shift + 1) == 0;
    if due {
      sub.request(amount);
    }
    due
  }

  fn received(&self) {
    let current = self.amount.load(Ordering::Relaxed);
    if let Some(next) = self.policy.adjust(current) {
      self.amount.store(next.max(1), Ordering::Relaxed);
    }
  }
}

/// Greed level from `RIO_WRITE_GREED_AMOUNT` / `RIO_WRITE_GREED_SHIFT`,
/// or `(3, 1)` by default.
///
/// The environment is read once per process. An invalid pair falls back to
/// the defaults instead of poisoning every later write; explicit
/// [`Constant::new`] misuse still fails fast. Each call returns a fresh
/// strategy so independent writes never share a cadence counter.
#[must_use]
pub fn system() -> Arc<dyn WriteGreed> {
  let (amount, shift) = *system_params();
  // parameters were validated when first read
  Arc::new(Constant { amount, shift, cnt: AtomicU64::new(0) })
}

fn system_params() -> &'static (u64, u64) {
  static PARAMS: OnceLock<(u64, u64)> = OnceLock::new();
  PARAMS.get_or_init(|| {
    let amount = env_u64(AMOUNT_ENV).unwrap_or(DEFAULT_AMOUNT);
    let shift = env_u64(SHIFT_ENV).unwrap_or(DEFAULT_SHIFT);
    if amount == 0 || shift >= amount {
      #[cfg(feature = "tracing")]
      tracing::warn!(
        amount,
        shift,
        "invalid greed configuration, falling back to defaults"
      );
      return (DEFAULT_AMOUNT, DEFAULT_SHIFT);
    }
    (amount, shift)
  })
}

fn env_u64(name: &str) -> Option<u64> {
  std::env::var(name).ok()?.trim().parse().ok()
}
