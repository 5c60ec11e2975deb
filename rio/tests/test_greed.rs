use std::sync::{Arc, Mutex};

use proptest::prelude::*;
use rio::{
  greed::{Constant, WriteGreed},
  stream::Subscription,
};

#[derive(Default)]
struct Recording {
  requests: Mutex<Vec<u64>>,
}

impl Subscription for Recording {
  fn request(&self, n: u64) {
    self.requests.lock().unwrap().push(n);
  }

  fn cancel(&self) {}
}

proptest! {
  #[test]
  fn prop_request_cadence(
    amount in 1u64..64,
    shift_seed in any::<u64>(),
    calls in 1usize..400,
  ) {
    let shift = shift_seed % amount;
    let greed = Constant::new(amount, shift).unwrap();
    let sub = Recording::default();
    let period = amount - shift + 1;

    for pos in 0..calls as u64 {
      let before = sub.requests.lock().unwrap().len();
      let issued = greed.request(&sub);
      let after = sub.requests.lock().unwrap().len();

      // the first call always requests; the Nth subsequent call requests
      // iff N is a multiple of (amount - shift + 1)
      let expected = pos == 0 || pos % period == 0;
      prop_assert_eq!(issued, expected);
      prop_assert_eq!(after - before, usize::from(expected));
      if expected {
        prop_assert_eq!(
          sub.requests.lock().unwrap().last().copied(),
          Some(amount)
        );
      }
    }
  }

  #[test]
  fn prop_invalid_shift_fails_construction(
    amount in 0u64..32,
    extra in 0u64..32,
  ) {
    // shift >= amount (and amount == 0) are configuration errors
    let shift = amount + extra;
    prop_assert!(Constant::new(amount, shift).is_err());
  }
}

#[test]
fn shared_strategy_counter_spans_adapter_and_loop() {
  // one strategy instance drives both the initial request and the loop's
  // follow-ups; the cadence must not restart between them
  let greed: Arc<dyn WriteGreed> = Arc::new(Constant::new(4, 2).unwrap());
  let sub = Recording::default();
  // period = 4 - 2 + 1 = 3
  let issued: Vec<bool> = (0..7).map(|_| greed.request(&sub)).collect();
  assert_eq!(issued, vec![true, false, false, true, false, false, true]);
  assert_eq!(*sub.requests.lock().unwrap(), vec![4, 4, 4]);
}
