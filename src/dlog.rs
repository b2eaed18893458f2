//! Discrete logarithms of small exponents
//!
//! Decrypted tally cells are group elements `g^k` with `k` bounded by the
//! number of ballots, so a table built by repeated multiplication recovers `k`.

use log::debug;
use num_bigint::BigUint;
use num_traits::One;
use std::collections::HashMap;

/// Memoized `base^k mod modulus -> k`, extended on demand
#[derive(Clone, Debug)]
pub struct DLogTable {
    dlogs: HashMap<BigUint, u64>,
    last_dlog_result: BigUint,
    counter: u64,
    base: BigUint,
    modulus: BigUint,
}

impl DLogTable {
    /// Create a table seeded with `1 -> 0`
    pub fn new(base: BigUint, modulus: BigUint) -> Self {
        let mut dlogs = HashMap::new();
        dlogs.insert(BigUint::one(), 0);

        DLogTable {
            dlogs,
            last_dlog_result: BigUint::one(),
            counter: 0,
            base,
            modulus,
        }
    }

    fn increment(&mut self) {
        self.counter += 1;
        self.last_dlog_result = (&self.last_dlog_result * &self.base) % &self.modulus;
        self.dlogs.insert(self.last_dlog_result.clone(), self.counter);
    }

    /// Extend the table to cover every exponent in `[0, up_to]`
    pub fn precompute(&mut self, up_to: u64) {
        if self.counter >= up_to {
            return;
        }

        debug!("Extending discrete log table from {} to {}", self.counter, up_to);
        while self.counter < up_to {
            self.increment();
        }
    }

    /// The exponent of `value`, if it has been precomputed
    pub fn lookup(&self, value: &BigUint) -> Option<u64> {
        self.dlogs.get(value).copied()
    }

    /// Largest exponent covered so far
    pub fn max_exponent(&self) -> u64 {
        self.counter
    }

    pub fn len(&self) -> usize {
        self.dlogs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dlogs.is_empty()
    }
}
