use std::cell::RefCell;

use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256StarStar;

/// Seeded source of random test data.
///
/// Uses the xoshiro256** PRNG so every failing case can be replayed from
/// its seed.
pub struct Fuzzer {
    pub seed: u64,
    rng: RefCell<Xoshiro256StarStar>,
}

impl Fuzzer {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: RefCell::new(Xoshiro256StarStar::seed_from_u64(seed)),
        }
    }

    /// Random integer in `[min, max]` (inclusive).
    pub fn random_int(&self, min: i64, max: i64) -> i64 {
        self.rng.borrow_mut().gen_range(min..=max)
    }

    /// Random index in `[0, n)`, like `Math.floor(Math.random() * n)`.
    pub fn below(&self, n: usize) -> usize {
        self.rng.borrow_mut().gen_range(0..n)
    }

    pub fn pick<'a, T>(&self, elements: &'a [T]) -> &'a T {
        &elements[self.below(elements.len())]
    }

    /// Random f64 in `[0, 1)`.
    pub fn random(&self) -> f64 {
        self.rng.borrow_mut().gen::<f64>()
    }
}

/// Seeds for the randomized suites, one per run.
pub fn seeds() -> Vec<u64> {
    (0..30u64)
        .map(|i| 0x5eed_c0de_u64 ^ i.wrapping_mul(0x9e37_79b9_7f4a_7c15))
        .collect()
}
