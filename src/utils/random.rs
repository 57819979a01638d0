//! Seeded random number handle.
//!
//! Every stochastic step of the engine (potential pool sampling, initial
//! permanences, tie-breakers, least-used cell selection, synapse growth) draws
//! from one `Random` owned by the connectivity model, so a run is reproducible
//! from the seed stored in its configuration.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

/// A deterministic pseudo-random number generator.
///
/// # Example
///
/// ```rust
/// use cortexa::utils::Random;
///
/// let mut a = Random::new(42);
/// let mut b = Random::new(42);
/// assert_eq!(a.get_usize(100), b.get_usize(100));
///
/// let picked = a.sample((0..10).collect::<Vec<usize>>(), 3);
/// assert_eq!(picked.len(), 3);
/// ```
#[derive(Clone)]
pub struct Random {
    rng: ChaCha20Rng,
    seed: u64,
    /// Number of values drawn so far.
    steps: u64,
}

impl Random {
    /// Creates a generator from `seed`. A negative seed draws one from entropy.
    #[must_use]
    pub fn new(seed: i64) -> Self {
        let actual_seed = u64::try_from(seed).unwrap_or_else(|_| rand::thread_rng().gen());
        Self {
            rng: ChaCha20Rng::seed_from_u64(actual_seed),
            seed: actual_seed,
            steps: 0,
        }
    }

    /// The seed actually in use.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Number of values drawn so far.
    #[must_use]
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// A uniform `usize` in `[0, n)`; 0 when `n` is 0.
    pub fn get_usize(&mut self, n: usize) -> usize {
        self.steps += 1;
        if n == 0 {
            return 0;
        }
        self.rng.gen_range(0..n)
    }

    /// A uniform `f64` in `[0, 1)`.
    pub fn get_real64(&mut self) -> f64 {
        self.steps += 1;
        self.rng.gen()
    }

    /// True with the given probability.
    pub fn get_bool_with_prob(&mut self, probability: f64) -> bool {
        self.get_real64() < probability
    }

    /// Fisher-Yates shuffle in place.
    pub fn shuffle<T>(&mut self, slice: &mut [T]) {
        for i in (1..slice.len()).rev() {
            let j = self.get_usize(i + 1);
            slice.swap(i, j);
        }
    }

    /// Picks `k` distinct items without replacement, in draw order.
    ///
    /// When `k >= items.len()` every item is returned, shuffled.
    pub fn sample<T>(&mut self, mut items: Vec<T>, k: usize) -> Vec<T> {
        let n = items.len();
        if k >= n {
            self.shuffle(&mut items);
            return items;
        }

        // Partial Fisher-Yates
        for i in 0..k {
            let j = self.get_usize(n - i) + i;
            items.swap(i, j);
        }
        items.truncate(k);
        items
    }
}

impl Default for Random {
    fn default() -> Self {
        Self::new(42)
    }
}

impl std::fmt::Debug for Random {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Random")
            .field("seed", &self.seed)
            .field("steps", &self.steps)
            .finish_non_exhaustive()
    }
}
