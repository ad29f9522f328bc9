//! Pre-generated random draws for one annealing run.
//!
//! A run consumes exactly one [`Draw`] per iteration, so drawing the whole
//! budget up front makes a run a pure function of `(initial graph, config, seed)`.

use crate::error::{Result, SrgError};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Everything one iteration needs from the RNG.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Draw {
    /// First pivot vertex.
    pub u: usize,
    /// Second pivot vertex (may equal `u`; the step is then skipped).
    pub v: usize,
    /// Uniform pick into the gain set.
    pub gain_pick: u32,
    /// Uniform pick into the loss set.
    pub loss_pick: u32,
    /// Metropolis threshold in `[0, 1)`.
    pub threshold: f64,
}

/// A seed-reproducible sequence of [`Draw`]s.
#[derive(Clone, Debug)]
pub struct RandomStream {
    seed: u64,
    draws: Vec<Draw>,
}

impl RandomStream {
    /// Draws `len` iterations' worth of randomness for an `n`-vertex graph.
    ///
    /// # Errors
    /// `InvalidParameters` if `n == 0` and `len > 0`.
    pub fn generate(n: usize, len: usize, seed: u64) -> Result<Self> {
        if n == 0 && len > 0 {
            return Err(SrgError::invalid("cannot draw vertices from an empty graph"));
        }
        let mut rng = SmallRng::seed_from_u64(seed);
        let draws = (0..len)
            .map(|_| Draw {
                u: rng.random_range(0..n),
                v: rng.random_range(0..n),
                gain_pick: rng.random(),
                loss_pick: rng.random(),
                threshold: rng.random::<f64>(),
            })
            .collect();
        Ok(Self { seed, draws })
    }

    /// The seed this stream was generated from.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Number of draws.
    pub fn len(&self) -> usize {
        self.draws.len()
    }

    /// `true` if the stream holds no draws.
    pub fn is_empty(&self) -> bool {
        self.draws.is_empty()
    }

    /// The `i`-th draw.
    #[inline(always)]
    pub fn get(&self, i: usize) -> Option<&Draw> {
        self.draws.get(i)
    }

    /// All draws in order.
    pub fn draws(&self) -> &[Draw] {
        &self.draws
    }
}

/// SplitMix64 mixer for deriving per-run seeds from a base seed.
#[inline]
pub fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// A seed from OS entropy, for runs configured without one.
pub fn entropy_seed() -> u64 {
    rand::random::<u64>()
}
