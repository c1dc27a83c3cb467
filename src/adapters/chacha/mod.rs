//! ChaCha20 adapter: CSPRNG-backed implementation of `NoiseSource`.
//!
//! Laplace draws use the inverse CDF; Gaussian draws scale a standard normal
//! sample from `rand_distr`.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use rand_distr::StandardNormal;

use crate::ports::NoiseSource;

/// Noise source seeded from OS entropy, or from a fixed seed for
/// reproducible runs.
#[derive(Debug, Clone)]
pub struct ChaChaNoise {
    rng: ChaCha20Rng,
}

impl ChaChaNoise {
    /// Create a noise source seeded from OS entropy.
    #[must_use]
    pub fn from_entropy() -> Self {
        Self {
            rng: ChaCha20Rng::from_entropy(),
        }
    }

    /// Create a deterministic noise source.
    #[must_use]
    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self {
            rng: ChaCha20Rng::from_seed(seed),
        }
    }

    /// Create a deterministic noise source from a short seed.
    #[must_use]
    pub fn seed_from_u64(seed: u64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
        }
    }
}

impl Default for ChaChaNoise {
    fn default() -> Self {
        Self::from_entropy()
    }
}

impl NoiseSource for ChaChaNoise {
    fn laplace(&mut self, scale: f64) -> f64 {
        // Laplace(0, b) via inverse CDF.
        // IMPORTANT: avoid exact endpoints that would yield ln(0) => +/-inf.
        let mut u01: f64 = self.rng.gen(); // [0, 1)
        if u01 == 0.0 {
            u01 = f64::MIN_POSITIVE;
        }
        let u: f64 = u01 - 0.5; // (-0.5, 0.5)

        let inner: f64 = 1.0 - 2.0 * u.abs();
        -scale * u.signum() * inner.ln()
    }

    fn gaussian(&mut self, std_dev: f64) -> f64 {
        let z: f64 = self.rng.sample(StandardNormal);
        z * std_dev
    }
}
