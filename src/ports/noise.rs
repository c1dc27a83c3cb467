//! Noise port: Trait for the random source behind DP mechanisms.
//!
//! The noise engine never reaches for a global RNG; callers pass a
//! `NoiseSource` in, which keeps runs reproducible under a fixed seed.

use crate::domain::Mechanism;

/// A source of zero-mean noise draws.
pub trait NoiseSource {
    /// Draw from Laplace(0, `scale`).
    fn laplace(&mut self, scale: f64) -> f64;

    /// Draw from Normal(0, `std_dev`²).
    fn gaussian(&mut self, std_dev: f64) -> f64;

    /// Draw one sample of the given mechanism at the given scale.
    ///
    /// A zero scale always returns exactly zero.
    fn sample(&mut self, mechanism: Mechanism, scale: f64) -> f64 {
        if scale == 0.0 {
            return 0.0;
        }
        match mechanism {
            Mechanism::Laplace => self.laplace(scale),
            Mechanism::Gaussian => self.gaussian(scale),
        }
    }
}

impl<N: NoiseSource + ?Sized> NoiseSource for &mut N {
    fn laplace(&mut self, scale: f64) -> f64 {
        (**self).laplace(scale)
    }

    fn gaussian(&mut self, std_dev: f64) -> f64 {
        (**self).gaussian(std_dev)
    }
}
