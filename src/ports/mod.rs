//! Ports layer: Trait definitions for external collaborators.
//!
//! Following Hexagonal Architecture, these traits define the boundaries
//! between the privacy core and its sources of randomness.

mod noise;

pub use noise::NoiseSource;
