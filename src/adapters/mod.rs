//! Adapters layer: Concrete implementations of ports.
//!
//! - `chacha`: ChaCha20 CSPRNG noise source
//! - `sanitize`: identifier filtering for logs

pub mod chacha;
pub mod sanitize;

pub use chacha::ChaChaNoise;
