//! Utility modules.
//!
//! The seeded random handle and the topology helpers shared by both
//! algorithms.

mod random;
mod topology;

pub use random::Random;
pub use topology::{Topology, WrappingMode};
