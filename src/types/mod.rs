//! Core types for the library.
//!
//! Primitive aliases shared by every module, and the insertion-ordered
//! containers the sequence memory relies on for reproducible iteration.

mod ordered;
mod primitives;

pub use ordered::{OrderedMap, OrderedSet};
pub use primitives::*;
