//! Primitive type definitions shared by the matrices and both algorithms.

/// Default floating point type.
///
/// Duty cycles, boost factors and overlaps are accumulated in double precision.
pub type Real = f64;

/// Synapse permanence value (0.0 to 1.0).
pub type Permanence = Real;

/// Flat index of a cell (`column * cells_per_column + offset`).
pub type CellIdx = usize;

/// Flat index of a column.
pub type ColumnIdx = usize;

/// Stable handle of a segment in the connections arena.
pub type Segment = u32;

/// Stable handle of a synapse in the connections arena.
pub type Synapse = u32;

/// Minimum permanence value.
pub const MIN_PERMANENCE: Permanence = 0.0;

/// Maximum permanence value.
pub const MAX_PERMANENCE: Permanence = 1.0;

/// Epsilon for floating point comparisons.
pub const EPSILON: Real = 1e-9;

/// Clamps a permanence into `[MIN_PERMANENCE, MAX_PERMANENCE]`.
#[inline]
#[must_use]
pub fn clamp_permanence(permanence: Permanence) -> Permanence {
    permanence.clamp(MIN_PERMANENCE, MAX_PERMANENCE)
}
