//! # Cortexa - spatial pooling and sequence memory over a sparse substrate
//!
//! Cortexa implements the single-region compute core of Hierarchical Temporal Memory:
//! a competitive spatial encoder that turns dense binary inputs into sparse column
//! activations, and a sequence memory that learns temporal context over those
//! activations with per-cell distal segments.
//!
//! ## Overview
//!
//! - **Sparse matrices** ([`matrix`]): N-dimensional index addressing, object-keyed
//!   and bit-keyed sparse storage, and the `right_vec_sum_at_nz` overlap primitive.
//! - **Connections** ([`algorithms::Connections`]): the single mutable model holding
//!   columns, cells, segments, synapses, statistics, the RNG and the last cycle.
//! - **Spatial Pooler** ([`algorithms::SpatialPooler`]): overlap, inhibition,
//!   permanence learning and homeostasis.
//! - **Temporal Memory** ([`algorithms::TemporalMemory`]): the four-phase,
//!   snapshot-based sequence learner producing a [`algorithms::ComputeCycle`].
//!
//! ## Quick Start
//!
//! ```rust
//! use cortexa::prelude::*;
//!
//! let params = Parameters::builder()
//!     .input_dimensions(vec![64])
//!     .column_dimensions(vec![128])
//!     .cells_per_column(4)
//!     .potential_radius(8)
//!     .global_inhibition(true)
//!     .local_area_density(0.05)
//!     .build()
//!     .unwrap();
//!
//! let mut connections = Connections::new(params).unwrap();
//! let sp = SpatialPooler::new();
//! sp.init(&mut connections).unwrap();
//!
//! let mut input = vec![0u8; 64];
//! for i in (0..64).step_by(4) {
//!     input[i] = 1;
//! }
//! let mut active = vec![0u8; 128];
//! let winners = sp.compute(&mut connections, &input, &mut active, true, true).unwrap();
//!
//! let tm = TemporalMemory::new();
//! let cycle = tm.compute(&mut connections, &winners, true).unwrap();
//! assert_eq!(cycle.active_cells().len(), winners.len() * 4);
//! ```
//!
//! ## Feature Flags
//!
//! - `serde`: derive `Serialize`/`Deserialize` for configuration and cycle snapshots,
//!   and enable [`config::Parameters::from_json`].

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::similar_names)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::unused_self)]

pub mod algorithms;
pub mod config;
pub mod matrix;
pub mod types;
pub mod utils;

/// Re-export of commonly used types and traits for convenience.
pub mod prelude {
    pub use crate::algorithms::{
        ComputeCycle, Connections, Pool, SegmentOwner, SpatialPooler, TemporalMemory,
    };
    pub use crate::config::{Parameters, ParametersBuilder};
    pub use crate::matrix::{MatrixShape, SparseBinaryMatrix, SparseMatrix, SparseObjectMatrix};
    pub use crate::types::{
        CellIdx, ColumnIdx, OrderedMap, OrderedSet, Permanence, Real, Segment, Synapse,
    };
    pub use crate::utils::{Random, Topology, WrappingMode};
    pub use crate::{CortexaError, Result};
}

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Error types for the library.
pub mod error {
    use crate::types::{Segment, Synapse};
    use thiserror::Error;

    /// Main error type for cortexa operations.
    #[derive(Error, Debug, Clone, PartialEq)]
    pub enum CortexaError {
        /// Invalid dimensions provided.
        #[error("Invalid dimensions: {0}")]
        InvalidDimensions(String),

        /// Invalid parameter value.
        #[error("Invalid parameter '{name}': {message}")]
        InvalidParameter {
            /// Name of the invalid parameter.
            name: &'static str,
            /// Description of the error.
            message: String,
        },

        /// Flat index out of bounds.
        #[error("Index {index} out of bounds (size: {size})")]
        IndexOutOfBounds {
            /// The invalid index.
            index: usize,
            /// The valid size.
            size: usize,
        },

        /// A single coordinate exceeds its dimension.
        #[error("Coordinate {coordinate} out of bounds for dimension {dimension} (size: {size})")]
        CoordinateOutOfBounds {
            /// The offending coordinate value.
            coordinate: usize,
            /// Which dimension it addressed.
            dimension: usize,
            /// Size of that dimension.
            size: usize,
        },

        /// Dimension mismatch between a caller's data and the configured shape.
        #[error("Dimension mismatch: expected {expected:?}, got {actual:?}")]
        DimensionMismatch {
            /// Expected dimensions.
            expected: Vec<usize>,
            /// Actual dimensions.
            actual: Vec<usize>,
        },

        /// Segment handle that does not exist or was destroyed.
        #[error("Unknown segment {0}")]
        UnknownSegment(Segment),

        /// Synapse handle that does not exist or was destroyed.
        #[error("Unknown synapse {0}")]
        UnknownSynapse(Synapse),

        /// Configuration document could not be parsed.
        #[cfg(feature = "serde")]
        #[error("Configuration error: {0}")]
        Config(String),
    }

    /// Result type alias using CortexaError.
    pub type Result<T> = std::result::Result<T, CortexaError>;
}

pub use error::{CortexaError, Result};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_error_display() {
        let err = CortexaError::CoordinateOutOfBounds {
            coordinate: 7,
            dimension: 1,
            size: 5,
        };
        assert_eq!(
            err.to_string(),
            "Coordinate 7 out of bounds for dimension 1 (size: 5)"
        );
    }
}
