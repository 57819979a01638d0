//! Sparse addressing substrate.
//!
//! Every matrix owns a [`MatrixShape`] mapping N-dimensional coordinates onto
//! flat indices, and stores only the occupied indices:
//!
//! - [`SparseObjectMatrix`]: index → arbitrary value
//! - [`SparseBinaryMatrix`]: index → bit, with optional cached per-row true counts
//!   and the `right_vec_sum_at_nz` overlap primitive

mod binary;
mod object;
mod shape;

pub use binary::SparseBinaryMatrix;
pub use object::SparseObjectMatrix;
pub use shape::MatrixShape;

use crate::error::Result;

/// Shared addressing behaviour of the sparse matrices.
pub trait SparseMatrix {
    /// The shape this matrix is addressed by.
    fn shape(&self) -> &MatrixShape;

    /// Occupied flat indices, strictly ascending.
    fn sparse_indices(&self) -> Vec<usize>;

    /// Maps coordinates to a flat index.
    fn compute_index(&self, coordinates: &[usize]) -> Result<usize> {
        self.shape().compute_index(coordinates)
    }

    /// Maps a flat index to coordinates.
    fn compute_coordinates(&self, index: usize) -> Result<Vec<usize>> {
        self.shape().compute_coordinates(index)
    }

    /// The configured dimensions.
    fn dimensions(&self) -> &[usize] {
        self.shape().dimensions()
    }

    /// Largest valid flat index.
    fn max_index(&self) -> usize {
        self.shape().max_index()
    }

    /// Total number of addressable elements.
    fn size(&self) -> usize {
        self.shape().size()
    }
}
