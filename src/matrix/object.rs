//! Object-keyed sparse matrix.

use super::{MatrixShape, SparseMatrix};
use crate::error::Result;
use std::collections::BTreeMap;

/// Sparse map from flat index (or coordinates) to a value of type `T`.
///
/// Backed by a `BTreeMap`, so occupied indices come out ascending without an
/// extra sort.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseObjectMatrix<T> {
    shape: MatrixShape,
    values: BTreeMap<usize, T>,
}

impl<T> SparseObjectMatrix<T> {
    /// Creates an empty row-major matrix.
    pub fn new(dimensions: &[usize]) -> Result<Self> {
        Ok(Self::with_shape(MatrixShape::new(dimensions)?))
    }

    /// Creates an empty matrix over an existing shape.
    pub fn with_shape(shape: MatrixShape) -> Self {
        Self {
            shape,
            values: BTreeMap::new(),
        }
    }

    /// Stores `value` at `index`, returning the previous value.
    pub fn set_index(&mut self, index: usize, value: T) -> Result<Option<T>> {
        self.shape.check_index(index)?;
        Ok(self.values.insert(index, value))
    }

    /// Stores `value` at `coordinates`, returning the previous value.
    pub fn set(&mut self, coordinates: &[usize], value: T) -> Result<Option<T>> {
        let index = self.shape.compute_index(coordinates)?;
        Ok(self.values.insert(index, value))
    }

    /// The value at `index`, if any.
    #[inline]
    pub fn get_index(&self, index: usize) -> Option<&T> {
        self.values.get(&index)
    }

    /// Mutable access to the value at `index`.
    #[inline]
    pub fn get_index_mut(&mut self, index: usize) -> Option<&mut T> {
        self.values.get_mut(&index)
    }

    /// The value at `coordinates`, if any.
    pub fn get(&self, coordinates: &[usize]) -> Result<Option<&T>> {
        let index = self.shape.compute_index(coordinates)?;
        Ok(self.values.get(&index))
    }

    /// Removes and returns the value at `index`.
    pub fn remove_index(&mut self, index: usize) -> Option<T> {
        self.values.remove(&index)
    }

    /// Number of occupied indices.
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if nothing is stored.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates `(index, value)` in ascending index order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> {
        self.values.iter().map(|(&i, v)| (i, v))
    }
}

impl<T> SparseMatrix for SparseObjectMatrix<T> {
    fn shape(&self) -> &MatrixShape {
        &self.shape
    }

    fn sparse_indices(&self) -> Vec<usize> {
        self.values.keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CortexaError;

    #[test]
    fn test_set_and_get_by_coordinates() {
        let mut m: SparseObjectMatrix<&str> = SparseObjectMatrix::new(&[3, 4]).unwrap();
        m.set(&[2, 1], "a").unwrap();
        m.set_index(3, "b").unwrap();

        assert_eq!(m.get(&[2, 1]).unwrap(), Some(&"a"));
        assert_eq!(m.get_index(9), Some(&"a"));
        assert_eq!(m.get(&[0, 3]).unwrap(), Some(&"b"));
        assert_eq!(m.get_index(0), None);
        assert_eq!(m.len(), 2);
    }

    #[test]
    fn test_sparse_indices_ascending() {
        let mut m = SparseObjectMatrix::new(&[10]).unwrap();
        for i in [7, 2, 9, 0, 4] {
            m.set_index(i, i * 10).unwrap();
        }
        assert_eq!(m.sparse_indices(), vec![0, 2, 4, 7, 9]);
        m.remove_index(4);
        assert_eq!(m.sparse_indices(), vec![0, 2, 7, 9]);
    }

    #[test]
    fn test_replace_returns_previous() {
        let mut m = SparseObjectMatrix::new(&[2, 2]).unwrap();
        assert_eq!(m.set_index(1, vec![1.0]).unwrap(), None);
        assert_eq!(m.set_index(1, vec![2.0]).unwrap(), Some(vec![1.0]));
    }

    #[test]
    fn test_out_of_bounds() {
        let mut m: SparseObjectMatrix<u8> = SparseObjectMatrix::new(&[2, 2]).unwrap();
        assert!(matches!(
            m.set_index(4, 1),
            Err(CortexaError::IndexOutOfBounds { .. })
        ));
        assert!(matches!(
            m.set(&[0, 2], 1),
            Err(CortexaError::CoordinateOutOfBounds { .. })
        ));
    }
}
