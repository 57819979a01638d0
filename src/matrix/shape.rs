//! N-dimensional coordinate ⇄ flat index addressing.

use crate::error::{CortexaError, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The fixed shape of a sparse matrix and its dimension-multiples table.
///
/// Row-major shapes vary the last coordinate fastest; column-major shapes vary
/// the first coordinate fastest. Both map every valid coordinate tuple onto a
/// unique flat index in `0..size()`.
///
/// # Example
///
/// ```rust
/// use cortexa::matrix::MatrixShape;
///
/// let shape = MatrixShape::new(&[3, 4]).unwrap();
/// assert_eq!(shape.compute_index(&[1, 2]).unwrap(), 6);
/// assert_eq!(shape.compute_coordinates(6).unwrap(), vec![1, 2]);
///
/// let cm = MatrixShape::column_major(&[3, 4]).unwrap();
/// assert_eq!(cm.compute_index(&[1, 2]).unwrap(), 7);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MatrixShape {
    dimensions: Vec<usize>,
    multiples: Vec<usize>,
    column_major: bool,
    size: usize,
}

impl MatrixShape {
    /// Creates a row-major shape.
    pub fn new(dimensions: &[usize]) -> Result<Self> {
        Self::with_ordering(dimensions, false)
    }

    /// Creates a column-major shape.
    pub fn column_major(dimensions: &[usize]) -> Result<Self> {
        Self::with_ordering(dimensions, true)
    }

    /// Creates a shape with an explicit ordering.
    pub fn with_ordering(dimensions: &[usize], column_major: bool) -> Result<Self> {
        if dimensions.is_empty() {
            return Err(CortexaError::InvalidDimensions(
                "at least one dimension is required".to_string(),
            ));
        }
        if dimensions.contains(&0) {
            return Err(CortexaError::InvalidDimensions(format!(
                "zero-sized dimension in {dimensions:?}"
            )));
        }

        let size = dimensions
            .iter()
            .try_fold(1usize, |acc, &d| acc.checked_mul(d))
            .ok_or_else(|| {
                CortexaError::InvalidDimensions(format!("{dimensions:?} overflows usize"))
            })?;

        let n = dimensions.len();
        let mut multiples = vec![1usize; n];
        if column_major {
            for i in 1..n {
                multiples[i] = multiples[i - 1] * dimensions[i - 1];
            }
        } else {
            for i in (0..n - 1).rev() {
                multiples[i] = multiples[i + 1] * dimensions[i + 1];
            }
        }

        Ok(Self {
            dimensions: dimensions.to_vec(),
            multiples,
            column_major,
            size,
        })
    }

    /// The configured dimensions.
    #[inline]
    pub fn dimensions(&self) -> &[usize] {
        &self.dimensions
    }

    /// The stride of each dimension.
    #[inline]
    pub fn multiples(&self) -> &[usize] {
        &self.multiples
    }

    /// Number of dimensions.
    #[inline]
    pub fn num_dimensions(&self) -> usize {
        self.dimensions.len()
    }

    /// Total number of addressable elements.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Largest valid flat index.
    #[inline]
    pub fn max_index(&self) -> usize {
        self.size - 1
    }

    /// Whether the first coordinate varies fastest.
    #[inline]
    pub fn is_column_major(&self) -> bool {
        self.column_major
    }

    /// Maps coordinates to a flat index.
    ///
    /// Fails when the number of coordinates differs from the number of
    /// dimensions, or when any coordinate is outside its dimension.
    pub fn compute_index(&self, coordinates: &[usize]) -> Result<usize> {
        self.check_coordinates(coordinates)?;
        Ok(coordinates
            .iter()
            .zip(&self.multiples)
            .map(|(c, m)| c * m)
            .sum())
    }

    /// Maps a flat index back to coordinates.
    pub fn compute_coordinates(&self, index: usize) -> Result<Vec<usize>> {
        self.check_index(index)?;
        Ok(self
            .multiples
            .iter()
            .zip(&self.dimensions)
            .map(|(m, d)| (index / m) % d)
            .collect())
    }

    /// Fails with `IndexOutOfBounds` unless `index < size()`.
    pub fn check_index(&self, index: usize) -> Result<()> {
        if index >= self.size {
            return Err(CortexaError::IndexOutOfBounds {
                index,
                size: self.size,
            });
        }
        Ok(())
    }

    fn check_coordinates(&self, coordinates: &[usize]) -> Result<()> {
        if coordinates.len() != self.dimensions.len() {
            return Err(CortexaError::DimensionMismatch {
                expected: vec![self.dimensions.len()],
                actual: vec![coordinates.len()],
            });
        }
        for (dimension, (&coordinate, &size)) in
            coordinates.iter().zip(&self.dimensions).enumerate()
        {
            if coordinate >= size {
                return Err(CortexaError::CoordinateOutOfBounds {
                    coordinate,
                    dimension,
                    size,
                });
            }
        }
        Ok(())
    }
}
