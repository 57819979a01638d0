//! Bit-keyed sparse matrix with optional per-row true counts.

use super::{MatrixShape, SparseMatrix};
use crate::error::{CortexaError, Result};
use crate::types::Real;
use bitvec::prelude::*;

/// A binary matrix over an N-dimensional shape.
///
/// The first dimension is the row dimension; everything after it is flattened
/// into the row. When created with [`SparseBinaryMatrix::with_true_counts`],
/// the number of set bits in every row is maintained incrementally on each
/// flip, so [`SparseBinaryMatrix::true_count`] is O(1).
///
/// # Example
///
/// ```rust
/// use cortexa::matrix::SparseBinaryMatrix;
///
/// let mut m = SparseBinaryMatrix::with_true_counts(&[2, 4]).unwrap();
/// m.set(&[0, 1], true).unwrap();
/// m.set(&[0, 3], true).unwrap();
/// m.set(&[1, 3], true).unwrap();
///
/// assert_eq!(m.true_count(0).unwrap(), 2);
/// let sums = m.right_vec_sum_at_nz(&[0, 1, 0, 1]).unwrap();
/// assert_eq!(sums, vec![2.0, 1.0]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SparseBinaryMatrix {
    shape: MatrixShape,
    bits: BitVec<u64, Lsb0>,
    row_len: usize,
    true_counts: Option<Vec<usize>>,
}

impl SparseBinaryMatrix {
    /// Creates an all-zero matrix without row statistics.
    pub fn new(dimensions: &[usize]) -> Result<Self> {
        Ok(Self::build(MatrixShape::new(dimensions)?, false))
    }

    /// Creates an all-zero matrix that tracks per-row true counts.
    pub fn with_true_counts(dimensions: &[usize]) -> Result<Self> {
        Ok(Self::build(MatrixShape::new(dimensions)?, true))
    }

    fn build(shape: MatrixShape, track_counts: bool) -> Self {
        let rows = shape.dimensions()[0];
        let size = shape.size();
        Self {
            bits: bitvec![u64, Lsb0; 0; size],
            row_len: size / rows,
            true_counts: track_counts.then(|| vec![0; rows]),
            shape,
        }
    }

    /// Number of rows (the first dimension).
    #[inline]
    pub fn num_rows(&self) -> usize {
        self.shape.dimensions()[0]
    }

    /// Number of bits per row.
    #[inline]
    pub fn row_len(&self) -> usize {
        self.row_len
    }

    /// Whether per-row counts are cached.
    #[inline]
    pub fn tracks_true_counts(&self) -> bool {
        self.true_counts.is_some()
    }

    /// Sets the bit at `index`, returning whether its value changed.
    pub fn set_index(&mut self, index: usize, value: bool) -> Result<bool> {
        self.shape.check_index(index)?;
        let old = self.bits[index];
        if old == value {
            return Ok(false);
        }
        self.bits.set(index, value);
        if let Some(counts) = self.true_counts.as_mut() {
            let row = index / self.row_len;
            if value {
                counts[row] += 1;
            } else {
                counts[row] = counts[row].saturating_sub(1);
            }
        }
        Ok(true)
    }

    /// Sets the bit at `coordinates`, returning whether its value changed.
    pub fn set(&mut self, coordinates: &[usize], value: bool) -> Result<bool> {
        let index = self.shape.compute_index(coordinates)?;
        self.set_index(index, value)
    }

    /// The bit at `index`.
    pub fn get_index(&self, index: usize) -> Result<bool> {
        self.shape.check_index(index)?;
        Ok(self.bits[index])
    }

    /// The bit at `coordinates`.
    pub fn get(&self, coordinates: &[usize]) -> Result<bool> {
        let index = self.shape.compute_index(coordinates)?;
        Ok(self.bits[index])
    }

    /// A dense 0/1 copy of one row.
    pub fn row(&self, row: usize) -> Result<Vec<u8>> {
        Ok(self.row_bits(row)?.iter().map(|b| u8::from(*b)).collect())
    }

    /// Set column offsets of one row, ascending.
    pub fn row_sparse(&self, row: usize) -> Result<Vec<usize>> {
        Ok(self.row_bits(row)?.iter_ones().collect())
    }

    fn row_bits(&self, row: usize) -> Result<&BitSlice<u64, Lsb0>> {
        if row >= self.num_rows() {
            return Err(CortexaError::IndexOutOfBounds {
                index: row,
                size: self.num_rows(),
            });
        }
        let start = row * self.row_len;
        Ok(&self.bits[start..start + self.row_len])
    }

    /// True if every index is set. Out-of-range indices count as unset.
    pub fn all(&self, indices: &[usize]) -> bool {
        indices
            .iter()
            .all(|&i| i < self.bits.len() && self.bits[i])
    }

    /// True if any index is set.
    pub fn any(&self, indices: &[usize]) -> bool {
        indices
            .iter()
            .any(|&i| i < self.bits.len() && self.bits[i])
    }

    /// Sets every index in `indices`.
    pub fn or(&mut self, indices: &[usize]) -> Result<()> {
        for &i in indices {
            self.set_index(i, true)?;
        }
        Ok(())
    }

    /// Clears one row's bits and its cached count.
    pub fn clear_statistics(&mut self, row: usize) -> Result<()> {
        let len = self.row_bits(row)?.len();
        let start = row * self.row_len;
        self.bits[start..start + len].fill(false);
        if let Some(counts) = self.true_counts.as_mut() {
            counts[row] = 0;
        }
        Ok(())
    }

    /// Number of set bits in `row`.
    pub fn true_count(&self, row: usize) -> Result<usize> {
        let bits = self.row_bits(row)?;
        Ok(match &self.true_counts {
            Some(counts) => counts[row],
            None => bits.count_ones(),
        })
    }

    /// Set-bit counts of every row.
    pub fn true_counts(&self) -> Vec<usize> {
        match &self.true_counts {
            Some(counts) => counts.clone(),
            None => self
                .bits
                .chunks(self.row_len)
                .map(BitSlice::count_ones)
                .collect(),
        }
    }

    /// Overrides the cached count of one row, enabling tracking if it was off.
    ///
    /// The override is not checked against the bits; the next flip in that row
    /// adjusts from the overridden value, never going below 0.
    pub fn set_true_count(&mut self, row: usize, count: usize) -> Result<()> {
        self.row_bits(row)?;
        if self.true_counts.is_none() {
            self.true_counts = Some(self.true_counts());
        }
        if let Some(counts) = self.true_counts.as_mut() {
            counts[row] = count;
        }
        Ok(())
    }

    /// For every row, the dot product of its bits with `input`.
    ///
    /// This is the overlap primitive: with a columns × inputs connected mask,
    /// the result is each column's count of connected synapses on active inputs.
    pub fn right_vec_sum_at_nz(&self, input: &[u8]) -> Result<Vec<Real>> {
        if input.len() != self.row_len {
            return Err(CortexaError::DimensionMismatch {
                expected: vec![self.row_len],
                actual: vec![input.len()],
            });
        }
        Ok(self
            .bits
            .chunks(self.row_len)
            .map(|row| row.iter_ones().filter(|&c| input[c] != 0).count() as Real)
            .collect())
    }

    /// [`right_vec_sum_at_nz`](Self::right_vec_sum_at_nz) with sums below
    /// `stimulus_threshold` zeroed and the rest multiplied by `factor`.
    pub fn right_vec_sum_at_nz_thresholded(
        &self,
        input: &[u8],
        stimulus_threshold: Real,
        factor: Real,
    ) -> Result<Vec<Real>> {
        let mut sums = self.right_vec_sum_at_nz(input)?;
        for s in &mut sums {
            *s = if *s < stimulus_threshold { 0.0 } else { *s * factor };
        }
        Ok(sums)
    }
}

impl SparseMatrix for SparseBinaryMatrix {
    fn shape(&self) -> &MatrixShape {
        &self.shape
    }

    fn sparse_indices(&self) -> Vec<usize> {
        self.bits.iter_ones().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connected_5x10() -> SparseBinaryMatrix {
        let rows: [[u8; 10]; 5] = [
            [1, 1, 1, 1, 1, 1, 1, 1, 1, 1],
            [0, 0, 1, 1, 1, 1, 1, 1, 1, 1],
            [0, 0, 0, 0, 1, 1, 1, 1, 1, 1],
            [0, 0, 0, 0, 0, 0, 1, 1, 1, 1],
            [0, 0, 0, 0, 0, 0, 0, 0, 1, 1],
        ];
        let mut m = SparseBinaryMatrix::with_true_counts(&[5, 10]).unwrap();
        for (r, row) in rows.iter().enumerate() {
            for (c, &bit) in row.iter().enumerate() {
                m.set(&[r, c], bit == 1).unwrap();
            }
        }
        m
    }

    #[test]
    fn test_set_index_reports_change() {
        let mut m = SparseBinaryMatrix::with_true_counts(&[3, 3]).unwrap();
        assert!(m.set_index(4, true).unwrap());
        assert!(!m.set_index(4, true).unwrap());
        assert_eq!(m.true_count(1).unwrap(), 1);
        assert!(m.set_index(4, false).unwrap());
        assert_eq!(m.true_count(1).unwrap(), 0);
    }

    #[test]
    fn test_true_counts_incremental() {
        let m = connected_5x10();
        assert_eq!(m.true_counts(), vec![10, 8, 6, 4, 2]);
        assert_eq!(m.row(4).unwrap(), vec![0, 0, 0, 0, 0, 0, 0, 0, 1, 1]);
        assert_eq!(m.row_sparse(3).unwrap(), vec![6, 7, 8, 9]);
    }

    #[test]
    fn test_untracked_counts_fall_back_to_popcount() {
        let mut m = SparseBinaryMatrix::new(&[2, 5]).unwrap();
        m.or(&[0, 3, 7]).unwrap();
        assert!(!m.tracks_true_counts());
        assert_eq!(m.true_count(0).unwrap(), 2);
        assert_eq!(m.true_counts(), vec![2, 1]);
    }

    #[test]
    fn test_right_vec_sum_at_nz() {
        let m = connected_5x10();
        assert_eq!(m.right_vec_sum_at_nz(&[0; 10]).unwrap(), vec![0.0; 5]);
        assert_eq!(
            m.right_vec_sum_at_nz(&[1; 10]).unwrap(),
            vec![10.0, 8.0, 6.0, 4.0, 2.0]
        );
        assert_eq!(
            m.right_vec_sum_at_nz(&[0, 0, 0, 0, 0, 0, 0, 0, 0, 1]).unwrap(),
            vec![1.0; 5]
        );
    }

    #[test]
    fn test_right_vec_sum_thresholded() {
        let m = connected_5x10();
        let sums = m
            .right_vec_sum_at_nz_thresholded(&[1; 10], 5.0, 0.5)
            .unwrap();
        assert_eq!(sums, vec![5.0, 4.0, 3.0, 0.0, 0.0]);
    }

    #[test]
    fn test_right_vec_sum_wrong_length() {
        let m = connected_5x10();
        assert!(m.right_vec_sum_at_nz(&[1; 9]).is_err());
    }

    #[test]
    fn test_all_any_or() {
        let mut m = SparseBinaryMatrix::new(&[8]).unwrap();
        m.or(&[2, 4]).unwrap();
        assert!(m.all(&[2, 4]));
        assert!(!m.all(&[2, 3]));
        assert!(m.any(&[0, 4]));
        assert!(!m.any(&[0, 1, 3, 5, 6, 7]));
        assert!(!m.any(&[100]));
        assert_eq!(m.sparse_indices(), vec![2, 4]);
    }

    #[test]
    fn test_clear_statistics() {
        let mut m = connected_5x10();
        m.clear_statistics(1).unwrap();
        assert_eq!(m.true_count(1).unwrap(), 0);
        assert!(!m.any(&(10..20).collect::<Vec<_>>()));
        assert_eq!(m.true_count(0).unwrap(), 10);
    }

    #[test]
    fn test_set_true_count_override() {
        let mut m = SparseBinaryMatrix::new(&[2, 2]).unwrap();
        m.set_true_count(0, 3).unwrap();
        assert!(m.tracks_true_counts());
        assert_eq!(m.true_count(0).unwrap(), 3);
        assert!(m.set_true_count(2, 0).is_err());
    }

    #[test]
    fn test_clear_after_zeroed_count_stays_at_zero() {
        let mut m = SparseBinaryMatrix::with_true_counts(&[2, 4]).unwrap();
        m.set(&[1, 2], true).unwrap();
        m.set_true_count(1, 0).unwrap();

        assert!(m.set(&[1, 2], false).unwrap());
        assert_eq!(m.true_count(1).unwrap(), 0);
        m.set(&[1, 3], true).unwrap();
        assert_eq!(m.true_count(1).unwrap(), 1);
    }
}
