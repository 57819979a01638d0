//! Neighborhood walks and column → input mapping over N-dimensional shapes.

use crate::error::Result;
use crate::matrix::MatrixShape;

/// How a neighborhood walk treats the edges of a dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WrappingMode {
    /// Coordinates past an edge are dropped.
    #[default]
    NoWrap,
    /// The space is toroidal.
    Wrap,
}

impl From<bool> for WrappingMode {
    fn from(wrap: bool) -> Self {
        if wrap {
            Self::Wrap
        } else {
            Self::NoWrap
        }
    }
}

/// Topology helpers. All indices are row-major flat indices of the given shape.
pub struct Topology;

impl Topology {
    /// Indices within a hypercube of `radius` around `center`, excluding the
    /// center itself, ascending and without duplicates.
    ///
    /// A radius larger than a dimension simply revisits the same coordinates
    /// when wrapping; duplicates are collapsed.
    ///
    /// # Example
    ///
    /// ```rust
    /// use cortexa::matrix::MatrixShape;
    /// use cortexa::utils::{Topology, WrappingMode};
    ///
    /// let shape = MatrixShape::new(&[8]).unwrap();
    /// let n = Topology::neighbors_nd(0, &shape, 2, WrappingMode::Wrap).unwrap();
    /// assert_eq!(n, vec![1, 2, 6, 7]);
    /// ```
    pub fn neighbors_nd(
        center: usize,
        shape: &MatrixShape,
        radius: usize,
        wrap: WrappingMode,
    ) -> Result<Vec<usize>> {
        let center_coords = shape.compute_coordinates(center)?;
        let mut result = Vec::new();
        Self::walk(
            &center_coords,
            shape,
            radius as i64,
            wrap,
            0,
            0,
            &mut result,
        );

        result.sort_unstable();
        result.dedup();
        result.retain(|&i| i != center);
        Ok(result)
    }

    fn walk(
        center: &[usize],
        shape: &MatrixShape,
        radius: i64,
        wrap: WrappingMode,
        dim: usize,
        partial: usize,
        result: &mut Vec<usize>,
    ) {
        if dim == center.len() {
            result.push(partial);
            return;
        }

        let size = shape.dimensions()[dim] as i64;
        let stride = shape.multiples()[dim];
        let c = center[dim] as i64;

        for coord in (c - radius)..=(c + radius) {
            let coord = match wrap {
                WrappingMode::NoWrap if coord < 0 || coord >= size => continue,
                WrappingMode::NoWrap => coord,
                WrappingMode::Wrap => coord.rem_euclid(size),
            };
            Self::walk(
                center,
                shape,
                radius,
                wrap,
                dim + 1,
                partial + coord as usize * stride,
                result,
            );
        }
    }

    /// The input index at the center of `column`'s receptive field.
    ///
    /// Each input coordinate is `floor((c + 0.5) × inputDim / columnDim)`,
    /// capped at `inputDim − 1`. Input dimensions with no column counterpart
    /// map as if the column dimension were 1 with coordinate 0.
    pub fn map_column(
        column: usize,
        column_shape: &MatrixShape,
        input_shape: &MatrixShape,
    ) -> Result<usize> {
        let column_coords = column_shape.compute_coordinates(column)?;
        let column_dims = column_shape.dimensions();

        let input_coords: Vec<usize> = input_shape
            .dimensions()
            .iter()
            .enumerate()
            .map(|(d, &input_dim)| {
                let c = column_coords.get(d).copied().unwrap_or(0) as f64;
                let col_dim = column_dims.get(d).copied().unwrap_or(1) as f64;
                let mapped = ((c + 0.5) * input_dim as f64 / col_dim).floor() as usize;
                mapped.min(input_dim - 1)
            })
            .collect();

        input_shape.compute_index(&input_coords)
    }
}
