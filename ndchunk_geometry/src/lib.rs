//! The shape and chunk grid geometry for the `ndchunk` crate.
//!
//! An N-dimensional array of shape `shape` is partitioned into a regular grid of chunks of shape `chunkshape`, and each chunk is further partitioned into blocks of shape `blockshape`.
//! Everything in this crate is a pure computation over those three shapes:
//!  - validation of a shape triple ([`ShapeDescriptor`]),
//!  - chunk counts, chunk origins and the logical (unpadded) extent of boundary chunks ([`ChunkGrid`]),
//!  - conversion between linear (row-major) and multi-dimensional indices,
//!  - the overlap between a requested [`Region`] of the array and a chunk ([`RegionOverlap`]),
//!  - contiguous element runs for copying a region between row-major layouts ([`iterators`]).
//!
//! ## Licence
//! `ndchunk_geometry` is licensed under either of
//!  - the Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> or
//!  - the MIT license <http://opensource.org/licenses/MIT>, at your option.

mod chunk_grid;
pub use chunk_grid::{ChunkGrid, RegionOverlap};

mod region;
pub use region::Region;

mod shape_descriptor;
pub use shape_descriptor::{InvalidShapeError, ShapeDescriptor};

pub mod iterators;

use thiserror::Error;

/// The maximum supported array rank.
pub const MAX_DIM: usize = 8;

/// The shape of an array, chunk, or block.
pub type ArrayShape = Vec<u64>;

/// An ND index to an element in an array or chunk, or to a chunk in a chunk grid.
pub type ArrayIndices = Vec<u64>;

/// An invalid index error.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum InvalidIndexError {
    /// Incompatible dimensionality.
    #[error("incompatible dimensionality {got}, expected {expected}")]
    IncompatibleDimensionality { got: usize, expected: usize },
    /// Indices outside of the bounds.
    #[error("indices {indices:?} are out of bounds of {bounds:?}")]
    OutOfBounds {
        indices: ArrayIndices,
        bounds: ArrayShape,
    },
    /// A linear index outside of the bounds.
    #[error("linear index {index} is out of bounds, must be less than {len}")]
    LinearOutOfBounds { index: u64, len: u64 },
}

impl InvalidIndexError {
    /// Create a new incompatible dimensionality error.
    #[must_use]
    pub const fn new_incompatible_dimensionality(got: usize, expected: usize) -> Self {
        Self::IncompatibleDimensionality { got, expected }
    }

    /// Create a new out of bounds error.
    #[must_use]
    pub fn new_oob(indices: &[u64], bounds: &[u64]) -> Self {
        Self::OutOfBounds {
            indices: indices.to_vec(),
            bounds: bounds.to_vec(),
        }
    }
}

/// Return the number of chunks along each dimension.
///
/// This is `ceil(shape[i] / chunkshape[i])`, or 0 along an empty axis.
/// An array whose every axis is empty has exactly one empty chunk, so its grid shape is all ones.
/// A rank 0 array has an empty grid shape and exactly one chunk.
///
/// # Panics
/// Panics if `shape` and `chunkshape` differ in length.
#[must_use]
pub fn chunk_count_per_dim(shape: &[u64], chunkshape: &[u64]) -> ArrayShape {
    assert_eq!(shape.len(), chunkshape.len());
    if shape.iter().all(|&shape| shape == 0) {
        return vec![1; shape.len()];
    }
    std::iter::zip(shape, chunkshape)
        .map(|(&shape, &chunk)| {
            if shape == 0 || chunk == 0 {
                0
            } else {
                shape.div_ceil(chunk)
            }
        })
        .collect()
}

/// Convert multi-dimensional `indices` within `shape` to a row-major linear index.
///
/// # Errors
/// Returns [`InvalidIndexError`] if `indices` and `shape` differ in length or any index is out of bounds.
pub fn multi_to_linear_index(indices: &[u64], shape: &[u64]) -> Result<u64, InvalidIndexError> {
    if indices.len() != shape.len() {
        return Err(InvalidIndexError::new_incompatible_dimensionality(
            indices.len(),
            shape.len(),
        ));
    }
    if std::iter::zip(indices, shape).any(|(index, shape)| index >= shape) {
        return Err(InvalidIndexError::new_oob(indices, shape));
    }
    Ok(ravel_indices(indices, shape))
}

/// Convert a row-major `linear` index to multi-dimensional indices within `shape`.
///
/// # Errors
/// Returns [`InvalidIndexError`] if `linear` is not less than the number of elements in `shape`.
pub fn linear_to_multi_index(linear: u64, shape: &[u64]) -> Result<ArrayIndices, InvalidIndexError> {
    let len = shape.iter().product::<u64>();
    if linear >= len {
        return Err(InvalidIndexError::LinearOutOfBounds { index: linear, len });
    }
    Ok(unravel_index(linear, shape))
}

/// Return the logical extent of the chunk at `chunk_indices`, i.e. the part of the padded chunk within `shape`.
///
/// The single chunk of an array whose every axis is empty has an all-zero extent.
///
/// # Errors
/// Returns [`InvalidIndexError`] if the dimensionalities differ or `chunk_indices` is outside the chunk grid.
pub fn chunk_logical_extent(
    chunk_indices: &[u64],
    shape: &[u64],
    chunkshape: &[u64],
) -> Result<ArrayShape, InvalidIndexError> {
    if chunk_indices.len() != shape.len() || chunkshape.len() != shape.len() {
        return Err(InvalidIndexError::new_incompatible_dimensionality(
            chunk_indices.len(),
            shape.len(),
        ));
    }
    let grid_shape = chunk_count_per_dim(shape, chunkshape);
    if std::iter::zip(chunk_indices, &grid_shape).any(|(index, count)| index >= count) {
        return Err(InvalidIndexError::new_oob(chunk_indices, &grid_shape));
    }
    Ok(itertools::izip!(chunk_indices, shape, chunkshape)
        .map(|(&index, &shape, &chunk)| {
            let origin = index.saturating_mul(chunk);
            std::cmp::min(chunk, shape.saturating_sub(origin))
        })
        .collect())
}

/// Ravel ND indices to a linear index (row-major).
///
/// Does not check that the indices are within `shape`.
#[must_use]
pub fn ravel_indices(indices: &[u64], shape: &[u64]) -> u64 {
    let mut index: u64 = 0;
    let mut count = 1;
    for (i, s) in std::iter::zip(indices, shape).rev() {
        index += i * count;
        count *= s;
    }
    index
}

/// Unravel a linear index to ND indices (row-major).
#[must_use]
pub fn unravel_index(mut index: u64, shape: &[u64]) -> ArrayIndices {
    let mut indices: ArrayIndices = vec![0; shape.len()];
    for (indices_i, &dim) in std::iter::zip(indices.iter_mut().rev(), shape.iter().rev()) {
        *indices_i = index % dim;
        index /= dim;
    }
    indices
}
