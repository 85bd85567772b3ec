use thiserror::Error;

use crate::{ArrayShape, MAX_DIM};

/// An invalid shape error.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum InvalidShapeError {
    /// The shape, chunk shape and block shape have different lengths.
    #[error("rank mismatch: shape has {shape} dimensions, chunk shape has {chunk} and block shape has {block}")]
    RankMismatch {
        shape: usize,
        chunk: usize,
        block: usize,
    },
    /// The rank exceeds [`MAX_DIM`].
    #[error("rank {0} exceeds the maximum of {MAX_DIM}")]
    RankTooLarge(usize),
    /// A chunk extent is invalid for the array extent.
    #[error("chunk extent {chunk} is invalid for array extent {shape} in dimension {dim}")]
    InvalidChunkExtent { dim: usize, shape: u64, chunk: u64 },
    /// A block extent is invalid for the chunk extent.
    #[error("block extent {block} is invalid for chunk extent {chunk} in dimension {dim}")]
    InvalidBlockExtent { dim: usize, chunk: u64, block: u64 },
    /// The number of elements in a shape exceeds [`u64::MAX`].
    #[error("the number of elements in {0:?} exceeds u64::MAX")]
    TooManyElements(ArrayShape),
}

fn checked_num_elements(shape: &[u64]) -> Option<u64> {
    shape.iter().try_fold(1u64, |acc, &extent| acc.checked_mul(extent))
}

/// A validated `shape`, `chunkshape` and `blockshape` triple.
///
/// Along a non-empty axis, `1 <= chunkshape <= shape` and `1 <= blockshape <= chunkshape`.
/// Along an empty axis (`shape == 0`), the chunk extent is unconstrained and the block extent may only be 0 if the chunk extent is 0.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ShapeDescriptor {
    shape: ArrayShape,
    chunkshape: ArrayShape,
    blockshape: ArrayShape,
}

impl ShapeDescriptor {
    /// Create a new shape descriptor.
    ///
    /// # Errors
    /// Returns [`InvalidShapeError`] if the ranks differ, the rank exceeds [`MAX_DIM`], a chunk or block extent is invalid, or the element count of the padded array or of a chunk exceeds [`u64::MAX`].
    pub fn new(
        shape: ArrayShape,
        chunkshape: ArrayShape,
        blockshape: ArrayShape,
    ) -> Result<Self, InvalidShapeError> {
        if shape.len() != chunkshape.len() || shape.len() != blockshape.len() {
            return Err(InvalidShapeError::RankMismatch {
                shape: shape.len(),
                chunk: chunkshape.len(),
                block: blockshape.len(),
            });
        }
        if shape.len() > MAX_DIM {
            return Err(InvalidShapeError::RankTooLarge(shape.len()));
        }
        for (dim, (&shape, &chunk, &block)) in
            itertools::izip!(&shape, &chunkshape, &blockshape).enumerate()
        {
            if shape > 0 && (chunk == 0 || chunk > shape) {
                return Err(InvalidShapeError::InvalidChunkExtent { dim, shape, chunk });
            }
            if block > chunk || (block == 0 && chunk > 0) {
                return Err(InvalidShapeError::InvalidBlockExtent { dim, chunk, block });
            }
        }
        let padded_shape: Option<ArrayShape> = std::iter::zip(&shape, &chunkshape)
            .map(|(&shape, &chunk)| {
                if chunk == 0 {
                    Some(shape)
                } else {
                    shape.checked_next_multiple_of(chunk)
                }
            })
            .collect();
        if padded_shape.as_deref().and_then(checked_num_elements).is_none() {
            return Err(InvalidShapeError::TooManyElements(shape));
        }
        if checked_num_elements(&chunkshape).is_none() {
            return Err(InvalidShapeError::TooManyElements(chunkshape));
        }
        Ok(Self {
            shape,
            chunkshape,
            blockshape,
        })
    }

    /// Return the array shape.
    #[must_use]
    pub fn shape(&self) -> &[u64] {
        &self.shape
    }

    /// Return the chunk shape.
    #[must_use]
    pub fn chunkshape(&self) -> &[u64] {
        &self.chunkshape
    }

    /// Return the block shape.
    #[must_use]
    pub fn blockshape(&self) -> &[u64] {
        &self.blockshape
    }

    /// Return the rank.
    #[must_use]
    pub fn dimensionality(&self) -> usize {
        self.shape.len()
    }

    /// Return the number of elements in the array.
    #[must_use]
    pub fn num_elements(&self) -> u64 {
        self.shape.iter().product()
    }

    /// Return the number of elements in a padded chunk.
    #[must_use]
    pub fn chunk_num_elements(&self) -> u64 {
        self.chunkshape.iter().product()
    }

    /// Return the number of elements in a block.
    #[must_use]
    pub fn block_num_elements(&self) -> u64 {
        self.blockshape.iter().product()
    }

    /// Return the array shape rounded up to a multiple of the chunk shape.
    #[must_use]
    pub fn padded_shape(&self) -> ArrayShape {
        std::iter::zip(&self.shape, &self.chunkshape)
            .map(|(&shape, &chunk)| if chunk == 0 { shape } else { shape.next_multiple_of(chunk) })
            .collect()
    }

    /// Return the chunk shape rounded up to a multiple of the block shape.
    #[must_use]
    pub fn padded_chunkshape(&self) -> ArrayShape {
        std::iter::zip(&self.chunkshape, &self.blockshape)
            .map(|(&chunk, &block)| if block == 0 { chunk } else { chunk.next_multiple_of(block) })
            .collect()
    }

    /// Return the number of blocks along each dimension of a chunk.
    #[must_use]
    pub fn blocks_per_chunk(&self) -> ArrayShape {
        std::iter::zip(&self.chunkshape, &self.blockshape)
            .map(|(&chunk, &block)| if block == 0 { 0 } else { chunk.div_ceil(block) })
            .collect()
    }
}
