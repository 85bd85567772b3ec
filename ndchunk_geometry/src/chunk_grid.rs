use crate::{
    chunk_count_per_dim, chunk_logical_extent, linear_to_multi_index, multi_to_linear_index,
    ravel_indices, ArrayIndices, ArrayShape, InvalidIndexError, InvalidShapeError, Region,
    ShapeDescriptor,
};

/// The overlap between a requested region of an array and a chunk.
///
/// `chunk_offset` is relative to the chunk origin and `buffer_offset` is relative to the region start.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegionOverlap {
    /// The start of the overlap in chunk coordinates.
    pub chunk_offset: ArrayIndices,
    /// The start of the overlap in region coordinates.
    pub buffer_offset: ArrayIndices,
    /// The shape of the overlap.
    pub extent: ArrayShape,
}

impl RegionOverlap {
    /// Return the number of elements in the overlap.
    #[must_use]
    pub fn num_elements(&self) -> u64 {
        self.extent.iter().product()
    }
}

/// A regular chunk grid over a validated [`ShapeDescriptor`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChunkGrid {
    descriptor: ShapeDescriptor,
    grid_shape: ArrayShape,
    num_chunks: u64,
}

impl ChunkGrid {
    /// Create a new chunk grid.
    #[must_use]
    pub fn new(descriptor: ShapeDescriptor) -> Self {
        let grid_shape = chunk_count_per_dim(descriptor.shape(), descriptor.chunkshape());
        let num_chunks = grid_shape.iter().product();
        Self {
            descriptor,
            grid_shape,
            num_chunks,
        }
    }

    /// Create a new chunk grid from a `shape`, `chunkshape` and `blockshape`.
    ///
    /// # Errors
    /// Returns [`InvalidShapeError`] if the shapes are not a valid [`ShapeDescriptor`].
    pub fn from_shapes(
        shape: ArrayShape,
        chunkshape: ArrayShape,
        blockshape: ArrayShape,
    ) -> Result<Self, InvalidShapeError> {
        Ok(Self::new(ShapeDescriptor::new(shape, chunkshape, blockshape)?))
    }

    /// Return the shape descriptor.
    #[must_use]
    pub fn descriptor(&self) -> &ShapeDescriptor {
        &self.descriptor
    }

    /// Return the array shape.
    #[must_use]
    pub fn shape(&self) -> &[u64] {
        self.descriptor.shape()
    }

    /// Return the (padded) chunk shape.
    #[must_use]
    pub fn chunkshape(&self) -> &[u64] {
        self.descriptor.chunkshape()
    }

    /// Return the block shape.
    #[must_use]
    pub fn blockshape(&self) -> &[u64] {
        self.descriptor.blockshape()
    }

    /// Return the rank.
    #[must_use]
    pub fn dimensionality(&self) -> usize {
        self.descriptor.dimensionality()
    }

    /// Return the number of chunks along each dimension.
    #[must_use]
    pub fn grid_shape(&self) -> &[u64] {
        &self.grid_shape
    }

    /// Return the total number of chunks.
    #[must_use]
    pub fn num_chunks(&self) -> u64 {
        self.num_chunks
    }

    /// Return the chunk indices of the chunk with row-major `linear` index.
    ///
    /// # Errors
    /// Returns [`InvalidIndexError`] if `linear` is not less than [`num_chunks`](Self::num_chunks).
    pub fn chunk_indices(&self, linear: u64) -> Result<ArrayIndices, InvalidIndexError> {
        linear_to_multi_index(linear, &self.grid_shape)
    }

    /// Return the row-major linear index of the chunk at `chunk_indices`.
    ///
    /// # Errors
    /// Returns [`InvalidIndexError`] if `chunk_indices` is not in the grid.
    pub fn linear_chunk_index(&self, chunk_indices: &[u64]) -> Result<u64, InvalidIndexError> {
        multi_to_linear_index(chunk_indices, &self.grid_shape)
    }

    /// Return the origin of the chunk at `chunk_indices` in array coordinates.
    ///
    /// # Errors
    /// Returns [`InvalidIndexError`] if `chunk_indices` is not in the grid.
    pub fn chunk_origin(&self, chunk_indices: &[u64]) -> Result<ArrayIndices, InvalidIndexError> {
        self.check_chunk_indices(chunk_indices)?;
        Ok(std::iter::zip(chunk_indices, self.chunkshape())
            .map(|(index, chunk)| index * chunk)
            .collect())
    }

    /// Return the logical extent of the chunk at `chunk_indices`.
    ///
    /// # Errors
    /// Returns [`InvalidIndexError`] if `chunk_indices` is not in the grid.
    pub fn chunk_logical_extent(
        &self,
        chunk_indices: &[u64],
    ) -> Result<ArrayShape, InvalidIndexError> {
        chunk_logical_extent(chunk_indices, self.shape(), self.chunkshape())
    }

    /// Return the logical region of the array covered by the chunk at `chunk_indices`.
    ///
    /// # Errors
    /// Returns [`InvalidIndexError`] if `chunk_indices` is not in the grid.
    pub fn chunk_region(&self, chunk_indices: &[u64]) -> Result<Region, InvalidIndexError> {
        let origin = self.chunk_origin(chunk_indices)?;
        let extent = self.chunk_logical_extent(chunk_indices)?;
        Region::new_with_start_shape(origin, extent)
    }

    /// Returns true if the chunk at `chunk_indices` is a boundary chunk with a logical extent smaller than the chunk shape.
    ///
    /// # Errors
    /// Returns [`InvalidIndexError`] if `chunk_indices` is not in the grid.
    pub fn is_partial_chunk(&self, chunk_indices: &[u64]) -> Result<bool, InvalidIndexError> {
        Ok(self.chunk_logical_extent(chunk_indices)?.as_slice() != self.chunkshape())
    }

    /// Return the chunk containing the element at `indices` and the offset of the element within that chunk.
    ///
    /// # Errors
    /// Returns [`InvalidIndexError`] if `indices` is not in the array.
    pub fn element_location(
        &self,
        indices: &[u64],
    ) -> Result<(ArrayIndices, ArrayIndices), InvalidIndexError> {
        if indices.len() != self.dimensionality() {
            return Err(InvalidIndexError::new_incompatible_dimensionality(
                indices.len(),
                self.dimensionality(),
            ));
        }
        if std::iter::zip(indices, self.shape()).any(|(index, shape)| index >= shape) {
            return Err(InvalidIndexError::new_oob(indices, self.shape()));
        }
        Ok(std::iter::zip(indices, self.chunkshape())
            .map(|(index, chunk)| (index / chunk, index % chunk))
            .unzip())
    }

    /// Return the overlap between `region` and the logical extent of the chunk at `chunk_indices`.
    ///
    /// Returns [`None`] if they are disjoint.
    /// A region that is empty along an axis but located on the chunk produces an empty overlap.
    ///
    /// # Errors
    /// Returns [`InvalidIndexError`] if `chunk_indices` is not in the grid or `region` has a different dimensionality.
    pub fn region_overlap(
        &self,
        chunk_indices: &[u64],
        region: &Region,
    ) -> Result<Option<RegionOverlap>, InvalidIndexError> {
        if region.dimensionality() != self.dimensionality() {
            return Err(InvalidIndexError::new_incompatible_dimensionality(
                region.dimensionality(),
                self.dimensionality(),
            ));
        }
        let chunk_region = self.chunk_region(chunk_indices)?;
        let dimensionality = self.dimensionality();
        let mut overlap = RegionOverlap {
            chunk_offset: Vec::with_capacity(dimensionality),
            buffer_offset: Vec::with_capacity(dimensionality),
            extent: Vec::with_capacity(dimensionality),
        };
        for (&region_start, &region_size, &chunk_start, &chunk_size) in itertools::izip!(
            region.start(),
            region.shape(),
            chunk_region.start(),
            chunk_region.shape()
        ) {
            let chunk_end = chunk_start + chunk_size;
            let (start, size) = if region_size == 0 {
                if region_start < chunk_start || region_start > chunk_end {
                    return Ok(None);
                }
                (region_start, 0)
            } else {
                let start = std::cmp::max(region_start, chunk_start);
                let end = std::cmp::min(region_start + region_size, chunk_end);
                if end <= start {
                    return Ok(None);
                }
                (start, end - start)
            };
            overlap.chunk_offset.push(start - chunk_start);
            overlap.buffer_offset.push(start - region_start);
            overlap.extent.push(size);
        }
        Ok(Some(overlap))
    }

    /// Return the region of the chunk grid containing every chunk intersecting `region`.
    ///
    /// # Errors
    /// Returns [`InvalidIndexError`] if `region` is not within the array.
    pub fn chunks_in_region(&self, region: &Region) -> Result<Region, InvalidIndexError> {
        region.check_inbounds(self.shape())?;
        if region.is_empty() {
            return Ok(Region::new_with_shape(vec![0; self.dimensionality()]));
        }
        Ok(itertools::izip!(region.start(), region.shape(), self.chunkshape())
            .map(|(&start, &size, &chunk)| start / chunk..(start + size - 1) / chunk + 1)
            .into())
    }

    /// Return the row-major linear indices of every chunk intersecting `region`, in row-major order.
    ///
    /// # Errors
    /// Returns [`InvalidIndexError`] if `region` is not within the array.
    pub fn linear_chunk_indices_in_region(
        &self,
        region: &Region,
    ) -> Result<Vec<u64>, InvalidIndexError> {
        Ok(self
            .chunks_in_region(region)?
            .indices()
            .map(|chunk_indices| ravel_indices(&chunk_indices, &self.grid_shape))
            .collect())
    }

    fn check_chunk_indices(&self, chunk_indices: &[u64]) -> Result<(), InvalidIndexError> {
        multi_to_linear_index(chunk_indices, &self.grid_shape).map(|_| ())
    }
}
