//! Region iterators.
//!
//! - [`Indices`]: the element indices of a region in row-major order.
//! - [`ContiguousRuns`]: runs of contiguous elements of a region within an array.
//! - [`CopyRuns`]: runs of elements that are contiguous in both a source and a destination layout.

use std::iter::FusedIterator;

use crate::{unravel_index, ArrayIndices, InvalidIndexError, Region};

/// An iterator over the indices of the elements of a [`Region`].
///
/// Iterates over the last dimension fastest (i.e. C-contiguous order).
/// A rank 0 region yields a single empty index.
#[derive(Clone, Debug)]
pub struct Indices {
    region: Region,
    index_front: u64,
    index_back: u64,
}

impl Indices {
    /// Create a new indices iterator.
    #[must_use]
    pub fn new(region: Region) -> Self {
        let length = region.num_elements();
        Self {
            region,
            index_front: 0,
            index_back: length,
        }
    }

    fn indices_at(&self, index: u64) -> ArrayIndices {
        let mut indices = unravel_index(index, self.region.shape());
        std::iter::zip(indices.iter_mut(), self.region.start())
            .for_each(|(index, start)| *index += start);
        indices
    }
}

impl Iterator for Indices {
    type Item = ArrayIndices;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index_front < self.index_back {
            let indices = self.indices_at(self.index_front);
            self.index_front += 1;
            Some(indices)
        } else {
            None
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let length = usize::try_from(self.index_back - self.index_front).unwrap_or(usize::MAX);
        (length, Some(length))
    }
}

impl DoubleEndedIterator for Indices {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.index_front < self.index_back {
            self.index_back -= 1;
            Some(self.indices_at(self.index_back))
        } else {
            None
        }
    }
}

impl ExactSizeIterator for Indices {}

impl FusedIterator for Indices {}

fn strides(shape: &[u64]) -> Vec<u64> {
    let mut strides = vec![1; shape.len()];
    for i in (0..shape.len().saturating_sub(1)).rev() {
        strides[i] = strides[i + 1] * shape[i + 1];
    }
    strides
}

fn check_within(extent: &[u64], start: &[u64], shape: &[u64]) -> Result<(), InvalidIndexError> {
    if start.len() != extent.len() || shape.len() != extent.len() {
        return Err(InvalidIndexError::new_incompatible_dimensionality(
            start.len().max(shape.len()),
            extent.len(),
        ));
    }
    let region = Region::new_with_start_shape(start.to_vec(), extent.to_vec())?;
    region.check_inbounds(shape)
}

/// Iterates over runs of elements that are contiguous in both a source and a destination row-major layout.
///
/// The iterator item is a tuple: (source element offset, destination element offset).
/// Every run is [`contiguous_elements`](CopyRuns::contiguous_elements) long.
///
/// For example, copying a 2x3 extent starting at `(1, 1)` of a 4x4 source into the origin of a 2x3 destination produces
/// ```text
/// [(5, 0), (9, 3)]
/// ```
/// with 3 contiguous elements.
#[derive(Clone, Debug)]
pub struct CopyRuns {
    outer: Indices,
    src_start: Vec<u64>,
    src_strides: Vec<u64>,
    dst_start: Vec<u64>,
    dst_strides: Vec<u64>,
    contiguous_elements: u64,
}

impl CopyRuns {
    /// Create a new copy runs iterator for an `extent` located at `src_start` within `src_shape` and `dst_start` within `dst_shape`.
    ///
    /// # Errors
    /// Returns [`InvalidIndexError`] if the dimensionalities differ or the extent does not fit in either layout.
    pub fn new(
        extent: &[u64],
        src_shape: &[u64],
        src_start: &[u64],
        dst_shape: &[u64],
        dst_start: &[u64],
    ) -> Result<Self, InvalidIndexError> {
        check_within(extent, src_start, src_shape)?;
        check_within(extent, dst_start, dst_shape)?;

        // Merge trailing dimensions that are complete in both layouts
        let mut split = extent.len();
        let mut contiguous_elements = 1;
        for dim in (0..extent.len()).rev() {
            split = dim;
            contiguous_elements *= extent[dim];
            if extent[dim] != src_shape[dim] || extent[dim] != dst_shape[dim] {
                break;
            }
        }

        let outer = if extent.contains(&0) {
            Region::new_with_shape(vec![0])
        } else {
            Region::new_with_shape(extent[..split].to_vec())
        };
        Ok(Self {
            outer: outer.indices(),
            src_start: src_start.to_vec(),
            src_strides: strides(src_shape),
            dst_start: dst_start.to_vec(),
            dst_strides: strides(dst_shape),
            contiguous_elements,
        })
    }

    /// Return the number of contiguous elements in each run.
    #[must_use]
    pub fn contiguous_elements(&self) -> u64 {
        self.contiguous_elements
    }

    fn offset(outer: &[u64], start: &[u64], strides: &[u64]) -> u64 {
        let mut offset = 0;
        for (dim, (&start, &stride)) in std::iter::zip(start, strides).enumerate() {
            let index = start + outer.get(dim).copied().unwrap_or_default();
            offset += index * stride;
        }
        offset
    }
}

impl Iterator for CopyRuns {
    type Item = (u64, u64);

    fn next(&mut self) -> Option<Self::Item> {
        let outer = self.outer.next()?;
        Some((
            Self::offset(&outer, &self.src_start, &self.src_strides),
            Self::offset(&outer, &self.dst_start, &self.dst_strides),
        ))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.outer.size_hint()
    }
}

impl ExactSizeIterator for CopyRuns {}

impl FusedIterator for CopyRuns {}

/// Iterates over runs of contiguous elements of a region within an array.
///
/// The iterator item is the element offset of the start of each run.
/// Every run is [`contiguous_elements`](ContiguousRuns::contiguous_elements) long.
#[derive(Clone, Debug)]
pub struct ContiguousRuns(CopyRuns);

impl ContiguousRuns {
    /// Create a new contiguous runs iterator.
    ///
    /// # Errors
    /// Returns [`InvalidIndexError`] if `array_shape` does not encapsulate `region`.
    pub fn new(region: &Region, array_shape: &[u64]) -> Result<Self, InvalidIndexError> {
        Ok(Self(CopyRuns::new(
            region.shape(),
            array_shape,
            region.start(),
            array_shape,
            region.start(),
        )?))
    }

    /// Return the number of contiguous elements in each run.
    #[must_use]
    pub fn contiguous_elements(&self) -> u64 {
        self.0.contiguous_elements()
    }
}

impl Iterator for ContiguousRuns {
    type Item = u64;

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|(offset, _)| offset)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}

impl ExactSizeIterator for ContiguousRuns {}

impl FusedIterator for ContiguousRuns {}
