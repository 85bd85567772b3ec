use std::fmt::Display;
use std::ops::Range;

use crate::iterators::Indices;
use crate::{ArrayIndices, ArrayShape, InvalidIndexError};

/// A hyper-rectangular region of an array or chunk, given by start indices and a shape.
#[derive(Clone, Eq, PartialEq, Hash, Debug, Default)]
pub struct Region {
    start: ArrayIndices,
    shape: ArrayShape,
}

impl Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.to_ranges())
    }
}

impl<T: IntoIterator<Item = Range<u64>>> From<T> for Region {
    fn from(ranges: T) -> Self {
        let (start, shape) = ranges
            .into_iter()
            .map(|range| (range.start, range.end.saturating_sub(range.start)))
            .unzip();
        Self { start, shape }
    }
}

impl Region {
    /// Create a new region with `shape` starting at the origin.
    #[must_use]
    pub fn new_with_shape(shape: ArrayShape) -> Self {
        Self {
            start: vec![0; shape.len()],
            shape,
        }
    }

    /// Create a new region from a list of [`Range`]s.
    #[must_use]
    pub fn new_with_ranges(ranges: &[Range<u64>]) -> Self {
        Self::from(ranges.iter().cloned())
    }

    /// Create a new region.
    ///
    /// # Errors
    /// Returns [`InvalidIndexError`] if `start` and `shape` differ in length.
    pub fn new_with_start_shape(
        start: ArrayIndices,
        shape: ArrayShape,
    ) -> Result<Self, InvalidIndexError> {
        if start.len() == shape.len() {
            Ok(Self { start, shape })
        } else {
            Err(InvalidIndexError::new_incompatible_dimensionality(
                start.len(),
                shape.len(),
            ))
        }
    }

    /// Return the start of the region.
    #[must_use]
    pub fn start(&self) -> &[u64] {
        &self.start
    }

    /// Return the shape of the region.
    #[must_use]
    pub fn shape(&self) -> &[u64] {
        &self.shape
    }

    /// Return the dimensionality of the region.
    #[must_use]
    pub fn dimensionality(&self) -> usize {
        self.start.len()
    }

    /// Return the end (exclusive) of the region.
    #[must_use]
    pub fn end_exc(&self) -> ArrayIndices {
        std::iter::zip(&self.start, &self.shape)
            .map(|(start, size)| start + size)
            .collect()
    }

    /// Return the region as a list of ranges.
    #[must_use]
    pub fn to_ranges(&self) -> Vec<Range<u64>> {
        std::iter::zip(&self.start, &self.shape)
            .map(|(&start, &size)| start..start + size)
            .collect()
    }

    /// Return the number of elements in the region.
    ///
    /// A rank 0 region has one element.
    #[must_use]
    pub fn num_elements(&self) -> u64 {
        self.shape.iter().product()
    }

    /// Return the number of elements of the region as a [`usize`].
    ///
    /// # Panics
    /// Panics if [`num_elements()`](Self::num_elements()) is greater than [`usize::MAX`].
    #[must_use]
    pub fn num_elements_usize(&self) -> usize {
        usize::try_from(self.num_elements()).unwrap()
    }

    /// Returns true if the region has zero elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shape.iter().any(|size| *size == 0)
    }

    /// Returns true if the region lies within an array of shape `array_shape`.
    #[must_use]
    pub fn inbounds_shape(&self, array_shape: &[u64]) -> bool {
        self.dimensionality() == array_shape.len()
            && itertools::izip!(&self.start, &self.shape, array_shape)
                .all(|(&start, &size, &array)| start.checked_add(size).is_some_and(|end| end <= array))
    }

    /// Check that the region lies within an array of shape `array_shape`.
    ///
    /// # Errors
    /// Returns [`InvalidIndexError`] if the dimensionality differs or the region extends past `array_shape`.
    pub fn check_inbounds(&self, array_shape: &[u64]) -> Result<(), InvalidIndexError> {
        if self.dimensionality() != array_shape.len() {
            Err(InvalidIndexError::new_incompatible_dimensionality(
                self.dimensionality(),
                array_shape.len(),
            ))
        } else if self.inbounds_shape(array_shape) {
            Ok(())
        } else {
            Err(InvalidIndexError::new_oob(&self.end_exc(), array_shape))
        }
    }

    /// Return the overlapping region between this region and `other`.
    ///
    /// The overlap is empty along any axis where the regions do not intersect.
    ///
    /// # Errors
    /// Returns [`InvalidIndexError`] if the dimensionality of `other` does not match.
    pub fn overlap(&self, other: &Self) -> Result<Self, InvalidIndexError> {
        if other.dimensionality() != self.dimensionality() {
            return Err(InvalidIndexError::new_incompatible_dimensionality(
                other.dimensionality(),
                self.dimensionality(),
            ));
        }
        let (start, shape) = itertools::izip!(&self.start, &self.shape, &other.start, &other.shape)
            .map(|(&start_a, &size_a, &start_b, &size_b)| {
                let start = std::cmp::max(start_a, start_b);
                let end = std::cmp::min(start_a + size_a, start_b + size_b);
                (start, end.saturating_sub(start))
            })
            .unzip();
        Ok(Self { start, shape })
    }

    /// Return the region relative to `offset`.
    ///
    /// # Errors
    /// Returns [`InvalidIndexError`] if `offset` has a different dimensionality or is greater than the start of the region along any axis.
    pub fn relative_to(&self, offset: &[u64]) -> Result<Self, InvalidIndexError> {
        if offset.len() != self.dimensionality() {
            return Err(InvalidIndexError::new_incompatible_dimensionality(
                offset.len(),
                self.dimensionality(),
            ));
        }
        let start = std::iter::zip(&self.start, offset)
            .map(|(&start, &offset)| start.checked_sub(offset))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| InvalidIndexError::new_oob(offset, &self.start))?;
        Ok(Self {
            start,
            shape: self.shape.clone(),
        })
    }

    /// Return an iterator over the indices of the elements in the region in row-major order.
    #[must_use]
    pub fn indices(&self) -> Indices {
        Indices::new(self.clone())
    }
}
