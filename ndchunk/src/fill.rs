//! The special chunk policy.
//!
//! A fill (zero, NaN, a constant value, or uninitialized) is stored as a [`SpecialChunk`] with no payload.
//! Special chunks are expanded only when read into an output buffer or when a write touches part of them.

use ndchunk_storage::{FillValue, SpecialChunk};

use crate::array::ArrayError;

/// Decides how fills are represented and when a special chunk must be materialized.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpecialChunkPolicy {
    element_size: usize,
}

impl SpecialChunkPolicy {
    /// Create a new special chunk policy for elements of `element_size` bytes.
    #[must_use]
    pub const fn new(element_size: usize) -> Self {
        Self { element_size }
    }

    /// Return the element size in bytes.
    #[must_use]
    pub const fn element_size(&self) -> usize {
        self.element_size
    }

    /// Validate `fill` and return the special chunk representing it.
    ///
    /// # Errors
    /// Returns [`ArrayError::InvalidFillValue`] if
    ///  - a [`FillValue::Value`] is not exactly one element long, or
    ///  - a [`FillValue::Nan`] is requested for an element size other than 4 or 8.
    pub fn special_chunk(&self, fill: FillValue) -> Result<SpecialChunk, ArrayError> {
        match &fill {
            FillValue::Value(value) if value.len() != self.element_size => {
                return Err(ArrayError::InvalidFillValue(format!(
                    "fill value has {} bytes, expected {}",
                    value.len(),
                    self.element_size
                )));
            }
            FillValue::Nan if !matches!(self.element_size, 4 | 8) => {
                return Err(ArrayError::InvalidFillValue(format!(
                    "NaN fill requires an element size of 4 or 8, got {}",
                    self.element_size
                )));
            }
            _ => {}
        }
        Ok(SpecialChunk::new(self.element_size, fill))
    }

    /// Check that `special` is a valid special chunk for this element size.
    ///
    /// # Errors
    /// Returns [`ArrayError::InvalidFillValue`] if the element size of `special` differs or its fill is invalid.
    pub fn validate(&self, special: &SpecialChunk) -> Result<(), ArrayError> {
        if special.element_size() != self.element_size {
            return Err(ArrayError::InvalidFillValue(format!(
                "special chunk has element size {}, expected {}",
                special.element_size(),
                self.element_size
            )));
        }
        self.special_chunk(special.fill().clone()).map(|_| ())
    }

    /// Return the bytes of one element of `special`, or [`None`] if its elements are uninitialized.
    #[must_use]
    pub fn element_bytes(&self, special: &SpecialChunk) -> Option<Vec<u8>> {
        special.fill().element_bytes(self.element_size)
    }

    /// Expand `special` into a padded chunk of `num_elements` elements.
    ///
    /// Uninitialized elements are zero.
    #[must_use]
    pub fn materialize(&self, special: &SpecialChunk, num_elements: usize) -> Vec<u8> {
        match self.element_bytes(special) {
            Some(element) if element.iter().any(|&byte| byte != 0) => element.repeat(num_elements),
            _ => vec![0; num_elements * self.element_size],
        }
    }

    /// Returns true if a write of `write_extent` into a chunk with `logical_extent` must start from the existing chunk contents.
    ///
    /// A write that covers the whole logical extent replaces the chunk and needs no prior contents.
    #[must_use]
    pub fn requires_existing(&self, write_extent: &[u64], logical_extent: &[u64]) -> bool {
        write_extent != logical_extent
    }
}
