use ndchunk_geometry::Region;
use ndchunk_geometry::iterators::{ContiguousRuns, CopyRuns};
use unsafe_cell_slice::UnsafeCellSlice;

use super::ArrayError;

/// Return the number of bytes in `num_elements` elements of `element_size` bytes.
///
/// # Errors
/// Returns [`ArrayError::TooLarge`] if the number of bytes exceeds [`usize::MAX`].
pub(crate) fn bytes_len(num_elements: u64, element_size: usize) -> Result<usize, ArrayError> {
    usize::try_from(num_elements)
        .ok()
        .and_then(|num_elements| num_elements.checked_mul(element_size))
        .ok_or(ArrayError::TooLarge {
            num_elements,
            element_size,
        })
}

fn byte_offset(element_offset: u64, element_size: usize) -> Result<usize, ArrayError> {
    bytes_len(element_offset, element_size)
}

/// Copy an `extent` of elements at `src_start` in the row-major `src` of shape `src_shape` to `dst_start` in the row-major `dst` of shape `dst_shape`.
#[allow(clippy::too_many_arguments)]
pub(crate) fn copy_elements(
    element_size: usize,
    extent: &[u64],
    src: &[u8],
    src_shape: &[u64],
    src_start: &[u64],
    dst: &mut [u8],
    dst_shape: &[u64],
    dst_start: &[u64],
) -> Result<(), ArrayError> {
    let runs = CopyRuns::new(extent, src_shape, src_start, dst_shape, dst_start)?;
    let run_len = bytes_len(runs.contiguous_elements(), element_size)?;
    for (src_offset, dst_offset) in runs {
        let src_offset = byte_offset(src_offset, element_size)?;
        let dst_offset = byte_offset(dst_offset, element_size)?;
        dst[dst_offset..dst_offset + run_len]
            .copy_from_slice(&src[src_offset..src_offset + run_len]);
    }
    Ok(())
}

/// A disjoint view of a region of the bytes of a row-major array.
///
/// The region of a view must not overlap the region of any other view of the same bytes.
pub(crate) struct DisjointView<'a> {
    bytes: UnsafeCellSlice<'a, u8>,
    element_size: usize,
    shape: &'a [u64],
    region: Region,
}

impl<'a> DisjointView<'a> {
    /// Create a new view of `region` within the bytes of an array with `shape`.
    ///
    /// # Errors
    /// Returns [`ArrayError::InvalidIndex`] if `region` is out of bounds of `shape`, or [`ArrayError::SizeMismatch`] if `bytes` does not hold exactly `shape` elements.
    ///
    /// # Safety
    /// `region` must not overlap the region of any other view of `bytes` that is alive at the same time.
    pub(crate) unsafe fn new(
        bytes: UnsafeCellSlice<'a, u8>,
        element_size: usize,
        shape: &'a [u64],
        region: Region,
    ) -> Result<Self, ArrayError> {
        region.check_inbounds(shape)?;
        let expected = bytes_len(shape.iter().product(), element_size)?;
        if bytes.len() != expected {
            return Err(ArrayError::size_mismatch(bytes.len(), expected));
        }
        Ok(Self {
            bytes,
            element_size,
            shape,
            region,
        })
    }

    /// Fill every element of the view with `element`.
    ///
    /// # Errors
    /// Returns [`ArrayError::SizeMismatch`] if `element` is not one element long.
    pub(crate) fn fill(&mut self, element: &[u8]) -> Result<(), ArrayError> {
        if element.len() != self.element_size {
            return Err(ArrayError::size_mismatch(element.len(), self.element_size));
        }
        let runs = ContiguousRuns::new(&self.region, self.shape)?;
        let run_len = bytes_len(runs.contiguous_elements(), self.element_size)?;
        let run: Vec<u8> = element.iter().copied().cycle().take(run_len).collect();
        for offset in runs {
            let offset = byte_offset(offset, self.element_size)?;
            // SAFETY: the run is within the region of this view, which is disjoint from other views
            unsafe {
                self.bytes
                    .index_mut(offset..offset + run.len())
                    .copy_from_slice(&run);
            }
        }
        Ok(())
    }

    /// Copy the elements of the view from the region of the same shape at `src_start` in the row-major `src` of shape `src_shape`.
    ///
    /// # Errors
    /// Returns [`ArrayError::InvalidIndex`] if the region does not fit in `src`, or [`ArrayError::SizeMismatch`] if `src` does not hold exactly `src_shape` elements.
    pub(crate) fn copy_from(
        &mut self,
        src: &[u8],
        src_shape: &[u64],
        src_start: &[u64],
    ) -> Result<(), ArrayError> {
        let expected = bytes_len(src_shape.iter().product(), self.element_size)?;
        if src.len() != expected {
            return Err(ArrayError::size_mismatch(src.len(), expected));
        }
        let runs = CopyRuns::new(
            self.region.shape(),
            src_shape,
            src_start,
            self.shape,
            self.region.start(),
        )?;
        let run_len = bytes_len(runs.contiguous_elements(), self.element_size)?;
        for (src_offset, dst_offset) in runs {
            let src_offset = byte_offset(src_offset, self.element_size)?;
            let dst_offset = byte_offset(dst_offset, self.element_size)?;
            // SAFETY: the run is within the region of this view, which is disjoint from other views
            unsafe {
                self.bytes
                    .index_mut(dst_offset..dst_offset + run_len)
                    .copy_from_slice(&src[src_offset..src_offset + run_len]);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disjoint_views() {
        let shape = vec![4, 4];
        let mut bytes = vec![0u8; 16 * 2];
        {
            let slice = UnsafeCellSlice::new(&mut bytes);
            let mut top = unsafe {
                DisjointView::new(slice, 2, &shape, Region::new_with_ranges(&[0..2, 0..4]))
            }
            .unwrap();
            let mut bottom_left = unsafe {
                DisjointView::new(slice, 2, &shape, Region::new_with_ranges(&[2..4, 0..2]))
            }
            .unwrap();
            top.fill(&[1, 1]).unwrap();
            let src: Vec<u8> = (0..8).collect();
            bottom_left.copy_from(&src, &[2, 2], &[0, 0]).unwrap();
            assert!(top.fill(&[1]).is_err());
        }
        assert_eq!(&bytes[..16], &[1; 16]);
        assert_eq!(&bytes[16..20], &[0, 1, 2, 3]);
        assert_eq!(&bytes[20..24], &[0; 4]);
        assert_eq!(&bytes[24..28], &[4, 5, 6, 7]);
        assert_eq!(&bytes[28..], &[0; 4]);
    }

    #[test]
    fn disjoint_view_bounds() {
        let shape = vec![2, 2];
        let mut bytes = vec![0u8; 4];
        let slice = UnsafeCellSlice::new(&mut bytes);
        assert!(
            unsafe { DisjointView::new(slice, 1, &shape, Region::new_with_ranges(&[0..3, 0..1])) }
                .is_err()
        );
        assert!(
            unsafe { DisjointView::new(slice, 2, &shape, Region::new_with_ranges(&[0..1, 0..1])) }
                .is_err()
        );
    }

    #[test]
    fn copy_elements_into_padded_chunk() {
        // A 2x3 logical extent copied into a zeroed 3x4 padded chunk
        let src: Vec<u8> = (1..=6).collect();
        let mut dst = vec![0u8; 12];
        copy_elements(1, &[2, 3], &src, &[2, 3], &[0, 0], &mut dst, &[3, 4], &[0, 0]).unwrap();
        assert_eq!(dst, vec![1, 2, 3, 0, 4, 5, 6, 0, 0, 0, 0, 0]);
    }
}
