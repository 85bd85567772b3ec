use ndchunk_codec::CodecOptions;
use ndchunk_geometry::Region;
use ndchunk_storage::{ChunkRecord, ChunkStorage, FillValue};
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use rayon_iter_concurrent_limit::iter_concurrent_limit;
use unsafe_cell_slice::UnsafeCellSlice;

use super::array_bytes::{DisjointView, bytes_len, copy_elements};
use super::{ArrayError, PartitionedArray};
use crate::Context;

impl PartitionedArray {
    /// Read every element of the array into the row-major `out`.
    ///
    /// Chunks are visited in row-major order and processed concurrently on the worker pool of `context`.
    /// Only the logical extent of each chunk is written to `out`.
    /// Elements of uninitialized special chunks leave `out` untouched.
    ///
    /// # Errors
    /// Returns [`ArrayError::SizeMismatch`] if `out` is not the size of the array, [`ArrayError::Released`] if the array has been released, or another [`ArrayError`] if the codec or the store fails.
    pub fn to_buffer(&self, context: &Context, out: &mut [u8]) -> Result<(), ArrayError> {
        self.get_slice_buffer(context, &self.full_region(), out)
    }

    /// Read every element of the array into a new row-major buffer.
    ///
    /// Elements of uninitialized special chunks are zero.
    ///
    /// # Errors
    /// See [`to_buffer`](PartitionedArray::to_buffer).
    pub fn to_vec(&self, context: &Context) -> Result<Vec<u8>, ArrayError> {
        self.storage()?;
        let mut out = vec![0; self.size_bytes()];
        self.to_buffer(context, &mut out)?;
        Ok(out)
    }

    /// Write every element of the array from the row-major `buffer`.
    ///
    /// Every chunk is materialized.
    ///
    /// # Errors
    /// Returns [`ArrayError::SizeMismatch`] if `buffer` is not the size of the array, [`ArrayError::Released`] if the array has been released, or another [`ArrayError`] if the codec or the store fails.
    pub fn write_buffer(&self, context: &Context, buffer: &[u8]) -> Result<(), ArrayError> {
        self.set_slice_buffer(context, &self.full_region(), buffer)
    }

    /// Read the elements in `region` into the row-major `out` with the shape of `region`.
    ///
    /// # Errors
    /// Returns [`ArrayError::InvalidIndex`] if `region` is not within the array, [`ArrayError::SizeMismatch`] if `out` is not the size of `region`, [`ArrayError::Released`] if the array has been released, or another [`ArrayError`] if the codec or the store fails.
    pub fn get_slice_buffer(
        &self,
        context: &Context,
        region: &Region,
        out: &mut [u8],
    ) -> Result<(), ArrayError> {
        let storage = self.storage()?;
        region.check_inbounds(self.shape())?;
        let expected = bytes_len(region.num_elements(), self.element_size)?;
        if out.len() != expected {
            return Err(ArrayError::size_mismatch(out.len(), expected));
        }

        let chunk_indices = self.grid.linear_chunk_indices_in_region(region)?;
        let (chunk_concurrent_limit, options) =
            self.chunk_concurrency(context, chunk_indices.len());
        let out = UnsafeCellSlice::new(out);
        let read_chunk = |chunk_index: u64| {
            self.read_region_chunk(storage, chunk_index, region, out, &options)
        };
        context.install(|| {
            iter_concurrent_limit!(
                chunk_concurrent_limit,
                chunk_indices,
                try_for_each,
                read_chunk
            )
        })
    }

    /// Read the elements in `region` into a new row-major buffer with the shape of `region`.
    ///
    /// Elements of uninitialized special chunks are zero.
    ///
    /// # Errors
    /// See [`get_slice_buffer`](PartitionedArray::get_slice_buffer).
    pub fn get_slice_vec(&self, context: &Context, region: &Region) -> Result<Vec<u8>, ArrayError> {
        self.storage()?;
        region.check_inbounds(self.shape())?;
        let mut out = vec![0; bytes_len(region.num_elements(), self.element_size)?];
        self.get_slice_buffer(context, region, &mut out)?;
        Ok(out)
    }

    /// Write the elements in `region` from the row-major `buffer` with the shape of `region`.
    ///
    /// Every chunk intersecting `region` is materialized.
    /// A chunk only partly covered by `region` is read first, expanding a special chunk with its fill.
    ///
    /// # Errors
    /// Returns [`ArrayError::InvalidIndex`] if `region` is not within the array, [`ArrayError::SizeMismatch`] if `buffer` is not the size of `region`, [`ArrayError::Released`] if the array has been released, or another [`ArrayError`] if the codec or the store fails.
    /// Chunks written before a failure keep their new contents.
    pub fn set_slice_buffer(
        &self,
        context: &Context,
        region: &Region,
        buffer: &[u8],
    ) -> Result<(), ArrayError> {
        let storage = self.storage()?;
        region.check_inbounds(self.shape())?;
        let expected = bytes_len(region.num_elements(), self.element_size)?;
        if buffer.len() != expected {
            return Err(ArrayError::size_mismatch(buffer.len(), expected));
        }

        let chunk_indices = self.grid.linear_chunk_indices_in_region(region)?;
        let (chunk_concurrent_limit, options) =
            self.chunk_concurrency(context, chunk_indices.len());
        let write_chunk = |chunk_index: u64| {
            if let Some(record) =
                self.encode_region_chunk(storage, chunk_index, region, buffer, &options)?
            {
                storage.set(chunk_index, record)?;
            }
            Ok::<_, ArrayError>(())
        };
        context.install(|| {
            iter_concurrent_limit!(
                chunk_concurrent_limit,
                chunk_indices,
                try_for_each,
                write_chunk
            )
        })
    }

    /// Encode every chunk of the array from the row-major `buffer`.
    ///
    /// Returns the chunk records in row-major order, paired with their linear chunk index.
    pub(super) fn encode_buffer(
        &self,
        context: &Context,
        buffer: &[u8],
    ) -> Result<Vec<(u64, ChunkRecord)>, ArrayError> {
        let storage = self.storage()?;
        let region = self.full_region();
        let chunk_indices: Vec<u64> = (0..self.num_chunks()).collect();
        let (chunk_concurrent_limit, options) =
            self.chunk_concurrency(context, chunk_indices.len());
        let encode_chunk = |chunk_index: u64| {
            let record = match self.encode_region_chunk(
                storage,
                chunk_index,
                &region,
                buffer,
                &options,
            )? {
                Some(record) => record,
                None => self.policy.special_chunk(FillValue::Zero)?.into(),
            };
            Ok::<_, ArrayError>((chunk_index, record))
        };
        let mut records = context.install(|| {
            iter_concurrent_limit!(chunk_concurrent_limit, chunk_indices, map, encode_chunk)
                .collect::<Result<Vec<_>, ArrayError>>()
        })?;
        records.sort_unstable_by_key(|(chunk_index, _)| *chunk_index);
        Ok(records)
    }

    fn full_region(&self) -> Region {
        Region::new_with_shape(self.shape().to_vec())
    }

    /// Read the overlap of `region` and the chunk at `chunk_index` into the disjoint part of `out` it maps to.
    fn read_region_chunk(
        &self,
        storage: &ChunkStorage,
        chunk_index: u64,
        region: &Region,
        out: UnsafeCellSlice<'_, u8>,
        options: &CodecOptions,
    ) -> Result<(), ArrayError> {
        let chunk_indices = self.grid.chunk_indices(chunk_index)?;
        let Some(overlap) = self.grid.region_overlap(&chunk_indices, region)? else {
            return Ok(());
        };
        if overlap.num_elements() == 0 {
            return Ok(());
        }
        let view_region =
            Region::new_with_start_shape(overlap.buffer_offset.clone(), overlap.extent.clone())?;
        // SAFETY: the overlaps of distinct chunks with a region are disjoint
        let mut view =
            unsafe { DisjointView::new(out, self.element_size, region.shape(), view_region)? };

        match storage.get(chunk_index)? {
            ChunkRecord::Special(special) => {
                self.policy.validate(&special)?;
                if let Some(element) = self.policy.element_bytes(&special) {
                    view.fill(&element)?;
                }
            }
            ChunkRecord::Encoded(encoded) => {
                let chunk = self
                    .codec
                    .decompress(&encoded, &self.representation(), options)?;
                view.copy_from(&chunk, self.chunkshape(), &overlap.chunk_offset)?;
            }
        }
        Ok(())
    }

    /// Encode the chunk at `chunk_index` after writing the overlap of `region` from the row-major `buffer`.
    ///
    /// Returns [`None`] if the chunk does not intersect `region`.
    fn encode_region_chunk(
        &self,
        storage: &ChunkStorage,
        chunk_index: u64,
        region: &Region,
        buffer: &[u8],
        options: &CodecOptions,
    ) -> Result<Option<ChunkRecord>, ArrayError> {
        let chunk_indices = self.grid.chunk_indices(chunk_index)?;
        let Some(overlap) = self.grid.region_overlap(&chunk_indices, region)? else {
            return Ok(None);
        };
        if overlap.num_elements() == 0 {
            return Ok(None);
        }
        let logical_extent = self.grid.chunk_logical_extent(&chunk_indices)?;
        let mut chunk = if self
            .policy
            .requires_existing(&overlap.extent, &logical_extent)
        {
            self.decode_record(&storage.get(chunk_index)?, options)?
        } else {
            vec![0; self.representation().chunk_size()]
        };
        copy_elements(
            self.element_size,
            &overlap.extent,
            buffer,
            region.shape(),
            &overlap.buffer_offset,
            &mut chunk,
            self.chunkshape(),
            &overlap.chunk_offset,
        )?;
        Ok(Some(self.encode_chunk(&chunk, options)?))
    }
}
