use ndchunk_storage::{ChunkRecord, FillValue, StorageError};
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use rayon_iter_concurrent_limit::iter_concurrent_limit;

use super::{ArrayError, PartitionedArray};
use crate::{Context, Params, StorageConfig};

impl PartitionedArray {
    /// Retrieve the record of the chunk at the linear `chunk_index`.
    ///
    /// # Errors
    /// Returns [`ArrayError::InvalidIndex`] if `chunk_index` is not less than the number of chunks, [`ArrayError::Released`] if the array has been released, or [`ArrayError::StorageError`] if the store fails.
    pub fn get_chunk(&self, chunk_index: u64) -> Result<ChunkRecord, ArrayError> {
        let storage = self.storage()?;
        self.check_chunk_index(chunk_index)?;
        Ok(storage.get(chunk_index)?)
    }

    /// Replace the record of the chunk at the linear `chunk_index`.
    ///
    /// An encoded record must hold the compressed bytes of the full padded chunk produced by the codec of this array.
    ///
    /// # Errors
    /// Returns [`ArrayError::InvalidIndex`] if `chunk_index` is not less than the number of chunks, [`ArrayError::InvalidFillValue`] if a special record does not match the element size, [`ArrayError::Released`] if the array has been released, or [`ArrayError::StorageError`] if the store fails.
    pub fn set_chunk(&self, chunk_index: u64, record: ChunkRecord) -> Result<(), ArrayError> {
        let storage = self.storage()?;
        self.check_chunk_index(chunk_index)?;
        if let ChunkRecord::Special(special) = &record {
            self.policy.validate(special)?;
        }
        storage.set(chunk_index, record)?;
        Ok(())
    }

    /// Overwrite the whole chunk at the linear `chunk_index` with a special chunk with `fill`.
    ///
    /// # Errors
    /// Returns [`ArrayError::InvalidFillValue`] if `fill` is invalid for the element size, or see [`set_chunk`](PartitionedArray::set_chunk).
    pub fn fill_chunk(&self, chunk_index: u64, fill: FillValue) -> Result<(), ArrayError> {
        let special = self.policy.special_chunk(fill)?;
        self.set_chunk(chunk_index, special.into())
    }

    /// Return the bytes of the padded chunk at the linear `chunk_index`.
    ///
    /// Special chunks are expanded with their fill, and uninitialized elements are zero.
    ///
    /// # Errors
    /// Returns [`ArrayError::InvalidIndex`] if `chunk_index` is not less than the number of chunks, [`ArrayError::Released`] if the array has been released, or another [`ArrayError`] if the codec or the store fails.
    pub fn decode_chunk(&self, context: &Context, chunk_index: u64) -> Result<Vec<u8>, ArrayError> {
        let record = self.get_chunk(chunk_index)?;
        let (_, options) = self.chunk_concurrency(context, 1);
        context.install(|| self.decode_record(&record, &options))
    }

    /// Copy the array into a new store with the same geometry.
    ///
    /// The new store is created with the storage back-end of `storage`, replacing any store previously at its path.
    /// Special chunks stay special.
    /// Encoded chunks are copied as is if the compression configuration is unchanged, otherwise they are decoded and encoded again.
    ///
    /// # Errors
    /// Returns [`ArrayError::StorageError`] if the new store would replace the store of this array, [`ArrayError::Released`] if the array has been released, or another [`ArrayError`] if the codec or either store fails.
    pub fn copy(
        &self,
        context: &Context,
        storage: &StorageConfig,
    ) -> Result<PartitionedArray, ArrayError> {
        let source = self.storage()?;
        let backend = storage.storage_backend();
        if self.backend().is_some_and(|source| source.shares_path(backend)) {
            return Err(StorageError::Unsupported(
                "an array cannot be copied onto its own store".to_string(),
            )
            .into());
        }

        let params = Params::from_descriptor(self.grid.descriptor().clone(), self.element_size)?
            .storage(storage.clone());
        let codec = params.storage_config().build_codec()?;
        let recompress = codec.configuration() != self.compression();
        let target = Self::new(&params, codec, Some(backend.clone()), backend.create()?);
        target.initialise_storage(target.storage()?)?;

        let chunk_indices: Vec<u64> = (0..self.num_chunks()).collect();
        let (chunk_concurrent_limit, options) =
            self.chunk_concurrency(context, chunk_indices.len());
        let copy_chunk = |chunk_index: u64| {
            let record = match source.get(chunk_index)? {
                ChunkRecord::Encoded(encoded) if recompress => {
                    let chunk = self
                        .codec
                        .decompress(&encoded, &self.representation(), &options)?;
                    target.encode_chunk(&chunk, &options)?
                }
                record => record,
            };
            Ok::<_, ArrayError>((chunk_index, record))
        };
        let mut records = context.install(|| {
            iter_concurrent_limit!(chunk_concurrent_limit, chunk_indices, map, copy_chunk)
                .collect::<Result<Vec<_>, ArrayError>>()
        })?;
        records.sort_unstable_by_key(|(chunk_index, _)| *chunk_index);
        target.append_records(records)?;
        log::debug!(
            "copied array with shape {:?} and {} chunks{}",
            self.shape(),
            self.num_chunks(),
            if recompress { ", recompressed" } else { "" }
        );
        Ok(target)
    }
}
