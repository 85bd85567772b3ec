//! Partitioned arrays.
//!
//! A [`PartitionedArray`] is an N-dimensional array of fixed-size elements partitioned into a regular grid of chunks, each chunk partitioned into blocks.
//! It is defined by:
//!  - **shape**: the length of the array dimensions,
//!  - **chunk shape**: the padded shape of every chunk,
//!  - **block shape**: the shape of the blocks within a chunk, used by the codec,
//!  - **element size**: the number of bytes in an element,
//!  - **compression**: the codec that encodes materialized chunks, and
//!  - **storage**: the [`ChunkStore`](ndchunk_storage::ChunkStore) holding one record per chunk.
//!
//! Chunks are addressed by row-major linear index.
//! A chunk is either special (a fill with no payload) or materialized (the compressed bytes of the full padded chunk).
//! Special chunks are read without the codec and are indistinguishable from materialized chunks in the output of every read.
//!
//! Operations that do per-chunk work take a [`Context`](crate::Context) and run on its worker pool.

mod array_buffer;
mod array_bytes;
mod array_chunk;
mod array_errors;
mod array_metadata;

pub use array_errors::ArrayError;
pub use array_metadata::{ArrayMetadata, FORMAT_VERSION};

use bytes::Bytes;
use ndchunk_codec::{ChunkRepresentation, Codec, CodecOptions, CompressionConfig};
use ndchunk_geometry::{ChunkGrid, InvalidIndexError};
use ndchunk_storage::{ChunkRecord, ChunkStorage, FillValue, SpecialChunk, StorageBackend};

pub(crate) use self::array_bytes::bytes_len;
use crate::concurrency::ConcurrencySplit;
use crate::{Context, Params, SpecialChunkPolicy};

/// A chunked and blocked N-dimensional array.
///
/// An array owns exactly one chunk store handle.
/// [`release`](PartitionedArray::release) flushes and drops the store, after which every operation fails with [`ArrayError::Released`].
/// Dropping an array that has not been released releases it.
#[derive(Debug)]
pub struct PartitionedArray {
    grid: ChunkGrid,
    element_size: usize,
    size_bytes: usize,
    representation: ChunkRepresentation,
    policy: SpecialChunkPolicy,
    codec: Codec,
    backend: Option<StorageBackend>,
    storage: Option<ChunkStorage>,
}

impl PartitionedArray {
    fn new(
        params: &Params,
        codec: Codec,
        backend: Option<StorageBackend>,
        storage: ChunkStorage,
    ) -> Self {
        Self {
            grid: ChunkGrid::new(params.descriptor().clone()),
            element_size: params.element_size(),
            size_bytes: params.size_bytes(),
            representation: params.representation(),
            policy: SpecialChunkPolicy::new(params.element_size()),
            codec,
            backend,
            storage: Some(storage),
        }
    }

    fn initialise_storage(&self, storage: &ChunkStorage) -> Result<(), ArrayError> {
        if storage.num_chunks() != 0 {
            log::debug!(
                "truncating a store with {} chunks for a new array",
                storage.num_chunks()
            );
            storage.resize(0, &SpecialChunk::new(self.element_size, FillValue::Zero).into())?;
        }
        storage.set_metadata(Bytes::from(self.metadata().to_json()?))?;
        Ok(())
    }

    /// Create an array with every element uninitialized.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if the codec or the store cannot be created.
    pub fn create_uninitialized(context: &Context, params: &Params) -> Result<Self, ArrayError> {
        Self::create_filled(context, params, FillValue::Uninitialized)
    }

    /// Create an array with every element zero.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if the codec or the store cannot be created.
    pub fn create_zeros(context: &Context, params: &Params) -> Result<Self, ArrayError> {
        Self::create_filled(context, params, FillValue::Zero)
    }

    /// Create an array with every element a floating point NaN.
    ///
    /// # Errors
    /// Returns [`ArrayError::InvalidFillValue`] if the element size is not 4 or 8, or another [`ArrayError`] if the codec or the store cannot be created.
    pub fn create_nans(context: &Context, params: &Params) -> Result<Self, ArrayError> {
        Self::create_filled(context, params, FillValue::Nan)
    }

    /// Create an array with every element equal to `value`.
    ///
    /// # Errors
    /// Returns [`ArrayError::InvalidFillValue`] if `value` is not one element long, or another [`ArrayError`] if the codec or the store cannot be created.
    pub fn create_full(
        context: &Context,
        params: &Params,
        value: Vec<u8>,
    ) -> Result<Self, ArrayError> {
        Self::create_filled(context, params, FillValue::Value(value))
    }

    /// Create an array with every chunk a special chunk with `fill`.
    ///
    /// A new store is created with the storage back-end of `params`, replacing any store previously at its path.
    /// No chunk is compressed, and the store receives one record per chunk.
    ///
    /// # Errors
    /// Returns [`ArrayError::InvalidFillValue`] if `fill` is invalid for the element size, or another [`ArrayError`] if the codec or the store cannot be created.
    pub fn create_filled(
        _context: &Context,
        params: &Params,
        fill: FillValue,
    ) -> Result<Self, ArrayError> {
        let special = SpecialChunkPolicy::new(params.element_size()).special_chunk(fill)?;
        let codec = params.storage_config().build_codec()?;
        let backend = params.storage_config().storage_backend();
        let storage = backend.create()?;
        let array = Self::new(params, codec, Some(backend.clone()), storage);
        array.append_special(&special)?;
        Ok(array)
    }

    /// Create an array in a caller supplied `storage` with every chunk a special chunk with `fill`.
    ///
    /// Existing chunks in `storage` are discarded.
    /// The storage back-end of `params` is ignored.
    ///
    /// # Errors
    /// Returns [`ArrayError::InvalidFillValue`] if `fill` is invalid for the element size, or another [`ArrayError`] if the codec cannot be created or the store fails.
    pub fn create_with_store(
        _context: &Context,
        params: &Params,
        storage: ChunkStorage,
        fill: FillValue,
    ) -> Result<Self, ArrayError> {
        let special = SpecialChunkPolicy::new(params.element_size()).special_chunk(fill)?;
        let codec = params.storage_config().build_codec()?;
        let array = Self::new(params, codec, None, storage);
        array.append_special(&special)?;
        Ok(array)
    }

    fn append_special(&self, special: &SpecialChunk) -> Result<(), ArrayError> {
        let storage = self.storage()?;
        self.initialise_storage(storage)?;
        for chunk_index in 0..self.grid.num_chunks() {
            let chunk_id = storage.append(special.clone().into())?;
            debug_assert_eq!(chunk_id, chunk_index);
        }
        log::debug!(
            "created array with shape {:?} and {} {:?} chunks",
            self.shape(),
            self.num_chunks(),
            special.fill()
        );
        Ok(())
    }

    /// Create an array from the row-major `buffer` of every element.
    ///
    /// Every chunk is materialized and compressed concurrently, then appended to the store in row-major order.
    ///
    /// # Errors
    /// Returns [`ArrayError::SizeMismatch`] if `buffer` is not the size of the array, or another [`ArrayError`] if the codec or the store fails.
    pub fn from_buffer(
        context: &Context,
        params: &Params,
        buffer: &[u8],
    ) -> Result<Self, ArrayError> {
        let expected = params.size_bytes();
        if buffer.len() != expected {
            return Err(ArrayError::size_mismatch(buffer.len(), expected));
        }
        let codec = params.storage_config().build_codec()?;
        let backend = params.storage_config().storage_backend();
        let storage = backend.create()?;
        let array = Self::new(params, codec, Some(backend.clone()), storage);
        let storage = array.storage()?;
        array.initialise_storage(storage)?;
        let records = array.encode_buffer(context, buffer)?;
        array.append_records(records)?;
        log::debug!(
            "created array with shape {:?} and {} materialized chunks",
            array.shape(),
            array.num_chunks()
        );
        Ok(array)
    }

    fn append_records(&self, records: Vec<(u64, ChunkRecord)>) -> Result<(), ArrayError> {
        let storage = self.storage()?;
        for (chunk_index, record) in records {
            let chunk_id = storage.append(record)?;
            debug_assert_eq!(chunk_id, chunk_index);
        }
        Ok(())
    }

    /// Open an existing array from a persistent storage back-end.
    ///
    /// # Errors
    /// Returns [`ArrayError::StorageError`] if the store is missing or cannot be read, or [`ArrayError::InvalidMetadata`] if the metadata is missing or inconsistent with the store.
    pub fn open(backend: &StorageBackend) -> Result<Self, ArrayError> {
        let storage = backend.open()?;
        let mut array = Self::open_with_store(storage)?;
        array.backend = Some(backend.clone());
        Ok(array)
    }

    /// Open an existing array from a caller supplied `storage`.
    ///
    /// # Errors
    /// Returns [`ArrayError::InvalidMetadata`] if the metadata is missing or inconsistent with the store, or another [`ArrayError`] if the store or codec fails.
    pub fn open_with_store(storage: ChunkStorage) -> Result<Self, ArrayError> {
        let metadata = storage
            .metadata()?
            .ok_or_else(|| ArrayError::InvalidMetadata("array metadata is missing".to_string()))?;
        let metadata = ArrayMetadata::from_json(&metadata)?;
        let params = Params::from_descriptor(metadata.descriptor()?, metadata.element_size)?
            .compression(metadata.compression);
        let codec = params.storage_config().build_codec()?;
        let array = Self::new(&params, codec, None, storage);
        let num_chunks = array.storage()?.num_chunks();
        if num_chunks != array.num_chunks() {
            return Err(ArrayError::InvalidMetadata(format!(
                "the store has {num_chunks} chunks, expected {}",
                array.num_chunks()
            )));
        }
        log::debug!(
            "opened array with shape {:?} and {} chunks",
            array.shape(),
            num_chunks
        );
        Ok(array)
    }

    /// Release the array, flushing and dropping its store.
    ///
    /// A non-persistent store discards its chunks. A persistent store stays on disk.
    ///
    /// # Errors
    /// Returns [`ArrayError::Released`] if the array has already been released, or [`ArrayError::StorageError`] if the store cannot be flushed.
    /// The array is released even if flushing fails.
    pub fn release(&mut self) -> Result<(), ArrayError> {
        let storage = self.storage.take().ok_or(ArrayError::Released)?;
        storage.flush()?;
        log::debug!("released array with shape {:?}", self.shape());
        Ok(())
    }

    /// Returns true if the array has been released.
    #[must_use]
    pub fn is_released(&self) -> bool {
        self.storage.is_none()
    }

    /// Return the chunk storage.
    ///
    /// # Errors
    /// Returns [`ArrayError::Released`] if the array has been released.
    pub fn storage(&self) -> Result<&ChunkStorage, ArrayError> {
        self.storage.as_ref().ok_or(ArrayError::Released)
    }

    /// Return the storage back-end, or [`None`] for an array in a caller supplied store.
    #[must_use]
    pub fn backend(&self) -> Option<&StorageBackend> {
        self.backend.as_ref()
    }

    /// Return the chunk grid.
    #[must_use]
    pub fn grid(&self) -> &ChunkGrid {
        &self.grid
    }

    /// Return the array shape.
    #[must_use]
    pub fn shape(&self) -> &[u64] {
        self.grid.shape()
    }

    /// Return the chunk shape.
    #[must_use]
    pub fn chunkshape(&self) -> &[u64] {
        self.grid.chunkshape()
    }

    /// Return the block shape.
    #[must_use]
    pub fn blockshape(&self) -> &[u64] {
        self.grid.blockshape()
    }

    /// Return the dimensionality (rank) of the array.
    #[must_use]
    pub fn dimensionality(&self) -> usize {
        self.grid.dimensionality()
    }

    /// Return the element size in bytes.
    #[must_use]
    pub fn element_size(&self) -> usize {
        self.element_size
    }

    /// Return the number of elements in the array.
    #[must_use]
    pub fn num_elements(&self) -> u64 {
        self.grid.descriptor().num_elements()
    }

    /// Return the number of chunks in the array.
    #[must_use]
    pub fn num_chunks(&self) -> u64 {
        self.grid.num_chunks()
    }

    /// Return the number of bytes in a buffer holding every element of the array.
    #[must_use]
    pub fn size_bytes(&self) -> usize {
        self.size_bytes
    }

    /// Return the compression configuration.
    #[must_use]
    pub fn compression(&self) -> CompressionConfig {
        self.codec.configuration()
    }

    /// Return the array metadata.
    #[must_use]
    pub fn metadata(&self) -> ArrayMetadata {
        ArrayMetadata::new(self.grid.descriptor(), self.element_size, self.compression())
    }

    fn representation(&self) -> ChunkRepresentation {
        self.representation
    }

    fn chunk_num_elements(&self) -> usize {
        self.representation.chunk_size() / self.element_size
    }

    fn chunk_concurrency(&self, context: &Context, num_chunks: usize) -> (usize, CodecOptions) {
        let split = ConcurrencySplit::for_chunks(
            context.config(),
            num_chunks,
            &self.codec.recommended_concurrency(&self.representation()),
        );
        (split.chunks(), split.codec_options())
    }

    fn check_chunk_index(&self, chunk_index: u64) -> Result<(), ArrayError> {
        if chunk_index < self.num_chunks() {
            Ok(())
        } else {
            Err(InvalidIndexError::LinearOutOfBounds {
                index: chunk_index,
                len: self.num_chunks(),
            }
            .into())
        }
    }

    /// Decode a chunk record to the bytes of the padded chunk.
    ///
    /// Special chunks are expanded without the codec, with uninitialized elements as zero.
    fn decode_record(
        &self,
        record: &ChunkRecord,
        options: &CodecOptions,
    ) -> Result<Vec<u8>, ArrayError> {
        match record {
            ChunkRecord::Special(special) => {
                self.policy.validate(special)?;
                Ok(self.policy.materialize(special, self.chunk_num_elements()))
            }
            ChunkRecord::Encoded(encoded) => {
                Ok(self
                    .codec
                    .decompress(encoded, &self.representation(), options)?)
            }
        }
    }

    fn encode_chunk(&self, chunk: &[u8], options: &CodecOptions) -> Result<ChunkRecord, ArrayError> {
        let encoded = self.codec.compress(chunk, &self.representation(), options)?;
        Ok(ChunkRecord::Encoded(Bytes::from(encoded)))
    }
}

impl Drop for PartitionedArray {
    fn drop(&mut self) {
        if let Some(storage) = self.storage.take()
            && let Err(err) = storage.flush()
        {
            log::warn!(
                "failed to flush the store of an array with shape {:?} on drop: {err}",
                self.shape()
            );
        }
    }
}
