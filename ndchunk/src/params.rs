use ndchunk_codec::{ChunkRepresentation, Codec, CodecError, CompressionConfig, codec_from_config};
use ndchunk_geometry::{ArrayShape, ShapeDescriptor};
use ndchunk_storage::StorageBackend;

use crate::array::{ArrayError, bytes_len};

/// The storage configuration of an array: how chunks are compressed and where they are stored.
#[derive(Clone, Debug, Default)]
pub struct StorageConfig {
    compression: CompressionConfig,
    codec: Option<Codec>,
    backend: StorageBackend,
}

impl StorageConfig {
    /// Create a new storage configuration.
    #[must_use]
    pub fn new(compression: CompressionConfig, backend: StorageBackend) -> Self {
        Self {
            compression,
            codec: None,
            backend,
        }
    }

    /// Set the compression configuration.
    #[must_use]
    pub fn compression(mut self, compression: CompressionConfig) -> Self {
        self.compression = compression;
        self.codec = None;
        self
    }

    /// Set a codec directly, overriding the compression configuration.
    ///
    /// The configuration of the codec is recorded in the array metadata.
    #[must_use]
    pub fn codec(mut self, codec: Codec) -> Self {
        self.compression = codec.configuration();
        self.codec = Some(codec);
        self
    }

    /// Set the storage back-end.
    #[must_use]
    pub fn backend(mut self, backend: StorageBackend) -> Self {
        self.backend = backend;
        self
    }

    /// Return the compression configuration.
    #[must_use]
    pub fn compression_config(&self) -> &CompressionConfig {
        &self.compression
    }

    /// Return the storage back-end.
    #[must_use]
    pub fn storage_backend(&self) -> &StorageBackend {
        &self.backend
    }

    /// Return the codec, creating it from the compression configuration if it was not set directly.
    ///
    /// # Errors
    /// Returns a [`CodecError`] if the codec cannot be created.
    pub fn build_codec(&self) -> Result<Codec, CodecError> {
        match &self.codec {
            Some(codec) => Ok(codec.clone()),
            None => codec_from_config(&self.compression),
        }
    }
}

/// The construction parameters of a [`PartitionedArray`](crate::array::PartitionedArray).
///
/// ```
/// # use ndchunk::{Params, StorageBackend};
/// # use ndchunk::codec::CompressionConfig;
/// let params = Params::new(vec![20, 10], vec![7, 5], vec![3, 5], 4)?
///     .compression(CompressionConfig::Zstd { level: 3 })
///     .backend(StorageBackend::Memory);
/// assert_eq!(params.element_size(), 4);
/// # Ok::<_, ndchunk::ArrayError>(())
/// ```
#[derive(Clone, Debug)]
pub struct Params {
    descriptor: ShapeDescriptor,
    element_size: usize,
    size_bytes: usize,
    representation: ChunkRepresentation,
    storage: StorageConfig,
}

impl Params {
    /// Create new parameters with the default storage configuration.
    ///
    /// # Errors
    /// Returns [`ArrayError::InvalidShape`] if the shapes are not a valid shape descriptor, [`ArrayError::InvalidElementSize`] if `element_size` is zero, or [`ArrayError::TooLarge`] if the array or a chunk does not fit in memory.
    pub fn new(
        shape: ArrayShape,
        chunkshape: ArrayShape,
        blockshape: ArrayShape,
        element_size: usize,
    ) -> Result<Self, ArrayError> {
        let descriptor = ShapeDescriptor::new(shape, chunkshape, blockshape)?;
        Self::from_descriptor(descriptor, element_size)
    }

    /// Create new parameters from a validated [`ShapeDescriptor`].
    ///
    /// The bytes of the whole array and of a padded chunk must be addressable.
    ///
    /// # Errors
    /// Returns [`ArrayError::InvalidElementSize`] if `element_size` is zero, or [`ArrayError::TooLarge`] if the array or a chunk does not fit in memory.
    pub fn from_descriptor(
        descriptor: ShapeDescriptor,
        element_size: usize,
    ) -> Result<Self, ArrayError> {
        if element_size == 0 {
            return Err(ArrayError::InvalidElementSize(element_size));
        }
        let size_bytes = bytes_len(descriptor.num_elements(), element_size)?;
        let representation = ChunkRepresentation::new(
            element_size,
            descriptor.chunk_num_elements(),
            descriptor.block_num_elements(),
        )
        .ok_or(ArrayError::TooLarge {
            num_elements: descriptor.chunk_num_elements(),
            element_size,
        })?;
        Ok(Self {
            descriptor,
            element_size,
            size_bytes,
            representation,
            storage: StorageConfig::default(),
        })
    }

    /// Set the compression configuration.
    #[must_use]
    pub fn compression(mut self, compression: CompressionConfig) -> Self {
        self.storage = self.storage.compression(compression);
        self
    }

    /// Set a codec directly, overriding the compression configuration.
    #[must_use]
    pub fn codec(mut self, codec: Codec) -> Self {
        self.storage = self.storage.codec(codec);
        self
    }

    /// Set the storage back-end.
    #[must_use]
    pub fn backend(mut self, backend: StorageBackend) -> Self {
        self.storage = self.storage.backend(backend);
        self
    }

    /// Set the storage configuration.
    #[must_use]
    pub fn storage(mut self, storage: StorageConfig) -> Self {
        self.storage = storage;
        self
    }

    /// Return the shape descriptor.
    #[must_use]
    pub fn descriptor(&self) -> &ShapeDescriptor {
        &self.descriptor
    }

    /// Return the element size in bytes.
    #[must_use]
    pub fn element_size(&self) -> usize {
        self.element_size
    }

    /// Return the storage configuration.
    #[must_use]
    pub fn storage_config(&self) -> &StorageConfig {
        &self.storage
    }

    /// Return the number of bytes in a buffer holding every element of the array.
    #[must_use]
    pub fn size_bytes(&self) -> usize {
        self.size_bytes
    }

    pub(crate) fn representation(&self) -> ChunkRepresentation {
        self.representation
    }
}
