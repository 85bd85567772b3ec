use ndchunk_codec::CodecError;
use ndchunk_geometry::{InvalidIndexError, InvalidShapeError};
use ndchunk_storage::StorageError;
use thiserror::Error;

/// Array errors.
#[derive(Clone, Debug, Error)]
#[non_exhaustive]
pub enum ArrayError {
    /// An invalid shape, chunk shape, or block shape.
    #[error(transparent)]
    InvalidShape(#[from] InvalidShapeError),
    /// An invalid chunk index, region, or element index.
    #[error(transparent)]
    InvalidIndex(#[from] InvalidIndexError),
    /// A buffer with an unexpected size.
    #[error("got a buffer of {got} bytes, expected {expected}")]
    SizeMismatch {
        /// The buffer size.
        got: usize,
        /// The expected buffer size.
        expected: usize,
    },
    /// A buffer of the array or of a chunk would exceed the addressable memory.
    #[error("{num_elements} elements of {element_size} bytes exceed the addressable memory")]
    TooLarge {
        /// The number of elements.
        num_elements: u64,
        /// The element size in bytes.
        element_size: usize,
    },
    /// An invalid element size.
    #[error("invalid element size {_0}, must be greater than zero")]
    InvalidElementSize(usize),
    /// A codec error.
    #[error(transparent)]
    CodecError(#[from] CodecError),
    /// A store error.
    #[error(transparent)]
    StorageError(#[from] StorageError),
    /// An invalid fill value.
    #[error("invalid fill value: {_0}")]
    InvalidFillValue(String),
    /// Missing or inconsistent array metadata.
    #[error("invalid array metadata: {_0}")]
    InvalidMetadata(String),
    /// The array has been released.
    #[error("the array has been released")]
    Released,
    /// The context could not be created.
    #[error("failed to create the context: {_0}")]
    ContextCreate(String),
}

impl ArrayError {
    pub(crate) fn size_mismatch(got: usize, expected: usize) -> Self {
        Self::SizeMismatch { got, expected }
    }
}
