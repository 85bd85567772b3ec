use bytes::Bytes;

use crate::StorageError;

const KIND_ENCODED: u8 = 0;
const KIND_SPECIAL: u8 = 1;

const TAG_ZERO: u8 = 0;
const TAG_NAN: u8 = 1;
const TAG_UNINITIALIZED: u8 = 2;
const TAG_VALUE: u8 = 3;

/// The fill of a special chunk.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum FillValue {
    /// Every element is zero.
    Zero,
    /// Every element is a floating point NaN (element size 4 or 8).
    Nan,
    /// The element values are unspecified.
    Uninitialized,
    /// Every element has the same value.
    Value(Vec<u8>),
}

impl FillValue {
    /// Return the bytes of a single element, or [`None`] for [`FillValue::Uninitialized`] or an unsupported NaN element size.
    #[must_use]
    pub fn element_bytes(&self, element_size: usize) -> Option<Vec<u8>> {
        match self {
            Self::Zero => Some(vec![0; element_size]),
            Self::Nan => match element_size {
                4 => Some(f32::NAN.to_ne_bytes().to_vec()),
                8 => Some(f64::NAN.to_ne_bytes().to_vec()),
                _ => None,
            },
            Self::Uninitialized => None,
            Self::Value(value) => Some(value.clone()),
        }
    }

    const fn tag(&self) -> u8 {
        match self {
            Self::Zero => TAG_ZERO,
            Self::Nan => TAG_NAN,
            Self::Uninitialized => TAG_UNINITIALIZED,
            Self::Value(_) => TAG_VALUE,
        }
    }
}

/// A special chunk: every element has the same fill and there is no payload.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SpecialChunk {
    element_size: usize,
    fill: FillValue,
}

impl SpecialChunk {
    /// Create a new special chunk.
    #[must_use]
    pub const fn new(element_size: usize, fill: FillValue) -> Self {
        Self { element_size, fill }
    }

    /// Return the element size in bytes.
    #[must_use]
    pub const fn element_size(&self) -> usize {
        self.element_size
    }

    /// Return the fill.
    #[must_use]
    pub const fn fill(&self) -> &FillValue {
        &self.fill
    }
}

/// A chunk as held by a chunk store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChunkRecord {
    /// A special chunk with no payload.
    Special(SpecialChunk),
    /// An encoded (compressed) padded chunk.
    Encoded(Bytes),
}

impl From<SpecialChunk> for ChunkRecord {
    fn from(special: SpecialChunk) -> Self {
        Self::Special(special)
    }
}

impl ChunkRecord {
    /// Returns true if the chunk is special.
    #[must_use]
    pub const fn is_special(&self) -> bool {
        matches!(self, Self::Special(_))
    }

    /// Serialise the record for stores that persist chunks as bytes.
    ///
    /// The first byte is the kind (`0` encoded, `1` special).
    /// An encoded record is followed by its payload.
    /// A special record is followed by the fill tag, the element size as a little-endian `u32`, and the element value for [`FillValue::Value`].
    ///
    /// # Errors
    /// Returns [`StorageError::Other`] if the element size of a special chunk does not fit in a `u32`.
    pub fn to_bytes(&self) -> Result<Vec<u8>, StorageError> {
        match self {
            Self::Encoded(payload) => {
                let mut bytes = Vec::with_capacity(payload.len() + 1);
                bytes.push(KIND_ENCODED);
                bytes.extend_from_slice(payload);
                Ok(bytes)
            }
            Self::Special(special) => {
                let element_size = u32::try_from(special.element_size)
                    .map_err(|_| StorageError::from("special chunk element size is too large"))?;
                let mut bytes = vec![KIND_SPECIAL, special.fill.tag()];
                bytes.extend_from_slice(&element_size.to_le_bytes());
                if let FillValue::Value(value) = &special.fill {
                    bytes.extend_from_slice(value);
                }
                Ok(bytes)
            }
        }
    }

    /// Deserialise a record produced by [`to_bytes`](Self::to_bytes).
    ///
    /// # Errors
    /// Returns [`StorageError::Corrupt`] if `bytes` is not a valid record.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StorageError> {
        match bytes.split_first() {
            Some((&KIND_ENCODED, payload)) => Ok(Self::Encoded(Bytes::copy_from_slice(payload))),
            Some((&KIND_SPECIAL, special)) => {
                if special.len() < 5 {
                    return Err(StorageError::Corrupt("truncated special chunk".to_string()));
                }
                let (tag, rest) = (special[0], &special[1..]);
                let (element_size, value) = rest.split_at(4);
                let element_size = u32::from_le_bytes([
                    element_size[0],
                    element_size[1],
                    element_size[2],
                    element_size[3],
                ]) as usize;
                let fill = match tag {
                    TAG_ZERO => FillValue::Zero,
                    TAG_NAN => FillValue::Nan,
                    TAG_UNINITIALIZED => FillValue::Uninitialized,
                    TAG_VALUE if value.len() == element_size => FillValue::Value(value.to_vec()),
                    TAG_VALUE => {
                        return Err(StorageError::Corrupt(format!(
                            "special chunk value has {} bytes, expected {element_size}",
                            value.len()
                        )))
                    }
                    tag => {
                        return Err(StorageError::Corrupt(format!(
                            "unknown special chunk tag {tag}"
                        )))
                    }
                };
                if tag != TAG_VALUE && !value.is_empty() {
                    return Err(StorageError::Corrupt(
                        "unexpected trailing bytes in special chunk".to_string(),
                    ));
                }
                Ok(Self::Special(SpecialChunk::new(element_size, fill)))
            }
            Some((kind, _)) => Err(StorageError::Corrupt(format!("unknown chunk kind {kind}"))),
            None => Err(StorageError::Corrupt("empty chunk record".to_string())),
        }
    }
}
