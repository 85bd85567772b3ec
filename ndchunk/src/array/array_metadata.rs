use ndchunk_codec::CompressionConfig;
use ndchunk_geometry::{ArrayShape, ShapeDescriptor};
use serde::{Deserialize, Serialize};

use super::ArrayError;

/// The format version written to array metadata.
pub const FORMAT_VERSION: u32 = 1;

/// Array metadata, stored as JSON in the metadata slot of a chunk store.
///
/// For example:
/// ```json
/// {
///   "format_version": 1,
///   "shape": [20, 10],
///   "chunkshape": [7, 5],
///   "blockshape": [3, 5],
///   "element_size": 4,
///   "compression": {
///     "name": "zstd",
///     "configuration": {
///       "level": 3
///     }
///   }
/// }
/// ```
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ArrayMetadata {
    /// The format version.
    pub format_version: u32,
    /// The array shape.
    pub shape: ArrayShape,
    /// The chunk shape.
    pub chunkshape: ArrayShape,
    /// The block shape.
    pub blockshape: ArrayShape,
    /// The element size in bytes.
    pub element_size: usize,
    /// The compression configuration.
    pub compression: CompressionConfig,
}

impl ArrayMetadata {
    /// Create new array metadata.
    #[must_use]
    pub fn new(
        descriptor: &ShapeDescriptor,
        element_size: usize,
        compression: CompressionConfig,
    ) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            shape: descriptor.shape().to_vec(),
            chunkshape: descriptor.chunkshape().to_vec(),
            blockshape: descriptor.blockshape().to_vec(),
            element_size,
            compression,
        }
    }

    /// Serialise the metadata to JSON.
    ///
    /// # Errors
    /// Returns [`ArrayError::InvalidMetadata`] if serialisation fails.
    pub fn to_json(&self) -> Result<Vec<u8>, ArrayError> {
        serde_json::to_vec_pretty(self).map_err(|err| ArrayError::InvalidMetadata(err.to_string()))
    }

    /// Deserialise metadata from JSON.
    ///
    /// # Errors
    /// Returns [`ArrayError::InvalidMetadata`] if `json` is not valid metadata or has an unsupported format version.
    pub fn from_json(json: &[u8]) -> Result<Self, ArrayError> {
        let metadata: Self = serde_json::from_slice(json)
            .map_err(|err| ArrayError::InvalidMetadata(err.to_string()))?;
        if metadata.format_version != FORMAT_VERSION {
            return Err(ArrayError::InvalidMetadata(format!(
                "unsupported format version {}, expected {FORMAT_VERSION}",
                metadata.format_version
            )));
        }
        Ok(metadata)
    }

    /// Return the validated shape descriptor.
    ///
    /// # Errors
    /// Returns [`ArrayError::InvalidMetadata`] if the shapes are not a valid shape descriptor.
    pub fn descriptor(&self) -> Result<ShapeDescriptor, ArrayError> {
        ShapeDescriptor::new(
            self.shape.clone(),
            self.chunkshape.clone(),
            self.blockshape.clone(),
        )
        .map_err(|err| ArrayError::InvalidMetadata(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const JSON: &str = r#"{
  "format_version": 1,
  "shape": [
    20,
    10
  ],
  "chunkshape": [
    7,
    5
  ],
  "blockshape": [
    3,
    5
  ],
  "element_size": 4,
  "compression": {
    "name": "zstd",
    "configuration": {
      "level": 3
    }
  }
}"#;

    #[test]
    fn array_metadata_json() {
        let descriptor = ShapeDescriptor::new(vec![20, 10], vec![7, 5], vec![3, 5]).unwrap();
        let metadata = ArrayMetadata::new(&descriptor, 4, CompressionConfig::Zstd { level: 3 });
        assert_eq!(String::from_utf8(metadata.to_json().unwrap()).unwrap(), JSON);
        let metadata = ArrayMetadata::from_json(JSON.as_bytes()).unwrap();
        assert_eq!(metadata.descriptor().unwrap(), descriptor);
        assert_eq!(metadata.element_size, 4);
    }

    #[test]
    fn array_metadata_invalid() {
        assert!(ArrayMetadata::from_json(b"{}").is_err());
        let version_2 = JSON.replace("\"format_version\": 1", "\"format_version\": 2");
        assert!(ArrayMetadata::from_json(version_2.as_bytes()).is_err());
        let metadata = ArrayMetadata::from_json(JSON.replace("7,", "0,").as_bytes()).unwrap();
        assert!(matches!(
            metadata.descriptor(),
            Err(ArrayError::InvalidMetadata(_))
        ));
    }
}
