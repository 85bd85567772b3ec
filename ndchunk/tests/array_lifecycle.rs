#![allow(missing_docs)]

use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use ndchunk::codec::CompressionConfig;
use ndchunk::storage::store::MemoryChunkStore;
use ndchunk::storage::{Bytes, ChunkStore, StorageError};
use ndchunk::{
    ArrayError, ArrayMetadata, Context, ContextConfig, FillValue, Params, PartitionedArray,
    Region, SpecialChunk, StorageBackend, StorageConfig,
};

fn sequence(len: usize) -> Vec<u8> {
    (0..len).map(|i| u8::try_from(i % 253).unwrap()).collect()
}

#[test]
fn array_release() -> Result<(), Box<dyn Error>> {
    let context = Context::init(ContextConfig::default())?;
    let params = Params::new(vec![20, 10], vec![7, 5], vec![3, 5], 4)?;
    let mut array = PartitionedArray::create_zeros(&context, &params)?;
    assert!(!array.is_released());
    array.release()?;
    assert!(array.is_released());
    assert!(matches!(array.release(), Err(ArrayError::Released)));

    assert!(matches!(array.to_vec(&context), Err(ArrayError::Released)));
    assert!(matches!(array.get_chunk(0), Err(ArrayError::Released)));
    assert!(matches!(
        array.fill_chunk(0, FillValue::Zero),
        Err(ArrayError::Released)
    ));
    assert!(matches!(
        array.set_slice_buffer(&context, &Region::new_with_ranges(&[0..1, 0..1]), &[0; 4]),
        Err(ArrayError::Released)
    ));

    // Geometry outlives the store
    assert_eq!(array.shape(), &[20, 10]);
    assert_eq!(array.num_chunks(), 6);
    context.teardown();
    Ok(())
}

#[test]
fn array_reopen() -> Result<(), Box<dyn Error>> {
    let context = Context::init(ContextConfig::default())?;
    let dir = tempfile::TempDir::new()?;
    for backend in [
        StorageBackend::Contiguous(dir.path().join("array.ndchunk")),
        StorageBackend::Sparse(dir.path().join("array")),
    ] {
        let params = Params::new(vec![14, 10], vec![8, 5], vec![2, 2], 2)?
            .compression(CompressionConfig::Zstd { level: 1 })
            .backend(backend.clone());
        let buffer = sequence(14 * 10 * 2);
        let expected = {
            let mut array = PartitionedArray::create_zeros(&context, &params)?;
            let region = Region::new_with_ranges(&[0..14, 0..5]);
            array.set_slice_buffer(&context, &region, &buffer[..14 * 5 * 2])?;
            let expected = array.to_vec(&context)?;
            array.release()?;
            expected
        };

        let array = PartitionedArray::open(&backend)?;
        assert_eq!(array.shape(), &[14, 10]);
        assert_eq!(array.chunkshape(), &[8, 5]);
        assert_eq!(array.blockshape(), &[2, 2]);
        assert_eq!(array.element_size(), 2);
        assert_eq!(array.compression(), CompressionConfig::Zstd { level: 1 });
        assert_eq!(array.backend(), Some(&backend));
        assert!(array.get_chunk(1)?.is_special());
        assert!(!array.get_chunk(2)?.is_special());
        assert_eq!(array.to_vec(&context)?, expected);
        assert_eq!(array.metadata(), params_metadata(&params));
    }

    assert!(matches!(
        PartitionedArray::open(&StorageBackend::Sparse(dir.path().join("missing"))),
        Err(ArrayError::StorageError(StorageError::MissingStore(_)))
    ));
    Ok(())
}

fn params_metadata(params: &Params) -> ArrayMetadata {
    ArrayMetadata::new(
        params.descriptor(),
        params.element_size(),
        params.storage_config().compression_config().clone(),
    )
}

#[test]
fn array_open_with_store() -> Result<(), Box<dyn Error>> {
    let context = Context::init(ContextConfig::default())?;
    let store = Arc::new(MemoryChunkStore::new());
    assert!(matches!(
        PartitionedArray::open_with_store(store.clone()),
        Err(ArrayError::InvalidMetadata(_))
    ));

    let params = Params::new(vec![5], vec![3], vec![2], 1)?;
    let mut array =
        PartitionedArray::create_with_store(&context, &params, store.clone(), FillValue::Zero)?;
    array.set_slice_buffer(&context, &Region::new_with_ranges(&[3..5]), &[7, 8])?;
    array.release()?;

    let array = PartitionedArray::open_with_store(store.clone())?;
    assert_eq!(array.backend(), None);
    assert_eq!(array.to_vec(&context)?, vec![0, 0, 0, 7, 8]);

    // A store with a chunk count inconsistent with its metadata
    store.append(SpecialChunk::new(1, FillValue::Zero).into())?;
    assert!(matches!(
        PartitionedArray::open_with_store(store),
        Err(ArrayError::InvalidMetadata(_))
    ));
    Ok(())
}

#[test]
fn array_too_large() -> Result<(), Box<dyn Error>> {
    // The shape is valid but its bytes are not addressable
    assert!(matches!(
        Params::new(vec![1 << 31, 1 << 31], vec![1 << 31, 1 << 31], vec![1, 1], 4),
        Err(ArrayError::TooLarge { .. })
    ));

    // Metadata describing such an array is rejected on open
    let store = Arc::new(MemoryChunkStore::new());
    let mut metadata = params_metadata(&Params::new(vec![5], vec![3], vec![2], 1)?);
    metadata.shape = vec![1 << 31, 1 << 31];
    metadata.chunkshape = vec![1 << 31, 1 << 31];
    metadata.blockshape = vec![1, 1];
    metadata.element_size = 4;
    store.set_metadata(Bytes::from(metadata.to_json()?))?;
    store.append(SpecialChunk::new(4, FillValue::Zero).into())?;
    assert!(matches!(
        PartitionedArray::open_with_store(store),
        Err(ArrayError::TooLarge { element_size: 4, .. })
    ));
    Ok(())
}

#[test]
fn array_create_with_store_truncates() -> Result<(), Box<dyn Error>> {
    let context = Context::init(ContextConfig::default())?;
    let store = Arc::new(MemoryChunkStore::new());
    for _ in 0..10 {
        store.append(SpecialChunk::new(1, FillValue::Uninitialized).into())?;
    }
    let params = Params::new(vec![5], vec![3], vec![2], 1)?;
    let array =
        PartitionedArray::create_with_store(&context, &params, store.clone(), FillValue::Zero)?;
    assert_eq!(store.num_chunks(), 2);
    assert_eq!(array.to_vec(&context)?, vec![0; 5]);
    Ok(())
}

#[test]
fn array_copy() -> Result<(), Box<dyn Error>> {
    let context = Context::init(ContextConfig::default())?;
    let dir = tempfile::TempDir::new()?;
    let contiguous = StorageBackend::Contiguous(dir.path().join("array.ndchunk"));
    let params = Params::new(vec![20, 10], vec![7, 5], vec![3, 5], 4)?
        .compression(CompressionConfig::Gzip { level: 1 })
        .backend(contiguous.clone());
    let array = PartitionedArray::create_zeros(&context, &params)?;
    let buffer = sequence(7 * 5 * 4);
    array.set_slice_buffer(&context, &Region::new_with_ranges(&[7..14, 0..5]), &buffer)?;
    let expected = array.to_vec(&context)?;

    let configs = [
        StorageConfig::new(
            CompressionConfig::Gzip { level: 1 },
            StorageBackend::Memory,
        ),
        StorageConfig::new(
            CompressionConfig::Zstd { level: 5 },
            StorageBackend::Sparse(dir.path().join("copy")),
        ),
        StorageConfig::new(CompressionConfig::None, StorageBackend::Memory),
    ];
    for config in configs {
        let copy = array.copy(&context, &config)?;
        assert_eq!(copy.compression(), *config.compression_config());
        assert_eq!(copy.backend(), Some(config.storage_backend()));
        assert_eq!(copy.shape(), array.shape());
        for chunk_index in 0..6 {
            assert_eq!(
                copy.get_chunk(chunk_index)?.is_special(),
                chunk_index != 2
            );
        }
        assert_eq!(copy.to_vec(&context)?, expected);
    }

    // Unchanged compression copies encoded chunks as is
    let copy = array.copy(
        &context,
        &StorageConfig::new(
            CompressionConfig::Gzip { level: 1 },
            StorageBackend::Memory,
        ),
    )?;
    assert_eq!(copy.get_chunk(2)?, array.get_chunk(2)?);

    assert!(matches!(
        array.copy(
            &context,
            &StorageConfig::new(CompressionConfig::None, contiguous)
        ),
        Err(ArrayError::StorageError(StorageError::Unsupported(_)))
    ));
    Ok(())
}

#[test]
fn array_copy_onto_own_store() -> Result<(), Box<dyn Error>> {
    let context = Context::init(ContextConfig::default())?;
    let dir = tempfile::TempDir::new()?;
    let params = Params::new(vec![5], vec![3], vec![2], 1)?
        .backend(StorageBackend::Sparse(dir.path().join("d")));
    let array = PartitionedArray::from_buffer(&context, &params, &[1, 2, 3, 4, 5])?;

    // Differently spelled paths to the store of the array
    for backend in [
        StorageBackend::Sparse(dir.path().join(".").join("d")),
        StorageBackend::Sparse(PathBuf::from(format!("{}/./d", dir.path().display()))),
        StorageBackend::Contiguous(dir.path().join("d")),
    ] {
        assert!(matches!(
            array.copy(&context, &StorageConfig::new(CompressionConfig::None, backend)),
            Err(ArrayError::StorageError(StorageError::Unsupported(_)))
        ));
    }
    assert_eq!(array.to_vec(&context)?, vec![1, 2, 3, 4, 5]);
    Ok(())
}

#[test]
fn array_zero_chunks() -> Result<(), Box<dyn Error>> {
    let context = Context::init(ContextConfig::default())?;
    let params = Params::new(vec![20, 0], vec![7, 0], vec![3, 0], 4)?;
    let mut array = PartitionedArray::from_buffer(&context, &params, &[])?;
    assert_eq!(array.num_chunks(), 0);
    assert!(array.to_vec(&context)?.is_empty());
    assert!(matches!(
        array.get_chunk(0),
        Err(ArrayError::InvalidIndex(_))
    ));
    array.release()?;
    Ok(())
}

#[test]
fn array_all_axes_empty() -> Result<(), Box<dyn Error>> {
    let context = Context::init(ContextConfig::default())?;
    let dir = tempfile::TempDir::new()?;
    for backend in [
        StorageBackend::Memory,
        StorageBackend::Contiguous(dir.path().join("empty.ndchunk")),
        StorageBackend::Sparse(dir.path().join("empty")),
    ] {
        let params = Params::new(vec![0], vec![0], vec![0], 4)?.backend(backend.clone());
        let mut array = PartitionedArray::from_buffer(&context, &params, &[])?;
        assert_eq!(array.num_chunks(), 1);
        assert!(array.get_chunk(0)?.is_special());
        assert!(array.to_vec(&context)?.is_empty());
        assert!(array.decode_chunk(&context, 0)?.is_empty());
        assert!(matches!(
            array.get_chunk(1),
            Err(ArrayError::InvalidIndex(_))
        ));
        array.release()?;

        if backend.is_persistent() {
            let array = PartitionedArray::open(&backend)?;
            assert_eq!(array.num_chunks(), 1);
            assert!(array.to_vec(&context)?.is_empty());
        }
    }

    let params = Params::new(vec![0, 0], vec![3, 0], vec![2, 0], 2)?;
    let array = PartitionedArray::create_full(&context, &params, vec![1, 2])?;
    assert_eq!(array.num_chunks(), 1);
    assert!(array.to_vec(&context)?.is_empty());
    Ok(())
}

#[test]
fn array_rank_zero() -> Result<(), Box<dyn Error>> {
    let context = Context::init(ContextConfig::default())?;
    let params = Params::new(vec![], vec![], vec![], 8)?;
    let array = PartitionedArray::from_buffer(&context, &params, &[1, 2, 3, 4, 5, 6, 7, 8])?;
    assert_eq!(array.num_chunks(), 1);
    assert_eq!(array.dimensionality(), 0);
    assert_eq!(array.to_vec(&context)?, vec![1, 2, 3, 4, 5, 6, 7, 8]);
    Ok(())
}
