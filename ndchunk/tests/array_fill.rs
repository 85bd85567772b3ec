#![allow(missing_docs)]

use std::error::Error;

use ndchunk::codec::CompressionConfig;
use ndchunk::{
    ArrayError, ChunkRecord, Context, ContextConfig, FillValue, MAX_DIM, Params,
    PartitionedArray, StorageBackend,
};

/// (shape, chunkshape, blockshape)
type Shapes = (&'static [u64], &'static [u64], &'static [u64]);

const SHAPES: &[Shapes] = &[
    (&[], &[], &[]),
    (&[5], &[3], &[2]),
    (&[20, 0], &[7, 0], &[3, 0]),
    (&[20, 10], &[7, 5], &[3, 5]),
    (&[14, 10], &[8, 5], &[2, 2]),
    (&[12, 10, 14], &[3, 5, 9], &[3, 4, 4]),
    (&[10, 21, 30], &[8, 7, 15], &[5, 5, 10]),
    (&[10, 21, 30, 55], &[8, 7, 15, 3], &[5, 5, 10, 1]),
    (&[3, 2, 3, 2, 3, 2, 3, 2], &[2, 2, 2, 2, 2, 2, 2, 2], &[1, 1, 1, 1, 1, 1, 1, 1]),
    (&[0], &[0], &[0]),
    (&[0, 0], &[3, 0], &[2, 0]),
];

const TYPESIZES: &[usize] = &[1, 2, 4, 7];

fn backends(dir: &tempfile::TempDir) -> Vec<StorageBackend> {
    vec![
        StorageBackend::Memory,
        StorageBackend::Contiguous(dir.path().join("array.ndchunk")),
        StorageBackend::Sparse(dir.path().join("array")),
    ]
}

fn context() -> Context {
    let mut config = ContextConfig::default();
    config.set_nthreads(2);
    Context::init(config).unwrap()
}

fn params(
    (shape, chunkshape, blockshape): Shapes,
    typesize: usize,
    backend: &StorageBackend,
) -> Result<Params, ArrayError> {
    Ok(Params::new(shape.to_vec(), chunkshape.to_vec(), blockshape.to_vec(), typesize)?
        .compression(CompressionConfig::None)
        .backend(backend.clone()))
}

fn expected_chunks(shape: &[u64], chunkshape: &[u64]) -> u64 {
    // Every axis empty: a single empty chunk
    if shape.iter().all(|&extent| extent == 0) {
        return 1;
    }
    std::iter::zip(shape, chunkshape)
        .map(|(shape, chunk)| if *shape == 0 { 0 } else { shape.div_ceil(*chunk) })
        .product()
}

fn num_elements(shape: &[u64]) -> usize {
    usize::try_from(shape.iter().product::<u64>()).unwrap()
}

#[test]
fn array_zeros() -> Result<(), Box<dyn Error>> {
    assert!(SHAPES.iter().any(|(shape, _, _)| shape.len() == MAX_DIM));
    let context = context();
    let dir = tempfile::TempDir::new()?;
    for &shapes in SHAPES {
        for &typesize in TYPESIZES {
            for backend in backends(&dir) {
                let params = params(shapes, typesize, &backend)?;
                let mut array = PartitionedArray::create_zeros(&context, &params)?;
                assert_eq!(array.num_chunks(), expected_chunks(shapes.0, shapes.1));

                let mut buffer = vec![1u8; num_elements(shapes.0) * typesize];
                array.to_buffer(&context, &mut buffer)?;
                assert!(buffer.iter().all(|&byte| byte == 0), "{shapes:?} {typesize} {backend:?}");
                array.release()?;
            }
        }
    }
    context.teardown();
    Ok(())
}

#[test]
fn array_full() -> Result<(), Box<dyn Error>> {
    let context = context();
    let dir = tempfile::TempDir::new()?;
    for &shapes in SHAPES {
        for &typesize in TYPESIZES {
            for backend in backends(&dir) {
                let params = params(shapes, typesize, &backend)?;
                let value: Vec<u8> = (1..=typesize).map(|byte| u8::try_from(byte).unwrap()).collect();
                let array = PartitionedArray::create_full(&context, &params, value.clone())?;
                let buffer = array.to_vec(&context)?;
                assert_eq!(buffer, value.repeat(num_elements(shapes.0)));
            }
        }
    }
    Ok(())
}

#[test]
fn array_nans() -> Result<(), Box<dyn Error>> {
    let context = context();
    let dir = tempfile::TempDir::new()?;
    for &shapes in SHAPES {
        for backend in backends(&dir) {
            let array = PartitionedArray::create_nans(&context, &params(shapes, 4, &backend)?)?;
            let buffer = array.to_vec(&context)?;
            assert!(buffer
                .chunks_exact(4)
                .all(|element| f32::from_ne_bytes(element.try_into().unwrap()).is_nan()));

            let array = PartitionedArray::create_nans(&context, &params(shapes, 8, &backend)?)?;
            let buffer = array.to_vec(&context)?;
            assert!(buffer
                .chunks_exact(8)
                .all(|element| f64::from_ne_bytes(element.try_into().unwrap()).is_nan()));
        }
    }

    let backend = StorageBackend::Memory;
    for typesize in [1, 2, 7] {
        assert!(matches!(
            PartitionedArray::create_nans(&context, &params(SHAPES[1], typesize, &backend)?),
            Err(ArrayError::InvalidFillValue(_))
        ));
    }
    Ok(())
}

#[test]
fn array_uninitialized() -> Result<(), Box<dyn Error>> {
    let context = context();
    let params = params(SHAPES[3], 4, &StorageBackend::Memory)?;
    let array = PartitionedArray::create_uninitialized(&context, &params)?;
    for chunk_index in 0..array.num_chunks() {
        assert!(array.get_chunk(chunk_index)?.is_special());
    }

    // Uninitialized elements leave the output untouched
    let mut buffer = vec![0xAB; array.size_bytes()];
    array.to_buffer(&context, &mut buffer)?;
    assert!(buffer.iter().all(|&byte| byte == 0xAB));

    // And are zero when decoded
    assert_eq!(array.decode_chunk(&context, 0)?, vec![0; 7 * 5 * 4]);
    Ok(())
}

#[test]
fn array_full_invalid_value() -> Result<(), Box<dyn Error>> {
    let context = context();
    let params = params(SHAPES[3], 4, &StorageBackend::Memory)?;
    assert!(matches!(
        PartitionedArray::create_full(&context, &params, vec![1, 2]),
        Err(ArrayError::InvalidFillValue(_))
    ));
    Ok(())
}

#[test]
fn array_invalid_shape() {
    assert!(matches!(
        Params::new(vec![20, 10], vec![7, 0], vec![3, 5], 4),
        Err(ArrayError::InvalidShape(_))
    ));
    assert!(matches!(
        Params::new(vec![20, 10], vec![7, 5], vec![3], 4),
        Err(ArrayError::InvalidShape(_))
    ));
    assert!(matches!(
        Params::new(vec![20, 10], vec![7, 5], vec![8, 5], 4),
        Err(ArrayError::InvalidShape(_))
    ));
    assert!(matches!(
        Params::new(vec![1; 9], vec![1; 9], vec![1; 9], 4),
        Err(ArrayError::InvalidShape(_))
    ));
}

#[test]
fn array_zeros_end_to_end() -> Result<(), Box<dyn Error>> {
    let context = context();
    let params = Params::new(vec![20, 10], vec![7, 5], vec![3, 5], 4)?;
    let array = PartitionedArray::create_zeros(&context, &params)?;
    assert_eq!(array.num_chunks(), 6);
    let buffer = array.to_vec(&context)?;
    assert_eq!(buffer.len(), 800);
    assert!(buffer.iter().all(|&byte| byte == 0));
    assert!(matches!(
        array.get_chunk(0)?,
        ChunkRecord::Special(special) if *special.fill() == FillValue::Zero
    ));
    Ok(())
}
