#![allow(missing_docs)]

use std::error::Error;

use ndchunk::codec::{
    BloscCompressor, BloscShuffleMode, ChunkRepresentation, CodecOptions, CompressionConfig,
    codec_from_config,
};
use ndchunk::storage::Bytes;
use ndchunk::{
    ArrayError, ChunkRecord, Context, ContextConfig, FillValue, Params, PartitionedArray, Region,
    SpecialChunk,
};

fn compression_configs() -> Vec<CompressionConfig> {
    let mut configs = vec![
        CompressionConfig::None,
        CompressionConfig::Gzip { level: 5 },
        CompressionConfig::Zstd { level: 3 },
    ];
    for cname in [
        BloscCompressor::BloscLZ,
        BloscCompressor::LZ4,
        BloscCompressor::Zstd,
    ] {
        for shuffle in [
            BloscShuffleMode::NoShuffle,
            BloscShuffleMode::Shuffle,
            BloscShuffleMode::BitShuffle,
        ] {
            configs.push(CompressionConfig::Blosc {
                cname,
                clevel: 5,
                shuffle,
            });
        }
    }
    configs
}

fn sequence(len: usize) -> Vec<u8> {
    (0..len).map(|i| u8::try_from(i * 7 % 251).unwrap()).collect()
}

fn context(nthreads: usize) -> Context {
    let mut config = ContextConfig::default();
    config.set_nthreads(nthreads);
    Context::init(config).unwrap()
}

#[test]
fn array_from_buffer_round_trip() -> Result<(), Box<dyn Error>> {
    for nthreads in [1, 4] {
        let context = context(nthreads);
        for compression in compression_configs() {
            for element_size in [1, 2, 8] {
                let params = Params::new(vec![14, 10], vec![8, 5], vec![2, 2], element_size)?
                    .compression(compression.clone());
                let buffer = sequence(14 * 10 * element_size);
                let array = PartitionedArray::from_buffer(&context, &params, &buffer)?;
                assert_eq!(array.num_chunks(), 4);
                assert_eq!(array.compression(), compression);
                assert!(!array.get_chunk(3)?.is_special());
                assert_eq!(array.to_vec(&context)?, buffer, "{compression:?}");
            }
        }
        context.teardown();
    }
    Ok(())
}

#[test]
fn array_from_buffer_size_mismatch() -> Result<(), Box<dyn Error>> {
    let context = context(2);
    let params = Params::new(vec![14, 10], vec![8, 5], vec![2, 2], 2)?;
    assert!(matches!(
        PartitionedArray::from_buffer(&context, &params, &[0; 279]),
        Err(ArrayError::SizeMismatch {
            got: 279,
            expected: 280
        })
    ));

    let array = PartitionedArray::create_zeros(&context, &params)?;
    let mut out = vec![0; 281];
    assert!(matches!(
        array.to_buffer(&context, &mut out),
        Err(ArrayError::SizeMismatch { .. })
    ));
    Ok(())
}

#[test]
fn array_write_buffer() -> Result<(), Box<dyn Error>> {
    let context = context(2);
    let params = Params::new(vec![10, 21, 30], vec![8, 7, 15], vec![5, 5, 10], 2)?;
    let array = PartitionedArray::create_uninitialized(&context, &params)?;
    let buffer = sequence(10 * 21 * 30 * 2);
    array.write_buffer(&context, &buffer)?;
    for chunk_index in 0..array.num_chunks() {
        assert!(!array.get_chunk(chunk_index)?.is_special());
    }
    assert_eq!(array.to_vec(&context)?, buffer);
    Ok(())
}

#[test]
fn array_slices() -> Result<(), Box<dyn Error>> {
    let context = context(2);
    let params = Params::new(vec![12, 10, 14], vec![3, 5, 9], vec![3, 4, 4], 1)?;
    let buffer = sequence(12 * 10 * 14);
    let array = PartitionedArray::from_buffer(&context, &params, &buffer)?;

    let region = Region::new_with_ranges(&[2..7, 4..6, 8..14]);
    let mut expected = Vec::new();
    for i in 2..7 {
        for j in 4..6 {
            for k in 8..14 {
                expected.push(buffer[i * 10 * 14 + j * 14 + k]);
            }
        }
    }
    assert_eq!(array.get_slice_vec(&context, &region)?, expected);

    // Empty regions read nothing
    let empty = Region::new_with_ranges(&[2..2, 0..10, 0..14]);
    assert!(array.get_slice_vec(&context, &empty)?.is_empty());

    // Out of bounds
    let outside = Region::new_with_ranges(&[0..13, 0..10, 0..14]);
    assert!(matches!(
        array.get_slice_vec(&context, &outside),
        Err(ArrayError::InvalidIndex(_))
    ));
    let wrong_rank = Region::new_with_ranges(&[0..1, 0..1]);
    assert!(matches!(
        array.get_slice_vec(&context, &wrong_rank),
        Err(ArrayError::InvalidIndex(_))
    ));
    Ok(())
}

#[test]
fn array_set_slice_materializes_touched_chunks() -> Result<(), Box<dyn Error>> {
    let context = context(2);
    let params = Params::new(vec![20, 10], vec![7, 5], vec![3, 5], 1)?;
    let array = PartitionedArray::create_full(&context, &params, vec![9])?;

    let region = Region::new_with_ranges(&[6..8, 4..6]);
    array.set_slice_buffer(&context, &region, &[1, 2, 3, 4])?;
    for chunk_index in 0..4 {
        assert!(!array.get_chunk(chunk_index)?.is_special());
    }
    for chunk_index in 4..6 {
        assert!(array.get_chunk(chunk_index)?.is_special());
    }

    let mut expected = vec![9; 200];
    expected[6 * 10 + 4] = 1;
    expected[6 * 10 + 5] = 2;
    expected[7 * 10 + 4] = 3;
    expected[7 * 10 + 5] = 4;
    assert_eq!(array.to_vec(&context)?, expected);

    assert!(matches!(
        array.set_slice_buffer(&context, &region, &[1, 2, 3]),
        Err(ArrayError::SizeMismatch {
            got: 3,
            expected: 4
        })
    ));
    Ok(())
}

#[test]
fn array_fill_chunk() -> Result<(), Box<dyn Error>> {
    let context = context(2);
    let params = Params::new(vec![20, 10], vec![7, 5], vec![3, 5], 4)?;
    let buffer = sequence(20 * 10 * 4);
    let array = PartitionedArray::from_buffer(&context, &params, &buffer)?;

    array.fill_chunk(5, FillValue::Value(vec![1, 2, 3, 4]))?;
    assert!(array.get_chunk(5)?.is_special());
    assert_eq!(array.decode_chunk(&context, 5)?, [1, 2, 3, 4].repeat(7 * 5));

    let out = array.to_vec(&context)?;
    for i in 0..20 {
        for j in 0..10 {
            let offset = (i * 10 + j) * 4;
            let element = &out[offset..offset + 4];
            if i >= 14 && j >= 5 {
                assert_eq!(element, [1, 2, 3, 4]);
            } else {
                assert_eq!(element, &buffer[offset..offset + 4]);
            }
        }
    }

    assert!(matches!(
        array.fill_chunk(5, FillValue::Value(vec![1])),
        Err(ArrayError::InvalidFillValue(_))
    ));
    assert!(matches!(
        array.fill_chunk(6, FillValue::Zero),
        Err(ArrayError::InvalidIndex(_))
    ));
    assert!(matches!(
        array.decode_chunk(&context, 6),
        Err(ArrayError::InvalidIndex(_))
    ));
    Ok(())
}

#[test]
fn array_padding_is_not_read() -> Result<(), Box<dyn Error>> {
    let context = context(2);
    let params = Params::new(vec![14, 10], vec![8, 5], vec![2, 2], 1)?
        .compression(CompressionConfig::None);
    let array = PartitionedArray::create_zeros(&context, &params)?;

    // The chunk at grid position (1, 0) has a logical extent of 6x5 in a padded 8x5 chunk
    let mut chunk = vec![0xFF; 8 * 5];
    for (i, element) in chunk[..6 * 5].iter_mut().enumerate() {
        *element = u8::try_from(i).unwrap();
    }
    let codec = codec_from_config(&CompressionConfig::None)?;
    let encoded = codec.compress(
        &chunk,
        &ChunkRepresentation::new(1, 8 * 5, 2 * 2).ok_or("chunk too large")?,
        &CodecOptions::default(),
    )?;
    array.set_chunk(2, ChunkRecord::Encoded(Bytes::from(encoded)))?;

    let out = array.to_vec(&context)?;
    assert!(!out.contains(&0xFF));
    for i in 0..6 {
        for j in 0..5 {
            assert_eq!(out[(8 + i) * 10 + j], u8::try_from(i * 5 + j).unwrap());
        }
    }

    // Partial writes keep the rest of the chunk
    array.set_slice_buffer(&context, &Region::new_with_ranges(&[13..14, 0..1]), &[100])?;
    let out = array.to_vec(&context)?;
    assert_eq!(out[13 * 10], 100);
    assert_eq!(out[12 * 10 + 4], 24);
    Ok(())
}

#[test]
fn array_set_chunk_invalid_special() -> Result<(), Box<dyn Error>> {
    let context = context(1);
    let params = Params::new(vec![5], vec![3], vec![2], 2)?;
    let array = PartitionedArray::create_zeros(&context, &params)?;
    let wrong_size = SpecialChunk::new(4, FillValue::Zero);
    assert!(matches!(
        array.set_chunk(0, wrong_size.into()),
        Err(ArrayError::InvalidFillValue(_))
    ));
    Ok(())
}
