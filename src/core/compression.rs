//! Transparent compression for stored records
//!
//! Every file below the base path is compressed with the store's configured
//! method. There is no per-file header, so a store must always be reopened
//! with the method it was written with; `None` keeps files human-readable.

use crate::error::{Result, StoreError};
use flate2::read::{GzDecoder, ZlibDecoder};
use flate2::write::{GzEncoder, ZlibEncoder};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

/// Compression method for stored files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum CompressionMethod {
    /// No compression
    #[default]
    None = 0,
    /// zlib (deflate with zlib framing)
    Zlib = 1,
    /// gzip (deflate with gzip framing)
    Gzip = 2,
    /// LZ4 compression (fast, moderate ratio)
    Lz4 = 3,
    /// Zstd compression (slower, better ratio)
    Zstd = 4,
}

impl CompressionMethod {
    /// Convert from u8
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(CompressionMethod::None),
            1 => Some(CompressionMethod::Zlib),
            2 => Some(CompressionMethod::Gzip),
            3 => Some(CompressionMethod::Lz4),
            4 => Some(CompressionMethod::Zstd),
            _ => None,
        }
    }
}

/// Compress data using the specified method
pub fn compress(data: &[u8], method: CompressionMethod) -> Result<Vec<u8>> {
    match method {
        CompressionMethod::None => Ok(data.to_vec()),
        CompressionMethod::Zlib => {
            let mut encoder = ZlibEncoder::new(Vec::new(), flate2::Compression::default());
            encoder.write_all(data)?;
            Ok(encoder.finish()?)
        }
        CompressionMethod::Gzip => {
            let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::default());
            encoder.write_all(data)?;
            Ok(encoder.finish()?)
        }
        CompressionMethod::Lz4 => Ok(lz4_flex::compress_prepend_size(data)),
        CompressionMethod::Zstd => zstd::bulk::compress(data, 3)
            .map_err(|e| StoreError::Compression(format!("Zstd compression failed: {}", e))),
    }
}

/// Decompress data using the specified method
pub fn decompress(data: &[u8], method: CompressionMethod) -> Result<Vec<u8>> {
    match method {
        CompressionMethod::None => Ok(data.to_vec()),
        CompressionMethod::Zlib => {
            let mut out = Vec::new();
            ZlibDecoder::new(data)
                .read_to_end(&mut out)
                .map_err(|e| StoreError::Compression(format!("zlib decompression failed: {}", e)))?;
            Ok(out)
        }
        CompressionMethod::Gzip => {
            let mut out = Vec::new();
            GzDecoder::new(data)
                .read_to_end(&mut out)
                .map_err(|e| StoreError::Compression(format!("gzip decompression failed: {}", e)))?;
            Ok(out)
        }
        CompressionMethod::Lz4 => lz4_flex::decompress_size_prepended(data)
            .map_err(|e| StoreError::Compression(format!("LZ4 decompression failed: {}", e))),
        // Streaming decoder: records have no fixed upper size
        CompressionMethod::Zstd => zstd::stream::decode_all(data)
            .map_err(|e| StoreError::Compression(format!("Zstd decompression failed: {}", e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [CompressionMethod; 5] = [
        CompressionMethod::None,
        CompressionMethod::Zlib,
        CompressionMethod::Gzip,
        CompressionMethod::Lz4,
        CompressionMethod::Zstd,
    ];

    #[test]
    fn test_compression_method_conversion() {
        assert_eq!(CompressionMethod::from_u8(0), Some(CompressionMethod::None));
        assert_eq!(CompressionMethod::from_u8(1), Some(CompressionMethod::Zlib));
        assert_eq!(CompressionMethod::from_u8(2), Some(CompressionMethod::Gzip));
        assert_eq!(CompressionMethod::from_u8(4), Some(CompressionMethod::Zstd));
        assert_eq!(CompressionMethod::from_u8(99), None);
    }

    #[test]
    fn test_every_method_restores_input() {
        let data = b"name: David\nposts:\n  - hello\n".repeat(50);
        for method in ALL {
            let compressed = compress(&data, method).unwrap();
            let decompressed = decompress(&compressed, method).unwrap();
            assert_eq!(data, decompressed, "{:?}", method);
            if method != CompressionMethod::None {
                assert!(compressed.len() < data.len(), "{:?}", method);
            }
        }
    }

    #[test]
    fn test_no_compression() {
        let data = b"Test data";
        let compressed = compress(data, CompressionMethod::None).unwrap();
        assert_eq!(data, compressed.as_slice());
    }

    #[test]
    fn test_garbage_fails_to_decompress() {
        let garbage = b"definitely not gzip";
        assert!(matches!(
            decompress(garbage, CompressionMethod::Gzip),
            Err(StoreError::Compression(_))
        ));
        assert!(decompress(garbage, CompressionMethod::Zlib).is_err());
    }

    #[test]
    fn test_method_names() {
        let method: CompressionMethod = serde_json::from_str("\"gzip\"").unwrap();
        assert_eq!(method, CompressionMethod::Gzip);
        assert_eq!(CompressionMethod::default(), CompressionMethod::None);
    }
}
