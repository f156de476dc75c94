// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Blob payload compression.
//!
//! Archived content is zstd-compressed once per version and the same bytes
//! are written to every blob path. Output is a pure function of the input
//! and level, so rewriting a version after a crash produces identical blobs.
//!
//! # Example
//!
//! ```
//! use redis_archiver::compression::{compress_bytes, decompress_bytes, is_compressed};
//!
//! let raw = br#"{"v":1}"#;
//! let packed = compress_bytes(raw)?;
//! assert!(is_compressed(&packed));
//! assert_eq!(decompress_bytes(&packed)?, raw);
//! # Ok::<(), redis_archiver::compression::CompressionError>(())
//! ```

/// Zstd magic bytes (little-endian): 0xFD2FB528
const ZSTD_MAGIC: [u8; 4] = [0x28, 0xB5, 0x2F, 0xFD];

/// Default compression level (3 is a good balance of speed/ratio)
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 3;

#[derive(Debug, thiserror::Error)]
pub enum CompressionError {
    #[error("compression failed: {0}")]
    CompressFailed(String),

    #[error("decompression failed: {0}")]
    DecompressFailed(String),
}

/// Check if data is zstd-compressed by checking magic bytes.
#[inline]
#[must_use]
pub fn is_compressed(data: &[u8]) -> bool {
    data.len() >= 4 && data[..4] == ZSTD_MAGIC
}

/// Compress bytes at the default level.
pub fn compress_bytes(data: &[u8]) -> Result<Vec<u8>, CompressionError> {
    compress_bytes_with_level(data, DEFAULT_COMPRESSION_LEVEL)
}

/// Compress bytes with custom level (1-22).
pub fn compress_bytes_with_level(data: &[u8], level: i32) -> Result<Vec<u8>, CompressionError> {
    zstd::encode_all(data, level)
        .map_err(|e| CompressionError::CompressFailed(e.to_string()))
}

/// Decompress an archived blob.
///
/// Returns the input unchanged if it has no zstd header.
pub fn decompress_bytes(data: &[u8]) -> Result<Vec<u8>, CompressionError> {
    if is_compressed(data) {
        zstd::decode_all(data)
            .map_err(|e| CompressionError::DecompressFailed(e.to_string()))
    } else {
        Ok(data.to_vec())
    }
}

/// Compression statistics for a single operation.
#[derive(Debug, Clone, Copy)]
pub struct CompressionStats {
    pub original_bytes: usize,
    pub compressed_bytes: usize,
    /// original / compressed
    pub ratio: f64,
    /// Space saved (0.0 - 1.0, negative when the output grew)
    pub savings: f64,
}

impl CompressionStats {
    #[must_use]
    pub fn new(original_bytes: usize, compressed_bytes: usize) -> Self {
        let ratio = if compressed_bytes > 0 {
            original_bytes as f64 / compressed_bytes as f64
        } else {
            0.0
        };
        let savings = if original_bytes > 0 {
            1.0 - (compressed_bytes as f64 / original_bytes as f64)
        } else {
            0.0
        };
        Self {
            original_bytes,
            compressed_bytes,
            ratio,
            savings,
        }
    }
}

/// Compress and return stats.
pub fn compress_with_stats(data: &[u8]) -> Result<(Vec<u8>, CompressionStats), CompressionError> {
    let compressed = compress_bytes(data)?;
    let stats = CompressionStats::new(data.len(), compressed.len());
    Ok((compressed, stats))
}
