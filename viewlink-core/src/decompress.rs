//! Pluggable payload decompression capability.
//!
//! The producer marks compressed payloads via the `compressed` header
//! flag; the algorithm itself is an external capability behind a
//! trait. A failed decompression drops the frame, it never kills the
//! connection or the process.

use crate::error::ViewError;

/// Decompresses raw frame payloads into RGBA rasters.
pub trait Decompressor: Send + Sync {
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, ViewError>;
}

// ── ZstdDecompressor ─────────────────────────────────────────────

/// Production decompressor for zstd-encoded payloads.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZstdDecompressor;

impl Decompressor for ZstdDecompressor {
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, ViewError> {
        zstd::decode_all(data).map_err(|e| ViewError::Decompression(e.to_string()))
    }
}

// ── NoopDecompressor ─────────────────────────────────────────────

/// Identity passthrough for uncompressed streams and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopDecompressor;

impl Decompressor for NoopDecompressor {
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, ViewError> {
        Ok(data.to_vec())
    }
}

// ── Tests ────────────────────────────────────────────────────────
