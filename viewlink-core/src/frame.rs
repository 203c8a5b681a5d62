//! Frame data model.
//!
//! [`FrameMetadata`] is the JSON header carried inside every wire
//! message; [`BufferedFrame`] is a fully decoded RGBA raster as stored
//! in the [`FrameStore`](crate::store::FrameStore). Buffered frames are
//! immutable after insertion and shared as `Arc<BufferedFrame>`.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::ViewError;

/// Bytes per RGBA pixel.
pub const BYTES_PER_PIXEL: usize = 4;

// ── FrameMetadata ────────────────────────────────────────────────

/// Per-frame metadata, JSON-encoded on the wire by the producer.
///
/// `latency` is derived client-side at receipt (`now - timestamp`) and
/// is never sent by the producer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameMetadata {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Whether the payload is compressed.
    pub compressed: bool,
    /// Producer-clock capture time, Unix epoch milliseconds.
    pub timestamp: i64,
    /// Producer-assigned frame number. Not required to be contiguous.
    pub frame_id: u32,
    /// Client-derived receive latency in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency: Option<i64>,
}

impl FrameMetadata {
    /// Byte size of the decoded RGBA raster this header describes.
    ///
    /// Computed in `u64` with saturation: dimensions are
    /// attacker-controlled, and a product beyond `u64::MAX` can never
    /// match a real payload length anyway.
    pub fn pixel_len(&self) -> u64 {
        (self.width as u64)
            .saturating_mul(self.height as u64)
            .saturating_mul(BYTES_PER_PIXEL as u64)
    }
}

// ── BufferedFrame ────────────────────────────────────────────────

/// A decoded frame ready for display, owned by the frame store.
#[derive(Debug, Clone)]
pub struct BufferedFrame {
    /// Decoded RGBA raster, exactly `width * height * 4` bytes.
    pub pixels: Bytes,
    /// Frame metadata with client-derived `latency` filled in.
    pub metadata: FrameMetadata,
    /// Client-clock receive time, Unix epoch milliseconds.
    pub received_at: i64,
}

impl BufferedFrame {
    /// Build a frame, rejecting payloads that do not match the
    /// advertised dimensions.
    pub fn new(
        pixels: Bytes,
        metadata: FrameMetadata,
        received_at: i64,
    ) -> Result<Self, ViewError> {
        let expected = metadata.pixel_len();
        if pixels.len() as u64 != expected {
            return Err(ViewError::PayloadSizeMismatch {
                actual: pixels.len() as u64,
                expected,
                width: metadata.width,
                height: metadata.height,
            });
        }
        Ok(Self {
            pixels,
            metadata,
            received_at,
        })
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(width: u32, height: u32) -> FrameMetadata {
        FrameMetadata {
            width,
            height,
            compressed: false,
            timestamp: 1_700_000_000_000,
            frame_id: 7,
            latency: None,
        }
    }

    #[test]
    fn accepts_exact_payload() {
        let m = meta(10, 10);
        let frame = BufferedFrame::new(Bytes::from(vec![0u8; 400]), m, 0).unwrap();
        assert_eq!(frame.pixels.len(), 400);
        assert_eq!(frame.metadata.frame_id, 7);
    }

    #[test]
    fn rejects_size_mismatch() {
        let m = meta(10, 10);
        let err = BufferedFrame::new(Bytes::from(vec![0u8; 399]), m, 0).unwrap_err();
        assert!(matches!(err, ViewError::PayloadSizeMismatch { .. }));
    }

    #[test]
    fn rejects_overflowing_dimensions() {
        // A hostile header can claim dimensions whose raster size
        // exceeds any integer width; the math must saturate, never
        // wrap, and the frame must be rejected.
        let m = meta(u32::MAX, u32::MAX);
        assert_eq!(m.pixel_len(), u64::MAX);
        let err = BufferedFrame::new(Bytes::from(vec![0u8; 4]), m, 0).unwrap_err();
        assert!(matches!(err, ViewError::PayloadSizeMismatch { .. }));

        // Product fits u64 but not usize arithmetic done naively.
        let m = meta(u32::MAX, 2);
        assert_eq!(m.pixel_len(), u32::MAX as u64 * 8);
        let err = BufferedFrame::new(Bytes::from(vec![0u8; 400]), m, 0).unwrap_err();
        assert!(matches!(err, ViewError::PayloadSizeMismatch { .. }));
    }

    #[test]
    fn header_json_uses_snake_case() {
        let m = meta(1920, 1080);
        let json = serde_json::to_string(&m).unwrap();
        assert!(json.contains("\"frame_id\":7"));
        assert!(json.contains("\"compressed\":false"));
        // latency is client-side only and must not appear on the wire.
        assert!(!json.contains("latency"));
    }

    #[test]
    fn header_json_roundtrip_with_latency() {
        let mut m = meta(640, 480);
        m.latency = Some(42);
        let json = serde_json::to_string(&m).unwrap();
        let back: FrameMetadata = serde_json::from_str(&json).unwrap();
        assert_eq!(back, m);
    }
}
