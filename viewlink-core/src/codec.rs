//! Wire codecs.
//!
//! Two layers of framing:
//!
//! - [`FrameCodec`] — the frame-message codec shared with the producer.
//!   One complete binary message is a length-prefixed JSON header plus
//!   the raw (possibly compressed) pixel payload:
//!
//!   ```text
//!   header_len:  u32 LE                  (4)
//!   header:      UTF-8 JSON FrameMetadata (header_len)
//!   payload:     [u8]                    (rest of the message)
//!   ```
//!
//! - [`StreamCodec`] — `tokio_util` codec giving message boundaries on
//!   a raw TCP byte stream, since the frame message itself is only
//!   self-delimiting inside a message-oriented transport:
//!
//!   ```text
//!   body_len:    u32 LE  (4)
//!   kind:        u8      (1)   0 = binary, 1 = text
//!   body:        [u8]    (body_len)
//!   ```

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::ViewError;
use crate::frame::FrameMetadata;
use crate::transport::TransportMessage;

// ── FrameCodec ───────────────────────────────────────────────────

/// A decoded wire message: parsed header plus raw payload bytes.
#[derive(Debug, Clone)]
pub struct WireFrame {
    pub header: FrameMetadata,
    pub payload: Bytes,
}

/// Stateless codec for the frame-message wire format.
pub struct FrameCodec;

impl FrameCodec {
    /// Length of the `header_len` prefix.
    pub const PREFIX_SIZE: usize = 4;

    /// Decode one complete binary message.
    ///
    /// Never blocks and never allocates beyond the message length.
    /// Errors are per-message: the caller drops the message and keeps
    /// decoding subsequent ones.
    pub fn decode(message: &[u8]) -> Result<WireFrame, ViewError> {
        if message.len() < Self::PREFIX_SIZE {
            return Err(ViewError::TooShort {
                len: message.len(),
                needed: Self::PREFIX_SIZE,
            });
        }

        let header_len =
            u32::from_le_bytes(message[..Self::PREFIX_SIZE].try_into().unwrap()) as usize;
        let body_start = Self::PREFIX_SIZE + header_len;
        if message.len() < body_start {
            return Err(ViewError::TooShort {
                len: message.len(),
                needed: body_start,
            });
        }

        let header: FrameMetadata =
            serde_json::from_slice(&message[Self::PREFIX_SIZE..body_start])
                .map_err(|e| ViewError::HeaderParse(e.to_string()))?;

        Ok(WireFrame {
            header,
            payload: Bytes::copy_from_slice(&message[body_start..]),
        })
    }

    /// Encode a header and payload into one complete binary message.
    pub fn encode(header: &FrameMetadata, payload: &[u8]) -> Result<Vec<u8>, ViewError> {
        let header_json = serde_json::to_vec(header)?;
        let mut message =
            Vec::with_capacity(Self::PREFIX_SIZE + header_json.len() + payload.len());
        message.extend_from_slice(&(header_json.len() as u32).to_le_bytes());
        message.extend_from_slice(&header_json);
        message.extend_from_slice(payload);
        Ok(message)
    }
}

// ── StreamCodec ──────────────────────────────────────────────────

/// Maximum transport frame body the codec will accept.
pub const MAX_STREAM_FRAME: usize = 64 * 1024 * 1024;

const STREAM_HEADER: usize = 5; // u32 length + u8 kind

const KIND_BINARY: u8 = 0;
const KIND_TEXT: u8 = 1;

/// `tokio_util` codec framing [`TransportMessage`]s over a byte stream.
#[derive(Debug, Default)]
pub struct StreamCodec;

impl Decoder for StreamCodec {
    type Item = TransportMessage;
    type Error = ViewError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < STREAM_HEADER {
            return Ok(None);
        }

        let body_len = u32::from_le_bytes(src[..4].try_into().unwrap()) as usize;
        if body_len > MAX_STREAM_FRAME {
            return Err(ViewError::FrameTooLarge {
                size: body_len,
                max: MAX_STREAM_FRAME,
            });
        }
        if src.len() < STREAM_HEADER + body_len {
            src.reserve(STREAM_HEADER + body_len - src.len());
            return Ok(None);
        }

        src.advance(4);
        let kind = src.get_u8();
        let body = src.split_to(body_len).freeze();

        match kind {
            KIND_BINARY => Ok(Some(TransportMessage::Binary(body))),
            KIND_TEXT => Ok(Some(TransportMessage::Text(String::from_utf8(
                body.to_vec(),
            )?))),
            other => Err(ViewError::HeaderParse(format!(
                "unknown transport frame kind {other:#x}"
            ))),
        }
    }
}

impl Encoder<TransportMessage> for StreamCodec {
    type Error = ViewError;

    fn encode(&mut self, item: TransportMessage, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let (kind, body): (u8, &[u8]) = match &item {
            TransportMessage::Binary(b) => (KIND_BINARY, b),
            TransportMessage::Text(t) => (KIND_TEXT, t.as_bytes()),
        };
        if body.len() > MAX_STREAM_FRAME {
            return Err(ViewError::FrameTooLarge {
                size: body.len(),
                max: MAX_STREAM_FRAME,
            });
        }
        dst.reserve(STREAM_HEADER + body.len());
        dst.put_u32_le(body.len() as u32);
        dst.put_u8(kind);
        dst.put_slice(body);
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────
