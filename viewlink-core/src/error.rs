//! Domain-specific error types for the viewlink streaming client.
//!
//! All fallible operations return `Result<T, ViewError>`.
//! No panics on invalid input — every error is typed and recoverable.

use std::time::Duration;
use thiserror::Error;

/// The canonical error type for the streaming client.
#[derive(Debug, Error)]
pub enum ViewError {
    // ── Protocol Errors ──────────────────────────────────────────
    /// A wire message was shorter than its framing requires.
    #[error("message too short: {len} bytes (need {needed})")]
    TooShort { len: usize, needed: usize },

    /// The JSON frame header could not be parsed.
    #[error("invalid frame header: {0}")]
    HeaderParse(String),

    /// The decoded pixel payload does not match the advertised dimensions.
    #[error("payload size mismatch: {actual} bytes (expected {expected} for {width}x{height})")]
    PayloadSizeMismatch {
        actual: u64,
        expected: u64,
        width: u32,
        height: u32,
    },

    /// An inbound transport frame exceeded the codec limit.
    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: usize, max: usize },

    // ── Transport Errors ─────────────────────────────────────────
    /// The TCP/IO layer reported an error.
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// An operation exceeded its deadline.
    #[error("timeout after {0:?}")]
    Timeout(Duration),

    /// An mpsc channel was closed unexpectedly.
    #[error("channel closed")]
    ChannelClosed,

    /// Every automatic reconnect attempt has been spent.
    #[error("reconnect attempts exhausted after {attempts} tries")]
    ReconnectExhausted { attempts: u32 },

    // ── Capability Errors ────────────────────────────────────────
    /// The external decompression capability rejected the payload.
    #[error("decompression failed: {0}")]
    Decompression(String),

    // ── Configuration Errors ─────────────────────────────────────
    /// A quality level name did not match any known profile.
    #[error("unknown quality level: {0:?}")]
    Config(String),

    /// Control message serialization failed.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// UTF-8 conversion failed.
    #[error("invalid utf-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
}

// ── Convenient From implementations ──────────────────────────────

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for ViewError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        ViewError::ChannelClosed
    }
}

impl From<serde_json::Error> for ViewError {
    fn from(e: serde_json::Error) -> Self {
        ViewError::Encoding(e.to_string())
    }
}
