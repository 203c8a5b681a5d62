//! # viewlink-core
//!
//! Core library for the viewlink remote-desktop stream viewer.
//!
//! This crate contains:
//! - **Event**: `EventBus` — typed publish/subscribe hub, and the
//!   `StreamEvent` union published to the presentation layer
//! - **Frame model**: `FrameMetadata`, `BufferedFrame`
//! - **Store**: `FrameStore` — bounded frame ring buffer with a
//!   movable read cursor
//! - **Codec**: `FrameCodec` for the producer's frame-message format,
//!   `StreamCodec` for framed TCP I/O via `tokio_util`
//! - **Transport**: `Transport`/`Connector` abstraction plus the TCP
//!   implementation
//! - **Connection**: `ConnectionManager` — state machine with
//!   heartbeat and exponential-backoff reconnect
//! - **Metrics**: `MetricsTracker`, `StreamStats`
//! - **Quality**: named `QualityProfile`s and their control messages
//! - **Error**: `ViewError` — typed, `thiserror`-based error hierarchy

pub mod clock;
pub mod codec;
pub mod connection;
pub mod decompress;
pub mod error;
pub mod event;
pub mod frame;
pub mod message;
pub mod metrics;
pub mod quality;
pub mod store;
pub mod transport;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use clock::{Clock, SystemClock};
pub use codec::{FrameCodec, StreamCodec, WireFrame};
pub use connection::{
    ConnectionConfig, ConnectionHandle, ConnectionManager, ConnectionState, backoff_delay,
};
pub use decompress::{Decompressor, NoopDecompressor, ZstdDecompressor};
pub use error::ViewError;
pub use event::{EventBus, StreamBus, StreamEvent};
pub use frame::{BufferedFrame, FrameMetadata};
pub use message::ControlMessage;
pub use metrics::{MetricsTracker, StreamStats};
pub use quality::{QualityController, QualityLevel, QualityProfile};
pub use store::FrameStore;
pub use transport::{Connector, TcpConnector, TcpTransport, Transport, TransportMessage};
