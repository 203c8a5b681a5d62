//! Transport abstraction and the TCP implementation.
//!
//! The connection manager never touches a socket type directly: it
//! drives a boxed [`Transport`] obtained from a [`Connector`], so the
//! state machine is host-independent and unit-testable with an
//! in-memory peer. The shipped implementation frames messages over TCP
//! with [`StreamCodec`](crate::codec::StreamCodec).

use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_util::codec::Framed;

use crate::codec::StreamCodec;
use crate::error::ViewError;

// ── TransportMessage ─────────────────────────────────────────────

/// One message delivered by or handed to a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportMessage {
    /// Server→client frame message.
    Binary(Bytes),
    /// Client→server JSON control message.
    Text(String),
}

// ── Traits ───────────────────────────────────────────────────────

/// An open, message-oriented, bidirectional link to the producer.
#[async_trait]
pub trait Transport: Send {
    /// Send one message.
    async fn send(&mut self, message: TransportMessage) -> Result<(), ViewError>;

    /// Receive the next message.
    ///
    /// `None` means the peer closed the link; `Some(Err(_))` is a
    /// transport-level failure, after which the link is unusable.
    async fn recv(&mut self) -> Option<Result<TransportMessage, ViewError>>;

    /// Close the link with a normal-closure handshake.
    async fn close(&mut self) -> Result<(), ViewError>;
}

/// Factory for [`Transport`]s, invoked on every (re)connect.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn Transport>, ViewError>;
}

// ── TcpTransport ─────────────────────────────────────────────────

/// TCP transport framing messages with [`StreamCodec`].
pub struct TcpTransport {
    framed: Framed<TcpStream, StreamCodec>,
}

impl TcpTransport {
    /// Wrap an established stream.
    pub fn new(stream: TcpStream) -> Result<Self, ViewError> {
        stream.set_nodelay(true)?;
        Ok(Self {
            framed: Framed::new(stream, StreamCodec),
        })
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn send(&mut self, message: TransportMessage) -> Result<(), ViewError> {
        self.framed.send(message).await
    }

    async fn recv(&mut self) -> Option<Result<TransportMessage, ViewError>> {
        self.framed.next().await
    }

    async fn close(&mut self) -> Result<(), ViewError> {
        self.framed.close().await
    }
}

// ── TcpConnector ─────────────────────────────────────────────────

/// Opens [`TcpTransport`]s to a fixed producer address.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    addr: SocketAddr,
    open_timeout: Duration,
}

impl TcpConnector {
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            open_timeout: Duration::from_secs(10),
        }
    }

    /// Override the TCP open timeout (distinct from the manager's
    /// overall connect timeout, which also covers this).
    pub fn with_open_timeout(mut self, timeout: Duration) -> Self {
        self.open_timeout = timeout;
        self
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }
}

#[async_trait]
impl Connector for TcpConnector {
    async fn connect(&self) -> Result<Box<dyn Transport>, ViewError> {
        let stream = tokio::time::timeout(self.open_timeout, TcpStream::connect(self.addr))
            .await
            .map_err(|_| ViewError::Timeout(self.open_timeout))??;
        Ok(Box::new(TcpTransport::new(stream)?))
    }
}

// ── Tests ────────────────────────────────────────────────────────
