//! Connection capability traits.
//!
//! A listener never sees a concrete transport. It holds the send half of a
//! [`Connection`] behind a mutex and hands the receive half to its reader
//! task. Implementations live in evhub-infra (e.g. the axum WebSocket
//! adapter).
//!
//! Uses native async fn in traits (RPITIT, Rust 2024 edition). The send half
//! is type-erased through [`BoxFrameSink`] so the hub can store listeners
//! backed by different transports in one registry.

mod box_sink;

use std::future::Future;
use std::net::SocketAddr;

use evhub_types::error::TransportError;

pub use box_sink::{BoxFrameSink, FrameSinkDyn};

/// A single transport frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Application message, one JSON object per frame.
    Text(String),
    Binary(Vec<u8>),
    /// Transport-level liveness check.
    Ping(Vec<u8>),
    /// Reply to a ping.
    Pong(Vec<u8>),
    /// Peer-initiated close.
    Close,
}

/// Send half of a connection.
pub trait FrameSink: Send + 'static {
    /// Write one frame. Implementations must not interleave frames; callers
    /// guarantee at most one in-flight `send`.
    fn send(&mut self, frame: Frame) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Start the closing handshake and release the transport.
    fn close(&mut self) -> impl Future<Output = Result<(), TransportError>> + Send;
}

/// Receive half of a connection.
pub trait FrameStream: Send + 'static {
    /// Wait for the next frame. `None` means the peer went away.
    fn recv(&mut self) -> impl Future<Output = Option<Result<Frame, TransportError>>> + Send;
}

/// A ready, bidirectional, message-framed connection handed to the hub after
/// the upstream handshake.
pub trait Connection: Send + 'static {
    type Sink: FrameSink;
    type Stream: FrameStream;

    fn peer_addr(&self) -> Option<SocketAddr>;

    /// Split into independently owned send and receive halves.
    fn split(self) -> (Self::Sink, Self::Stream);
}
