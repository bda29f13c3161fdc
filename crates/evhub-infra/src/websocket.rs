//! axum WebSocket adapter for the hub's [`Connection`] port.
//!
//! The upgraded socket is split with [`StreamExt::split`] so the listener can
//! own the send half under its mutex while the reader task drains the receive
//! half. Ping replies are generated by tungstenite while reading, so the
//! listener only ever sees pongs it asked for.

use std::net::SocketAddr;

use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};

use evhub_core::connection::{Connection, Frame, FrameSink, FrameStream};
use evhub_types::error::TransportError;

/// An upgraded WebSocket plus the address of the peer that opened it.
pub struct WsConnection {
    socket: WebSocket,
    remote: Option<SocketAddr>,
}

impl WsConnection {
    pub fn new(socket: WebSocket, remote: Option<SocketAddr>) -> Self {
        Self { socket, remote }
    }
}

impl Connection for WsConnection {
    type Sink = WsSink;
    type Stream = WsStream;

    fn peer_addr(&self) -> Option<SocketAddr> {
        self.remote
    }

    fn split(self) -> (WsSink, WsStream) {
        let (sink, stream) = self.socket.split();
        (WsSink { inner: sink }, WsStream { inner: stream })
    }
}

pub struct WsSink {
    inner: SplitSink<WebSocket, Message>,
}

pub struct WsStream {
    inner: SplitStream<WebSocket>,
}

impl FrameSink for WsSink {
    async fn send(&mut self, frame: Frame) -> Result<(), TransportError> {
        self.inner
            .send(into_message(frame))
            .await
            .map_err(|e| TransportError::Io(e.to_string()))
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.inner
            .close()
            .await
            .map_err(|e| TransportError::Io(e.to_string()))
    }
}

impl FrameStream for WsStream {
    async fn recv(&mut self) -> Option<Result<Frame, TransportError>> {
        let message = self.inner.next().await?;
        Some(
            message
                .map(from_message)
                .map_err(|e| TransportError::Io(e.to_string())),
        )
    }
}

fn into_message(frame: Frame) -> Message {
    match frame {
        Frame::Text(text) => Message::Text(text.into()),
        Frame::Binary(bytes) => Message::Binary(bytes.into()),
        Frame::Ping(bytes) => Message::Ping(bytes.into()),
        Frame::Pong(bytes) => Message::Pong(bytes.into()),
        Frame::Close => Message::Close(None),
    }
}

fn from_message(message: Message) -> Frame {
    match message {
        Message::Text(text) => Frame::Text(text.as_str().to_owned()),
        Message::Binary(bytes) => Frame::Binary(bytes.to_vec()),
        Message::Ping(bytes) => Frame::Ping(bytes.to_vec()),
        Message::Pong(bytes) => Frame::Pong(bytes.to_vec()),
        Message::Close(_) => Frame::Close,
    }
}
