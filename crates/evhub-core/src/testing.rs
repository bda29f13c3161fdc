//! In-memory connection double for listener and hub tests.
//!
//! The peer side records every frame the listener writes, injects inbound
//! frames, can fail or stall writes (and the closing handshake) on demand,
//! and counts overlapping `send` calls so tests can prove writes are
//! serialized.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use evhub_types::error::TransportError;
use evhub_types::event::Event;
use tokio::sync::mpsc;

use crate::connection::{Connection, Frame, FrameSink, FrameStream};

type Inbound = mpsc::UnboundedSender<Result<Frame, TransportError>>;

#[derive(Default)]
struct Shared {
    sent: Mutex<Vec<Frame>>,
    in_flight: AtomicBool,
    overlaps: AtomicUsize,
    fail_writes: AtomicBool,
    fail_close: AtomicBool,
    close_calls: AtomicUsize,
    write_delay_ms: AtomicU64,
}

pub(crate) struct MemoryConnection {
    sink: MemorySink,
    stream: MemoryStream,
    remote: SocketAddr,
}

pub(crate) struct MemorySink {
    shared: Arc<Shared>,
    inbound: Inbound,
    auto_pong: bool,
}

pub(crate) struct MemoryStream {
    rx: mpsc::UnboundedReceiver<Result<Frame, TransportError>>,
}

/// Test-side handle to the remote end of a [`MemoryConnection`].
#[derive(Clone)]
pub(crate) struct MemoryPeer {
    shared: Arc<Shared>,
    inbound: Inbound,
}

/// Create a connected pair. With `auto_pong`, every ping written by the
/// listener is answered with a pong on the inbound stream.
pub(crate) fn memory_pair(auto_pong: bool) -> (MemoryConnection, MemoryPeer) {
    let shared = Arc::new(Shared::default());
    let (tx, rx) = mpsc::unbounded_channel();

    let conn = MemoryConnection {
        sink: MemorySink {
            shared: Arc::clone(&shared),
            inbound: tx.clone(),
            auto_pong,
        },
        stream: MemoryStream { rx },
        remote: SocketAddr::from(([127, 0, 0, 1], 40000)),
    };
    let peer = MemoryPeer {
        shared,
        inbound: tx,
    };
    (conn, peer)
}

impl Connection for MemoryConnection {
    type Sink = MemorySink;
    type Stream = MemoryStream;

    fn peer_addr(&self) -> Option<SocketAddr> {
        Some(self.remote)
    }

    fn split(self) -> (MemorySink, MemoryStream) {
        (self.sink, self.stream)
    }
}

impl FrameSink for MemorySink {
    async fn send(&mut self, frame: Frame) -> Result<(), TransportError> {
        let shared = &self.shared;
        if shared.close_calls.load(Ordering::SeqCst) > 0 {
            return Err(TransportError::Closed);
        }
        if shared.fail_writes.load(Ordering::SeqCst) {
            return Err(TransportError::Io("injected write failure".to_string()));
        }

        if shared.in_flight.swap(true, Ordering::SeqCst) {
            shared.overlaps.fetch_add(1, Ordering::SeqCst);
        }

        // Give any unsynchronized writer a chance to overlap with this one.
        tokio::task::yield_now().await;
        let delay = shared.write_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        let is_ping = matches!(frame, Frame::Ping(_));
        shared.sent.lock().unwrap().push(frame);
        shared.in_flight.store(false, Ordering::SeqCst);

        if is_ping && self.auto_pong {
            let _ = self.inbound.send(Ok(Frame::Pong(Vec::new())));
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.shared.close_calls.fetch_add(1, Ordering::SeqCst);
        // A stalled peer stalls the closing handshake too.
        let delay = self.shared.write_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.shared.fail_close.load(Ordering::SeqCst) {
            return Err(TransportError::Io("injected close failure".to_string()));
        }
        Ok(())
    }
}

impl FrameStream for MemoryStream {
    async fn recv(&mut self) -> Option<Result<Frame, TransportError>> {
        self.rx.recv().await
    }
}

impl MemoryPeer {
    pub(crate) fn send_frame(&self, frame: Frame) {
        let _ = self.inbound.send(Ok(frame));
    }

    pub(crate) fn send_text(&self, text: &str) {
        self.send_frame(Frame::Text(text.to_string()));
    }

    pub(crate) fn send_error(&self, err: TransportError) {
        let _ = self.inbound.send(Err(err));
    }

    pub(crate) fn pong(&self) {
        self.send_frame(Frame::Pong(Vec::new()));
    }

    pub(crate) fn disconnect(&self) {
        self.send_error(TransportError::Closed);
    }

    pub(crate) fn fail_writes(&self, fail: bool) {
        self.shared.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn fail_close(&self, fail: bool) {
        self.shared.fail_close.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn set_write_delay(&self, delay: Duration) {
        self.shared
            .write_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub(crate) fn sent_frames(&self) -> Vec<Frame> {
        self.shared.sent.lock().unwrap().clone()
    }

    /// Application frames decoded back into events, in write order.
    pub(crate) fn sent_events(&self) -> Vec<Event> {
        self.sent_frames()
            .into_iter()
            .filter_map(|frame| match frame {
                Frame::Text(text) => Some(serde_json::from_str(&text).unwrap()),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn ping_count(&self) -> usize {
        self.sent_frames()
            .iter()
            .filter(|f| matches!(f, Frame::Ping(_)))
            .count()
    }

    pub(crate) fn overlaps(&self) -> usize {
        self.shared.overlaps.load(Ordering::SeqCst)
    }

    pub(crate) fn close_calls(&self) -> usize {
        self.shared.close_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn transport_closed(&self) -> bool {
        self.close_calls() > 0
    }
}
