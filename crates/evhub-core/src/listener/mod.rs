//! Connection-backed event listeners.
//!
//! A [`Listener`] owns the send half of one connection plus its heartbeat
//! state, type filter and cancellation token. Three tasks run per listener:
//!
//! - **heartbeat** ([`heartbeat`]): pings the peer every 10s and declares it
//!   dead when pongs stop arriving.
//! - **reader** ([`reader`]): decodes inbound events into a bounded channel,
//!   or, with no inbound consumer, blocks on the next frame only to notice
//!   the peer going away.
//! - **writer** ([`writer`]): drains the listener's bounded outbound queue.
//!   The hub only ever enqueues, so publishers never wait on a peer.
//!
//! Every write to the connection (pings, dispatched events) goes through the
//! listener's single mutex, so frames never interleave. Closing is one-way: once the token fires the listener never
//! becomes live again, and a peer that wants to resume must register anew.

pub(crate) mod heartbeat;
pub(crate) mod reader;
pub(crate) mod writer;

use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};

use evhub_types::error::{ListenerError, TransportError};
use evhub_types::event::Event;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Mutex};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::connection::{BoxFrameSink, Frame};
use crate::filter::EventFilter;

pub use heartbeat::{MAX_PENDING_PONGS, PING_DEADLINE, PING_INTERVAL};

/// Deadline for application writes (including the wait for the send mutex)
/// and for the closing handshake.
pub const WRITE_DEADLINE: std::time::Duration = PING_DEADLINE;

/// Why a listener stopped. The first recorded reason wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// `close()` called by the owner or an external caller.
    Requested,
    /// The listener's cancellation token (or its parent) fired.
    Cancelled,
    /// Too many pings went unanswered.
    HeartbeatTimeout,
    /// The peer closed the connection or the stream ended.
    PeerDisconnected,
    /// The peer sent a data frame to a listener that expects none.
    UnexpectedData,
    ReadFailure,
    DecodeFailure,
    WriteFailure,
    /// The inbound event consumer dropped its receiver.
    InboundClosed,
    /// The outbound queue filled up faster than the peer drained it.
    QueueFull,
    /// The hub is shutting down.
    Shutdown,
}

impl From<&ListenerError> for CloseReason {
    fn from(err: &ListenerError) -> Self {
        match err {
            ListenerError::HeartbeatTimeout => CloseReason::HeartbeatTimeout,
            ListenerError::DecodeFailure(_) => CloseReason::DecodeFailure,
            ListenerError::QueueFull(_) => CloseReason::QueueFull,
            ListenerError::TransportClosed
            | ListenerError::WriteFailure(_)
            | ListenerError::Encode(_) => CloseReason::WriteFailure,
        }
    }
}

/// Registration options for a listener.
#[derive(Debug, Default)]
pub struct ListenerOptions {
    pub(crate) filter: EventFilter,
    pub(crate) inbound: Option<mpsc::Sender<Event>>,
    pub(crate) parent: Option<CancellationToken>,
}

impl ListenerOptions {
    pub fn new(filter: EventFilter) -> Self {
        Self {
            filter,
            ..Self::default()
        }
    }

    /// Decode inbound frames as events and forward them to `sender`.
    ///
    /// The channel is bounded: a slow consumer stalls the reader rather than
    /// buffering without limit.
    pub fn with_inbound(mut self, sender: mpsc::Sender<Event>) -> Self {
        self.inbound = Some(sender);
        self
    }

    /// Tie the listener's lifetime to `parent`: cancelling it closes the listener.
    pub fn with_parent(mut self, parent: CancellationToken) -> Self {
        self.parent = Some(parent);
        self
    }
}

/// Mutex-guarded send state. `sink` is `None` once the listener has closed
/// its connection.
struct SendState {
    sink: Option<BoxFrameSink>,
    pending_pongs: u32,
}

/// A registered, connection-backed subscriber.
pub struct Listener {
    id: String,
    remote: Option<SocketAddr>,
    filter: EventFilter,
    cancel: CancellationToken,
    outbound: mpsc::Sender<Arc<str>>,
    state: Mutex<SendState>,
    close_reason: OnceLock<CloseReason>,
}

impl Listener {
    /// Build a listener plus the receiving end of its outbound queue, which
    /// belongs to the writer task.
    pub(crate) fn new(
        id: String,
        remote: Option<SocketAddr>,
        filter: EventFilter,
        sink: BoxFrameSink,
        cancel: CancellationToken,
        outbound_capacity: usize,
    ) -> (Self, mpsc::Receiver<Arc<str>>) {
        let (outbound, queue) = mpsc::channel(outbound_capacity.max(1));
        let listener = Self {
            id,
            remote,
            filter,
            cancel,
            outbound,
            state: Mutex::new(SendState {
                sink: Some(sink),
                pending_pongs: 0,
            }),
            close_reason: OnceLock::new(),
        };
        (listener, queue)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn remote(&self) -> Option<SocketAddr> {
        self.remote
    }

    pub fn filter(&self) -> &EventFilter {
        &self.filter
    }

    /// True once the cancellation token has fired. Never blocks.
    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn close_reason(&self) -> Option<CloseReason> {
        self.close_reason.get().copied()
    }

    /// Disconnect the listener. Idempotent and safe to call concurrently.
    pub async fn close(&self) {
        self.close_with(CloseReason::Requested).await;
    }

    /// Block until `external` is cancelled or the listener closes.
    pub async fn wait(&self, external: &CancellationToken) {
        tokio::select! {
            _ = external.cancelled() => {}
            _ = self.cancel.cancelled() => {}
        }
    }

    /// Serialize `event` and write it to the connection.
    pub async fn write_message(&self, event: &Event) -> Result<(), ListenerError> {
        let text =
            serde_json::to_string(event).map_err(|e| ListenerError::Encode(e.to_string()))?;
        self.write_text(&text).await
    }

    /// Hand an encoded event to the writer task without waiting.
    pub(crate) fn enqueue(&self, text: Arc<str>) -> Result<(), ListenerError> {
        if self.is_closed() {
            return Err(ListenerError::TransportClosed);
        }
        self.outbound.try_send(text).map_err(|err| match err {
            TrySendError::Full(_) => ListenerError::QueueFull(self.outbound.max_capacity()),
            TrySendError::Closed(_) => ListenerError::TransportClosed,
        })
    }

    /// Write an already-encoded event. The deadline covers both the wait for
    /// the send mutex and the send itself.
    pub(crate) async fn write_text(&self, text: &str) -> Result<(), ListenerError> {
        let write = async {
            let mut state = self.state.lock().await;
            let sink = state.sink.as_mut().ok_or(ListenerError::TransportClosed)?;
            sink.send(Frame::Text(text.to_string()))
                .await
                .map_err(ListenerError::from)
        };

        match timeout(WRITE_DEADLINE, write).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::DeadlineExceeded(WRITE_DEADLINE).into()),
        }
    }

    pub(crate) async fn close_with(&self, reason: CloseReason) {
        let mut state = self.state.lock().await;

        let Some(mut sink) = state.sink.take() else {
            // Already closed; make sure the token agrees.
            self.cancel.cancel();
            return;
        };

        let _ = self.close_reason.set(reason);
        self.cancel.cancel();
        drop(state);

        debug!(
            listener = %self.id,
            remote = ?self.remote,
            reason = ?reason,
            "Event listener stopped"
        );

        match timeout(WRITE_DEADLINE, sink.close()).await {
            Ok(Ok(())) | Ok(Err(TransportError::Closed)) => {}
            Ok(Err(err)) => {
                error!(listener = %self.id, error = %err, "Failed closing listener connection");
            }
            Err(_) => {
                warn!(listener = %self.id, "Closing handshake timed out");
            }
        }
    }

    pub(crate) async fn pong_received(&self) {
        self.state.lock().await.pending_pongs = 0;
    }

    pub(crate) fn token(&self) -> &CancellationToken {
        &self.cancel
    }

    #[cfg(test)]
    pub(crate) async fn pending_pongs(&self) -> u32 {
        self.state.lock().await.pending_pongs
    }
}

impl std::fmt::Debug for Listener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listener")
            .field("id", &self.id)
            .field("remote", &self.remote)
            .field("filter", &self.filter)
            .field("closed", &self.is_closed())
            .finish()
    }
}
