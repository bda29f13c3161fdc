//! Ping/pong liveness loop.
//!
//! State machine: `Connected -> PingSent -> Connected` on pong, or
//! `PingSent -> PingSent` while pongs stay missing, then `Closed` once more
//! than [`MAX_PENDING_PONGS`] pings are outstanding at the next tick. `Closed`
//! is terminal.

use std::sync::Arc;
use std::time::Duration;

use evhub_types::error::{ListenerError, TransportError};
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

use super::{CloseReason, Listener};
use crate::connection::Frame;
use crate::registry::Registry;

/// Time between pings.
pub const PING_INTERVAL: Duration = Duration::from_secs(10);

/// Send deadline for a single ping.
pub const PING_DEADLINE: Duration = Duration::from_secs(5);

/// Unanswered pings tolerated before the peer is declared dead.
pub const MAX_PENDING_PONGS: u32 = 2;

const PING_PAYLOAD: &[u8] = b"keepalive";

enum Beat {
    Sent,
    Failed(ListenerError),
    Closed,
}

impl Listener {
    /// One heartbeat tick, performed under the send mutex.
    async fn beat(&self) -> Beat {
        let mut state = self.state.lock().await;

        if state.pending_pongs > MAX_PENDING_PONGS {
            return Beat::Failed(ListenerError::HeartbeatTimeout);
        }

        let Some(sink) = state.sink.as_mut() else {
            return Beat::Closed;
        };

        match timeout(PING_DEADLINE, sink.send(Frame::Ping(PING_PAYLOAD.to_vec()))).await {
            Ok(Ok(())) => {
                state.pending_pongs += 1;
                Beat::Sent
            }
            Ok(Err(err)) => Beat::Failed(err.into()),
            Err(_) => Beat::Failed(TransportError::DeadlineExceeded(PING_DEADLINE).into()),
        }
    }
}

/// Run the heartbeat until the listener closes, then close and evict it.
pub(crate) async fn run(listener: Arc<Listener>, registry: Registry) {
    debug!(
        listener = %listener.id(),
        remote = ?listener.remote(),
        "Event listener heartbeat started"
    );

    let reason = loop {
        if listener.is_closed() {
            break CloseReason::Cancelled;
        }

        match listener.beat().await {
            Beat::Sent => {}
            Beat::Failed(ListenerError::HeartbeatTimeout) => {
                warn!(
                    listener = %listener.id(),
                    remote = ?listener.remote(),
                    "Heartbeat for event listener timed out"
                );
                break CloseReason::HeartbeatTimeout;
            }
            Beat::Failed(err) => {
                debug!(listener = %listener.id(), error = %err, "Heartbeat ping failed");
                break CloseReason::from(&err);
            }
            Beat::Closed => break CloseReason::Cancelled,
        }

        tokio::select! {
            _ = sleep(PING_INTERVAL) => {}
            _ = listener.token().cancelled() => break CloseReason::Cancelled,
        }
    };

    listener.close_with(reason).await;
    registry.evict(listener.id());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::BoxFrameSink;
    use crate::filter::EventFilter;
    use crate::testing::{memory_pair, MemoryPeer};
    use crate::Connection;
    use tokio_util::sync::CancellationToken;

    /// Start only the heartbeat task; pongs are delivered by calling
    /// `pong_received` directly.
    fn start(auto_pong: bool) -> (Arc<Listener>, MemoryPeer, Registry) {
        let (conn, peer) = memory_pair(auto_pong);
        let (sink, _stream) = conn.split();
        let (listener, _queue) = Listener::new(
            "hb".to_string(),
            None,
            EventFilter::all(),
            BoxFrameSink::new(sink),
            CancellationToken::new(),
            8,
        );
        let listener = Arc::new(listener);
        let registry = Registry::default();
        registry.insert(Arc::clone(&listener));
        tokio::spawn(run(Arc::clone(&listener), registry.clone()));
        (listener, peer, registry)
    }

    #[tokio::test(start_paused = true)]
    async fn first_ping_is_sent_immediately() {
        let (listener, peer, _registry) = start(false);
        sleep(Duration::from_millis(1)).await;

        assert_eq!(peer.ping_count(), 1);
        assert_eq!(listener.pending_pongs().await, 1);
        assert_eq!(
            peer.sent_frames()[0],
            Frame::Ping(b"keepalive".to_vec())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn unanswered_pings_time_out() {
        let (listener, peer, registry) = start(false);

        // Pings at 0s, 10s, 20s; the 30s tick finds three outstanding.
        sleep(Duration::from_secs(25)).await;
        assert!(!listener.is_closed());
        assert_eq!(peer.ping_count(), 3);

        sleep(Duration::from_secs(10)).await;
        assert!(listener.is_closed());
        assert_eq!(listener.close_reason(), Some(CloseReason::HeartbeatTimeout));
        assert_eq!(peer.ping_count(), 3);
        assert!(peer.transport_closed());
        assert_eq!(registry.len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn pong_resets_the_timeout() {
        let (listener, _peer, _registry) = start(false);

        sleep(Duration::from_secs(15)).await;
        assert_eq!(listener.pending_pongs().await, 2);
        listener.pong_received().await;

        // Without the pong the listener would have closed at 30s.
        sleep(Duration::from_secs(20)).await;
        assert!(!listener.is_closed());

        // Pings at 20s, 30s, 40s go unanswered; the 50s tick closes.
        sleep(Duration::from_secs(20)).await;
        assert!(listener.is_closed());
        assert_eq!(listener.close_reason(), Some(CloseReason::HeartbeatTimeout));
    }

    #[tokio::test(start_paused = true)]
    async fn pong_after_single_missed_ping_resets_the_timeout() {
        let (listener, peer, _registry) = start(false);

        sleep(Duration::from_secs(5)).await;
        assert_eq!(listener.pending_pongs().await, 1);
        listener.pong_received().await;
        assert_eq!(listener.pending_pongs().await, 0);

        // Without the pong the 30s tick would close; now pings at 10s, 20s,
        // 30s go unanswered and the 40s tick closes.
        sleep(Duration::from_secs(30)).await;
        assert!(!listener.is_closed());
        assert_eq!(peer.ping_count(), 4);

        sleep(Duration::from_secs(10)).await;
        assert!(listener.is_closed());
        assert_eq!(listener.close_reason(), Some(CloseReason::HeartbeatTimeout));
        assert_eq!(peer.ping_count(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn responsive_peer_stays_connected() {
        let (listener, peer, _registry) = start(true);

        // Auto-pong only queues the reply; deliver it the way the reader would.
        for _ in 0..10 {
            sleep(Duration::from_secs(10)).await;
            listener.pong_received().await;
        }

        assert!(!listener.is_closed());
        assert!(peer.ping_count() >= 10);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_ping_closes_listener() {
        let (listener, peer, registry) = start(false);
        sleep(Duration::from_millis(1)).await;

        peer.fail_writes(true);
        sleep(Duration::from_secs(11)).await;

        assert!(listener.is_closed());
        assert_eq!(listener.close_reason(), Some(CloseReason::WriteFailure));
        assert_eq!(registry.len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_ping_hits_send_deadline() {
        let (listener, peer, _registry) = start(false);
        sleep(Duration::from_millis(1)).await;

        peer.set_write_delay(Duration::from_secs(60));
        sleep(Duration::from_secs(16)).await;

        assert!(listener.is_closed());
        assert_eq!(listener.close_reason(), Some(CloseReason::WriteFailure));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_pinging() {
        let (listener, peer, registry) = start(false);
        sleep(Duration::from_millis(1)).await;

        listener.token().cancel();
        sleep(Duration::from_secs(30)).await;

        assert_eq!(peer.ping_count(), 1);
        assert_eq!(listener.close_reason(), Some(CloseReason::Cancelled));
        assert!(peer.transport_closed());
        assert_eq!(registry.len(), 0);
    }
}
