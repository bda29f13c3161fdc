//! Inbound side of a listener.
//!
//! With an inbound channel configured, each text or binary frame is decoded
//! as one [`Event`] and forwarded; any decode or transport error ends the
//! loop. Without one, the peer is not expected to send payload traffic, so
//! the first data frame (or the end of the stream) closes the listener.
//! Control frames are handled in both modes: pongs reset the heartbeat
//! counter, pings are answered by the transport itself.

use std::sync::Arc;

use evhub_types::error::{ListenerError, TransportError};
use evhub_types::event::Event;
use tokio::sync::mpsc;
use tracing::debug;

use super::{CloseReason, Listener};
use crate::connection::{Frame, FrameStream};
use crate::registry::Registry;

pub(crate) async fn run<S: FrameStream>(
    listener: Arc<Listener>,
    mut stream: S,
    inbound: Option<mpsc::Sender<Event>>,
    registry: Registry,
) {
    let reason = tokio::select! {
        reason = read_loop(&listener, &mut stream, inbound.as_ref()) => reason,
        _ = listener.token().cancelled() => CloseReason::Cancelled,
    };

    listener.close_with(reason).await;
    registry.evict(listener.id());
}

async fn read_loop<S: FrameStream>(
    listener: &Listener,
    stream: &mut S,
    inbound: Option<&mpsc::Sender<Event>>,
) -> CloseReason {
    loop {
        let frame = match stream.recv().await {
            None | Some(Err(TransportError::Closed)) => return CloseReason::PeerDisconnected,
            Some(Err(err)) => {
                debug!(listener = %listener.id(), error = %err, "Event listener read failed");
                return CloseReason::ReadFailure;
            }
            Some(Ok(frame)) => frame,
        };

        let payload = match frame {
            Frame::Pong(_) => {
                listener.pong_received().await;
                continue;
            }
            Frame::Ping(_) => continue,
            Frame::Close => return CloseReason::PeerDisconnected,
            Frame::Text(text) => text.into_bytes(),
            Frame::Binary(bytes) => bytes,
        };

        let Some(sender) = inbound else {
            debug!(listener = %listener.id(), "Unexpected data from event listener peer");
            return CloseReason::UnexpectedData;
        };

        let event = match decode(&payload) {
            Ok(event) => event,
            Err(err) => {
                debug!(listener = %listener.id(), error = %err, "Malformed inbound event");
                return CloseReason::from(&err);
            }
        };

        if sender.send(event).await.is_err() {
            return CloseReason::InboundClosed;
        }
    }
}

fn decode(payload: &[u8]) -> Result<Event, ListenerError> {
    serde_json::from_slice(payload).map_err(|e| ListenerError::DecodeFailure(e.to_string()))
}
