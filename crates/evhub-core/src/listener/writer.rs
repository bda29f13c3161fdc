//! Outbound side of a listener.
//!
//! Drains the bounded queue filled by [`Hub::publish`](crate::Hub::publish)
//! and writes each event under the send mutex, in queue order. The first
//! failed write closes the listener; queued events behind it are dropped.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::warn;

use super::{CloseReason, Listener};
use crate::registry::Registry;

pub(crate) async fn run(
    listener: Arc<Listener>,
    mut queue: mpsc::Receiver<Arc<str>>,
    registry: Registry,
) {
    let reason = loop {
        let text = tokio::select! {
            text = queue.recv() => text,
            _ = listener.token().cancelled() => break CloseReason::Cancelled,
        };
        let Some(text) = text else {
            break CloseReason::Cancelled;
        };

        if let Err(err) = listener.write_text(&text).await {
            warn!(
                listener = %listener.id(),
                remote = ?listener.remote(),
                error = %err,
                "Failed sending event to listener"
            );
            break CloseReason::from(&err);
        }
    };

    listener.close_with(reason).await;
    registry.evict(listener.id());
}
