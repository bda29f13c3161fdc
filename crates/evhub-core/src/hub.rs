//! Process-wide registry and dispatcher of events to listeners.
//!
//! The `Hub` is created once at daemon startup and passed by reference (it is
//! cheap to clone) to every call site that registers listeners or publishes
//! events. `publish` never fails and never waits on a peer: it queues the
//! encoded event on each matching listener, whose writer task does the I/O.
//! A listener whose write fails, or whose queue overflows, is closed and
//! evicted without affecting delivery to anyone else.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use evhub_types::config::EventsConfig;
use evhub_types::error::{HubError, ListenerError};
use evhub_types::event::{Event, LogLevel};
use futures_util::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::connection::{BoxFrameSink, Connection};
use crate::listener::{heartbeat, reader, writer, CloseReason, Listener, ListenerOptions};
use crate::registry::Registry;

struct HubInner {
    registry: Registry,
    config: EventsConfig,
    shutting_down: AtomicBool,
    shutdown: CancellationToken,
}

/// Registry of active listeners plus filtered broadcast.
#[derive(Clone)]
pub struct Hub {
    inner: Arc<HubInner>,
}

impl Hub {
    pub fn new(config: EventsConfig) -> Self {
        Self {
            inner: Arc::new(HubInner {
                registry: Registry::default(),
                config,
                shutting_down: AtomicBool::new(false),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    pub fn config(&self) -> &EventsConfig {
        &self.inner.config
    }

    /// Token cancelled when the hub shuts down. Request handlers pass it to
    /// [`Listener::wait`].
    pub fn shutdown_token(&self) -> CancellationToken {
        self.inner.shutdown.clone()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.inner.shutting_down.load(Ordering::SeqCst)
    }

    /// Register a ready connection and start its heartbeat, reader and
    /// writer tasks.
    ///
    /// Must be called from within a tokio runtime.
    pub fn register<C: Connection>(
        &self,
        connection: C,
        options: ListenerOptions,
    ) -> Result<Arc<Listener>, HubError> {
        if self.is_shutting_down() {
            return Err(HubError::ShuttingDown);
        }

        let ListenerOptions {
            filter,
            inbound,
            parent,
        } = options;

        let id = Uuid::now_v7().to_string();
        let remote = connection.peer_addr();
        let cancel = parent
            .map(|p| p.child_token())
            .unwrap_or_else(|| self.inner.shutdown.child_token());
        let (sink, stream) = connection.split();

        let (listener, queue) = Listener::new(
            id,
            remote,
            filter,
            BoxFrameSink::new(sink),
            cancel,
            self.inner.config.outbound_buffer,
        );
        let listener = Arc::new(listener);

        // Insert before the tasks start so a connection that dies at once is
        // still evicted rather than left behind.
        self.inner.registry.insert(Arc::clone(&listener));

        tokio::spawn(heartbeat::run(
            Arc::clone(&listener),
            self.inner.registry.clone(),
        ));
        tokio::spawn(reader::run(
            Arc::clone(&listener),
            stream,
            inbound,
            self.inner.registry.clone(),
        ));
        tokio::spawn(writer::run(
            Arc::clone(&listener),
            queue,
            self.inner.registry.clone(),
        ));

        if self.is_shutting_down() {
            listener.token().cancel();
        }

        debug!(
            listener = %listener.id(),
            remote = ?remote,
            types = ?listener.filter().accepted_types().collect::<Vec<_>>(),
            "Event listener registered"
        );
        Ok(listener)
    }

    /// Remove and close the listener `id`. Returns false if it was not registered.
    pub async fn unregister(&self, id: &str) -> bool {
        match self.inner.registry.evict(id) {
            Some(listener) => {
                listener.close().await;
                true
            }
            None => false,
        }
    }

    pub fn listener(&self, id: &str) -> Option<Arc<Listener>> {
        self.inner.registry.get(id)
    }

    pub fn listener_count(&self) -> usize {
        self.inner.registry.len()
    }

    pub fn listener_ids(&self) -> Vec<String> {
        self.inner
            .registry
            .snapshot()
            .iter()
            .map(|l| l.id().to_string())
            .collect()
    }

    /// Deliver `event` to every listener whose filter accepts it.
    ///
    /// Returns once the event is queued; peer I/O happens on each listener's
    /// writer task. Must be called from within a tokio runtime.
    pub fn publish(&self, event: Event) {
        self.dispatch(&event, None);
    }

    /// Like [`publish`](Self::publish), skipping the listener `origin`.
    pub fn publish_from(&self, origin: &str, event: Event) {
        self.dispatch(&event, Some(origin));
    }

    fn dispatch(&self, event: &Event, skip: Option<&str>) {
        if !self.level_allowed(event) {
            return;
        }

        let targets: Vec<Arc<Listener>> = self
            .inner
            .registry
            .snapshot()
            .into_iter()
            .filter(|l| !l.is_closed() && Some(l.id()) != skip && l.filter().matches(event))
            .collect();

        if targets.is_empty() {
            return;
        }

        let text: Arc<str> = match serde_json::to_string(event) {
            Ok(text) => Arc::from(text),
            Err(err) => {
                warn!(event_type = %event.event_type, error = %err, "Failed encoding event");
                return;
            }
        };

        for listener in targets {
            match listener.enqueue(Arc::clone(&text)) {
                Ok(()) => {}
                Err(ListenerError::TransportClosed) => {
                    self.inner.registry.evict(listener.id());
                }
                Err(err) => {
                    warn!(
                        listener = %listener.id(),
                        event_type = %event.event_type,
                        error = %err,
                        "Dropping event listener that is not keeping up"
                    );
                    self.inner.registry.evict(listener.id());
                    let reason = CloseReason::from(&err);
                    tokio::spawn(async move { listener.close_with(reason).await });
                }
            }
        }
    }

    /// Gate `logging` events on the hub's debug/verbose settings.
    fn level_allowed(&self, event: &Event) -> bool {
        let config = &self.inner.config;
        match event.log_level() {
            Some(LogLevel::Debug) => config.debug,
            Some(LogLevel::Info) => config.debug || config.verbose,
            _ => true,
        }
    }

    /// Close every listener and refuse further registrations.
    pub async fn shutdown(&self) {
        self.inner.shutting_down.store(true, Ordering::SeqCst);

        let listeners = self.inner.registry.drain();
        let count = listeners.len();
        join_all(
            listeners
                .iter()
                .map(|l| l.close_with(CloseReason::Shutdown)),
        )
        .await;

        self.inner.shutdown.cancel();
        info!(listeners = count, "Event hub shut down");
    }
}

impl std::fmt::Debug for Hub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hub")
            .field("listener_count", &self.listener_count())
            .field("shutting_down", &self.is_shutting_down())
            .finish()
    }
}
