//! Event stream endpoints.
//!
//! - `GET /1.0/events` upgrades to a WebSocket and registers a monitor
//!   listener. The peer only receives events; any data it sends closes the
//!   stream.
//! - `GET /1.0/events/relay` registers a listener whose inbound frames are
//!   decoded as events and republished to everyone else.
//! - `POST /1.0/events` publishes one event from a plain HTTP client.
//!
//! The upgrade task stays alive until the listener closes or the daemon shuts
//! down. Disconnect detection is the hub's job, not the handler's.

use std::net::SocketAddr;

use axum::extract::ws::{WebSocket, WebSocketUpgrade};
use axum::extract::{ConnectInfo, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use tokio::sync::mpsc;

use evhub_core::{EventFilter, ListenerOptions};
use evhub_infra::websocket::WsConnection;
use evhub_types::error::HubError;
use evhub_types::event::Event;

use crate::http::error::AppError;
use crate::state::AppState;

/// Query string shared by both stream endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct EventsQuery {
    /// Comma-separated event types. Absent or empty means all types.
    #[serde(rename = "type")]
    pub types: Option<String>,
    pub project: Option<String>,
}

impl EventsQuery {
    pub fn filter(&self) -> EventFilter {
        let filter = EventFilter::parse_types(self.types.as_deref().unwrap_or_default());
        match self.project.as_deref() {
            Some(project) if !project.is_empty() => filter.with_project(project),
            _ => filter,
        }
    }
}

/// GET /1.0/events
pub async fn stream_events(
    ws: WebSocketUpgrade,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    Query(query): Query<EventsQuery>,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    if state.hub.is_shutting_down() {
        return Err(HubError::ShuttingDown.into());
    }

    let filter = query.filter();
    Ok(ws
        .on_upgrade(move |socket| monitor(socket, remote, filter, state))
        .into_response())
}

async fn monitor(socket: WebSocket, remote: SocketAddr, filter: EventFilter, state: AppState) {
    let connection = WsConnection::new(socket, Some(remote));
    let listener = match state.hub.register(connection, ListenerOptions::new(filter)) {
        Ok(listener) => listener,
        Err(err) => {
            tracing::debug!(remote = %remote, error = %err, "Rejected event listener");
            return;
        }
    };

    listener.wait(&state.hub.shutdown_token()).await;
}

/// GET /1.0/events/relay
pub async fn relay_events(
    ws: WebSocketUpgrade,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    Query(query): Query<EventsQuery>,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    if state.hub.is_shutting_down() {
        return Err(HubError::ShuttingDown.into());
    }

    let filter = query.filter();
    Ok(ws
        .on_upgrade(move |socket| relay(socket, remote, filter, state))
        .into_response())
}

async fn relay(socket: WebSocket, remote: SocketAddr, filter: EventFilter, state: AppState) {
    let (tx, mut rx) = mpsc::channel(state.config.events.inbound_buffer.max(1));
    let connection = WsConnection::new(socket, Some(remote));
    let listener = match state
        .hub
        .register(connection, ListenerOptions::new(filter).with_inbound(tx))
    {
        Ok(listener) => listener,
        Err(err) => {
            tracing::debug!(remote = %remote, error = %err, "Rejected relay listener");
            return;
        }
    };

    let shutdown = state.hub.shutdown_token();
    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Some(event) => state.hub.publish_from(listener.id(), event),
                None => break,
            },
            _ = listener.wait(&shutdown) => break,
        }
    }
}

/// POST /1.0/events
pub async fn publish_event(
    State(state): State<AppState>,
    Json(event): Json<Event>,
) -> Result<impl IntoResponse, AppError> {
    if state.hub.is_shutting_down() {
        return Err(HubError::ShuttingDown.into());
    }

    tracing::debug!(event_type = %event.event_type, "Publishing event from HTTP");
    state.hub.publish(event);

    Ok((
        StatusCode::ACCEPTED,
        Json(serde_json::json!({ "status": "accepted" })),
    ))
}
