//! Listener introspection and forced disconnect.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use evhub_core::Listener;

use crate::http::error::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ListenerInfo {
    pub id: String,
    pub remote: Option<String>,
    /// Empty when the listener accepts every type.
    pub types: Vec<String>,
    pub project: Option<String>,
}

impl From<&Arc<Listener>> for ListenerInfo {
    fn from(listener: &Arc<Listener>) -> Self {
        Self {
            id: listener.id().to_string(),
            remote: listener.remote().map(|addr| addr.to_string()),
            types: listener
                .filter()
                .accepted_types()
                .map(str::to_string)
                .collect(),
            project: listener.filter().project().map(str::to_string),
        }
    }
}

/// GET /1.0/events/listeners
pub async fn list_listeners(State(state): State<AppState>) -> Json<Vec<ListenerInfo>> {
    let listeners = state
        .hub
        .listener_ids()
        .iter()
        .filter_map(|id| state.hub.listener(id))
        .map(|listener| ListenerInfo::from(&listener))
        .collect();
    Json(listeners)
}

/// GET /1.0/events/listeners/{id}
pub async fn get_listener(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ListenerInfo>, AppError> {
    state
        .hub
        .listener(&id)
        .map(|listener| Json(ListenerInfo::from(&listener)))
        .ok_or_else(|| AppError::NotFound(format!("listener '{id}' not found")))
}

/// DELETE /1.0/events/listeners/{id}
pub async fn disconnect_listener(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    if state.hub.unregister(&id).await {
        tracing::info!(listener = %id, "Event listener disconnected via API");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("listener '{id}' not found")))
    }
}
