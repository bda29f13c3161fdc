//! Axum router configuration with middleware.
//!
//! Routes:
//! - `GET  /1.0/events`                  WebSocket event stream (monitor)
//! - `POST /1.0/events`                  publish one event
//! - `GET  /1.0/events/relay`            WebSocket stream that also accepts events
//! - `GET  /1.0/events/listeners`        registered listeners
//! - `GET|DELETE /1.0/events/listeners/{id}`
//! - `GET  /health`
//!
//! The router must be served with
//! `into_make_service_with_connect_info::<SocketAddr>()` so stream handlers
//! can record the peer address.

use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let event_routes = Router::new()
        .route(
            "/events",
            get(handlers::events::stream_events).post(handlers::events::publish_event),
        )
        .route("/events/relay", get(handlers::events::relay_events))
        .route(
            "/events/listeners",
            get(handlers::listeners::list_listeners),
        )
        .route(
            "/events/listeners/{id}",
            get(handlers::listeners::get_listener)
                .delete(handlers::listeners::disconnect_listener),
        );

    Router::new()
        .nest("/1.0", event_routes)
        .route("/health", get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health
async fn health_check(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": if state.hub.is_shutting_down() { "shutting_down" } else { "ok" },
        "version": env!("CARGO_PKG_VERSION"),
        "listeners": state.hub.listener_count(),
    }))
}
