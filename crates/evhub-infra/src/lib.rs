//! Concrete adapters for the ports defined in `evhub-core`.

pub mod config;
pub mod websocket;
