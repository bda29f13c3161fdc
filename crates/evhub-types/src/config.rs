//! Daemon configuration types for evhub.
//!
//! `DaemonConfig` represents the `evhubd.toml` file that controls the listen
//! address, event dispatch gates and telemetry export. Heartbeat timing is not
//! configurable here; it is fixed in `evhub-core`.

use serde::{Deserialize, Serialize};

/// Top-level configuration for the `evhubd` daemon.
///
/// All sections and fields have sensible defaults, so an empty file is valid.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaemonConfig {
    #[serde(default)]
    pub listen: ListenConfig,

    #[serde(default)]
    pub events: EventsConfig,

    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Address the HTTP/WebSocket server binds to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListenConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8443
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Dispatch settings for the event hub.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventsConfig {
    /// Forward `logging` events of level `debug` (implies `verbose`).
    #[serde(default)]
    pub debug: bool,

    /// Forward `logging` events of level `info`.
    #[serde(default)]
    pub verbose: bool,

    /// Capacity of the bounded queue between a listener's reader task and
    /// its inbound event consumer.
    #[serde(default = "default_inbound_buffer")]
    pub inbound_buffer: usize,

    /// Events queued per listener while its writer is busy. A listener whose
    /// queue fills up is disconnected.
    #[serde(default = "default_outbound_buffer")]
    pub outbound_buffer: usize,
}

fn default_inbound_buffer() -> usize {
    64
}

fn default_outbound_buffer() -> usize {
    256
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            debug: false,
            verbose: false,
            inbound_buffer: default_inbound_buffer(),
            outbound_buffer: default_outbound_buffer(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Bridge tracing spans to OpenTelemetry (stdout exporter).
    #[serde(default)]
    pub otel: bool,
}
