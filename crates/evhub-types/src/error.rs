use std::time::Duration;

use thiserror::Error;

/// Errors reported by a connection transport.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("connection closed")]
    Closed,

    #[error("transport I/O error: {0}")]
    Io(String),

    #[error("send deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),
}

/// Errors that terminate a listener. None of these are retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ListenerError {
    #[error("transport closed")]
    TransportClosed,

    #[error("malformed inbound frame: {0}")]
    DecodeFailure(String),

    #[error("write failed: {0}")]
    WriteFailure(String),

    #[error("heartbeat timed out")]
    HeartbeatTimeout,

    #[error("event encoding failed: {0}")]
    Encode(String),

    /// The listener's outbound queue is full; the peer is not keeping up.
    #[error("outbound queue full ({0} events pending)")]
    QueueFull(usize),
}

impl From<TransportError> for ListenerError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Closed => ListenerError::TransportClosed,
            other => ListenerError::WriteFailure(other.to_string()),
        }
    }
}

/// Errors from hub registration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HubError {
    #[error("event hub is shutting down")]
    ShuttingDown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error_display() {
        let err = TransportError::DeadlineExceeded(Duration::from_secs(5));
        assert_eq!(err.to_string(), "send deadline of 5s exceeded");
    }

    #[test]
    fn test_transport_closed_maps_to_listener_closed() {
        let err: ListenerError = TransportError::Closed.into();
        assert_eq!(err, ListenerError::TransportClosed);
    }

    #[test]
    fn test_listener_error_display() {
        assert_eq!(ListenerError::HeartbeatTimeout.to_string(), "heartbeat timed out");
        assert_eq!(
            ListenerError::QueueFull(256).to_string(),
            "outbound queue full (256 events pending)"
        );
    }

    #[test]
    fn test_transport_io_maps_to_write_failure() {
        let err: ListenerError = TransportError::Io("broken pipe".to_string()).into();
        assert_eq!(
            err.to_string(),
            "write failed: transport I/O error: broken pipe"
        );
    }
}
