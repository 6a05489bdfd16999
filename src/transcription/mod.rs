/// Wire messages for the realtime endpoint
pub mod protocol;
/// WebSocket session lifecycle
pub mod realtime;
/// Partial/committed transcript reconciliation
pub mod transcript;

pub use protocol::{ClientMessage, ServerMessage};
pub use realtime::RealtimeSession;
pub use transcript::{edit_plan, EditPlan, TranscriptBuffer};

use thiserror::Error;

/// Errors from the streaming transcription path
#[derive(Debug, Clone, Error)]
pub enum StreamingError {
    /// Failed to establish the WebSocket connection
    #[error("failed to connect to transcription service: {0}")]
    ConnectionFailed(String),

    /// Credentials rejected by the service
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Malformed traffic in either direction
    #[error("websocket protocol error: {0}")]
    ProtocolError(String),

    /// Connection closed unexpectedly
    #[error("websocket disconnected: {0}")]
    Disconnected(String),

    /// Outgoing frame could not be sent
    #[error("failed to send audio: {0}")]
    SendFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_streaming_error_display() {
        let err = StreamingError::ConnectionFailed("timeout".to_owned());
        assert!(err.to_string().contains("timeout"));

        let err = StreamingError::AuthenticationFailed("invalid key".to_owned());
        assert!(err.to_string().contains("invalid key"));

        let err = StreamingError::SendFailed("broken pipe".to_owned());
        assert!(err.to_string().contains("broken pipe"));
    }
}
