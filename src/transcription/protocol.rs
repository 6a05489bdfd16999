//! Scribe v2 Realtime wire messages
//!
//! JSON message types exchanged with the ElevenLabs speech-to-text WebSocket.
//!
//! # Protocol Overview
//!
//! 1. Connect to the realtime endpoint; session options ride in the query
//!    string, the API key in the `xi-api-key` header
//! 2. Receive `session_started`
//! 3. Stream base64-encoded PCM16 chunks
//! 4. Receive `partial_transcript` events while speaking
//! 5. Send a `commit` control frame on stop
//! 6. Receive the `committed_transcript` for the finished utterance

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};

/// Build the connection URL for a realtime session
///
/// Commit strategy is always manual: the hotkey decides when an utterance
/// ends, not server-side voice activity detection.
pub fn endpoint_url(base: &str, model_id: &str, sample_rate: u32) -> String {
    format!(
        "{base}?model_id={model_id}&audio_format=pcm_{sample_rate}&commit_strategy=manual&include_timestamps=false"
    )
}

// ============================================================================
// Client Messages (sent TO the service)
// ============================================================================

/// Messages sent from client to the realtime endpoint
///
/// Audio frames carry no type tag (the payload keys identify them); control
/// frames are tagged.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ClientMessage {
    /// One chunk of microphone audio
    Audio {
        /// Base64-encoded little-endian PCM16 samples
        audio_base_64: String,
        /// Sample rate of the encoded chunk in Hz
        sample_rate: u32,
    },
    /// Control frame
    Control {
        #[serde(rename = "type")]
        kind: ControlKind,
    },
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ControlKind {
    /// Finalize the current utterance
    Commit,
}

impl ClientMessage {
    /// Create an audio message from raw PCM16 samples
    pub fn audio(samples: &[i16], sample_rate: u32) -> Self {
        let bytes: Vec<u8> = samples.iter().flat_map(|&s| s.to_le_bytes()).collect();

        Self::Audio {
            audio_base_64: STANDARD.encode(&bytes),
            sample_rate,
        }
    }

    /// Create the commit control frame
    pub fn commit() -> Self {
        Self::Control {
            kind: ControlKind::Commit,
        }
    }
}

// ============================================================================
// Server Messages (received FROM the service)
// ============================================================================

/// Messages received from the realtime endpoint
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// The session is open and ready for audio
    SessionStarted {
        #[serde(default)]
        session_id: String,
    },

    /// In-progress transcript; may be superseded by later output
    PartialTranscript {
        #[serde(default)]
        text: String,
    },

    /// Final transcript for the committed utterance
    CommittedTranscript {
        #[serde(default)]
        text: String,
    },

    /// Service-side error
    Error {
        #[serde(default)]
        code: Option<String>,
        #[serde(default)]
        message: String,
    },

    /// Catch-all so unknown message types don't kill deserialization
    #[serde(other)]
    Unknown,
}

impl ServerMessage {
    pub fn is_error(&self) -> bool {
        matches!(self, ServerMessage::Error { .. })
    }

    /// Transcript text, if this message carries any
    pub fn text(&self) -> Option<&str> {
        match self {
            ServerMessage::PartialTranscript { text }
            | ServerMessage::CommittedTranscript { text } => Some(text),
            _ => None,
        }
    }
}
