//! WebSocket session against the Scribe v2 Realtime endpoint
//!
//! Lifecycle: connect (handshake + `session_started`), stream audio frames,
//! send `commit` on stop, close. Incoming events are parsed on a background
//! task and handed over an mpsc channel so the sender side never blocks on
//! the reader.
//!
//! Connection failures are terminal for the session: the app logs them and
//! the next hotkey press simply starts over. There is no reconnect logic.

use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::{
    connect_async_with_config,
    tungstenite::{client::IntoClientRequest, http::HeaderValue, Message},
    MaybeTlsStream, WebSocketStream,
};

use super::protocol::{ClientMessage, ServerMessage};
use super::StreamingError;

/// Timeout for the initial WebSocket handshake
const CONNECTION_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeout for the `session_started` acknowledgment
const SESSION_TIMEOUT: Duration = Duration::from_secs(5);

/// Capacity of the incoming-event channel
const EVENT_CHANNEL_CAPACITY: usize = 100;

type WsSink =
    futures_util::stream::SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

/// Handle to an open realtime transcription session
pub struct RealtimeSession {
    /// WebSocket write half for outgoing frames
    write: WsSink,
    /// Incoming events; `Some` until taken for concurrent processing
    events: Option<mpsc::Receiver<ServerMessage>>,
    /// Session id announced by the service
    session_id: String,
    /// Background reader (aborted on close/drop)
    receiver_task: tokio::task::JoinHandle<()>,
}

impl RealtimeSession {
    /// Open a session and wait until the service is ready for audio
    ///
    /// # Errors
    /// Returns error on handshake failure, rejected credentials, or a missing
    /// `session_started` acknowledgment. A single attempt is made.
    pub async fn connect(url: &str, api_key: &str) -> Result<Self, StreamingError> {
        let mut request = url
            .into_client_request()
            .map_err(|e| StreamingError::ConnectionFailed(e.to_string()))?;

        request.headers_mut().insert(
            "xi-api-key",
            HeaderValue::from_str(api_key)
                .map_err(|e| StreamingError::AuthenticationFailed(e.to_string()))?,
        );

        tracing::info!("connecting to realtime transcription endpoint");

        // Nagle disabled: audio frames are small and latency-sensitive
        let (ws_stream, _response) = timeout(
            CONNECTION_TIMEOUT,
            connect_async_with_config(request, None, true),
        )
        .await
        .map_err(|_| StreamingError::ConnectionFailed("connection timeout".to_owned()))?
        .map_err(|e| StreamingError::ConnectionFailed(e.to_string()))?;

        tracing::debug!("websocket open, waiting for session_started");

        let (write, mut read) = ws_stream.split();

        let session_id = timeout(SESSION_TIMEOUT, async {
            while let Some(msg_result) = read.next().await {
                match msg_result {
                    Ok(Message::Text(text)) => match serde_json::from_str::<ServerMessage>(&text) {
                        Ok(ServerMessage::SessionStarted { session_id }) => {
                            tracing::info!(session_id = %session_id, "realtime session started");
                            return Ok(session_id);
                        }
                        Ok(ServerMessage::Error { message, .. }) => {
                            return Err(StreamingError::AuthenticationFailed(message));
                        }
                        Ok(_) => {
                            tracing::debug!("ignoring message before session_started");
                        }
                        Err(e) => {
                            tracing::warn!("unparseable message during handshake: {}", e);
                        }
                    },
                    Ok(Message::Close(_)) => {
                        return Err(StreamingError::Disconnected(
                            "closed before session_started".to_owned(),
                        ));
                    }
                    Err(e) => {
                        return Err(StreamingError::ProtocolError(e.to_string()));
                    }
                    _ => {} // ping/pong/binary
                }
            }
            Err(StreamingError::Disconnected("stream ended".to_owned()))
        })
        .await
        .map_err(|_| StreamingError::ConnectionFailed("session_started timeout".to_owned()))??;

        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let receiver_task = tokio::spawn(async move {
            while let Some(msg_result) = read.next().await {
                match msg_result {
                    Ok(Message::Text(text)) => match serde_json::from_str::<ServerMessage>(&text) {
                        Ok(msg) => {
                            if event_tx.send(msg).await.is_err() {
                                tracing::debug!("event channel closed");
                                break;
                            }
                        }
                        Err(e) => {
                            tracing::warn!("unparseable server message: {}", e);
                        }
                    },
                    Ok(Message::Close(_)) => {
                        tracing::info!("websocket closed by server");
                        break;
                    }
                    Err(e) => {
                        tracing::warn!("websocket error: {}", e);
                        break;
                    }
                    _ => {} // ping/pong/binary
                }
            }
            tracing::debug!("receiver task exiting");
        });

        Ok(Self {
            write,
            events: Some(event_rx),
            session_id,
            receiver_task,
        })
    }

    /// Send one chunk of PCM16 audio
    ///
    /// # Errors
    /// Returns error if the frame cannot be serialized or the socket rejects it
    pub async fn send_audio(
        &mut self,
        samples: &[i16],
        sample_rate: u32,
    ) -> Result<(), StreamingError> {
        self.send_message(&ClientMessage::audio(samples, sample_rate))
            .await
    }

    /// Finalize the current utterance
    ///
    /// # Errors
    /// Returns error if the control frame cannot be sent
    pub async fn commit(&mut self) -> Result<(), StreamingError> {
        self.send_message(&ClientMessage::commit()).await
    }

    async fn send_message(&mut self, msg: &ClientMessage) -> Result<(), StreamingError> {
        let json =
            serde_json::to_string(msg).map_err(|e| StreamingError::ProtocolError(e.to_string()))?;

        self.write
            .send(Message::Text(json))
            .await
            .map_err(|e| StreamingError::SendFailed(e.to_string()))
    }

    /// Receive the next server event
    ///
    /// Returns `None` once the connection is closed or the receiver was taken.
    pub async fn recv(&mut self) -> Option<ServerMessage> {
        match self.events.as_mut() {
            Some(rx) => rx.recv().await,
            None => None,
        }
    }

    /// Take ownership of the event receiver for concurrent processing
    ///
    /// After this call `recv()` returns `None`.
    pub fn take_events(&mut self) -> Option<mpsc::Receiver<ServerMessage>> {
        self.events.take()
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Close the connection and stop the background reader
    pub async fn close(mut self) {
        tracing::info!(session_id = %self.session_id, "closing realtime session");

        self.receiver_task.abort();

        if let Err(e) = self.write.close().await {
            tracing::warn!("error closing websocket: {}", e);
        }
    }
}

impl Drop for RealtimeSession {
    fn drop(&mut self) {
        // Sessions dropped without close() must not leak the reader
        self.receiver_task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcription::protocol::endpoint_url;

    fn scribe_url() -> String {
        endpoint_url(
            "wss://api.elevenlabs.io/v1/speech-to-text/realtime",
            "scribe_v2_realtime",
            16_000,
        )
    }

    #[tokio::test]
    async fn test_connect_rejects_invalid_header_value() {
        // Header values may not contain newlines; fails before any I/O
        let result = RealtimeSession::connect(&scribe_url(), "bad\nkey").await;
        assert!(matches!(
            result,
            Err(StreamingError::AuthenticationFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_connect_rejects_malformed_url() {
        let result = RealtimeSession::connect("not a url", "key").await;
        assert!(matches!(result, Err(StreamingError::ConnectionFailed(_))));
    }

    #[tokio::test]
    #[ignore = "requires network access and a valid ELEVENLABS_API_KEY"]
    async fn test_realtime_roundtrip() {
        let api_key = std::env::var("ELEVENLABS_API_KEY").unwrap();

        let mut session = RealtimeSession::connect(&scribe_url(), &api_key)
            .await
            .unwrap();
        assert!(!session.session_id().is_empty());

        // 100ms of silence at 16kHz
        let silence = vec![0_i16; 1600];
        session.send_audio(&silence, 16_000).await.unwrap();
        session.commit().await.unwrap();

        session.close().await;
    }
}
