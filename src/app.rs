//! Dictation controller
//!
//! Owns the start/stop toggle and the per-session pipeline. One session at a
//! time: a hotkey press while idle starts recording, a press while recording
//! stops it. The pipeline task forwards microphone chunks to the realtime
//! session and routes transcript events to the cursor, discarding anything
//! that belongs to a superseded session.

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

use crate::audio::{AudioCapture, ChunkSource};
use crate::config::{Config, InsertionMode, RecordingConfig};
use crate::input::{cgevent, clipboard};
use crate::recording_cleanup;
use crate::session::{SessionCounter, SessionToken};
use crate::sound::SoundCues;
use crate::transcription::{protocol, RealtimeSession, ServerMessage, TranscriptBuffer};

/// How long the stop path waits for the committed transcript
const FINALIZE_TIMEOUT: Duration = Duration::from_secs(5);

/// Seam between transcript routing and the actual keyboard/clipboard calls
///
/// Production uses [`CursorOutput`]; tests mock this to observe what would
/// have reached the screen.
#[cfg_attr(test, mockall::automock)]
pub trait TextOutput: Send + Sync {
    /// Erase `erase` characters, then type `append` at the cursor
    fn replace_tail(&self, erase: usize, append: &str) -> bool;

    /// Insert the full text via clipboard paste
    fn paste(&self, text: &str) -> bool;
}

/// CGEvent/clipboard-backed output
pub struct CursorOutput {
    paste_settle: Duration,
}

impl CursorOutput {
    pub fn new(paste_settle: Duration) -> Self {
        Self { paste_settle }
    }
}

impl TextOutput for CursorOutput {
    fn replace_tail(&self, erase: usize, append: &str) -> bool {
        if let Err(e) = cgevent::erase_chars(erase) {
            error!(error = %e, "failed to erase superseded text");
            return false;
        }
        if append.is_empty() {
            return true;
        }
        cgevent::type_text_safe(append)
    }

    fn paste(&self, text: &str) -> bool {
        match clipboard::paste_text(text, self.paste_settle) {
            Ok(()) => true,
            Err(e) => {
                // Same fallback as the clipboardless case: just type it
                warn!(error = %e, "clipboard paste failed, falling back to typing");
                cgevent::type_text_safe(text)
            }
        }
    }
}

/// Routes transcript events for one session to the output
///
/// Every event is validated against the session token first; a stale token
/// means a newer session owns the cursor and the event is dropped.
struct TranscriptRouter {
    token: SessionToken,
    mode: InsertionMode,
    buffer: TranscriptBuffer,
    output: Arc<dyn TextOutput>,
}

impl TranscriptRouter {
    fn new(token: SessionToken, mode: InsertionMode, output: Arc<dyn TextOutput>) -> Self {
        Self {
            token,
            mode,
            buffer: TranscriptBuffer::new(),
            output,
        }
    }

    /// Handle one server event; returns true once the committed transcript
    /// has been dealt with
    fn handle(&mut self, msg: ServerMessage) -> bool {
        match msg {
            ServerMessage::SessionStarted { session_id } => {
                info!(session_id = %session_id, "transcription session ready");
                false
            }
            ServerMessage::PartialTranscript { text } => {
                self.on_partial(text.trim());
                false
            }
            ServerMessage::CommittedTranscript { text } => {
                self.on_committed(text.trim());
                true
            }
            ServerMessage::Error { code, message } => {
                error!(code = ?code, "transcription error: {}", message);
                false
            }
            ServerMessage::Unknown => {
                debug!("ignoring unknown server message");
                false
            }
        }
    }

    fn on_partial(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if !self.token.is_current() {
            debug!(session = self.token.id(), "dropping stale partial transcript");
            return;
        }

        let plan = self.buffer.on_partial(text);
        match self.mode {
            InsertionMode::Streaming => {
                if !plan.is_noop() && self.output.replace_tail(plan.erase, &plan.append) {
                    self.buffer.mark_applied(text);
                }
                info!("streaming: {}", cgevent::generate_text_preview(text));
            }
            InsertionMode::Batch => {
                info!("processing: {}", cgevent::generate_text_preview(text));
            }
        }
    }

    fn on_committed(&mut self, text: &str) {
        if !self.token.is_current() {
            warn!(
                session = self.token.id(),
                "discarding committed transcript from superseded session"
            );
            return;
        }
        if text.is_empty() {
            // Nothing recognized; make sure no half-typed partial lingers
            let displayed_chars = self.buffer.displayed().chars().count();
            if self.mode == InsertionMode::Streaming && displayed_chars > 0 {
                let _ = self.output.replace_tail(displayed_chars, "");
            }
            self.buffer.clear();
            return;
        }

        let plan = self.buffer.on_committed(text);
        match self.mode {
            InsertionMode::Streaming => {
                if !plan.is_noop() && self.output.replace_tail(plan.erase, &plan.append) {
                    self.buffer.mark_applied(text);
                }
                info!("final: {}", cgevent::generate_text_preview(text));
            }
            InsertionMode::Batch => {
                if self.output.paste(text) {
                    info!("pasted: {}", cgevent::generate_text_preview(text));
                }
            }
        }
        self.buffer.clear();
    }
}

/// Everything a session task needs, detached from the controller
#[derive(Clone)]
struct SessionRuntime {
    endpoint: String,
    model_id: String,
    api_key: String,
    sample_rate: u32,
    chunk_interval: Duration,
    mode: InsertionMode,
    chunks: ChunkSource,
    output: Arc<dyn TextOutput>,
    recording: RecordingConfig,
    active: Arc<Mutex<Option<ActiveSession>>>,
}

struct ActiveSession {
    token: SessionToken,
    stop_tx: oneshot::Sender<()>,
}

/// The start/stop toggle and session owner
pub struct DictationController {
    runtime: SessionRuntime,
    sessions: SessionCounter,
    cues: SoundCues,
}

impl DictationController {
    pub fn new(config: &Config, api_key: String, chunks: ChunkSource) -> Self {
        let output: Arc<dyn TextOutput> = Arc::new(CursorOutput::new(Duration::from_millis(
            config.insertion.paste_settle_ms,
        )));

        Self {
            runtime: SessionRuntime {
                endpoint: config.api.endpoint.clone(),
                model_id: config.api.model_id.clone(),
                api_key,
                sample_rate: config.audio.sample_rate,
                chunk_interval: Duration::from_millis(config.audio.chunk_interval_ms),
                mode: config.insertion.mode,
                chunks,
                output,
                recording: config.recording.clone(),
                active: Arc::new(Mutex::new(None)),
            },
            sessions: SessionCounter::new(),
            cues: SoundCues::new(&config.sound),
        }
    }

    /// Hotkey handler: start when idle, stop when recording
    ///
    /// The active-slot mutex is the only guard against overlapping toggles;
    /// everything slow runs on the spawned session task.
    pub fn toggle(&self, capture: &mut AudioCapture) {
        let mut active = self.runtime.active.lock().unwrap();

        if let Some(session) = active.take() {
            drop(active);
            self.stop_session(capture, session);
        } else {
            let token = self.sessions.begin();
            info!(session = token.id(), "starting dictation session");

            if let Err(e) = capture.start_recording() {
                error!("failed to start microphone capture: {}", e);
                return;
            }

            self.cues.play_start();

            let (stop_tx, stop_rx) = oneshot::channel();
            *active = Some(ActiveSession {
                token: token.clone(),
                stop_tx,
            });
            drop(active);

            tokio::spawn(run_session(self.runtime.clone(), token, stop_rx));
        }
    }

    /// Stop the live session if there is one (used by the Ctrl-C path)
    pub fn stop_if_active(&self, capture: &mut AudioCapture) {
        let taken = self.runtime.active.lock().unwrap().take();
        if let Some(session) = taken {
            self.stop_session(capture, session);
        }
    }

    fn stop_session(&self, capture: &mut AudioCapture, session: ActiveSession) {
        info!(session = session.token.id(), "stopping dictation session");

        if let Err(e) = capture.stop_recording() {
            warn!("failed to pause microphone capture: {}", e);
        }

        self.cues.play_stop();

        // The session task finalizes in the background; a fresh session can
        // start immediately and staleness takes care of the rest
        if session.stop_tx.send(()).is_err() {
            debug!("session task already gone");
        }
    }
}

/// Release the active slot if it still belongs to `token`
///
/// Used by the failure paths inside the session task; the normal stop path
/// clears the slot in `toggle()`.
fn release_slot(active: &Arc<Mutex<Option<ActiveSession>>>, token: &SessionToken) {
    let mut slot = active.lock().unwrap();
    if slot.as_ref().is_some_and(|s| s.token.id() == token.id()) {
        *slot = None;
    }
}

/// One dictation session from connect to close
async fn run_session(
    runtime: SessionRuntime,
    token: SessionToken,
    mut stop_rx: oneshot::Receiver<()>,
) {
    let url = protocol::endpoint_url(&runtime.endpoint, &runtime.model_id, runtime.sample_rate);

    let mut session = match RealtimeSession::connect(&url, &runtime.api_key).await {
        Ok(session) => session,
        Err(e) => {
            error!("could not reach transcription service: {}", e);
            release_slot(&runtime.active, &token);
            return;
        }
    };

    let Some(mut events) = session.take_events() else {
        error!("event receiver unavailable");
        session.close().await;
        release_slot(&runtime.active, &token);
        return;
    };

    let mut router = TranscriptRouter::new(token.clone(), runtime.mode, Arc::clone(&runtime.output));
    let mut captured: Vec<i16> = Vec::new();
    let mut ticker = tokio::time::interval(runtime.chunk_interval);

    // Pump audio out and events in until the hotkey stops us
    loop {
        tokio::select! {
            _ = &mut stop_rx => {
                break;
            }
            _ = ticker.tick() => {
                let chunk = runtime.chunks.drain_pcm16();
                if chunk.is_empty() {
                    continue;
                }
                if runtime.recording.save_debug_wav {
                    captured.extend_from_slice(&chunk);
                }
                if let Err(e) = session.send_audio(&chunk, runtime.sample_rate).await {
                    warn!("audio send failed: {}", e);
                }
            }
            event = events.recv() => {
                match event {
                    Some(msg) => { router.handle(msg); }
                    None => {
                        warn!("server closed the connection mid-session");
                        session.close().await;
                        release_slot(&runtime.active, &token);
                        return;
                    }
                }
            }
        }
    }

    // Capture is already paused; flush whatever it buffered before the pause
    let tail = runtime.chunks.drain_pcm16();
    if !tail.is_empty() {
        if runtime.recording.save_debug_wav {
            captured.extend_from_slice(&tail);
        }
        if let Err(e) = session.send_audio(&tail, runtime.sample_rate).await {
            warn!("failed to send trailing audio: {}", e);
        }
    }

    if let Err(e) = session.commit().await {
        warn!("failed to commit utterance: {}", e);
    }

    // Bounded wait for the committed transcript so the final text still lands
    let deadline = tokio::time::Instant::now() + FINALIZE_TIMEOUT;
    loop {
        match tokio::time::timeout_at(deadline, events.recv()).await {
            Ok(Some(msg)) => {
                if router.handle(msg) {
                    break;
                }
            }
            Ok(None) => {
                warn!("connection closed before the committed transcript arrived");
                break;
            }
            Err(_) => {
                warn!("timed out waiting for the committed transcript");
                break;
            }
        }
    }

    session.close().await;

    if runtime.recording.save_debug_wav && !captured.is_empty() {
        match recording_cleanup::dump_path(&runtime.recording) {
            Ok(path) => {
                if let Err(e) = AudioCapture::save_wav_debug(&captured, runtime.sample_rate, &path)
                {
                    warn!("failed to save session recording: {}", e);
                }
            }
            Err(e) => warn!("failed to resolve recording path: {}", e),
        }
    }

    info!(session = token.id(), "session finished");
}
