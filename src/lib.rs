//! Scribe Hotkey - macOS push-to-toggle dictation
//!
//! A global hotkey starts and stops microphone capture; audio is streamed to
//! the Scribe v2 Realtime speech-to-text endpoint and the transcript lands at
//! the cursor, typed live (streaming mode) or pasted once committed (batch
//! mode). This library exports the modules for testing.

/// Dictation controller and session pipeline
pub mod app;
/// Audio capture and sample conversion
pub mod audio;
/// Configuration management
pub mod config;
/// Input handling (hotkeys, text insertion)
pub mod input;
/// macOS permission checks
pub mod permissions;
/// Debug recording retention
pub mod recording_cleanup;
/// Session identity and staleness
pub mod session;
/// Start/stop sound cues
pub mod sound;
/// Telemetry and logging
pub mod telemetry;
/// Realtime transcription client
pub mod transcription;
