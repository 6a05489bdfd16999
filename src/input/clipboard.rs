//! Clipboard-based text insertion
//!
//! Batch mode drops the whole transcript at the cursor in one paste: snapshot
//! the clipboard, put the transcript on it, press Cmd+V, wait for the target
//! app to read it, then put the snapshot back. The snapshot restore is skipped
//! when the clipboard held something unreadable as text (images etc. are not
//! preserved).

use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use super::cgevent;

/// Clipboard insertion errors
#[derive(Debug, Error)]
pub enum ClipboardError {
    /// Could not open a clipboard handle
    #[error("failed to access clipboard: {0}")]
    Access(String),

    /// Could not place text on the clipboard
    #[error("failed to write clipboard: {0}")]
    Write(String),

    /// The paste keystroke could not be posted
    #[error(transparent)]
    Keystroke(#[from] cgevent::TextInsertionError),
}

/// Paste `text` at the cursor, preserving the previous clipboard text
///
/// # Errors
/// Returns error if the clipboard is inaccessible or the keystroke fails;
/// callers fall back to simulated typing.
pub fn paste_text(text: &str, settle: Duration) -> Result<(), ClipboardError> {
    let mut clipboard =
        arboard::Clipboard::new().map_err(|e| ClipboardError::Access(e.to_string()))?;

    // Snapshot whatever the user had copied; non-text contents are lost
    let snapshot = match clipboard.get_text() {
        Ok(prev) => Some(prev),
        Err(e) => {
            debug!("clipboard snapshot unavailable: {}", e);
            None
        }
    };

    clipboard
        .set_text(text)
        .map_err(|e| ClipboardError::Write(e.to_string()))?;

    cgevent::paste_keystroke()?;

    // Give the frontmost app time to service the paste before the restore
    std::thread::sleep(settle);

    if let Some(prev) = snapshot {
        if let Err(e) = clipboard.set_text(prev) {
            warn!("failed to restore clipboard snapshot: {}", e);
        }
    }

    debug!(text_len = text.len(), "pasted text via clipboard");
    Ok(())
}
