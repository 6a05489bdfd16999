use core_graphics::event::{CGEvent, CGEventFlags, CGEventTapLocation, CGKeyCode};
use core_graphics::event_source::{CGEventSource, CGEventSourceStateID};
use thiserror::Error;
use tracing::{debug, error, info};

/// ANSI keycode for the V key
const KEYCODE_V: CGKeyCode = 9;
/// ANSI keycode for delete (backspace)
const KEYCODE_DELETE: CGKeyCode = 51;

/// Generate preview of text for logging (pure, testable)
///
/// Truncates text >50 chars with "..." suffix. Respects UTF-8 char boundaries.
#[must_use]
pub fn generate_text_preview(text: &str) -> String {
    if text.len() > 50 {
        // Find char boundary at or before byte 47
        let mut end = 47.min(text.len());
        while end > 0 && !text.is_char_boundary(end) {
            end -= 1;
        }
        if end == 0 {
            return "...".to_owned();
        }
        format!("{}...", &text[..end])
    } else {
        text.to_owned()
    }
}

/// Text insertion errors
#[derive(Debug, Error)]
pub enum TextInsertionError {
    /// Failed to create `CGEvent` source
    #[error("failed to create CGEvent source")]
    EventSourceCreation,

    /// Failed to create keyboard `CGEvent`
    #[error("failed to create keyboard CGEvent")]
    EventCreation,

    /// Text is empty
    #[error("text is empty")]
    EmptyText,
}

fn event_source() -> Result<CGEventSource, TextInsertionError> {
    CGEventSource::new(CGEventSourceStateID::HIDSystemState).map_err(|()| {
        error!("CGEventSource creation failed - Input Monitoring permission may have been revoked");
        TextInsertionError::EventSourceCreation
    })
}

/// Types text at the current cursor position using the `CGEvent` API
///
/// # Errors
/// Returns error if `CGEvent` creation fails or text is empty.
///
/// # Implementation
/// Uses `CGEventKeyboardSetUnicodeString` to carry the whole string on a
/// single keyboard event. Requires Input Monitoring permission (verified at
/// app startup).
///
/// # Known Limitations
/// - `event.post()` does not return errors - if insertion fails silently,
///   check System Settings → Privacy & Security → Input Monitoring
/// - Apps with secure input enabled (e.g. password fields) block it
pub fn type_text(text: &str) -> Result<(), TextInsertionError> {
    if text.is_empty() {
        return Err(TextInsertionError::EmptyText);
    }

    let source = event_source()?;

    let event = CGEvent::new_keyboard_event(source, 0, true)
        .map_err(|()| TextInsertionError::EventCreation)?;

    // SAFETY contract of set_string_from_utf16_unchecked: the slice must be
    // valid UTF-16. encode_utf16() on &str never produces unpaired surrogates.
    let utf16: Vec<u16> = text.encode_utf16().collect();
    event.set_string_from_utf16_unchecked(&utf16);

    event.post(CGEventTapLocation::HID);

    info!(
        text_len = text.len(),
        text_preview = %generate_text_preview(text),
        "typed text at cursor"
    );

    Ok(())
}

/// Erase `count` characters before the cursor with backspace keystrokes
///
/// # Errors
/// Returns error if `CGEvent` creation fails
pub fn erase_chars(count: usize) -> Result<(), TextInsertionError> {
    if count == 0 {
        return Ok(());
    }

    let source = event_source()?;

    for _ in 0..count {
        let down = CGEvent::new_keyboard_event(source.clone(), KEYCODE_DELETE, true)
            .map_err(|()| TextInsertionError::EventCreation)?;
        let up = CGEvent::new_keyboard_event(source.clone(), KEYCODE_DELETE, false)
            .map_err(|()| TextInsertionError::EventCreation)?;
        down.post(CGEventTapLocation::HID);
        up.post(CGEventTapLocation::HID);
    }

    debug!(count, "erased characters");
    Ok(())
}

/// Press Cmd+V to paste whatever is on the clipboard
///
/// # Errors
/// Returns error if `CGEvent` creation fails
pub fn paste_keystroke() -> Result<(), TextInsertionError> {
    let source = event_source()?;

    let down = CGEvent::new_keyboard_event(source.clone(), KEYCODE_V, true)
        .map_err(|()| TextInsertionError::EventCreation)?;
    down.set_flags(CGEventFlags::CGEventFlagCommand);
    let up = CGEvent::new_keyboard_event(source, KEYCODE_V, false)
        .map_err(|()| TextInsertionError::EventCreation)?;
    up.set_flags(CGEventFlags::CGEventFlagCommand);

    down.post(CGEventTapLocation::HID);
    up.post(CGEventTapLocation::HID);

    debug!("posted paste keystroke");
    Ok(())
}

/// Attempts to type text, logging errors without panicking
///
/// Errors are logged to telemetry but do not crash the app.
pub fn type_text_safe(text: &str) -> bool {
    match type_text(text) {
        Ok(()) => true,
        Err(e) => {
            error!(error = %e, text_len = text.len(), "text insertion failed");
            false
        }
    }
}
