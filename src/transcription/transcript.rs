//! Transcript state for one dictation session
//!
//! Partial transcripts may rewrite earlier words, so live typing cannot just
//! append. [`edit_plan`] computes the minimal keystroke sequence between what
//! is already on screen and what the service now believes was said: keep the
//! shared prefix, erase the divergent tail, type the remainder.

/// Minimal keystroke sequence turning one displayed string into another
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditPlan {
    /// Number of characters to erase from the end of the displayed text
    pub erase: usize,
    /// Text to type after erasing
    pub append: String,
}

impl EditPlan {
    pub fn is_noop(&self) -> bool {
        self.erase == 0 && self.append.is_empty()
    }
}

/// Compute the minimal edit from `displayed` to `target`
///
/// Characters (not bytes) are compared so erase counts map one-to-one onto
/// backspace keystrokes, including for multi-byte text.
pub fn edit_plan(displayed: &str, target: &str) -> EditPlan {
    let mut displayed_chars = displayed.chars();
    let mut target_chars = target.chars();
    let mut prefix_bytes = 0usize;
    let mut prefix_chars = 0usize;

    loop {
        match (displayed_chars.next(), target_chars.next()) {
            (Some(a), Some(b)) if a == b => {
                prefix_bytes += a.len_utf8();
                prefix_chars += 1;
            }
            _ => break,
        }
    }

    EditPlan {
        erase: displayed.chars().count() - prefix_chars,
        append: target[prefix_bytes..].to_owned(),
    }
}

/// Per-session transcript bookkeeping
///
/// Tracks what is currently typed on screen (streaming mode) and the latest
/// partial text (both modes). Cleared once the committed transcript has been
/// handled.
#[derive(Debug, Clone, Default)]
pub struct TranscriptBuffer {
    /// Text currently present at the user's cursor
    displayed: String,
    /// Most recent partial transcript from the service
    last_partial: String,
    /// Count of partial events processed
    partial_count: u64,
}

impl TranscriptBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a partial transcript and plan the on-screen update
    ///
    /// The returned plan moves the displayed text to `text`. Callers that do
    /// not type live (batch mode) can ignore it.
    pub fn on_partial(&mut self, text: &str) -> EditPlan {
        self.partial_count += 1;
        self.last_partial = text.to_owned();

        let plan = edit_plan(&self.displayed, text);
        if self.partial_count % 10 == 0 {
            tracing::debug!(
                partials = self.partial_count,
                displayed_chars = self.displayed.chars().count(),
                "transcript progress"
            );
        }
        plan
    }

    /// Record the committed transcript and plan the final reconciliation
    pub fn on_committed(&mut self, text: &str) -> EditPlan {
        tracing::info!(
            partials = self.partial_count,
            final_len = text.len(),
            "utterance committed"
        );
        edit_plan(&self.displayed, text)
    }

    /// Confirm that a plan was applied to the screen
    pub fn mark_applied(&mut self, target: &str) {
        self.displayed = target.to_owned();
    }

    /// Latest partial transcript (what batch mode shows in the console)
    pub fn last_partial(&self) -> &str {
        &self.last_partial
    }

    pub fn displayed(&self) -> &str {
        &self.displayed
    }

    pub fn has_text(&self) -> bool {
        !self.last_partial.is_empty() || !self.displayed.is_empty()
    }

    /// Reset for the next utterance
    pub fn clear(&mut self) {
        self.displayed.clear();
        self.last_partial.clear();
        self.partial_count = 0;
    }
}
