//! Accumulator for incremental completion fragments.
//!
//! One accumulator is created per streamed call, folded over the
//! fragments as they arrive, and consumed by `finish()` once the stream
//! signals completion. Nothing outlives the call that created it.

#[derive(Debug, Default)]
pub struct StreamAccumulator {
    text: String,
    fragments: usize,
}

impl StreamAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one fragment. Empty fragments are counted but add nothing.
    pub fn push(&mut self, fragment: &str) {
        self.text.push_str(fragment);
        self.fragments += 1;
    }

    /// Fold step: consume `self`, append `fragment`, return the accumulator.
    pub fn fold(mut self, fragment: &str) -> Self {
        self.push(fragment);
        self
    }

    /// Text received so far.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn fragment_count(&self) -> usize {
        self.fragments
    }

    /// Finalize into the full text, trimmed of surrounding whitespace.
    pub fn finish(self) -> String {
        let trimmed = self.text.trim();
        if trimmed.len() == self.text.len() {
            self.text
        } else {
            trimmed.to_string()
        }
    }
}

/// Split a complete, non-streamed text into display chunks.
///
/// Chunks are paragraph-sized and concatenate back to the original.
pub fn chunk_paragraphs(text: &str) -> Vec<&str> {
    text.split_inclusive("\n\n").filter(|c| !c.is_empty()).collect()
}
