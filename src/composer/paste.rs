//! Paste classification.
//!
//! A paste carries zero or more typed clipboard items plus an optional plain
//! text payload. Image items become attachments; text is either inserted as
//! is or, when it would blow out the collapsed view, wrapped in snippet
//! markers so it renders as a foldable block.

use crate::snippet::SnippetMarkers;

/// Columns per row assumed when sizing a paste by length.
pub const CHARS_PER_ROW: usize = 80;

/// One typed item from the clipboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipboardItem {
    pub mime_type: String,
    pub data: Vec<u8>,
    pub name: Option<String>,
}

impl ClipboardItem {
    #[must_use]
    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PasteEvent {
    pub items: Vec<ClipboardItem>,
    /// None when the clipboard had no text (or could not be read).
    pub text: Option<String>,
}

impl PasteEvent {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            items: Vec::new(),
            text: Some(text.into()),
        }
    }

    #[must_use]
    pub fn with_item(mut self, item: ClipboardItem) -> Self {
        self.items.push(item);
        self
    }
}

/// What to do with the text part of a paste.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextPaste {
    /// Insert unmodified.
    Native,
    /// Insert this wrapped form instead.
    Wrap(String),
}

/// Too tall (`newlines >= max_rows`) or too long (`chars > 80 × max_rows`)
/// for the collapsed view.
#[must_use]
pub fn is_oversized(text: &str, max_rows: usize) -> bool {
    let newlines = text.matches('\n').count();
    newlines >= max_rows || text.chars().count() > CHARS_PER_ROW * max_rows
}

/// Decide how to insert pasted text.
///
/// Text that already contains a marker is left alone so existing snippets are
/// never nested or corrupted.
#[must_use]
pub fn classify_text(text: &str, markers: &SnippetMarkers, max_rows: usize) -> TextPaste {
    if markers.appear_in(text) {
        return TextPaste::Native;
    }
    if is_oversized(text, max_rows) {
        TextPaste::Wrap(markers.wrap(text))
    } else {
        TextPaste::Native
    }
}
