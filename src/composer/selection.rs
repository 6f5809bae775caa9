//! Selection offsets and the tracker that keeps them across focus loss.

/// A character range into the buffer, `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Selection {
    pub start: usize,
    pub end: usize,
}

impl Selection {
    /// Build from two offsets in either order.
    #[must_use]
    pub fn new(a: usize, b: usize) -> Self {
        Self {
            start: a.min(b),
            end: a.max(b),
        }
    }

    /// A collapsed selection at `pos`.
    #[must_use]
    pub fn caret(pos: usize) -> Self {
        Self {
            start: pos,
            end: pos,
        }
    }

    #[must_use]
    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    #[must_use]
    pub fn range(&self) -> std::ops::Range<usize> {
        self.start..self.end
    }

    /// Shrink both ends into `0..=len`.
    #[must_use]
    pub fn clamp(self, len: usize) -> Self {
        Self::new(self.start.min(len), self.end.min(len))
    }
}

/// A selection that keeps its direction: `anchor` is where it started,
/// `cursor` is the end that moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Anchored {
    pub anchor: usize,
    pub cursor: usize,
}

impl Anchored {
    #[must_use]
    pub fn selection(self) -> Selection {
        Selection::new(self.anchor, self.cursor)
    }

    #[must_use]
    pub fn clamp(self, len: usize) -> Self {
        Self {
            anchor: self.anchor.min(len),
            cursor: self.cursor.min(len),
        }
    }
}

/// Forward selection: cursor at `end`.
impl From<Selection> for Anchored {
    fn from(selection: Selection) -> Self {
        Self {
            anchor: selection.start,
            cursor: selection.end,
        }
    }
}

/// Remembers the last selection captured before focus moved away.
#[derive(Debug, Clone, Default)]
pub struct SelectionTracker {
    saved: Option<Anchored>,
}

impl SelectionTracker {
    pub fn capture(&mut self, selection: Anchored) {
        self.saved = Some(selection);
    }

    #[must_use]
    pub fn saved(&self) -> Option<Selection> {
        self.saved.map(Anchored::selection)
    }

    /// Take the saved selection, clamped to the current buffer length.
    pub fn take(&mut self, len: usize) -> Option<Anchored> {
        self.saved.take().map(|s| s.clamp(len))
    }
}
