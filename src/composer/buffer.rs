use ropey::Rope;

/// Undo depth for the input primitive.
const UNDO_LIMIT: usize = 200;

/// Text storage for the composer.
///
/// Backed by a Rope (via `ropey`). Undo snapshots are rope clones, which
/// share structure, so taking one per edit is cheap.
#[derive(Debug, Clone, Default)]
pub struct ComposerBuffer {
    rope: Rope,
    undo: Vec<Rope>,
}

impl ComposerBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a character at the given character index, clamped to buffer boundaries.
    pub fn insert_char(&mut self, char_idx: usize, ch: char) {
        let idx = char_idx.min(self.rope.len_chars());
        self.rope.insert_char(idx, ch);
    }

    /// Insert a string at the given character index, clamped to buffer boundaries.
    pub fn insert_str(&mut self, char_idx: usize, text: &str) {
        let idx = char_idx.min(self.rope.len_chars());
        self.rope.insert(idx, text);
    }

    /// Remove a range of characters. Out-of-range ends are clamped.
    pub fn remove_range(&mut self, range: std::ops::Range<usize>) {
        let start = range.start.min(self.rope.len_chars());
        let end = range.end.min(self.rope.len_chars());
        if start < end {
            self.rope.remove(start..end);
        }
    }

    #[must_use]
    pub fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rope.len_chars() == 0
    }

    /// True when the content is empty after trimming whitespace.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.rope.chars().all(char::is_whitespace)
    }

    #[must_use]
    pub fn len_lines(&self) -> usize {
        self.rope.len_lines()
    }

    /// Clear the content. Undo history is kept; see [`Self::clear_undo`].
    pub fn clear(&mut self) {
        self.rope = Rope::new();
    }

    #[must_use]
    pub fn get_content(&self) -> String {
        self.rope.to_string()
    }

    pub fn set_content(&mut self, text: &str) {
        self.rope = Rope::from_str(text);
    }

    #[must_use]
    pub fn rope(&self) -> &Rope {
        &self.rope
    }

    /// The character at `char_idx`, if any.
    #[must_use]
    pub fn char_at(&self, char_idx: usize) -> Option<char> {
        (char_idx < self.rope.len_chars()).then(|| self.rope.char(char_idx))
    }

    /// Copy a character range out as a String.
    #[must_use]
    pub fn slice_to_string(&self, range: std::ops::Range<usize>) -> String {
        let len = self.rope.len_chars();
        let start = range.start.min(len);
        let end = range.end.min(len).max(start);
        self.rope.slice(start..end).to_string()
    }

    #[must_use]
    pub fn line_to_char(&self, line_idx: usize) -> usize {
        self.rope
            .line_to_char(line_idx.min(self.rope.len_lines().saturating_sub(1)))
    }

    #[must_use]
    pub fn char_to_line(&self, char_idx: usize) -> usize {
        self.rope.char_to_line(char_idx.min(self.rope.len_chars()))
    }

    /// Record the current content so the next edit can be undone.
    pub fn snapshot(&mut self) {
        self.push_undo(self.rope.clone());
    }

    /// Record an earlier state of the content as an undo step.
    pub fn push_undo(&mut self, rope: Rope) {
        if self.undo.len() == UNDO_LIMIT {
            self.undo.remove(0);
        }
        self.undo.push(rope);
    }

    /// Restore the most recent snapshot. Returns false when there is none.
    pub fn undo(&mut self) -> bool {
        match self.undo.pop() {
            Some(rope) => {
                self.rope = rope;
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    /// Forget all undo snapshots.
    pub fn clear_undo(&mut self) {
        self.undo.clear();
    }
}
