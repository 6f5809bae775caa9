use super::buffer::ComposerBuffer;
use super::selection::{Anchored, Selection};
use super::wrap::{locate, row_count, wrap_lines};
use unicode_segmentation::UnicodeSegmentation;

/// Cursor, selection anchor and scroll for the input primitive.
///
/// The selection runs between `anchor` and `cursor`; when they are equal the
/// selection is collapsed to a caret.
#[derive(Debug, Clone, Default)]
pub struct ComposerState {
    cursor: usize,
    anchor: usize,
    /// First visible row when the content is taller than the widget.
    scroll_offset: usize,
    /// Cursor (x, y) relative to the text area, set by the last layout pass.
    pub cursor_pos: (u16, u16),
    /// Width used by the last layout pass; 0 until the first one.
    last_width: usize,
    /// Column kept across vertical moves over shorter lines.
    preferred_col: Option<usize>,
}

impl ComposerState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    #[must_use]
    pub fn selection(&self) -> Selection {
        Selection::new(self.anchor, self.cursor)
    }

    /// Selection with its direction.
    #[must_use]
    pub fn anchored(&self) -> Anchored {
        Anchored {
            anchor: self.anchor,
            cursor: self.cursor,
        }
    }

    /// Place the selection; the cursor ends up at `selection.end`.
    pub fn set_selection(&mut self, selection: Selection, max_len: usize) {
        self.restore(selection.into(), max_len);
    }

    /// Put back a captured selection, cursor on the side it was on.
    pub fn restore(&mut self, selection: Anchored, max_len: usize) {
        let selection = selection.clamp(max_len);
        self.anchor = selection.anchor;
        self.cursor = selection.cursor;
        self.preferred_col = None;
    }

    pub fn set_cursor(&mut self, idx: usize, max_len: usize) {
        self.set_selection(Selection::caret(idx), max_len);
    }

    /// Move the cursor, dragging the anchor along unless extending.
    fn move_to(&mut self, idx: usize, extend: bool) {
        self.cursor = idx;
        if !extend {
            self.anchor = idx;
        }
    }

    pub fn select_all(&mut self, buffer: &ComposerBuffer) {
        self.anchor = 0;
        self.cursor = buffer.len_chars();
    }

    pub fn move_to_start(&mut self) {
        self.move_to(0, false);
    }

    pub fn move_to_end(&mut self, buffer: &ComposerBuffer) {
        self.move_to(buffer.len_chars(), false);
    }

    fn line_start(&self, buffer: &ComposerBuffer) -> usize {
        buffer.line_to_char(buffer.char_to_line(self.cursor))
    }

    fn line_end(&self, buffer: &ComposerBuffer) -> usize {
        let len = buffer.len_chars();
        let line_idx = buffer.char_to_line(self.cursor);
        let next = if line_idx + 1 < buffer.len_lines() {
            buffer.line_to_char(line_idx + 1)
        } else {
            len
        };
        if next > 0 && buffer.char_at(next - 1) == Some('\n') {
            next - 1
        } else {
            next
        }
    }

    pub fn move_to_line_start(&mut self, buffer: &ComposerBuffer, extend: bool) {
        let idx = self.line_start(buffer);
        self.move_to(idx, extend);
    }

    pub fn move_to_line_end(&mut self, buffer: &ComposerBuffer, extend: bool) {
        let idx = self.line_end(buffer);
        self.move_to(idx, extend);
    }

    /// Char count of the grapheme cluster ending at the cursor.
    fn grapheme_before(&self, buffer: &ComposerBuffer) -> usize {
        let start = self.cursor.saturating_sub(10);
        let prefix = buffer.slice_to_string(start..self.cursor);
        prefix
            .graphemes(true)
            .next_back()
            .map_or(1, |g| g.chars().count())
    }

    /// Char count of the grapheme cluster starting at the cursor.
    fn grapheme_after(&self, buffer: &ComposerBuffer) -> usize {
        let suffix = buffer.slice_to_string(self.cursor..self.cursor + 10);
        suffix
            .graphemes(true)
            .next()
            .map_or(1, |g| g.chars().count())
    }

    /// Move one grapheme left. Without `extend`, a selection collapses to its start.
    pub fn move_left(&mut self, buffer: &ComposerBuffer, extend: bool) {
        self.preferred_col = None;
        let selection = self.selection();
        if !extend && !selection.is_collapsed() {
            self.move_to(selection.start, false);
            return;
        }
        if self.cursor == 0 {
            return;
        }
        let idx = self.cursor - self.grapheme_before(buffer).min(self.cursor);
        self.move_to(idx, extend);
    }

    /// Move one grapheme right. Without `extend`, a selection collapses to its end.
    pub fn move_right(&mut self, buffer: &ComposerBuffer, extend: bool) {
        self.preferred_col = None;
        let selection = self.selection();
        if !extend && !selection.is_collapsed() {
            self.move_to(selection.end, false);
            return;
        }
        let len = buffer.len_chars();
        if self.cursor >= len {
            return;
        }
        let idx = (self.cursor + self.grapheme_after(buffer)).min(len);
        self.move_to(idx, extend);
    }

    pub fn move_word_left(&mut self, buffer: &ComposerBuffer, extend: bool) {
        self.preferred_col = None;
        let prefix = buffer.slice_to_string(0..self.cursor);
        let trimmed = prefix.trim_end();
        let byte_idx = trimmed
            .unicode_word_indices()
            .next_back()
            .map_or(0, |(offset, _)| offset);
        let idx = prefix[..byte_idx].chars().count();
        self.move_to(idx, extend);
    }

    pub fn move_word_right(&mut self, buffer: &ComposerBuffer, extend: bool) {
        self.preferred_col = None;
        let len = buffer.len_chars();
        let suffix = buffer.slice_to_string(self.cursor..len);
        let idx = match suffix.unicode_word_indices().next() {
            // At the start of a word: jump past it.
            Some((0, word)) => self.cursor + word.chars().count(),
            Some((offset, _)) => self.cursor + suffix[..offset].chars().count(),
            None => len,
        };
        self.move_to(idx.min(len), extend);
    }

    /// Move up one row. Returns false on the first row.
    pub fn move_up(&mut self, buffer: &ComposerBuffer, extend: bool) -> bool {
        self.move_vertical(buffer, extend, false)
    }

    /// Move down one row. Returns false on the last row.
    pub fn move_down(&mut self, buffer: &ComposerBuffer, extend: bool) -> bool {
        self.move_vertical(buffer, extend, true)
    }

    fn move_vertical(&mut self, buffer: &ComposerBuffer, extend: bool, down: bool) -> bool {
        let content = buffer.get_content();
        if content.is_empty() {
            return false;
        }
        let lines = wrap_lines(&content, self.last_width);
        let (row, col) = locate(&lines, self.cursor);
        let target_row = if down {
            if row + 1 >= lines.len() {
                return false;
            }
            row + 1
        } else {
            if row == 0 {
                return false;
            }
            row - 1
        };

        let col = *self.preferred_col.get_or_insert(col);
        let target = lines[target_row];
        let mut target_len = target.len();
        if target_row + 1 < lines.len()
            && !target.is_empty()
            && buffer.char_at(target.end - 1) == Some('\n')
        {
            target_len -= 1;
        }
        self.move_to(target.start + col.min(target_len), extend);
        true
    }

    /// Remove the selected text, if any. Returns true when something was removed.
    pub fn delete_selection(&mut self, buffer: &mut ComposerBuffer) -> bool {
        let selection = self.selection();
        if selection.is_collapsed() {
            return false;
        }
        buffer.remove_range(selection.range());
        self.move_to(selection.start, false);
        true
    }

    /// Backspace: the selection, or the grapheme before the cursor.
    pub fn delete_char_before(&mut self, buffer: &mut ComposerBuffer) {
        if self.delete_selection(buffer) || self.cursor == 0 {
            return;
        }
        let end = self.cursor;
        let start = end - self.grapheme_before(buffer).min(end);
        buffer.remove_range(start..end);
        self.move_to(start, false);
    }

    /// Delete key: the selection, or the grapheme after the cursor.
    pub fn delete_char_after(&mut self, buffer: &mut ComposerBuffer) {
        if self.delete_selection(buffer) || self.cursor >= buffer.len_chars() {
            return;
        }
        let start = self.cursor;
        buffer.remove_range(start..start + self.grapheme_after(buffer));
    }

    /// Delete the word before the cursor (Ctrl+W / Alt+Backspace).
    pub fn delete_word(&mut self, buffer: &mut ComposerBuffer) {
        if self.delete_selection(buffer) {
            return;
        }
        let end = self.cursor;
        self.move_word_left(buffer, false);
        buffer.remove_range(self.cursor..end);
    }

    /// Delete to the start of the line, or join with the previous line when
    /// already there (Ctrl+U).
    pub fn delete_line_left(&mut self, buffer: &mut ComposerBuffer) {
        if self.delete_selection(buffer) || self.cursor == 0 {
            return;
        }
        let line_start = self.line_start(buffer);
        let start = if self.cursor > line_start {
            line_start
        } else {
            self.cursor - 1
        };
        buffer.remove_range(start..self.cursor);
        self.move_to(start, false);
    }

    /// Delete to the end of the line, or the newline itself when at the end (Ctrl+K).
    pub fn delete_line_right(&mut self, buffer: &mut ComposerBuffer) {
        if self.delete_selection(buffer) || self.cursor >= buffer.len_chars() {
            return;
        }
        let end = self.line_end(buffer);
        if end > self.cursor {
            buffer.remove_range(self.cursor..end);
        } else {
            buffer.remove_range(self.cursor..self.cursor + 1);
        }
    }

    pub fn insert_char(&mut self, buffer: &mut ComposerBuffer, ch: char) {
        let mut tmp = [0u8; 4];
        self.insert_str(buffer, ch.encode_utf8(&mut tmp));
    }

    /// Replace the selection with `text` and leave a caret right after it.
    pub fn insert_str(&mut self, buffer: &mut ComposerBuffer, text: &str) -> Selection {
        let selection = self.selection().clamp(buffer.len_chars());
        buffer.remove_range(selection.range());
        buffer.insert_str(selection.start, text);
        let caret = selection.start + text.chars().count();
        self.move_to(caret, false);
        self.preferred_col = None;
        Selection::caret(caret)
    }

    pub fn insert_newline(&mut self, buffer: &mut ComposerBuffer) {
        self.insert_char(buffer, '\n');
    }

    /// Reset cursor, selection and scroll.
    pub fn reset(&mut self) {
        self.cursor = 0;
        self.anchor = 0;
        self.scroll_offset = 0;
        self.preferred_col = None;
        self.cursor_pos = (0, 0);
    }

    /// Forget the cached width (terminal resized).
    pub fn invalidate_width(&mut self) {
        self.last_width = 0;
    }

    #[must_use]
    pub fn scroll_offset(&self) -> usize {
        self.scroll_offset
    }

    /// Scroll so the last row sits at the bottom of `visible_height` rows.
    pub fn scroll_to_bottom(&mut self, visible_height: usize, total_rows: usize) {
        self.scroll_offset = total_rows.saturating_sub(visible_height);
    }

    /// Keep the cursor row inside the visible window, clamping after shrink.
    pub fn scroll_to_cursor(&mut self, visible_height: usize, total_rows: usize) {
        if visible_height == 0 {
            self.scroll_offset = 0;
            return;
        }
        let max_scroll = total_rows.saturating_sub(visible_height);
        self.scroll_offset = self.scroll_offset.min(max_scroll);

        let cursor_row = self.cursor_pos.1 as usize;
        if cursor_row < self.scroll_offset {
            self.scroll_offset = cursor_row;
        } else if cursor_row >= self.scroll_offset + visible_height {
            self.scroll_offset = cursor_row + 1 - visible_height;
        }
    }

    /// Lay out the buffer at `width` and store the cursor's (x, y).
    pub fn layout_cursor(&mut self, buffer: &ComposerBuffer, width: usize) -> (u16, u16) {
        use unicode_width::UnicodeWidthChar;

        self.last_width = width;
        let len = buffer.len_chars();
        self.cursor = self.cursor.min(len);
        self.anchor = self.anchor.min(len);

        let content = buffer.get_content();
        if width == 0 || content.is_empty() {
            self.cursor_pos = (0, 0);
            return self.cursor_pos;
        }

        let lines = wrap_lines(&content, width);
        let (row, col) = locate(&lines, self.cursor);
        let start = lines.get(row).map_or(0, |l| l.start);
        let x: usize = content
            .chars()
            .skip(start)
            .take(col)
            .map(|c| c.width().unwrap_or(0))
            .sum();

        // A cursor after a full last row wraps onto the next one.
        let (x, y) = if self.cursor == len && x >= width {
            (0, row + 1)
        } else {
            (x, row)
        };

        #[allow(clippy::cast_possible_truncation)] // Terminal coordinates fit in u16
        {
            self.cursor_pos = (x as u16, y as u16);
        }
        self.cursor_pos
    }

    /// Rows the buffer occupies at `width`.
    #[must_use]
    pub fn row_count(buffer: &ComposerBuffer, width: usize) -> usize {
        row_count(&buffer.get_content(), width)
    }
}
