//! Key handling for the focused composer.

use super::buffer::ComposerBuffer;
use super::machine::Composer;
use super::state::ComposerState;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// What a key press did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputResult {
    Submitted,
    Cancelled,
    /// Buffer text changed.
    Changed,
    /// Cursor, selection, mode or attachments changed.
    Moved,
    /// Not a composer key.
    Ignored,
}

impl Composer {
    #[allow(clippy::too_many_lines)]
    pub fn handle_key_event(&mut self, key: KeyEvent) -> InputResult {
        if key.kind == KeyEventKind::Release {
            return InputResult::Ignored;
        }
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let alt = key.modifiers.contains(KeyModifiers::ALT);
        let shift = key.modifiers.contains(KeyModifiers::SHIFT);
        let super_key = key.modifiers.contains(KeyModifiers::SUPER);

        match key.code {
            // Shift+Enter inserts a newline; Alt+Enter for terminals that
            // can't report Shift on Enter.
            KeyCode::Enter if shift || alt => {
                self.buffer.snapshot();
                self.state.insert_newline(&mut self.buffer);
                self.content_changed();
                InputResult::Changed
            }
            KeyCode::Enter => {
                if self.submit() {
                    InputResult::Submitted
                } else {
                    InputResult::Ignored
                }
            }
            KeyCode::Esc => {
                if self.cancel() {
                    InputResult::Cancelled
                } else if self.is_expanded() {
                    self.collapse();
                    InputResult::Moved
                } else {
                    InputResult::Ignored
                }
            }

            KeyCode::Char(c) if !ctrl && !alt && !super_key => {
                self.buffer.snapshot();
                self.state.insert_char(&mut self.buffer, c);
                self.content_changed();
                InputResult::Changed
            }

            KeyCode::Char('z') if ctrl => {
                if self.undo() {
                    InputResult::Changed
                } else {
                    InputResult::Ignored
                }
            }
            KeyCode::Char('x') if ctrl => {
                if self.remove_last_attachment().is_some() {
                    InputResult::Moved
                } else {
                    InputResult::Ignored
                }
            }

            // Word movement: Ctrl/Alt+Left/Right, or Alt+b/f from terminals
            // that send Option+Arrow that way.
            KeyCode::Left if ctrl || alt => {
                self.state.move_word_left(&self.buffer, shift);
                InputResult::Moved
            }
            KeyCode::Right if ctrl || alt => {
                self.state.move_word_right(&self.buffer, shift);
                InputResult::Moved
            }
            KeyCode::Char('b') if alt => {
                self.state.move_word_left(&self.buffer, false);
                InputResult::Moved
            }
            KeyCode::Char('f') if alt => {
                self.state.move_word_right(&self.buffer, false);
                InputResult::Moved
            }
            KeyCode::Left => {
                self.state.move_left(&self.buffer, shift);
                InputResult::Moved
            }
            KeyCode::Right => {
                self.state.move_right(&self.buffer, shift);
                InputResult::Moved
            }
            KeyCode::Up => {
                self.state.move_up(&self.buffer, shift);
                InputResult::Moved
            }
            KeyCode::Down => {
                self.state.move_down(&self.buffer, shift);
                InputResult::Moved
            }
            KeyCode::Home => {
                self.state.move_to_line_start(&self.buffer, shift);
                InputResult::Moved
            }
            KeyCode::End => {
                self.state.move_to_line_end(&self.buffer, shift);
                InputResult::Moved
            }
            KeyCode::Char('a') if ctrl => {
                self.state.move_to_line_start(&self.buffer, false);
                InputResult::Moved
            }
            KeyCode::Char('e') if ctrl => {
                self.state.move_to_line_end(&self.buffer, false);
                InputResult::Moved
            }

            KeyCode::Backspace if super_key => self.edit(|s, b| s.delete_line_left(b)),
            KeyCode::Backspace if ctrl || alt => self.edit(|s, b| s.delete_word(b)),
            KeyCode::Backspace => self.edit(|s, b| s.delete_char_before(b)),
            KeyCode::Delete => self.edit(|s, b| s.delete_char_after(b)),
            KeyCode::Char('w') if ctrl => self.edit(|s, b| s.delete_word(b)),
            KeyCode::Char('u') if ctrl => self.edit(|s, b| s.delete_line_left(b)),
            KeyCode::Char('k') if ctrl => self.edit(|s, b| s.delete_line_right(b)),

            _ => InputResult::Ignored,
        }
    }

    /// Run a deletion, keeping an undo snapshot only if it removed something.
    fn edit(
        &mut self,
        op: impl FnOnce(&mut ComposerState, &mut ComposerBuffer),
    ) -> InputResult {
        let before = self.buffer.rope().clone();
        op(&mut self.state, &mut self.buffer);
        if *self.buffer.rope() == before {
            return InputResult::Ignored;
        }
        self.buffer.push_undo(before);
        self.content_changed();
        InputResult::Changed
    }
}
