//! Composer rendering: the collapsed input box and the expanded editor +
//! preview panes.

use super::{
    CONTINUATION, PROMPT, PROMPT_WIDTH, StyledLine, StyledSpan, render_attachments,
    render_segments,
};
use crate::composer::{Composer, wrap_lines};
use crossterm::style::Color;
use unicode_width::UnicodeWidthStr;

/// Separator between the editor and preview panes.
const PANE_DIVIDER: &str = " │ ";

/// Lines to draw for the composer and where the cursor goes.
#[derive(Debug, Clone, Default)]
pub struct InputFrame {
    pub lines: Vec<StyledLine>,
    /// Cursor relative to the frame's top-left.
    pub cursor: (u16, u16),
}

/// Lay out the composer at `width` columns.
pub fn render_input(composer: &mut Composer, width: u16) -> InputFrame {
    if composer.is_expanded() {
        render_expanded(composer, width)
    } else {
        render_editor(composer, width)
    }
}

/// Editor rows with the prompt gutter.
fn render_editor(composer: &mut Composer, width: u16) -> InputFrame {
    let content_width = usize::from(width.saturating_sub(PROMPT_WIDTH + 1));
    let layout = composer.layout(content_width);
    let text = composer.text();
    let chars: Vec<char> = text.chars().collect();
    let rows = wrap_lines(&text, content_width);

    // Rows past the content stay blank so the box keeps its height until the
    // next recompute.
    let mut lines = Vec::with_capacity(usize::from(layout.visible_rows));
    for row in 0..usize::from(layout.visible_rows) {
        let index = layout.scroll_offset + row;
        let chunk: String = rows
            .get(index)
            .map(|r| {
                chars[r.start..r.end.min(chars.len())]
                    .iter()
                    .filter(|&&c| c != '\n')
                    .collect()
            })
            .unwrap_or_default();
        let prefix = if index == 0 { PROMPT } else { CONTINUATION };
        lines.push(StyledLine::new(vec![
            StyledSpan::dim(prefix),
            StyledSpan::raw(chunk),
        ]));
    }

    InputFrame {
        lines,
        cursor: (PROMPT_WIDTH + layout.cursor.0, layout.cursor.1),
    }
}

/// Editor on the left, folded preview and attachments on the right.
fn render_expanded(composer: &mut Composer, width: u16) -> InputFrame {
    let divider = PANE_DIVIDER.width() as u16;
    let left_width = width.saturating_sub(divider) / 2;
    let right_width = usize::from(width.saturating_sub(divider + left_width));

    let editor = render_editor(composer, left_width);
    let mut preview = render_segments(&composer.preview_segments(), true, right_width);
    let attachments = render_attachments(composer.attachments());
    if !attachments.is_empty() {
        preview.push(StyledLine::empty());
        preview.extend(attachments);
    }

    let mut lines = Vec::with_capacity(editor.lines.len());
    for (row, left) in editor.lines.into_iter().enumerate() {
        let mut line = left.truncated(usize::from(left_width));
        let pad = usize::from(left_width).saturating_sub(line.width());
        line.push(StyledSpan::raw(" ".repeat(pad)));
        line.push(StyledSpan::dim(PANE_DIVIDER));
        if let Some(right) = preview.get(row) {
            line.spans.extend(right.clone().truncated(right_width).spans);
        }
        lines.push(line);
    }

    InputFrame {
        lines,
        cursor: editor.cursor,
    }
}

/// Hints and notices under the composer.
#[must_use]
pub fn status_line(composer: &Composer, width: u16) -> StyledLine {
    let mut parts: Vec<StyledSpan> = Vec::new();
    let count = composer.attachments().len();
    if count > 0 {
        let unit = if count == 1 { "attachment" } else { "attachments" };
        parts.push(StyledSpan::raw(format!("{count} {unit}")));
    }
    if composer.is_loading() {
        parts.push(StyledSpan::colored("sending… esc to cancel", Color::Yellow));
    }
    if composer.image_warning() {
        parts.push(StyledSpan::colored(
            "images may not be supported",
            Color::Yellow,
        ));
    }
    let toggle = if composer.is_expanded() {
        "collapse"
    } else {
        "expand"
    };
    let modifier = if cfg!(target_os = "macos") {
        "cmd"
    } else {
        "ctrl"
    };
    parts.push(StyledSpan::dim(format!("{modifier}+shift+e {toggle}")));

    let mut line = StyledLine::raw(" ");
    for (i, part) in parts.into_iter().enumerate() {
        if i > 0 {
            line.push(StyledSpan::dim(" · "));
        }
        line.push(part);
    }
    line.truncated(usize::from(width))
}
