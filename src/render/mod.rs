//! Line rendering for messages and the composer.
//!
//! Terminal APIs use u16 for dimensions; numeric casts are intentional.
#![allow(clippy::cast_possible_truncation)]

pub mod input_box;
pub mod terminal;

use crate::attachment::Attachment;
use crate::composer::wrap_lines;
use crate::snippet::{Segment, SnippetMarkers, parse_segments};
use crossterm::style::{Attribute, Color, ContentStyle, StyledContent};
use std::io::{self, Write};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Input prompt prefix " › "
pub const PROMPT: &str = " › ";
/// Continuation line prefix "   "
pub const CONTINUATION: &str = "   ";
/// Width of prompt/continuation prefix
pub const PROMPT_WIDTH: u16 = 3;
/// Gutter drawn in front of unfolded snippet lines
const SNIPPET_GUTTER: &str = "│ ";

/// A styled span of text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StyledSpan {
    pub content: String,
    pub style: ContentStyle,
}

impl StyledSpan {
    pub fn raw(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            style: ContentStyle::new(),
        }
    }

    pub fn colored(content: impl Into<String>, color: Color) -> Self {
        Self {
            content: content.into(),
            style: ContentStyle {
                foreground_color: Some(color),
                ..ContentStyle::default()
            },
        }
    }

    pub fn dim(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            style: ContentStyle {
                attributes: Attribute::Dim.into(),
                ..ContentStyle::default()
            },
        }
    }

    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        write!(w, "{}", StyledContent::new(self.style, &self.content))
    }
}

/// A line of styled text.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StyledLine {
    pub spans: Vec<StyledSpan>,
}

impl StyledLine {
    #[must_use]
    pub fn new(spans: Vec<StyledSpan>) -> Self {
        Self { spans }
    }

    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn raw(content: impl Into<String>) -> Self {
        Self::new(vec![StyledSpan::raw(content)])
    }

    pub fn push(&mut self, span: StyledSpan) {
        self.spans.push(span);
    }

    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        for span in &self.spans {
            span.write_to(w)?;
        }
        Ok(())
    }

    /// Text without styling.
    #[must_use]
    pub fn plain(&self) -> String {
        self.spans.iter().map(|s| s.content.as_str()).collect()
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.spans.iter().map(|s| s.content.width()).sum()
    }

    /// Cut to at most `width` columns.
    #[must_use]
    pub fn truncated(mut self, width: usize) -> Self {
        let mut remaining = width;
        let mut kept = Vec::with_capacity(self.spans.len());
        for mut span in self.spans.drain(..) {
            if remaining == 0 {
                break;
            }
            let content = truncate_to_width(&span.content, remaining);
            remaining -= content.width();
            span.content = content;
            kept.push(span);
        }
        self.spans = kept;
        self
    }
}

/// Longest prefix of `s` that fits in `width` columns.
#[must_use]
pub fn truncate_to_width(s: &str, width: usize) -> String {
    let mut used = 0;
    s.chars()
        .take_while(|c| {
            used += c.width().unwrap_or(0);
            used <= width
        })
        .collect()
}

/// Who wrote a history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    /// Delivery notices from the host.
    System,
}

/// Label shown in place of a folded snippet.
#[must_use]
pub fn fold_label(snippet: &str) -> String {
    let lines = snippet.lines().count().max(1);
    let unit = if lines == 1 { "line" } else { "lines" };
    format!("▸ snippet · {lines} {unit}")
}

/// Lay out prose and snippets at `width` columns. Folded snippets collapse
/// to a single label line.
#[must_use]
pub fn render_segments(segments: &[Segment], folded: bool, width: usize) -> Vec<StyledLine> {
    let mut lines = Vec::new();
    for segment in segments {
        match segment {
            Segment::Prose(text) => {
                // The newline before a snippet ends the prose line; it does
                // not start an empty one.
                let text = text.strip_suffix('\n').unwrap_or(text);
                for row in wrap_lines(text, width) {
                    let row: String = text
                        .chars()
                        .skip(row.start)
                        .take(row.len())
                        .filter(|&c| c != '\n')
                        .collect();
                    lines.push(StyledLine::raw(row));
                }
            }
            Segment::Snippet(text) if folded => {
                lines.push(StyledLine::new(vec![StyledSpan::colored(
                    fold_label(text),
                    Color::Cyan,
                )]));
            }
            Segment::Snippet(text) => {
                let body_width = width.saturating_sub(SNIPPET_GUTTER.width());
                for line in text.split('\n') {
                    lines.push(StyledLine::new(vec![
                        StyledSpan::dim(SNIPPET_GUTTER),
                        StyledSpan::raw(truncate_to_width(line, body_width)),
                    ]));
                }
            }
        }
    }
    lines
}

/// One line per attachment.
#[must_use]
pub fn render_attachments(attachments: &[Attachment]) -> Vec<StyledLine> {
    attachments
        .iter()
        .map(|a| StyledLine::new(vec![StyledSpan::dim(format!("📎 {} ({})", a.filename, a.mime_type))]))
        .collect()
}

/// A history entry: role header, parsed body, then its attachments.
#[must_use]
pub fn render_message(
    role: Role,
    text: &str,
    attachments: &[Attachment],
    markers: &SnippetMarkers,
    folded: bool,
    width: usize,
) -> Vec<StyledLine> {
    let header = match role {
        Role::User => StyledSpan::colored("you", Color::Green),
        Role::System => StyledSpan::colored("·", Color::Yellow),
    };
    let mut lines = vec![StyledLine::new(vec![header])];
    lines.extend(render_segments(&parse_segments(text, markers), folded, width));
    lines.extend(render_attachments(attachments));
    lines
}
