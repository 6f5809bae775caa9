//! Snippet markers and the segmentation parser.
//!
//! Oversized pastes are stored in the buffer as
//!
//! ```text
//! <begin>
//! body
//! <end>
//! ```
//!
//! followed by a newline. [`parse_segments`] splits a stored message back into
//! prose and snippet segments so the history view can fold the snippets. The
//! parse never fails: an unterminated begin marker degrades to plain prose.

/// Default begin marker.
pub const DEFAULT_BEGIN: &str = "<<<snippet";
/// Default end marker.
pub const DEFAULT_END: &str = "snippet>>>";

/// The sentinel pair delimiting a verbatim block inside the buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnippetMarkers {
    pub begin: String,
    pub end: String,
}

impl Default for SnippetMarkers {
    fn default() -> Self {
        Self::new(DEFAULT_BEGIN, DEFAULT_END)
    }
}

impl SnippetMarkers {
    pub fn new(begin: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            begin: begin.into(),
            end: end.into(),
        }
    }

    /// Wrap `body` as `begin\nbody\nend\n`.
    #[must_use]
    pub fn wrap(&self, body: &str) -> String {
        let mut out = String::with_capacity(self.begin.len() + body.len() + self.end.len() + 3);
        out.push_str(&self.begin);
        out.push('\n');
        out.push_str(body);
        out.push('\n');
        out.push_str(&self.end);
        out.push('\n');
        out
    }

    /// Wrap the contents of a picked text file, labelled with its name.
    #[must_use]
    pub fn wrap_file(&self, name: &str, body: &str) -> String {
        format!("File: {name}:\n{}", self.wrap(body))
    }

    /// True if `text` already carries either marker verbatim.
    #[must_use]
    pub fn appear_in(&self, text: &str) -> bool {
        text.contains(&self.begin) || text.contains(&self.end)
    }
}

/// One piece of a parsed message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Prose(String),
    Snippet(String),
}

impl Segment {
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Prose(text) | Self::Snippet(text) => text,
        }
    }

    #[must_use]
    pub fn is_snippet(&self) -> bool {
        matches!(self, Self::Snippet(_))
    }
}

/// Split `text` into prose and snippet segments.
///
/// The newline after a begin marker, the newline before an end marker and the
/// newline after an end marker belong to the markers, so a wrapped body comes
/// back byte-for-byte. Empty prose is never emitted and adjacent prose pieces
/// are merged.
#[must_use]
pub fn parse_segments(text: &str, markers: &SnippetMarkers) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut pieces = text.split(markers.begin.as_str());

    // Text before the first begin marker can never be a snippet, even if a
    // stray end marker shows up in it.
    if let Some(first) = pieces.next() {
        push_prose(&mut segments, first);
    }

    for piece in pieces {
        let body = piece.strip_prefix('\n').unwrap_or(piece);
        match body.find(markers.end.as_str()) {
            Some(pos) => {
                let snippet = &body[..pos];
                let snippet = snippet.strip_suffix('\n').unwrap_or(snippet);
                segments.push(Segment::Snippet(snippet.to_string()));

                let rest = &body[pos + markers.end.len()..];
                push_prose(&mut segments, rest.strip_prefix('\n').unwrap_or(rest));
            }
            None => {
                // Unterminated: hand the marker back so no typed text is lost.
                let mut prose = String::with_capacity(markers.begin.len() + piece.len());
                prose.push_str(&markers.begin);
                prose.push_str(piece);
                push_prose(&mut segments, &prose);
            }
        }
    }

    segments
}

fn push_prose(segments: &mut Vec<Segment>, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(Segment::Prose(prev)) = segments.last_mut() {
        prev.push_str(text);
    } else {
        segments.push(Segment::Prose(text.to_string()));
    }
}
