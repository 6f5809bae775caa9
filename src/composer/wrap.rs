use unicode_width::UnicodeWidthChar;

/// A wrapped row as a char range `[start, end)`. A trailing newline, if any,
/// is part of the range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisualLine {
    pub start: usize,
    pub end: usize,
}

impl VisualLine {
    #[must_use]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Word-wrap `content` to `width` columns. Breaks at the last space when a
/// row overflows, else mid-word. Width 0 means unknown: only newlines split.
#[must_use]
pub fn wrap_lines(content: &str, width: usize) -> Vec<VisualLine> {
    let chars: Vec<char> = content.chars().collect();
    let mut lines = Vec::new();
    let width = if width == 0 { usize::MAX } else { width };

    let mut start = 0;
    let mut col = 0;
    // Index just past the most recent space on this row.
    let mut break_at: Option<usize> = None;

    for (i, &c) in chars.iter().enumerate() {
        if c == '\n' {
            lines.push(VisualLine { start, end: i + 1 });
            start = i + 1;
            col = 0;
            break_at = None;
            continue;
        }

        let w = c.width().unwrap_or(0);
        if col + w > width {
            match break_at.take() {
                Some(at) => {
                    lines.push(VisualLine { start, end: at });
                    start = at;
                    col = chars[at..i].iter().map(|ch| ch.width().unwrap_or(0)).sum();
                }
                None => {
                    lines.push(VisualLine { start, end: i });
                    start = i;
                    col = 0;
                }
            }
        }

        if c == ' ' {
            break_at = Some(i + 1);
        }
        col += w;
    }

    lines.push(VisualLine {
        start,
        end: chars.len(),
    });
    lines
}

/// Row and column of `char_idx` within `lines`.
#[must_use]
pub fn locate(lines: &[VisualLine], char_idx: usize) -> (usize, usize) {
    let last = lines.len().saturating_sub(1);
    for (row, line) in lines.iter().enumerate() {
        if (line.start..line.end).contains(&char_idx) || (row == last && char_idx == line.end) {
            return (row, char_idx - line.start);
        }
    }
    let start = lines.get(last).map_or(0, |l| l.start);
    (last, char_idx.saturating_sub(start))
}

/// Display width of a row, ignoring its newline.
#[must_use]
pub fn line_width(chars: &[char], line: VisualLine) -> usize {
    chars[line.start..line.end.min(chars.len())]
        .iter()
        .filter(|&&c| c != '\n')
        .map(|c| c.width().unwrap_or(0))
        .sum()
}

/// Rows the content occupies, counting the extra row a cursor needs after a
/// line that exactly fills the width. Empty content still takes one row.
#[must_use]
pub fn row_count(content: &str, width: usize) -> usize {
    if content.is_empty() {
        return 1;
    }
    let lines = wrap_lines(content, width);
    let chars: Vec<char> = content.chars().collect();
    let last = lines.last().copied().unwrap_or(VisualLine { start: 0, end: 0 });
    if width > 0 && line_width(&chars, last) >= width {
        lines.len() + 1
    } else {
        lines.len()
    }
}
