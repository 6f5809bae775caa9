//! Debounced height recomputation.

use std::time::{Duration, Instant};

/// Default debounce window.
pub const RESIZE_DEBOUNCE: Duration = Duration::from_millis(100);

/// Whether the composer shows the single editor or the editor + preview panes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompositionMode {
    #[default]
    Collapsed,
    Expanded,
}

/// Outcome of a height recomputation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposerHeight {
    /// Take all available space (expanded mode).
    Fill,
    /// Fixed height; `scrolls` when content is clipped.
    Rows { rows: u16, scrolls: bool },
}

impl Default for ComposerHeight {
    fn default() -> Self {
        Self::Rows {
            rows: 1,
            scrolls: false,
        }
    }
}

impl ComposerHeight {
    /// Visible rows, given the space available for `Fill`.
    #[must_use]
    pub fn visible_rows(self, available: u16) -> u16 {
        match self {
            Self::Fill => available,
            Self::Rows { rows, .. } => rows.min(available),
        }
    }
}

/// Grow to fit `content_rows` up to `line_height × max_rows`, then clamp.
#[must_use]
pub fn compute_height(
    content_rows: usize,
    line_height: u16,
    max_rows: usize,
    mode: CompositionMode,
) -> ComposerHeight {
    if mode == CompositionMode::Expanded {
        return ComposerHeight::Fill;
    }
    let line_height = usize::from(line_height.max(1));
    let natural = content_rows.max(1) * line_height;
    let max_height = max_rows.max(1) * line_height;
    let rows = u16::try_from(natural.min(max_height)).unwrap_or(u16::MAX);
    ComposerHeight::Rows {
        rows,
        scrolls: natural > max_height,
    }
}

/// Collapses bursts of resize requests into one recomputation.
///
/// A new request pushes the deadline out, cancelling any pending one.
#[derive(Debug, Clone)]
pub struct ResizeScheduler {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Default for ResizeScheduler {
    fn default() -> Self {
        Self::new(RESIZE_DEBOUNCE)
    }
}

impl ResizeScheduler {
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    pub fn request(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Time left until the pending recomputation, if any.
    #[must_use]
    pub fn time_until_due(&self, now: Instant) -> Option<Duration> {
        self.deadline.map(|d| d.saturating_duration_since(now))
    }

    /// True exactly once when the pending deadline has passed.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}
