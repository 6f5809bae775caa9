//! Interactive session: message history above, composer below.

mod delivery;
mod run;

pub use delivery::{DELIVERY_LATENCY, Delivery, Outcome, deliver};
pub use run::{RunOptions, run};

use crate::attachment::Attachment;
use crate::composer::{Composer, ComposerHandle, PasteEvent, ShortcutRegistry};
use crate::config::Config;
use crate::render::input_box::{render_input, status_line};
use crate::render::terminal::Screen;
use crate::render::{PROMPT_WIDTH, Role, StyledLine, render_message};
use crate::sink::MessageSink;
use crate::snippet::SnippetMarkers;
use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::path::PathBuf;
use std::time::Instant;

/// Rows under the composer for the status line.
const STATUS_HEIGHT: u16 = 1;
/// Width of the divider between editor and preview panes.
const PANE_DIVIDER_WIDTH: u16 = 3;

#[derive(Debug, Clone)]
struct HistoryEntry {
    role: Role,
    text: String,
    attachments: Vec<Attachment>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    Composer,
    History,
}

pub struct App {
    pub composer: Composer,
    registry: ShortcutRegistry,
    markers: SnippetMarkers,
    history: Vec<HistoryEntry>,
    /// Rows scrolled up from the bottom of the history.
    history_scroll: usize,
    history_folded: bool,
    focus: Focus,
    size: (u16, u16),
    viewport: Option<(usize, u16)>,
    dirty: bool,
    pub should_quit: bool,
}

impl App {
    pub fn new(config: &Config, sink: Box<dyn MessageSink>, width: u16, height: u16) -> Self {
        let registry = ShortcutRegistry::new();
        let mut composer = Composer::new(config, sink);
        composer.mount(&registry);
        let mut app = Self {
            composer,
            registry,
            markers: config.markers(),
            history: Vec::new(),
            history_scroll: 0,
            history_folded: true,
            focus: Focus::Composer,
            size: (width, height),
            viewport: None,
            dirty: true,
            should_quit: false,
        };
        app.sync_viewport();
        app.composer.resize_text_area();
        app
    }

    /// True once after anything visible changed.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub fn handle_event(&mut self, event: Event) {
        match event {
            Event::Key(key) => self.handle_key(key),
            Event::Paste(text) => self.handle_paste(text),
            Event::Resize(width, height) => {
                self.size = (width, height);
                self.sync_viewport();
            }
            Event::FocusLost => self.composer.blur(),
            Event::FocusGained => {
                if self.focus == Focus::Composer {
                    self.composer.focus_text_area();
                }
            }
            Event::Mouse(_) => return,
        }
        self.dirty = true;
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if key.kind == KeyEventKind::Release {
            return;
        }

        // The expand shortcut works from any pane.
        if let Some(id) = self.registry.dispatch(&key)
            && self.composer.handle_shortcut(id)
        {
            self.sync_viewport();
            return;
        }

        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('c') if ctrl => {
                if self.composer.text().is_empty() && self.composer.attachments().is_empty() {
                    self.should_quit = true;
                } else {
                    self.composer.clear();
                }
                return;
            }
            KeyCode::Tab => {
                self.toggle_focus();
                return;
            }
            _ => {}
        }

        match self.focus {
            Focus::Composer => {
                self.composer.handle_key_event(key);
                // Esc may have collapsed the composer.
                self.sync_viewport();
            }
            Focus::History => self.handle_history_key(key),
        }
    }

    fn toggle_focus(&mut self) {
        match self.focus {
            Focus::Composer => {
                self.focus = Focus::History;
                self.composer.blur();
            }
            Focus::History => {
                self.focus = Focus::Composer;
                self.composer.focus_text_area();
            }
        }
    }

    fn handle_history_key(&mut self, key: KeyEvent) {
        let page = usize::from(self.size.1 / 2).max(1);
        let locked = self.composer.page_scroll_locked();
        match key.code {
            KeyCode::Up if !locked => self.history_scroll += 1,
            KeyCode::Down if !locked => self.history_scroll = self.history_scroll.saturating_sub(1),
            KeyCode::PageUp if !locked => self.history_scroll += page,
            KeyCode::PageDown if !locked => {
                self.history_scroll = self.history_scroll.saturating_sub(page);
            }
            KeyCode::Char('f') => self.history_folded = !self.history_folded,
            KeyCode::Esc => self.toggle_focus(),
            _ => {}
        }
    }

    /// Dropped files arrive as a pasted path; anything else is text.
    fn handle_paste(&mut self, text: String) {
        if self.focus == Focus::History {
            self.toggle_focus();
        }
        match dropped_paths(&text) {
            Some(paths) => self.composer.pick_files(paths),
            None => self.composer.handle_paste(PasteEvent::from_text(text)),
        }
    }

    pub fn handle_delivery(&mut self, delivery: Delivery) {
        match delivery.outcome {
            Outcome::Sent { text, attachments } => {
                self.history.push(HistoryEntry {
                    role: Role::User,
                    text,
                    attachments,
                });
            }
            Outcome::Cancelled => self.push_notice("Send cancelled"),
            Outcome::Failed(message) => self.push_notice(&message),
        }
        // A result for a cancelled send must not unlock a newer one.
        self.composer.finish_send(delivery.id);
        self.history_scroll = 0;
        self.dirty = true;
    }

    fn push_notice(&mut self, text: &str) {
        self.history.push(HistoryEntry {
            role: Role::System,
            text: text.to_string(),
            attachments: Vec::new(),
        });
    }

    /// End of an event pass.
    pub fn tick(&mut self, now: Instant) {
        if self.composer.tick(now) {
            self.dirty = true;
        }
    }

    /// Tell the composer how much room it has; only on change so the resize
    /// debounce is not re-armed every pass.
    fn sync_viewport(&mut self) {
        let (width, height) = self.size;
        let pane_width = if self.composer.is_expanded() {
            width.saturating_sub(PANE_DIVIDER_WIDTH) / 2
        } else {
            width
        };
        let content_width = usize::from(pane_width.saturating_sub(PROMPT_WIDTH + 1));
        let available = height.saturating_sub(STATUS_HEIGHT);
        if self.viewport != Some((content_width, available)) {
            self.viewport = Some((content_width, available));
            self.composer.set_viewport(content_width, available);
        }
    }

    fn history_lines(&self, width: usize) -> Vec<StyledLine> {
        let mut lines = Vec::new();
        for (i, entry) in self.history.iter().enumerate() {
            if i > 0 {
                lines.push(StyledLine::empty());
            }
            lines.extend(render_message(
                entry.role,
                &entry.text,
                &entry.attachments,
                &self.markers,
                self.history_folded,
                width,
            ));
        }
        lines
    }

    /// Compose the full screen: history pinned above the composer.
    pub fn build_screen(&mut self) -> Screen {
        let (width, height) = self.size;
        let frame = render_input(&mut self.composer, width);
        let status = status_line(&self.composer, width);

        let composer_rows = u16::try_from(frame.lines.len()).unwrap_or(u16::MAX);
        let history_rows = usize::from(height.saturating_sub(composer_rows + STATUS_HEIGHT));

        let mut rows = Vec::with_capacity(usize::from(height));
        if history_rows > 0 {
            let lines = self.history_lines(usize::from(width));
            let max_scroll = lines.len().saturating_sub(history_rows);
            self.history_scroll = self.history_scroll.min(max_scroll);
            let end = lines.len() - self.history_scroll;
            let start = end.saturating_sub(history_rows);
            let shown = end - start;
            rows.extend(std::iter::repeat_n(StyledLine::empty(), history_rows - shown));
            rows.extend(lines[start..end].iter().cloned());
        }
        rows.extend(frame.lines);
        rows.push(status);

        let cursor = (self.focus == Focus::Composer && self.composer.is_focused()).then(|| {
            let top = u16::try_from(history_rows).unwrap_or(u16::MAX);
            (frame.cursor.0, top.saturating_add(frame.cursor.1))
        });
        Screen { rows, cursor }
    }
}

/// Paths in a paste that consists only of existing files, as terminals do
/// when files are dropped onto them.
fn dropped_paths(text: &str) -> Option<Vec<PathBuf>> {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed.contains('\n') {
        return None;
    }
    let unquoted = trimmed
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .or_else(|| trimmed.strip_prefix('"').and_then(|s| s.strip_suffix('"')))
        .map_or_else(|| trimmed.replace("\\ ", " "), str::to_string);
    let path = PathBuf::from(unquoted);
    path.is_file().then(|| vec![path])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composer::CompositionMode;
    use crate::sink::{ChannelSink, OutgoingMessage, SendId};
    use tempfile::TempDir;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn app() -> (App, UnboundedReceiver<OutgoingMessage>) {
        let (sink, rx) = ChannelSink::channel();
        (App::new(&Config::default(), Box::new(sink), 80, 24), rx)
    }

    fn press(app: &mut App, code: KeyCode, modifiers: KeyModifiers) {
        app.handle_event(Event::Key(KeyEvent::new(code, modifiers)));
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c), KeyModifiers::NONE);
        }
    }

    fn plain(screen: &Screen) -> Vec<String> {
        screen.rows.iter().map(StyledLine::plain).collect()
    }

    #[test]
    fn test_enter_sends_through_channel() {
        let (mut app, mut rx) = app();
        type_text(&mut app, "hello");
        press(&mut app, KeyCode::Enter, KeyModifiers::NONE);

        let sent = rx.try_recv().unwrap();
        assert_eq!(sent.text, "hello");
        assert!(app.composer.is_loading());

        app.handle_delivery(Delivery {
            id: sent.id,
            outcome: Outcome::Sent {
                text: sent.text,
                attachments: sent.attachments,
            },
        });
        assert!(!app.composer.is_loading());

        // Collapsing after submit restores focus on the next pass.
        app.tick(Instant::now());
        let screen = app.build_screen();
        let rows = plain(&screen);
        assert_eq!(rows.len(), 24);
        assert!(rows.contains(&"you".to_string()));
        assert!(rows.contains(&"hello".to_string()));
        assert_eq!(rows[22], " › ");
        assert_eq!(screen.cursor, Some((3, 22)));
    }

    #[test]
    fn test_esc_cancels_outstanding_send() {
        let (mut app, mut rx) = app();
        type_text(&mut app, "oops");
        press(&mut app, KeyCode::Enter, KeyModifiers::NONE);
        let sent = rx.try_recv().unwrap();

        press(&mut app, KeyCode::Esc, KeyModifiers::NONE);
        assert!(sent.abort.is_cancelled());
        assert!(!app.composer.is_loading());
    }

    #[test]
    fn test_late_cancel_result_keeps_resubmit_loading() {
        let (mut app, mut rx) = app();
        type_text(&mut app, "a");
        press(&mut app, KeyCode::Enter, KeyModifiers::NONE);
        let first = rx.try_recv().unwrap();
        press(&mut app, KeyCode::Esc, KeyModifiers::NONE);
        assert!(first.abort.is_cancelled());

        type_text(&mut app, "b");
        press(&mut app, KeyCode::Enter, KeyModifiers::NONE);
        let second = rx.try_recv().unwrap();
        assert_ne!(second.id, first.id);

        app.handle_delivery(Delivery {
            id: first.id,
            outcome: Outcome::Cancelled,
        });
        assert!(app.composer.is_loading());

        // A third message is refused while the second is in flight.
        type_text(&mut app, "c");
        press(&mut app, KeyCode::Enter, KeyModifiers::NONE);
        assert!(rx.try_recv().is_err());
        assert_eq!(app.composer.text(), "c");

        press(&mut app, KeyCode::Esc, KeyModifiers::NONE);
        assert!(second.abort.is_cancelled());
        assert!(!app.composer.is_loading());
    }

    #[test]
    fn test_late_sent_result_for_cancelled_send_is_still_shown() {
        let (mut app, mut rx) = app();
        type_text(&mut app, "a");
        press(&mut app, KeyCode::Enter, KeyModifiers::NONE);
        let first = rx.try_recv().unwrap();
        press(&mut app, KeyCode::Esc, KeyModifiers::NONE);
        type_text(&mut app, "b");
        press(&mut app, KeyCode::Enter, KeyModifiers::NONE);

        app.handle_delivery(Delivery {
            id: first.id,
            outcome: Outcome::Sent {
                text: first.text,
                attachments: first.attachments,
            },
        });
        assert!(app.composer.is_loading());
        app.tick(Instant::now());
        let rows = plain(&app.build_screen());
        assert!(rows.contains(&"a".to_string()));
    }

    #[test]
    fn test_shortcut_works_from_history_pane() {
        let (mut app, _rx) = app();
        press(&mut app, KeyCode::Tab, KeyModifiers::NONE);
        assert!(!app.composer.is_focused());

        let modifiers = crate::composer::shortcut::platform_modifier() | KeyModifiers::SHIFT;
        press(&mut app, KeyCode::Char('E'), modifiers);
        assert_eq!(app.composer.mode(), CompositionMode::Expanded);
        assert!(app.composer.page_scroll_locked());

        // History scrolling is locked while expanded.
        press(&mut app, KeyCode::Up, KeyModifiers::NONE);
        assert_eq!(app.history_scroll, 0);

        press(&mut app, KeyCode::Char('E'), modifiers);
        assert_eq!(app.composer.mode(), CompositionMode::Collapsed);
    }

    #[test]
    fn test_history_folding_toggle() {
        let (mut app, _rx) = app();
        let markers = SnippetMarkers::default();
        app.handle_delivery(Delivery {
            id: SendId(0),
            outcome: Outcome::Sent {
                text: format!("log:\n{}", markers.wrap("a\nb\nc")),
                attachments: Vec::new(),
            },
        });

        let rows = plain(&app.build_screen());
        assert!(rows.contains(&"▸ snippet · 3 lines".to_string()));

        press(&mut app, KeyCode::Tab, KeyModifiers::NONE);
        press(&mut app, KeyCode::Char('f'), KeyModifiers::NONE);
        let rows = plain(&app.build_screen());
        assert!(rows.contains(&"│ b".to_string()));
        assert!(!rows.iter().any(|r| r.starts_with('▸')));
    }

    #[test]
    fn test_ctrl_c_clears_then_quits() {
        let (mut app, _rx) = app();
        type_text(&mut app, "draft");
        press(&mut app, KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(app.composer.text(), "");
        assert!(!app.should_quit);

        press(&mut app, KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert!(app.should_quit);
    }

    #[test]
    fn test_cancel_and_failure_notices() {
        let (mut app, _rx) = app();
        app.handle_delivery(Delivery {
            id: SendId(0),
            outcome: Outcome::Cancelled,
        });
        app.handle_delivery(Delivery {
            id: SendId(1),
            outcome: Outcome::Failed("disk full".into()),
        });
        let rows = plain(&app.build_screen());
        assert!(rows.contains(&"Send cancelled".to_string()));
        assert!(rows.contains(&"disk full".to_string()));
    }

    #[test]
    fn test_text_paste_goes_through_classifier() {
        let (mut app, _rx) = app();
        app.handle_event(Event::Paste("x\n".repeat(30)));
        assert!(app.composer.text().starts_with("<<<snippet\n"));
    }

    #[test]
    fn test_dropped_paths() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("my notes.txt");
        std::fs::write(&path, "x").unwrap();
        let display = path.display().to_string();

        assert_eq!(dropped_paths(&format!("'{display}'")), Some(vec![path.clone()]));
        assert_eq!(dropped_paths(&format!("\"{display}\"\n")), Some(vec![path.clone()]));
        assert_eq!(
            dropped_paths(&display.replace(' ', "\\ ")),
            Some(vec![path.clone()])
        );
        assert_eq!(dropped_paths("just some words"), None);
        assert_eq!(dropped_paths(&format!("{display}\n{display}")), None);
        assert_eq!(dropped_paths(""), None);
    }
}
