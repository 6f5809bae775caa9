use super::*;
use crate::attachment::{Attachment, Provenance};
use crate::config::{AllowImageAttachment, Config};
use crate::sink::{MessageSink, SendId};
use crate::snippet::{SnippetMarkers, Segment};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::{Duration, Instant};
use tempfile::TempDir;

// Minimal valid PNG (1x1 transparent pixel)
const PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52,
    0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F, 0x15, 0xC4,
    0x89, 0x00, 0x00, 0x00, 0x0A, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00, 0x01, 0x00, 0x00,
    0x05, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
];

#[derive(Default)]
struct Recorded {
    sent: Vec<(String, Vec<Attachment>)>,
    cancels: usize,
}

#[derive(Clone, Default)]
struct RecordingSink(Rc<RefCell<Recorded>>);

impl RecordingSink {
    fn sent(&self) -> Vec<(String, Vec<Attachment>)> {
        self.0.borrow().sent.clone()
    }

    fn cancels(&self) -> usize {
        self.0.borrow().cancels
    }
}

impl MessageSink for RecordingSink {
    fn send(&mut self, text: String, attachments: Vec<Attachment>) -> SendId {
        let mut recorded = self.0.borrow_mut();
        recorded.sent.push((text, attachments));
        SendId(recorded.sent.len() as u64 - 1)
    }

    fn cancel(&mut self) {
        self.0.borrow_mut().cancels += 1;
    }
}

fn composer_with(config: &Config) -> (Composer, RecordingSink) {
    let sink = RecordingSink::default();
    let composer = Composer::new(config, Box::new(sink.clone()));
    (composer, sink)
}

fn composer() -> (Composer, RecordingSink) {
    composer_with(&Config::default())
}

fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
}

fn type_text(composer: &mut Composer, text: &str) {
    for c in text.chars() {
        composer.handle_key_event(key(KeyCode::Char(c)));
    }
}

fn png_item() -> ClipboardItem {
    ClipboardItem {
        mime_type: "image/png".into(),
        data: PNG.to_vec(),
        name: None,
    }
}

/// Run every pending resize and deferred action.
fn settle_pass(composer: &mut Composer) {
    composer.tick(Instant::now() + Duration::from_secs(1));
}

#[test]
fn test_wrapped_buffer_parses_to_one_snippet() {
    let (mut composer, _) = composer();
    let markers = SnippetMarkers::default();
    let body = "fn main() {\n    println!(\"hi\");\n}";
    composer.set_text(&markers.wrap(body));
    assert_eq!(
        composer.preview_segments(),
        vec![Segment::Snippet(body.to_string())]
    );
}

#[test]
fn test_prose_around_snippet_survives() {
    let (mut composer, _) = composer();
    composer.set_text("look at this:\n");
    composer.paste_text(&"line\n".repeat(30));
    composer.insert_at_cursor("thoughts?");

    let segments = composer.preview_segments();
    assert_eq!(segments.len(), 3);
    assert_eq!(segments[0], Segment::Prose("look at this:\n".into()));
    assert_eq!(segments[1], Segment::Snippet("line\n".repeat(30)));
    assert_eq!(segments[2], Segment::Prose("thoughts?".into()));
}

#[test]
fn test_oversized_paste_is_wrapped() {
    let (mut composer, _) = composer();
    let payload = "\n".repeat(25);
    composer.paste_text(&payload);

    let markers = SnippetMarkers::default();
    assert_eq!(
        composer.text(),
        format!("{}\n{payload}\n{}\n", markers.begin, markers.end)
    );
    assert_eq!(composer.preview_segments(), vec![Segment::Snippet(payload)]);
}

#[test]
fn test_long_single_line_paste_is_wrapped() {
    let config = Config {
        maximum_rows: 2,
        ..Config::default()
    };
    let (mut composer, _) = composer_with(&config);
    composer.paste_text(&"w".repeat(161));
    assert!(composer.text().starts_with("<<<snippet\n"));

    composer.clear();
    composer.paste_text(&"w".repeat(160));
    assert_eq!(composer.text(), "w".repeat(160));
}

#[test]
fn test_paste_with_markers_is_inserted_verbatim() {
    let (mut composer, _) = composer();
    let markers = SnippetMarkers::default();
    let already = markers.wrap(&"x\n".repeat(40));
    composer.paste_text(&already);
    assert_eq!(composer.text(), already);
    assert_eq!(composer.text().matches(&markers.begin).count(), 1);
    assert_eq!(composer.text().matches(&markers.end).count(), 1);
}

#[test]
fn test_insert_leaves_caret_after_text() {
    let (mut composer, _) = composer();
    composer.set_text("hello world");
    composer.set_selection(Selection::new(6, 11));
    let caret = composer.insert_at_cursor("rust");
    assert_eq!(composer.text(), "hello rust");
    assert_eq!(caret, Selection::caret(10));
    assert_eq!(composer.selection(), Selection::caret(10));
}

#[test]
fn test_is_empty_tracks_trimmed_buffer() {
    let (mut composer, _) = composer();
    assert!(composer.is_empty());
    for (text, empty) in [
        ("", true),
        ("   ", true),
        ("\n\t", true),
        ("x", false),
        (" x ", false),
    ] {
        composer.set_text(text);
        assert_eq!(composer.is_empty(), empty, "{text:?}");
    }
}

#[test]
fn test_enter_submits_and_resets() {
    let (mut composer, sink) = composer();
    type_text(&mut composer, "hello");
    assert!(!composer.is_empty());

    assert_eq!(
        composer.handle_key_event(key(KeyCode::Enter)),
        InputResult::Submitted
    );
    assert_eq!(sink.sent(), vec![("hello".to_string(), Vec::new())]);
    assert_eq!(composer.text(), "");
    assert!(composer.is_empty());
    assert!(composer.is_loading());
    assert_eq!(composer.mode(), CompositionMode::Collapsed);
    assert_eq!(composer.selection(), Selection::caret(0));

    settle_pass(&mut composer);
    assert!(composer.is_focused());
}

#[test]
fn test_enter_while_loading_does_nothing() {
    let (mut composer, sink) = composer();
    type_text(&mut composer, "one");
    composer.submit();
    type_text(&mut composer, "two");

    assert_eq!(
        composer.handle_key_event(key(KeyCode::Enter)),
        InputResult::Ignored
    );
    assert_eq!(sink.sent().len(), 1);
    assert_eq!(composer.text(), "two");

    assert!(composer.finish_send(SendId(0)));
    assert!(composer.submit());
    assert_eq!(sink.sent()[1].0, "two");
}

#[test]
fn test_late_result_for_cancelled_send_keeps_loading() {
    let (mut composer, sink) = composer();
    type_text(&mut composer, "a");
    composer.submit();
    assert!(composer.cancel());
    composer.set_text("b");
    assert!(composer.submit());

    // The first send's result arrives after the second went out.
    assert!(!composer.finish_send(SendId(0)));
    assert!(composer.is_loading());
    type_text(&mut composer, "c");
    assert!(!composer.submit());
    assert_eq!(sink.sent().len(), 2);

    assert!(composer.cancel());
    assert_eq!(sink.cancels(), 2);
    assert!(!composer.finish_send(SendId(1)));
}

#[test]
fn test_empty_submit_is_allowed() {
    let (mut composer, sink) = composer();
    assert!(composer.submit());
    assert_eq!(sink.sent(), vec![(String::new(), Vec::new())]);
}

#[test]
fn test_shift_enter_inserts_newline() {
    let (mut composer, sink) = composer();
    type_text(&mut composer, "a");
    let result = composer.handle_key_event(KeyEvent::new(KeyCode::Enter, KeyModifiers::SHIFT));
    assert_eq!(result, InputResult::Changed);
    composer.handle_key_event(KeyEvent::new(KeyCode::Enter, KeyModifiers::ALT));
    type_text(&mut composer, "b");

    assert_eq!(composer.text(), "a\n\nb");
    assert!(sink.sent().is_empty());
}

#[test]
fn test_shortcut_toggles_and_keeps_selection() {
    let registry = ShortcutRegistry::new();
    let (mut composer, _) = composer();
    composer.mount(&registry);
    composer.set_text("hello world");
    composer.set_selection(Selection::new(2, 7));

    composer.expand();
    assert!(composer.is_expanded());
    assert!(composer.page_scroll_locked());
    assert_eq!(composer.height(), ComposerHeight::Fill);
    settle_pass(&mut composer);

    let press = KeyEvent::new(
        KeyCode::Char('E'),
        shortcut::platform_modifier() | KeyModifiers::SHIFT,
    );
    let id = registry.dispatch(&press).unwrap();
    assert!(composer.handle_shortcut(id));
    settle_pass(&mut composer);

    assert_eq!(composer.mode(), CompositionMode::Collapsed);
    assert!(!composer.page_scroll_locked());
    assert_eq!(composer.selection(), Selection::new(2, 7));
    assert!(composer.is_focused());
}

#[test]
fn test_backward_selection_survives_expand() {
    let (mut composer, _) = composer();
    composer.set_text("hello world");
    for _ in 0..5 {
        composer.handle_key_event(KeyEvent::new(KeyCode::Left, KeyModifiers::SHIFT));
    }
    assert_eq!(composer.selection(), Selection::new(6, 11));

    composer.expand();
    settle_pass(&mut composer);
    composer.collapse();
    settle_pass(&mut composer);

    assert_eq!(composer.selection(), Selection::new(6, 11));
    // Shift+Left keeps growing the same backward selection.
    composer.handle_key_event(KeyEvent::new(KeyCode::Left, KeyModifiers::SHIFT));
    assert_eq!(composer.selection(), Selection::new(5, 11));
}

#[test]
fn test_dropping_composer_releases_shortcut() {
    let registry = ShortcutRegistry::new();
    let (mut composer, _) = composer();
    composer.mount(&registry);
    assert_eq!(registry.len(), 1);
    composer.unmount();
    assert!(registry.is_empty());

    composer.mount(&registry);
    drop(composer);
    assert!(registry.is_empty());
}

#[test]
fn test_selection_restored_after_blur() {
    let (mut composer, _) = composer();
    composer.set_text("abcdef");
    composer.set_selection(Selection::new(1, 3));
    composer.blur();
    assert!(!composer.is_focused());

    composer.set_selection(Selection::caret(6));
    composer.focus();
    settle_pass(&mut composer);
    assert_eq!(composer.selection(), Selection::new(1, 3));
}

#[test]
fn test_clear_discards_undo() {
    let (mut composer, _) = composer();
    type_text(&mut composer, "draft");
    composer.handle_key_event(KeyEvent::new(KeyCode::Char('z'), KeyModifiers::CONTROL));
    assert_eq!(composer.text(), "draf");
    assert!(composer.can_undo());

    composer.clear();
    assert!(!composer.can_undo());
    assert!(!composer.undo());
    assert_eq!(composer.text(), "");
    assert_eq!(composer.selection(), Selection::caret(0));
}

#[test]
fn test_noop_delete_keeps_no_undo_step() {
    let (mut composer, _) = composer();
    assert_eq!(
        composer.handle_key_event(key(KeyCode::Backspace)),
        InputResult::Ignored
    );
    assert!(!composer.can_undo());
}

#[tokio::test]
async fn test_image_cap_drops_extras() {
    let config = Config {
        maximum_image_attachments_per_message: 2,
        ..Config::default()
    };
    let (mut composer, _) = composer_with(&config);
    let mut paste = PasteEvent::default();
    for _ in 0..5 {
        paste = paste.with_item(png_item());
    }
    composer.handle_paste(paste);
    composer.settle_ingest().await;

    assert_eq!(composer.attachments().len(), 2);
    assert!(
        composer
            .attachments()
            .iter()
            .all(|a| a.is_image() && a.provenance == Provenance::Pasted)
    );

    // Cap already reached: nothing is even dispatched.
    composer.handle_paste(PasteEvent::default().with_item(png_item()));
    assert_eq!(composer.pending_ingest(), 0);
}

#[tokio::test]
async fn test_images_ignored_when_disallowed() {
    let config = Config {
        allow_image_attachment: AllowImageAttachment::No,
        ..Config::default()
    };
    let (mut composer, sink) = composer_with(&config);
    composer.handle_paste(PasteEvent::from_text("caption").with_item(png_item()));
    assert_eq!(composer.pending_ingest(), 0);
    composer.settle_ingest().await;

    assert!(composer.attachments().is_empty());
    assert_eq!(composer.text(), "caption");
    composer.submit();
    assert!(sink.sent()[0].1.is_empty());
}

#[tokio::test]
async fn test_warn_mode_accepts_and_flags() {
    let config = Config {
        allow_image_attachment: AllowImageAttachment::Warn,
        ..Config::default()
    };
    let (mut composer, sink) = composer_with(&config);
    assert!(!composer.image_warning());
    composer.handle_paste(PasteEvent::default().with_item(png_item()));
    composer.settle_ingest().await;

    assert!(composer.image_warning());
    assert_eq!(composer.attachments().len(), 1);
    composer.submit();
    assert_eq!(sink.sent()[0].1.len(), 1);
    assert!(!composer.image_warning());
}

#[tokio::test]
async fn test_submit_forwards_attachments() {
    let (mut composer, sink) = composer();
    composer.handle_paste(PasteEvent::from_text("see image").with_item(png_item()));
    composer.settle_ingest().await;
    composer.submit();

    let sent = sink.sent();
    assert_eq!(sent[0].0, "see image");
    assert_eq!(sent[0].1.len(), 1);
    assert_eq!(sent[0].1[0].filename, "pasted.png");
    assert!(composer.attachments().is_empty());
}

#[tokio::test]
async fn test_picked_text_file_is_inlined() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("notes.txt");
    std::fs::write(&path, "alpha\nbeta").unwrap();

    let (mut composer, _) = composer();
    composer.set_text("context: ");
    composer.pick_files([path]);
    composer.settle_ingest().await;

    assert_eq!(
        composer.text(),
        "context: File: notes.txt:\n<<<snippet\nalpha\nbeta\nsnippet>>>\n"
    );
    assert!(composer.attachments().is_empty());
    assert_eq!(
        composer.preview_segments(),
        vec![
            Segment::Prose("context: File: notes.txt:\n".into()),
            Segment::Snippet("alpha\nbeta".into()),
        ]
    );
}

#[tokio::test]
async fn test_picked_image_has_picked_provenance() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("diagram.png");
    std::fs::write(&path, PNG).unwrap();

    let (mut composer, _) = composer();
    composer.pick_files([path]);
    composer.settle_ingest().await;

    let attachments = composer.attachments();
    assert_eq!(attachments.len(), 1);
    assert_eq!(attachments[0].provenance, Provenance::Picked);
    assert_eq!(attachments[0].filename, "diagram.png");
    assert_eq!(composer.text(), "");
}

#[tokio::test]
async fn test_unreadable_file_changes_nothing() {
    let dir = TempDir::new().unwrap();
    let binary = dir.path().join("blob.dat");
    std::fs::write(&binary, [0xff, 0xfe, 0xfd]).unwrap();

    let (mut composer, _) = composer();
    composer.set_text("keep me");
    composer.pick_files([dir.path().join("missing.txt"), binary]);
    composer.settle_ingest().await;

    assert_eq!(composer.text(), "keep me");
    assert!(composer.attachments().is_empty());
    assert_eq!(composer.pending_ingest(), 0);
}

#[tokio::test]
async fn test_remove_attachments() {
    let (mut composer, _) = composer();
    let paste = PasteEvent::default()
        .with_item(png_item())
        .with_item(png_item());
    composer.handle_paste(paste);
    composer.settle_ingest().await;
    assert_eq!(composer.attachments().len(), 2);

    let first = composer.attachments()[0].id;
    assert!(composer.remove_attachment(first).is_some());
    assert!(composer.remove_attachment(first).is_none());

    let result = composer.handle_key_event(KeyEvent::new(KeyCode::Char('x'), KeyModifiers::CONTROL));
    assert_eq!(result, InputResult::Moved);
    assert!(composer.attachments().is_empty());
}

#[tokio::test]
async fn test_tick_applies_finished_ingestion() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("a.md");
    std::fs::write(&path, "# A").unwrap();

    let (mut composer, _) = composer();
    composer.pick_files([path]);
    while composer.pending_ingest() > 0 {
        composer.tick(Instant::now());
        tokio::task::yield_now().await;
    }
    assert!(composer.text().contains("# A"));
}

#[test]
fn test_cancel_keeps_draft() {
    let (mut composer, sink) = composer();
    assert!(!composer.cancel());
    assert_eq!(sink.cancels(), 0);

    type_text(&mut composer, "first");
    composer.submit();
    type_text(&mut composer, "second");
    composer.expand();

    assert_eq!(
        composer.handle_key_event(key(KeyCode::Esc)),
        InputResult::Cancelled
    );
    assert_eq!(sink.cancels(), 1);
    assert!(!composer.is_loading());
    assert_eq!(composer.mode(), CompositionMode::Collapsed);
    assert_eq!(composer.text(), "second");
}

#[test]
fn test_esc_collapses_when_idle() {
    let (mut composer, sink) = composer();
    composer.expand();
    assert_eq!(composer.handle_key_event(key(KeyCode::Esc)), InputResult::Moved);
    assert!(!composer.is_expanded());
    assert_eq!(composer.handle_key_event(key(KeyCode::Esc)), InputResult::Ignored);
    assert_eq!(sink.cancels(), 0);
}

#[test]
fn test_height_follows_content_after_debounce() {
    let (mut composer, _) = composer();
    composer.set_viewport(40, 50);
    composer.resize_text_area();
    assert_eq!(
        composer.height(),
        ComposerHeight::Rows {
            rows: 1,
            scrolls: false
        }
    );

    composer.set_text(&"row\n".repeat(44));
    // Not due yet.
    composer.tick(Instant::now());
    assert_eq!(
        composer.height(),
        ComposerHeight::Rows {
            rows: 1,
            scrolls: false
        }
    );

    settle_pass(&mut composer);
    assert_eq!(
        composer.height(),
        ComposerHeight::Rows {
            rows: 20,
            scrolls: true
        }
    );
    let layout = composer.layout(40);
    assert_eq!(layout.visible_rows, 20);
    assert_eq!(layout.scroll_offset, 25);
    assert_eq!(layout.cursor, (0, 19));
}

#[test]
fn test_handle_reset_and_clear_input() {
    let (mut composer, _) = composer();
    composer.set_text("text");
    composer.clear_input_value();
    assert_eq!(composer.text_value(), "");

    composer.set_text("more");
    composer.expand();
    composer.reset();
    assert_eq!(composer.text_value(), "");
    assert!(!composer.is_expanded());
}

#[test]
fn test_word_and_selection_keys() {
    let (mut composer, _) = composer();
    type_text(&mut composer, "one two");
    composer.handle_key_event(KeyEvent::new(KeyCode::Left, KeyModifiers::SHIFT));
    composer.handle_key_event(KeyEvent::new(KeyCode::Left, KeyModifiers::SHIFT));
    assert_eq!(composer.selection(), Selection::new(5, 7));

    type_text(&mut composer, "en");
    assert_eq!(composer.text(), "one ten");

    composer.handle_key_event(KeyEvent::new(KeyCode::Char('w'), KeyModifiers::CONTROL));
    assert_eq!(composer.text(), "one ");
    composer.handle_key_event(KeyEvent::new(KeyCode::Char('u'), KeyModifiers::CONTROL));
    assert!(composer.is_empty());
}

#[test]
fn test_disallowed_picked_image_is_not_dispatched() {
    let config = Config {
        allow_image_attachment: AllowImageAttachment::No,
        ..Config::default()
    };
    let (mut composer, _) = composer_with(&config);
    composer.pick_files([PathBuf::from("skip.png")]);
    assert_eq!(composer.pending_ingest(), 0);
}
