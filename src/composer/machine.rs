//! The composer: owns the buffer and drives every input path through it.

use super::buffer::ComposerBuffer;
use super::paste::{PasteEvent, TextPaste, classify_text};
use super::resize::{ComposerHeight, CompositionMode, ResizeScheduler, compute_height};
use super::selection::{Selection, SelectionTracker};
use super::shortcut::{ShortcutId, ShortcutRegistry, ShortcutSubscription, toggle_expand_binding};
use super::state::ComposerState;
use crate::attachment::{Attachment, AttachmentStore, Provenance};
use crate::config::{AllowImageAttachment, Config};
use crate::ingest::{IngestEvent, Ingestor, ImageSource, image_mime_for_path};
use crate::sink::{MessageSink, SendId};
use crate::snippet::{Segment, SnippetMarkers, parse_segments};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, error, trace, warn};
use uuid::Uuid;

/// Terminal rows per text line.
const LINE_HEIGHT: u16 = 1;

/// Work queued during an event and run at the end of the pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Deferred {
    RestoreFocus,
    ScrollToBottom,
}

/// Where the text area sits after a layout pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextAreaLayout {
    /// Rows the text area occupies on screen.
    pub visible_rows: u16,
    /// First content row shown.
    pub scroll_offset: usize,
    /// Cursor relative to the text area's top-left, already scrolled.
    pub cursor: (u16, u16),
}

/// Surface other components use to drive the composer.
pub trait ComposerHandle {
    fn clear_input_value(&mut self);
    fn text_value(&self) -> String;
    fn reset(&mut self);
    fn resize_text_area(&mut self);
    fn focus_text_area(&mut self);
    fn paste_text(&mut self, text: &str);
}

pub struct Composer {
    allow_images: AllowImageAttachment,
    max_rows: usize,
    markers: SnippetMarkers,

    pub(super) buffer: ComposerBuffer,
    pub(super) state: ComposerState,
    attachments: AttachmentStore,
    tracker: SelectionTracker,

    resize: ResizeScheduler,
    height: ComposerHeight,
    viewport_width: usize,
    available_rows: u16,

    mode: CompositionMode,
    is_empty: bool,
    /// The send awaiting a result; set means loading.
    outstanding: Option<SendId>,
    focused: bool,
    page_scroll_locked: bool,
    image_warning: bool,
    deferred: Vec<Deferred>,

    ingest: Ingestor,
    sink: Box<dyn MessageSink>,
    shortcut: Option<ShortcutSubscription>,
}

impl Composer {
    pub fn new(config: &Config, sink: Box<dyn MessageSink>) -> Self {
        Self {
            allow_images: config.allow_image_attachment,
            max_rows: config.maximum_rows.max(1),
            markers: config.markers(),
            buffer: ComposerBuffer::new(),
            state: ComposerState::new(),
            attachments: AttachmentStore::new(config.maximum_image_attachments_per_message),
            tracker: SelectionTracker::default(),
            resize: ResizeScheduler::new(config.resize_debounce()),
            height: ComposerHeight::default(),
            viewport_width: 0,
            available_rows: u16::try_from(config.maximum_rows).unwrap_or(u16::MAX),
            mode: CompositionMode::Collapsed,
            is_empty: true,
            outstanding: None,
            focused: true,
            page_scroll_locked: false,
            image_warning: false,
            deferred: Vec::new(),
            ingest: Ingestor::default(),
            sink,
            shortcut: None,
        }
    }

    /// Replace the ingestion backend.
    #[must_use]
    pub fn with_ingestor(mut self, ingest: Ingestor) -> Self {
        self.ingest = ingest;
        self
    }

    // --- Buffer ---

    /// Replace the whole buffer and put the cursor at the end.
    pub fn set_text(&mut self, value: &str) {
        self.buffer.snapshot();
        self.buffer.set_content(value);
        self.state.move_to_end(&self.buffer);
        self.content_changed();
    }

    /// Replace the selection with `text`, leaving a caret right after it.
    pub fn insert_at_cursor(&mut self, text: &str) -> Selection {
        self.buffer.snapshot();
        let caret = self.state.insert_str(&mut self.buffer, text);
        self.content_changed();
        if self.content_rows() > usize::from(self.visible_rows()) {
            self.defer(Deferred::ScrollToBottom);
        }
        caret
    }

    /// Empty the buffer and attachments and forget undo history.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.buffer.clear_undo();
        self.attachments.clear();
        self.state.reset();
        self.image_warning = false;
        self.content_changed();
    }

    /// Undo the last edit. Returns false when there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        if !self.buffer.undo() {
            return false;
        }
        let len = self.buffer.len_chars();
        self.state.set_cursor(self.state.cursor().min(len), len);
        self.content_changed();
        true
    }

    /// Called after every text mutation.
    pub(super) fn content_changed(&mut self) {
        self.is_empty = self.buffer.is_blank();
        self.resize.request(Instant::now());
    }

    // --- Send lifecycle ---

    /// Hand the buffer and attachments to the sink and reset.
    ///
    /// Returns false while a previous send is outstanding.
    pub fn submit(&mut self) -> bool {
        if self.outstanding.is_some() {
            debug!("Submit ignored while a send is outstanding");
            return false;
        }
        self.tracker.capture(self.state.anchored());
        let text = self.buffer.get_content();
        let attachments = if self.allow_images.allows_images() {
            self.attachments.take_all()
        } else {
            Vec::new()
        };
        self.clear();
        self.outstanding = Some(self.sink.send(text, attachments));
        self.set_mode(CompositionMode::Collapsed);
        true
    }

    /// Abort the outstanding send. Buffer and attachments are left alone.
    pub fn cancel(&mut self) -> bool {
        let Some(id) = self.outstanding.take() else {
            return false;
        };
        debug!(id = id.0, "Cancelling outstanding send");
        self.sink.cancel();
        self.set_mode(CompositionMode::Collapsed);
        true
    }

    /// The host reports send `id` completed. Results for sends that were
    /// already cancelled are ignored; returns whether loading ended.
    pub fn finish_send(&mut self, id: SendId) -> bool {
        if self.outstanding != Some(id) {
            trace!(id = id.0, "Ignoring result for a stale send");
            return false;
        }
        self.outstanding = None;
        true
    }

    // --- Mode ---

    pub fn expand(&mut self) {
        self.set_mode(CompositionMode::Expanded);
    }

    pub fn collapse(&mut self) {
        self.set_mode(CompositionMode::Collapsed);
    }

    pub fn toggle_mode(&mut self) {
        match self.mode {
            CompositionMode::Collapsed => self.expand(),
            CompositionMode::Expanded => self.collapse(),
        }
    }

    fn set_mode(&mut self, mode: CompositionMode) {
        self.tracker.capture(self.state.anchored());
        self.focused = false;
        self.mode = mode;
        self.page_scroll_locked = mode == CompositionMode::Expanded;
        self.recompute_height();
        self.defer(Deferred::RestoreFocus);
    }

    // --- Event pass ---

    fn defer(&mut self, action: Deferred) {
        if !self.deferred.contains(&action) {
            self.deferred.push(action);
        }
    }

    /// End of an event pass: apply finished ingestion, run a due resize,
    /// then the deferred actions. Returns true when anything changed.
    pub fn tick(&mut self, now: Instant) -> bool {
        let mut changed = self.drain_ingest() > 0;
        if self.resize.poll(now) {
            self.recompute_height();
            changed = true;
        }
        for action in std::mem::take(&mut self.deferred) {
            changed = true;
            match action {
                Deferred::RestoreFocus => {
                    self.focused = true;
                    let len = self.buffer.len_chars();
                    if let Some(selection) = self.tracker.take(len) {
                        self.state.restore(selection, len);
                    }
                }
                Deferred::ScrollToBottom => {
                    let visible = usize::from(self.visible_rows());
                    self.state.scroll_to_bottom(visible, self.content_rows());
                }
            }
        }
        changed
    }

    /// Time until a pending resize is due.
    #[must_use]
    pub fn next_deadline(&self, now: Instant) -> Option<Duration> {
        self.resize.time_until_due(now)
    }

    // --- Paste and ingestion ---

    /// Route a paste: images to ingestion, text through the classifier.
    pub fn handle_paste(&mut self, event: PasteEvent) {
        for item in event.items.into_iter().filter(|item| item.is_image()) {
            if !self.allow_images.allows_images() {
                trace!(mime = %item.mime_type, "Image attachments disabled, ignoring paste");
                continue;
            }
            if !self.attachments.can_accept_image() {
                trace!("Image limit reached, dropping pasted image");
                continue;
            }
            self.ingest.spawn_image(
                ImageSource::Clipboard {
                    data: item.data,
                    mime_type: item.mime_type,
                    name: item.name,
                },
                Provenance::Pasted,
            );
        }

        if let Some(text) = event.text
            && !text.is_empty()
        {
            self.insert_pasted_text(&text);
        }
    }

    fn insert_pasted_text(&mut self, text: &str) {
        match classify_text(text, &self.markers, self.max_rows) {
            TextPaste::Native => {
                self.insert_at_cursor(text);
            }
            TextPaste::Wrap(wrapped) => {
                debug!(chars = text.chars().count(), "Wrapping oversized paste");
                self.insert_at_cursor(&wrapped);
            }
        }
    }

    /// Attach files: images become attachments, everything else is inlined
    /// as a `File:` snippet once decoded.
    pub fn pick_files(&mut self, paths: impl IntoIterator<Item = PathBuf>) {
        for path in paths {
            if image_mime_for_path(&path).is_some() {
                if !self.allow_images.allows_images() {
                    trace!(path = %path.display(), "Image attachments disabled, ignoring file");
                } else if !self.attachments.can_accept_image() {
                    trace!(path = %path.display(), "Image limit reached, dropping file");
                } else {
                    self.ingest.spawn_image(ImageSource::File(path), Provenance::Picked);
                }
            } else {
                self.ingest.spawn_text_file(path);
            }
        }
    }

    /// Apply every finished ingestion job without waiting.
    pub fn drain_ingest(&mut self) -> usize {
        let mut applied = 0;
        while let Some(event) = self.ingest.try_next() {
            self.apply_ingest(event);
            applied += 1;
        }
        applied
    }

    /// Wait for and apply every outstanding ingestion job.
    pub async fn settle_ingest(&mut self) {
        while let Some(event) = self.ingest.next().await {
            self.apply_ingest(event);
        }
    }

    #[must_use]
    pub fn pending_ingest(&self) -> usize {
        self.ingest.pending()
    }

    fn apply_ingest(&mut self, event: IngestEvent) {
        match event {
            IngestEvent::Image {
                provenance,
                result: Ok(image),
            } => {
                if !self.allow_images.allows_images() {
                    return;
                }
                if self.allow_images == AllowImageAttachment::Warn {
                    warn!(file = %image.filename, "Image attached while image support is flagged");
                    self.image_warning = true;
                }
                let attachment =
                    Attachment::image(image.data, image.mime_type, provenance, image.filename);
                if !self.attachments.push(attachment) {
                    trace!("Image limit reached, dropping decoded image");
                }
            }
            IngestEvent::Image { result: Err(e), .. } => {
                error!("Failed to attach image: {e}");
            }
            IngestEvent::TextFile {
                name,
                result: Ok(text),
                ..
            } => {
                let block = self.markers.wrap_file(&name, &text);
                self.insert_at_cursor(&block);
            }
            IngestEvent::TextFile {
                path,
                result: Err(e),
                ..
            } => {
                error!(path = %path.display(), "Failed to read file: {e}");
            }
        }
    }

    // --- Attachments ---

    pub fn remove_attachment(&mut self, id: Uuid) -> Option<Attachment> {
        self.attachments.remove(id)
    }

    pub fn remove_last_attachment(&mut self) -> Option<Attachment> {
        self.attachments.pop()
    }

    // --- Global shortcut ---

    /// Register the expand/collapse shortcut. Dropping the composer, or
    /// calling [`Composer::unmount`], releases it.
    pub fn mount(&mut self, registry: &ShortcutRegistry) {
        self.shortcut = Some(registry.subscribe(toggle_expand_binding()));
    }

    pub fn unmount(&mut self) {
        self.shortcut = None;
    }

    #[must_use]
    pub fn owns_shortcut(&self, id: ShortcutId) -> bool {
        self.shortcut.as_ref().is_some_and(|s| s.id() == id)
    }

    /// Run the shortcut if it is ours.
    pub fn handle_shortcut(&mut self, id: ShortcutId) -> bool {
        if !self.owns_shortcut(id) {
            return false;
        }
        self.toggle_mode();
        true
    }

    // --- Layout ---

    /// Terminal resize: new text width and the rows available to the composer.
    pub fn set_viewport(&mut self, width: usize, available_rows: u16) {
        if width != self.viewport_width {
            self.state.invalidate_width();
        }
        self.viewport_width = width;
        self.available_rows = available_rows;
        self.resize.request(Instant::now());
    }

    /// Recompute the height now and drop any pending request.
    pub fn recompute_height(&mut self) {
        self.resize.cancel();
        let rows = self.content_rows();
        self.height = compute_height(rows, LINE_HEIGHT, self.max_rows, self.mode);
        let visible = usize::from(self.visible_rows());
        if rows > visible {
            self.state.scroll_to_bottom(visible, rows);
        }
    }

    fn content_rows(&self) -> usize {
        ComposerState::row_count(&self.buffer, self.viewport_width)
    }

    fn visible_rows(&self) -> u16 {
        self.height.visible_rows(self.available_rows).max(1)
    }

    /// Lay out the text area at `width` for drawing.
    pub fn layout(&mut self, width: usize) -> TextAreaLayout {
        let (x, y) = self.state.layout_cursor(&self.buffer, width);
        let visible_rows = self.visible_rows();
        let total = ComposerState::row_count(&self.buffer, width);
        self.state.scroll_to_cursor(usize::from(visible_rows), total);
        let scroll_offset = self.state.scroll_offset();
        let row = usize::from(y).saturating_sub(scroll_offset);
        TextAreaLayout {
            visible_rows,
            scroll_offset,
            cursor: (x, u16::try_from(row).unwrap_or(u16::MAX)),
        }
    }

    /// The buffer split into prose and snippets for the live preview.
    #[must_use]
    pub fn preview_segments(&self) -> Vec<Segment> {
        parse_segments(&self.buffer.get_content(), &self.markers)
    }

    // --- Focus ---

    /// The text area lost focus; remember where the selection was.
    pub fn blur(&mut self) {
        self.tracker.capture(self.state.anchored());
        self.focused = false;
    }

    pub fn focus(&mut self) {
        self.defer(Deferred::RestoreFocus);
    }

    // --- Accessors ---

    #[must_use]
    pub fn text(&self) -> String {
        self.buffer.get_content()
    }

    #[must_use]
    pub fn selection(&self) -> Selection {
        self.state.selection()
    }

    /// Place the selection, clamped to the buffer.
    pub fn set_selection(&mut self, selection: Selection) {
        self.state.set_selection(selection, self.buffer.len_chars());
    }

    #[must_use]
    pub fn attachments(&self) -> &[Attachment] {
        self.attachments.as_slice()
    }

    #[must_use]
    pub fn mode(&self) -> CompositionMode {
        self.mode
    }

    #[must_use]
    pub fn is_expanded(&self) -> bool {
        self.mode == CompositionMode::Expanded
    }

    #[must_use]
    pub fn height(&self) -> ComposerHeight {
        self.height
    }

    /// True when the buffer is empty or whitespace only.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.is_empty
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.outstanding.is_some()
    }

    #[must_use]
    pub fn is_focused(&self) -> bool {
        self.focused
    }

    #[must_use]
    pub fn page_scroll_locked(&self) -> bool {
        self.page_scroll_locked
    }

    /// An image was accepted under `warn` mode.
    #[must_use]
    pub fn image_warning(&self) -> bool {
        self.image_warning
    }

    #[must_use]
    pub fn markers(&self) -> &SnippetMarkers {
        &self.markers
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.buffer.can_undo()
    }
}

impl ComposerHandle for Composer {
    fn clear_input_value(&mut self) {
        self.set_text("");
    }

    fn text_value(&self) -> String {
        self.text()
    }

    fn reset(&mut self) {
        self.clear();
        self.collapse();
    }

    fn resize_text_area(&mut self) {
        self.recompute_height();
    }

    fn focus_text_area(&mut self) {
        self.focus();
    }

    fn paste_text(&mut self, text: &str) {
        self.handle_paste(PasteEvent::from_text(text));
    }
}
