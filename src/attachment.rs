//! Pending attachments for the message being composed.

use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentKind {
    Image,
    Text,
}

/// Where an attachment came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    /// Clipboard paste.
    Pasted,
    /// File chosen by the user.
    Picked,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attachment {
    pub id: Uuid,
    pub kind: AttachmentKind,
    /// Base64 for images, raw UTF-8 for text.
    pub payload: String,
    pub mime_type: String,
    pub provenance: Provenance,
    pub filename: String,
}

impl Attachment {
    pub fn image(
        payload: String,
        mime_type: impl Into<String>,
        provenance: Provenance,
        filename: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: AttachmentKind::Image,
            payload,
            mime_type: mime_type.into(),
            provenance,
            filename: filename.into(),
        }
    }

    #[must_use]
    pub fn is_image(&self) -> bool {
        self.kind == AttachmentKind::Image
    }
}

/// Ordered attachment list with a cap on images.
///
/// Images pushed past the cap are dropped without error; callers can tell
/// from the return value of [`AttachmentStore::push`].
#[derive(Debug, Clone, Default)]
pub struct AttachmentStore {
    items: Vec<Attachment>,
    max_images: usize,
}

impl AttachmentStore {
    #[must_use]
    pub fn new(max_images: usize) -> Self {
        Self {
            items: Vec::new(),
            max_images,
        }
    }

    /// Append an attachment. Returns false if it was dropped by the image cap.
    pub fn push(&mut self, attachment: Attachment) -> bool {
        if attachment.is_image() && !self.can_accept_image() {
            return false;
        }
        self.items.push(attachment);
        true
    }

    #[must_use]
    pub fn can_accept_image(&self) -> bool {
        self.image_count() < self.max_images
    }

    #[must_use]
    pub fn image_count(&self) -> usize {
        self.items.iter().filter(|a| a.is_image()).count()
    }

    #[must_use]
    pub fn max_images(&self) -> usize {
        self.max_images
    }

    pub fn remove(&mut self, id: Uuid) -> Option<Attachment> {
        let idx = self.items.iter().position(|a| a.id == id)?;
        Some(self.items.remove(idx))
    }

    pub fn pop(&mut self) -> Option<Attachment> {
        self.items.pop()
    }

    /// Drain everything, leaving the store empty.
    pub fn take_all(&mut self) -> Vec<Attachment> {
        std::mem::take(&mut self.items)
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Attachment] {
        &self.items
    }

    pub fn iter(&self) -> impl Iterator<Item = &Attachment> {
        self.items.iter()
    }
}
