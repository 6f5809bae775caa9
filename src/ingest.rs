//! Asynchronous ingestion of images and text files.
//!
//! Decoding runs on tokio tasks. Results come back over an unbounded channel
//! and are applied by the composer in the order they finish, not the order
//! they were started.

use crate::attachment::Provenance;
use crate::error::{Error, Result};
use async_trait::async_trait;
use base64::Engine;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Image extensions and their MIME types.
const IMAGE_FORMATS: &[(&str, &str)] = &[
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
];

/// Maximum image size (20MB).
const MAX_IMAGE_SIZE: u64 = 20 * 1024 * 1024;

/// Maximum text file size (500KB).
const MAX_TEXT_SIZE: u64 = 500 * 1024;

/// MIME type for a path with a supported image extension.
#[must_use]
pub fn image_mime_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    IMAGE_FORMATS
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, mime)| *mime)
}

fn is_supported_image_mime(mime: &str) -> bool {
    IMAGE_FORMATS.iter().any(|(_, m)| *m == mime)
}

fn extension_for_mime(mime: &str) -> &'static str {
    IMAGE_FORMATS
        .iter()
        .find(|(_, m)| *m == mime)
        .map_or("bin", |(e, _)| *e)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Raw image handed to the normalizer.
#[derive(Debug, Clone)]
pub enum ImageSource {
    Clipboard {
        data: Vec<u8>,
        mime_type: String,
        name: Option<String>,
    },
    File(PathBuf),
}

/// Encoded image ready to attach.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedImage {
    /// Base64 payload.
    pub data: String,
    pub mime_type: String,
    pub filename: String,
}

#[async_trait]
pub trait ImageNormalizer: Send + Sync {
    async fn normalize(&self, source: ImageSource) -> Result<NormalizedImage>;
}

#[async_trait]
pub trait TextDecoder: Send + Sync {
    async fn decode(&self, path: &Path) -> Result<String>;
}

/// Validates format and size, then base64-encodes the bytes.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsImageNormalizer;

#[async_trait]
impl ImageNormalizer for FsImageNormalizer {
    async fn normalize(&self, source: ImageSource) -> Result<NormalizedImage> {
        let (bytes, mime_type, filename) = match source {
            ImageSource::Clipboard {
                data,
                mime_type,
                name,
            } => {
                if !is_supported_image_mime(&mime_type) {
                    return Err(Error::Unsupported(mime_type));
                }
                let filename =
                    name.unwrap_or_else(|| format!("pasted.{}", extension_for_mime(&mime_type)));
                (data, mime_type, filename)
            }
            ImageSource::File(path) => {
                let mime_type = image_mime_for_path(&path)
                    .ok_or_else(|| Error::Unsupported(path.display().to_string()))?;
                // Check size before reading
                let size = tokio::fs::metadata(&path).await?.len();
                if size > MAX_IMAGE_SIZE {
                    return Err(Error::TooLarge {
                        size,
                        max: MAX_IMAGE_SIZE,
                    });
                }
                let data = tokio::fs::read(&path).await?;
                (data, mime_type.to_string(), file_name(&path))
            }
        };

        let size = bytes.len() as u64;
        if size > MAX_IMAGE_SIZE {
            return Err(Error::TooLarge {
                size,
                max: MAX_IMAGE_SIZE,
            });
        }

        Ok(NormalizedImage {
            data: base64::engine::general_purpose::STANDARD.encode(&bytes),
            mime_type,
            filename,
        })
    }
}

/// Reads a file as UTF-8.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsTextDecoder;

#[async_trait]
impl TextDecoder for FsTextDecoder {
    async fn decode(&self, path: &Path) -> Result<String> {
        let size = tokio::fs::metadata(path).await?.len();
        if size > MAX_TEXT_SIZE {
            return Err(Error::TooLarge {
                size,
                max: MAX_TEXT_SIZE,
            });
        }
        let bytes = tokio::fs::read(path).await?;
        String::from_utf8(bytes)
            .map_err(|e| Error::Decode(format!("{}: {e}", path.display())))
    }
}

/// A finished decode.
#[derive(Debug)]
pub enum IngestEvent {
    Image {
        provenance: Provenance,
        result: Result<NormalizedImage>,
    },
    TextFile {
        name: String,
        path: PathBuf,
        result: Result<String>,
    },
}

/// Dispatches decode jobs and collects their results.
pub struct Ingestor {
    normalizer: Arc<dyn ImageNormalizer>,
    decoder: Arc<dyn TextDecoder>,
    tx: mpsc::UnboundedSender<IngestEvent>,
    rx: mpsc::UnboundedReceiver<IngestEvent>,
    pending: usize,
}

impl Default for Ingestor {
    fn default() -> Self {
        Self::new(Arc::new(FsImageNormalizer), Arc::new(FsTextDecoder))
    }
}

impl Ingestor {
    pub fn new(normalizer: Arc<dyn ImageNormalizer>, decoder: Arc<dyn TextDecoder>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            normalizer,
            decoder,
            tx,
            rx,
            pending: 0,
        }
    }

    /// Start normalizing an image. Must be called inside a tokio runtime.
    pub fn spawn_image(&mut self, source: ImageSource, provenance: Provenance) {
        self.pending += 1;
        let normalizer = Arc::clone(&self.normalizer);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = normalizer.normalize(source).await;
            let _ = tx.send(IngestEvent::Image { provenance, result });
        });
    }

    /// Start decoding a text file. Must be called inside a tokio runtime.
    pub fn spawn_text_file(&mut self, path: PathBuf) {
        self.pending += 1;
        let decoder = Arc::clone(&self.decoder);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = decoder.decode(&path).await;
            let name = file_name(&path);
            let _ = tx.send(IngestEvent::TextFile { name, path, result });
        });
    }

    /// Jobs started but not yet collected.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending
    }

    /// Next finished job, without waiting.
    pub fn try_next(&mut self) -> Option<IngestEvent> {
        let event = self.rx.try_recv().ok()?;
        self.pending = self.pending.saturating_sub(1);
        Some(event)
    }

    /// Wait for the next finished job. Returns None when nothing is pending.
    pub async fn next(&mut self) -> Option<IngestEvent> {
        if self.pending == 0 {
            return None;
        }
        let event = self.rx.recv().await?;
        self.pending -= 1;
        Some(event)
    }
}
