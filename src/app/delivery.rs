//! Delivery of submitted messages.
//!
//! Stands in for the network: each message is held briefly so it can be
//! cancelled, then appended to the transcript (if any) and reported back.

use crate::attachment::Attachment;
use crate::error::Result;
use crate::sink::{OutgoingMessage, SendId};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tracing::{debug, error};

/// How long a message stays cancellable before it is delivered.
pub const DELIVERY_LATENCY: Duration = Duration::from_millis(400);

/// Result of one send, tagged with the send it belongs to.
#[derive(Debug)]
pub struct Delivery {
    pub id: SendId,
    pub outcome: Outcome,
}

#[derive(Debug)]
pub enum Outcome {
    Sent {
        text: String,
        attachments: Vec<Attachment>,
    },
    Cancelled,
    Failed(String),
}

#[derive(Serialize)]
struct TranscriptEntry<'a> {
    sent_at: u64,
    text: &'a str,
    attachments: &'a [Attachment],
}

async fn append_transcript(path: &Path, text: &str, attachments: &[Attachment]) -> Result<()> {
    let sent_at = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs());
    let mut line = serde_json::to_string(&TranscriptEntry {
        sent_at,
        text,
        attachments,
    })?;
    line.push('\n');

    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(line.as_bytes()).await?;
    file.flush().await?;
    Ok(())
}

/// Deliver messages one at a time until either channel closes.
pub async fn deliver(
    mut outgoing: mpsc::UnboundedReceiver<OutgoingMessage>,
    events: mpsc::UnboundedSender<Delivery>,
    transcript: Option<PathBuf>,
    latency: Duration,
) {
    while let Some(message) = outgoing.recv().await {
        let cancelled = tokio::select! {
            () = message.abort.cancelled() => true,
            () = tokio::time::sleep(latency) => false,
        };

        let outcome = if cancelled {
            debug!(id = message.id.0, "Delivery cancelled");
            Outcome::Cancelled
        } else if let Some(path) = &transcript
            && let Err(e) = append_transcript(path, &message.text, &message.attachments).await
        {
            error!(path = %path.display(), "Failed to write transcript: {e}");
            Outcome::Failed(format!("Failed to write transcript: {e}"))
        } else {
            Outcome::Sent {
                text: message.text,
                attachments: message.attachments,
            }
        };

        let delivery = Delivery {
            id: message.id,
            outcome,
        };
        if events.send(delivery).is_err() {
            break;
        }
    }
}
