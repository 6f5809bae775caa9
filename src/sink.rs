//! Where submitted messages go.

use crate::attachment::Attachment;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Identifies one send so late results can be matched to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SendId(pub u64);

/// Receives finished messages from the composer.
pub trait MessageSink {
    fn send(&mut self, text: String, attachments: Vec<Attachment>) -> SendId;

    /// Abort the outstanding send, if any.
    fn cancel(&mut self);
}

/// A submitted message plus the token that aborts its delivery.
#[derive(Debug)]
pub struct OutgoingMessage {
    pub id: SendId,
    pub text: String,
    pub attachments: Vec<Attachment>,
    pub abort: CancellationToken,
}

/// Forwards messages over a channel. Each send gets a fresh token; `cancel`
/// trips the latest one.
#[derive(Debug)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<OutgoingMessage>,
    current: Option<CancellationToken>,
    next_id: u64,
}

impl ChannelSink {
    #[must_use]
    pub fn new(tx: mpsc::UnboundedSender<OutgoingMessage>) -> Self {
        Self {
            tx,
            current: None,
            next_id: 0,
        }
    }

    /// Sink plus the receiving end.
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<OutgoingMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }
}

impl MessageSink for ChannelSink {
    fn send(&mut self, text: String, attachments: Vec<Attachment>) -> SendId {
        let id = SendId(self.next_id);
        self.next_id += 1;
        let abort = CancellationToken::new();
        self.current = Some(abort.clone());
        debug!(
            id = id.0,
            chars = text.chars().count(),
            attachments = attachments.len(),
            "Sending message"
        );
        if self
            .tx
            .send(OutgoingMessage {
                id,
                text,
                attachments,
                abort,
            })
            .is_err()
        {
            debug!("Message receiver dropped");
        }
        id
    }

    fn cancel(&mut self) {
        if let Some(token) = self.current.take() {
            token.cancel();
        }
    }
}
