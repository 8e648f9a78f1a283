//! User-visible notices.
//!
//! Recoverable conditions (a clamped field, a rejected file, a failed upload)
//! are not errors for the caller; they are broadcast here for whatever UI is
//! listening. Publishing with no subscribers is fine.
//!
//! Subjects are dot-separated so a subscriber can filter by prefix:
//!
//! | Subject              | Notice                        |
//! |----------------------|-------------------------------|
//! | `field.truncated`    | [`Notice::FieldTruncated`]    |
//! | `image.rejected`     | [`Notice::ImageRejected`]     |
//! | `image.upload_failed`| [`Notice::UploadFailed`]      |
//! | `save.text_required` | [`Notice::TextContentRequired`] |

use std::time::Instant;

use dossier_doc::BlockField;
use dossier_types::BlockId;
use tokio::sync::broadcast;

use crate::constants::NOTICE_CHANNEL_CAPACITY;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notice {
    /// A value was cut to `max` characters.
    FieldTruncated { block: BlockId, field: BlockField, max: usize },
    /// The selected file is not an allowed still image.
    ImageRejected { block: BlockId, mime: String },
    /// Upload failed; the block was restored.
    UploadFailed { block: BlockId, reason: String },
    /// An explicit save needs at least one text block with a body.
    TextContentRequired,
}

impl Notice {
    pub fn subject(&self) -> &'static str {
        match self {
            Notice::FieldTruncated { .. } => "field.truncated",
            Notice::ImageRejected { .. } => "image.rejected",
            Notice::UploadFailed { .. } => "image.upload_failed",
            Notice::TextContentRequired => "save.text_required",
        }
    }
}

/// A published notice.
#[derive(Clone, Debug)]
pub struct NoticeMessage {
    pub notice: Notice,
    pub timestamp: Instant,
}

/// Broadcast bus for notices. Cloning shares the channel.
#[derive(Clone, Debug)]
pub struct NoticeBus {
    tx: broadcast::Sender<NoticeMessage>,
}

impl Default for NoticeBus {
    fn default() -> Self {
        Self::new(NOTICE_CHANNEL_CAPACITY)
    }
}

impl NoticeBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Returns the number of subscribers that received it.
    pub fn publish(&self, notice: Notice) -> usize {
        tracing::debug!(subject = notice.subject(), "notice");
        let msg = NoticeMessage {
            notice,
            timestamp: Instant::now(),
        };
        self.tx.send(msg).unwrap_or(0)
    }

    /// Subscribe to notices whose subject starts with `prefix` (`""` for all).
    pub fn subscribe(&self, prefix: &str) -> NoticeSubscription {
        NoticeSubscription {
            prefix: prefix.to_string(),
            rx: self.tx.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

pub struct NoticeSubscription {
    prefix: String,
    rx: broadcast::Receiver<NoticeMessage>,
}

impl NoticeSubscription {
    fn wants(&self, msg: &NoticeMessage) -> bool {
        msg.notice.subject().starts_with(&self.prefix)
    }

    /// Next matching notice. `None` once every bus handle is dropped.
    pub async fn recv(&mut self) -> Option<NoticeMessage> {
        loop {
            match self.rx.recv().await {
                Ok(msg) if self.wants(&msg) => return Some(msg),
                Ok(_) => {}
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(prefix = %self.prefix, lagged = n, "notice subscription lagged behind");
                }
            }
        }
    }

    /// Next matching notice without waiting.
    pub fn try_recv(&mut self) -> Option<NoticeMessage> {
        loop {
            match self.rx.try_recv() {
                Ok(msg) if self.wants(&msg) => return Some(msg),
                Ok(_) => {}
                Err(broadcast::error::TryRecvError::Empty)
                | Err(broadcast::error::TryRecvError::Closed) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    tracing::warn!(prefix = %self.prefix, lagged = n, "notice subscription lagged behind");
                }
            }
        }
    }

    /// Everything currently queued, in order.
    pub fn drain(&mut self) -> Vec<Notice> {
        std::iter::from_fn(|| self.try_recv()).map(|m| m.notice).collect()
    }
}

impl std::fmt::Debug for NoticeSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NoticeSubscription")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_without_subscribers() {
        let bus = NoticeBus::default();
        assert_eq!(bus.publish(Notice::TextContentRequired), 0);
    }

    #[test]
    fn test_prefix_filter() {
        let bus = NoticeBus::default();
        let mut images = bus.subscribe("image.");
        let mut all = bus.subscribe("");

        bus.publish(Notice::TextContentRequired);
        bus.publish(Notice::ImageRejected {
            block: BlockId::new(),
            mime: "image/png".into(),
        });

        let got = images.drain();
        assert_eq!(got.len(), 1);
        assert!(matches!(&got[0], Notice::ImageRejected { mime, .. } if mime == "image/png"));
        assert_eq!(all.drain().len(), 2);
    }
}
