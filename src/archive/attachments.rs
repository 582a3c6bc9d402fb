use std::path::Path;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::feed::{FeedAttachment, HistoryFeed};
use crate::utils::sanitize::sanitize_name;

/// Downloads message attachments next to the channel log. A failed download
/// degrades to a missing local path; it never aborts the parent message.
pub struct AttachmentFetcher {
    feed: Arc<dyn HistoryFeed>,
}

impl AttachmentFetcher {
    pub fn new(feed: Arc<dyn HistoryFeed>) -> Self {
        Self { feed }
    }

    /// Prefixed with the attachment id so two uploads with the same name
    /// cannot collide within one channel.
    pub fn local_filename(attachment: &FeedAttachment) -> String {
        format!("{}_{}", attachment.id, sanitize_name(&attachment.filename))
    }

    pub async fn fetch(&self, attachment: &FeedAttachment, dest_dir: &Path) -> Option<String> {
        let path = dest_dir.join(Self::local_filename(attachment));

        let bytes = match self.feed.fetch_attachment(attachment).await {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!("failed to download {}: {}", attachment.url, err);
                return None;
            }
        };

        if let Err(err) = std::fs::write(&path, &bytes) {
            warn!("failed to save attachment {}: {}", path.display(), err);
            return None;
        }

        debug!(
            "saved attachment {} -> {}",
            attachment.filename,
            path.display()
        );
        Some(path.to_string_lossy().into_owned())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::feed::testing::{attachment, FakeFeed};

    use super::AttachmentFetcher;

    #[test]
    fn local_filename_is_id_prefixed_and_sanitized() {
        let att = attachment(9001, "my file?.png");
        assert_eq!(AttachmentFetcher::local_filename(&att), "9001_my_file.png");
    }

    #[tokio::test]
    async fn fetch_writes_bytes_to_collision_free_path() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = AttachmentFetcher::new(Arc::new(FakeFeed::new()));
        let att = attachment(7, "cat.jpg");

        let local_path = fetcher.fetch(&att, dir.path()).await.unwrap();
        assert!(local_path.ends_with("7_cat.jpg"));
        let bytes = std::fs::read(dir.path().join("7_cat.jpg")).unwrap();
        assert_eq!(bytes, b"bytes-of-7");
    }

    #[tokio::test]
    async fn failed_download_returns_none_and_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut feed = FakeFeed::new();
        feed.failing_attachments.insert(7);
        let fetcher = AttachmentFetcher::new(Arc::new(feed));
        let att = attachment(7, "cat.jpg");

        assert!(fetcher.fetch(&att, dir.path()).await.is_none());
        assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
    }
}
