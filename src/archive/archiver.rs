use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::archive::attachments::AttachmentFetcher;
use crate::archive::reactions::ReactionCollector;
use crate::archive::record::{AttachmentRecord, AuthorRecord, MessageRecord};
use crate::archive::ArchiveError;
use crate::feed::{ChannelInfo, FeedMessage, HistoryFeed, PageCursor};
use crate::utils::sanitize::sanitize_name;

pub const LOG_FILE: &str = "messages.jsonl";
pub const ATTACHMENTS_DIR: &str = "attachments";
const PAGE_SIZE: usize = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelOutcome {
    pub records_written: u64,
    pub max_ms_seen: i64,
}

/// Walks one channel's history from its resume boundary and appends every
/// message to the channel log in arrival order. Oldest-first ordering is what
/// lets the checkpoint be a single "maximum timestamp" scalar.
pub struct MessageArchiver {
    feed: Arc<dyn HistoryFeed>,
    attachments: AttachmentFetcher,
    reactions: ReactionCollector,
}

impl MessageArchiver {
    pub fn new(feed: Arc<dyn HistoryFeed>) -> Self {
        Self {
            attachments: AttachmentFetcher::new(feed.clone()),
            reactions: ReactionCollector::new(feed.clone()),
            feed,
        }
    }

    pub async fn archive(
        &self,
        channel: &ChannelInfo,
        community_dir: &Path,
        resume_boundary_ms: i64,
    ) -> Result<ChannelOutcome, ArchiveError> {
        let channel_dir =
            community_dir.join(format!("{}_{}", sanitize_name(&channel.name), channel.id));
        let attachments_dir = channel_dir.join(ATTACHMENTS_DIR);
        std::fs::create_dir_all(&attachments_dir)?;

        let mut log = open_log(&channel_dir.join(LOG_FILE), resume_boundary_ms)?;

        let mut outcome = ChannelOutcome {
            records_written: 0,
            // A fetch that returns nothing must not regress the checkpoint.
            max_ms_seen: resume_boundary_ms,
        };

        let mut cursor = if resume_boundary_ms > 0 {
            PageCursor::AfterMs(resume_boundary_ms)
        } else {
            PageCursor::Start
        };

        loop {
            let page = self
                .feed
                .next_page(channel.id, cursor, PAGE_SIZE)
                .await
                .map_err(ArchiveError::Feed)?;
            let Some(last) = page.last() else { break };
            cursor = PageCursor::AfterMessage(last.id);

            for message in &page {
                let record = self
                    .build_record(channel.id, message, &attachments_dir)
                    .await;
                append_record(&mut log, &record)?;
                outcome.records_written += 1;
                outcome.max_ms_seen = outcome.max_ms_seen.max(message.timestamp_ms());
            }
        }

        debug!(
            "channel {} ({}): {} new messages, high-water mark {}",
            channel.name, channel.id, outcome.records_written, outcome.max_ms_seen
        );
        Ok(outcome)
    }

    async fn build_record(
        &self,
        channel_id: u64,
        message: &FeedMessage,
        attachments_dir: &Path,
    ) -> MessageRecord {
        let mut attachments = Vec::with_capacity(message.attachments.len());
        for attachment in &message.attachments {
            let local_path = self.attachments.fetch(attachment, attachments_dir).await;
            attachments.push(AttachmentRecord {
                id: attachment.id,
                filename: attachment.filename.clone(),
                url: attachment.url.clone(),
                local_path,
            });
        }

        let mut reactions = Vec::with_capacity(message.reactions.len());
        for reaction in &message.reactions {
            reactions.push(self.reactions.collect(channel_id, message.id, reaction).await);
        }

        MessageRecord {
            id: message.id,
            author: AuthorRecord {
                name: message.author.name.clone(),
                discriminator: message.author.discriminator.clone(),
                id: message.author.id,
            },
            timestamp: message.timestamp.to_rfc3339(),
            content: message.content.clone(),
            attachments,
            edited: message.edited_timestamp.is_some(),
            reactions,
        }
    }
}

/// First-ever run starts a fresh log; an incremental run extends the
/// existing one. Previously written lines are never touched.
fn open_log(path: &Path, resume_boundary_ms: i64) -> Result<File, ArchiveError> {
    let file = if resume_boundary_ms > 0 {
        OpenOptions::new().create(true).append(true).open(path)?
    } else {
        File::create(path)?
    };
    Ok(file)
}

fn append_record(log: &mut File, record: &MessageRecord) -> Result<(), ArchiveError> {
    let line = serde_json::to_string(record).map_err(|e| ArchiveError::Storage(e.into()))?;
    log.write_all(line.as_bytes())?;
    log.write_all(b"\n")?;
    // One flush per message: a crash loses at most the in-flight record.
    log.flush()?;
    Ok(())
}
