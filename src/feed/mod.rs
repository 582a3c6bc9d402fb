use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[cfg(test)]
pub mod testing;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommunityInfo {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelInfo {
    pub id: u64,
    pub name: String,
    pub can_read_history: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedUser {
    pub id: u64,
    pub name: String,
    pub discriminator: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedAttachment {
    pub id: u64,
    pub filename: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedReaction {
    pub emoji: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedMessage {
    pub id: u64,
    pub author: FeedUser,
    pub timestamp: DateTime<Utc>,
    pub edited_timestamp: Option<DateTime<Utc>>,
    pub content: String,
    pub attachments: Vec<FeedAttachment>,
    pub reactions: Vec<FeedReaction>,
}

impl FeedMessage {
    pub fn timestamp_ms(&self) -> i64 {
        self.timestamp.timestamp_millis()
    }
}

/// Forward-only position in a channel's history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageCursor {
    /// From the beginning of the channel.
    Start,
    /// Strictly after the given instant; resumes from a checkpoint.
    AfterMs(i64),
    /// Strictly after the given message; continues within a run.
    AfterMessage(u64),
}

/// Read-only view of the remote chat platform. The archival engine consumes
/// the platform exclusively through this interface so it can be driven by an
/// in-memory feed in tests.
#[async_trait]
pub trait HistoryFeed: Send + Sync {
    /// Guilds the authenticated identity belongs to.
    async fn communities(&self) -> Result<Vec<CommunityInfo>>;

    /// Text channels of one guild, with the history-read permission resolved.
    async fn channels(&self, community_id: u64) -> Result<Vec<ChannelInfo>>;

    /// One page of messages after `cursor`, oldest first. An empty page means
    /// the history is exhausted. Iteration is not restartable mid-way; a
    /// retry must start over from its original cursor.
    async fn next_page(
        &self,
        channel_id: u64,
        cursor: PageCursor,
        limit: usize,
    ) -> Result<Vec<FeedMessage>>;

    /// Raw bytes of one attachment.
    async fn fetch_attachment(&self, attachment: &FeedAttachment) -> Result<Vec<u8>>;

    /// Every user who reacted with `emoji` on one message.
    async fn reactors(&self, channel_id: u64, message_id: u64, emoji: &str)
        -> Result<Vec<FeedUser>>;
}
