use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{
    ChannelInfo, CommunityInfo, FeedAttachment, FeedMessage, FeedReaction, FeedUser, HistoryFeed,
    PageCursor,
};

/// In-memory feed for exercising the archival engine without a network.
#[derive(Default)]
pub struct FakeFeed {
    pub communities: Vec<CommunityInfo>,
    pub channels: HashMap<u64, Vec<ChannelInfo>>,
    pub failing_channels: HashSet<u64>,
    pub failing_attachments: HashSet<u64>,
    pub fail_reactors: bool,
    pub reactor_rosters: HashMap<(u64, String), Vec<FeedUser>>,
    messages: Mutex<HashMap<u64, Vec<FeedMessage>>>,
    seen_cursors: Mutex<Vec<(u64, PageCursor)>>,
}

impl FakeFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_community(&mut self, id: u64, name: &str) {
        self.communities.push(CommunityInfo {
            id,
            name: name.to_string(),
        });
        self.channels.entry(id).or_default();
    }

    pub fn add_channel(&mut self, community_id: u64, id: u64, name: &str, can_read_history: bool) {
        self.channels
            .entry(community_id)
            .or_default()
            .push(ChannelInfo {
                id,
                name: name.to_string(),
                can_read_history,
            });
    }

    /// Usable after the feed is shared; new messages become visible to the
    /// next page fetch, like a live channel.
    pub fn push_message(&self, channel_id: u64, message: FeedMessage) {
        let mut guard = self.messages.lock().unwrap();
        let list = guard.entry(channel_id).or_default();
        list.push(message);
        list.sort_by_key(|m| m.id);
    }

    /// Every cursor the archiver requested for one channel, in order.
    pub fn cursors_for(&self, channel_id: u64) -> Vec<PageCursor> {
        self.seen_cursors
            .lock()
            .unwrap()
            .iter()
            .filter(|(ch, _)| *ch == channel_id)
            .map(|(_, cursor)| *cursor)
            .collect()
    }
}

#[async_trait]
impl HistoryFeed for FakeFeed {
    async fn communities(&self) -> Result<Vec<CommunityInfo>> {
        Ok(self.communities.clone())
    }

    async fn channels(&self, community_id: u64) -> Result<Vec<ChannelInfo>> {
        self.channels
            .get(&community_id)
            .cloned()
            .ok_or_else(|| anyhow!("unknown community {community_id}"))
    }

    async fn next_page(
        &self,
        channel_id: u64,
        cursor: PageCursor,
        limit: usize,
    ) -> Result<Vec<FeedMessage>> {
        self.seen_cursors.lock().unwrap().push((channel_id, cursor));
        if self.failing_channels.contains(&channel_id) {
            return Err(anyhow!("history fetch failed for channel {channel_id}"));
        }

        let guard = self.messages.lock().unwrap();
        let page = guard
            .get(&channel_id)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .filter(|m| match cursor {
                PageCursor::Start => true,
                PageCursor::AfterMs(ms) => m.timestamp_ms() > ms,
                PageCursor::AfterMessage(id) => m.id > id,
            })
            .take(limit)
            .collect();
        Ok(page)
    }

    async fn fetch_attachment(&self, attachment: &FeedAttachment) -> Result<Vec<u8>> {
        if self.failing_attachments.contains(&attachment.id) {
            return Err(anyhow!("cdn returned 404 for {}", attachment.url));
        }
        Ok(format!("bytes-of-{}", attachment.id).into_bytes())
    }

    async fn reactors(
        &self,
        _channel_id: u64,
        message_id: u64,
        emoji: &str,
    ) -> Result<Vec<FeedUser>> {
        if self.fail_reactors {
            return Err(anyhow!("missing permission to enumerate reactions"));
        }
        Ok(self
            .reactor_rosters
            .get(&(message_id, emoji.to_string()))
            .cloned()
            .unwrap_or_default())
    }
}

pub fn user(id: u64, name: &str) -> FeedUser {
    FeedUser {
        id,
        name: name.to_string(),
        discriminator: "0001".to_string(),
    }
}

pub fn message(id: u64, ms: i64, content: &str) -> FeedMessage {
    FeedMessage {
        id,
        author: user(1, "alice"),
        timestamp: DateTime::<Utc>::from_timestamp_millis(ms).unwrap(),
        edited_timestamp: None,
        content: content.to_string(),
        attachments: Vec::new(),
        reactions: Vec::new(),
    }
}

pub fn attachment(id: u64, filename: &str) -> FeedAttachment {
    FeedAttachment {
        id,
        filename: filename.to_string(),
        url: format!("https://cdn.example.com/{id}/{filename}"),
    }
}

pub fn reaction(emoji: &str, count: u64) -> FeedReaction {
    FeedReaction {
        emoji: emoji.to_string(),
        count,
    }
}
