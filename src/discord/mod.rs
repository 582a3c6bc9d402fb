use std::num::NonZeroU16;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client as DownloadClient;
use serenity::all::{
    ChannelId, ChannelType, GuildId, GuildPagination, Http, Message, MessageId, MessagePagination,
    Permissions, ReactionType, Timestamp, User, UserId,
};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::config::Config;
use crate::feed::{
    ChannelInfo, CommunityInfo, FeedAttachment, FeedMessage, FeedReaction, FeedUser, HistoryFeed,
    PageCursor,
};

/// First millisecond representable in a Discord snowflake.
const DISCORD_EPOCH_MS: i64 = 1_420_070_400_000;
const GUILD_PAGE: u64 = 100;
const REACTOR_PAGE: u8 = 100;

/// `HistoryFeed` backed by the Discord REST API. No gateway connection: the
/// archiver polls history, it does not consume events.
pub struct DiscordClient {
    http: Http,
    download: DownloadClient,
    current_user_id: RwLock<Option<UserId>>,
}

impl DiscordClient {
    pub fn new(config: &Config) -> Self {
        Self {
            http: Http::new(&config.auth.bot_token),
            download: DownloadClient::new(),
            current_user_id: RwLock::new(None),
        }
    }

    /// Validates the token and remembers the bot's own identity for
    /// permission checks.
    pub async fn login(&self) -> Result<()> {
        let user = self
            .http
            .get_current_user()
            .await
            .context("discord login failed, check the bot token")?;
        info!("logged in as {} ({})", user.name, user.id);
        *self.current_user_id.write().await = Some(user.id);
        Ok(())
    }

    async fn current_user_id(&self) -> Result<UserId> {
        (*self.current_user_id.read().await)
            .ok_or_else(|| anyhow!("discord client is not logged in"))
    }
}

#[async_trait]
impl HistoryFeed for DiscordClient {
    async fn communities(&self) -> Result<Vec<CommunityInfo>> {
        let mut guilds = Vec::new();
        let mut after: Option<GuildId> = None;
        loop {
            let target = after.map(GuildPagination::After);
            let page = self.http.get_guilds(target, Some(GUILD_PAGE)).await?;
            let Some(last) = page.last() else { break };
            after = Some(last.id);
            let full_page = page.len() as u64 == GUILD_PAGE;
            guilds.extend(page.into_iter().map(|guild| CommunityInfo {
                id: guild.id.get(),
                name: guild.name,
            }));
            if !full_page {
                break;
            }
        }
        Ok(guilds)
    }

    async fn channels(&self, community_id: u64) -> Result<Vec<ChannelInfo>> {
        let guild_id = GuildId::new(community_id);
        let me = self.current_user_id().await?;
        let guild = self.http.get_guild(guild_id).await?;
        let member = self.http.get_member(guild_id, me).await?;
        let channels = self.http.get_channels(guild_id).await?;

        Ok(channels
            .into_iter()
            .filter(|channel| channel.kind == ChannelType::Text)
            .map(|channel| {
                let permissions = guild.user_permissions_in(&channel, &member);
                ChannelInfo {
                    id: channel.id.get(),
                    can_read_history: permissions
                        .contains(Permissions::VIEW_CHANNEL | Permissions::READ_MESSAGE_HISTORY),
                    name: channel.name,
                }
            })
            .collect())
    }

    async fn next_page(
        &self,
        channel_id: u64,
        cursor: PageCursor,
        limit: usize,
    ) -> Result<Vec<FeedMessage>> {
        let after = MessageId::new(match cursor {
            PageCursor::Start => 1,
            PageCursor::AfterMs(ms) => resume_snowflake(ms),
            PageCursor::AfterMessage(id) => id,
        });

        let mut page = self
            .http
            .get_messages(
                ChannelId::new(channel_id),
                Some(MessagePagination::After(after)),
                Some(limit.min(100) as u8),
            )
            .await?;

        // The REST endpoint does not guarantee intra-page order.
        page.sort_by_key(|message| message.id);
        Ok(page.into_iter().map(feed_message).collect())
    }

    async fn fetch_attachment(&self, attachment: &FeedAttachment) -> Result<Vec<u8>> {
        debug!("downloading attachment from {}", attachment.url);
        let response = self
            .download
            .get(&attachment.url)
            .send()
            .await
            .map_err(|e| anyhow!("failed to download from {}: {}", attachment.url, e))?;
        if !response.status().is_success() {
            return Err(anyhow!(
                "failed to download from {}: status {}",
                attachment.url,
                response.status()
            ));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| anyhow!("failed to read response body: {}", e))?;
        Ok(bytes.to_vec())
    }

    async fn reactors(
        &self,
        channel_id: u64,
        message_id: u64,
        emoji: &str,
    ) -> Result<Vec<FeedUser>> {
        let reaction = ReactionType::try_from(emoji)
            .unwrap_or_else(|_| ReactionType::Unicode(emoji.to_string()));

        let mut users = Vec::new();
        let mut after: Option<UserId> = None;
        loop {
            let page = self
                .http
                .get_reaction_users(
                    ChannelId::new(channel_id),
                    MessageId::new(message_id),
                    &reaction,
                    REACTOR_PAGE,
                    after.map(UserId::get),
                )
                .await?;
            let Some(last) = page.last() else { break };
            after = Some(last.id);
            let full_page = page.len() == REACTOR_PAGE as usize;
            users.extend(page.iter().map(feed_user));
            if !full_page {
                break;
            }
        }
        Ok(users)
    }
}

fn feed_message(message: Message) -> FeedMessage {
    FeedMessage {
        id: message.id.get(),
        author: feed_user(&message.author),
        timestamp: to_utc(message.timestamp),
        edited_timestamp: message.edited_timestamp.map(to_utc),
        content: message.content,
        attachments: message
            .attachments
            .iter()
            .map(|attachment| FeedAttachment {
                id: attachment.id.get(),
                filename: attachment.filename.clone(),
                url: attachment.url.clone(),
            })
            .collect(),
        reactions: message
            .reactions
            .iter()
            .map(|reaction| FeedReaction {
                emoji: reaction.reaction_type.to_string(),
                count: reaction.count,
            })
            .collect(),
    }
}

fn feed_user(user: &User) -> FeedUser {
    FeedUser {
        id: user.id.get(),
        name: user.name.clone(),
        discriminator: discriminator_string(user.discriminator),
    }
}

/// Discord dropped discriminators for migrated users; those accounts report
/// "0", the same value the official clients show.
fn discriminator_string(discriminator: Option<NonZeroU16>) -> String {
    match discriminator {
        Some(d) => format!("{:04}", d.get()),
        None => "0".to_string(),
    }
}

fn to_utc(timestamp: Timestamp) -> DateTime<Utc> {
    let ms = (timestamp.unix_timestamp_nanos() / 1_000_000) as i64;
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}

/// Greatest snowflake whose timestamp is at or before `boundary_ms`. Used as
/// an exclusive `after` cursor it skips the entire boundary millisecond,
/// which keeps a re-run from re-appending the last archived message.
fn resume_snowflake(boundary_ms: i64) -> u64 {
    let offset_ms = (boundary_ms - DISCORD_EPOCH_MS + 1).max(1) as u64;
    (offset_ms << 22) - 1
}

#[cfg(test)]
mod tests {
    use serenity::all::Timestamp;

    use super::{
        discriminator_string, resume_snowflake, to_utc, DISCORD_EPOCH_MS,
    };

    fn snowflake_ms(id: u64) -> i64 {
        (id >> 22) as i64 + DISCORD_EPOCH_MS
    }

    #[test]
    fn resume_snowflake_excludes_the_whole_boundary_millisecond() {
        let boundary = 1_700_000_000_000;
        let cursor = resume_snowflake(boundary);

        // The cursor itself still lives in the boundary millisecond...
        assert_eq!(snowflake_ms(cursor), boundary);
        // ...and it is the last id there, so "strictly greater" means the
        // next millisecond onward.
        assert_eq!(snowflake_ms(cursor + 1), boundary + 1);
    }

    #[test]
    fn resume_snowflake_clamps_pre_epoch_boundaries() {
        assert_eq!(resume_snowflake(0), (1u64 << 22) - 1);
        assert_eq!(resume_snowflake(DISCORD_EPOCH_MS), (1u64 << 22) - 1);
    }

    #[test]
    fn discriminator_renders_legacy_and_migrated_forms() {
        assert_eq!(
            discriminator_string(std::num::NonZeroU16::new(1)),
            "0001"
        );
        assert_eq!(
            discriminator_string(std::num::NonZeroU16::new(9999)),
            "9999"
        );
        assert_eq!(discriminator_string(None), "0");
    }

    #[test]
    fn to_utc_preserves_the_instant() {
        let ts = Timestamp::from_unix_timestamp(1_700_000_000).unwrap();
        assert_eq!(to_utc(ts).timestamp_millis(), 1_700_000_000_000);
    }
}
