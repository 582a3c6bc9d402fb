use std::sync::Arc;

use tracing::warn;

use crate::archive::record::{ReactionRecord, ReactorRecord};
use crate::feed::{FeedReaction, FeedUser, HistoryFeed};

/// Resolves the full reactor list for each emoji on a message. Partial
/// reaction data beats losing the message: enumeration failures degrade to
/// an empty reactor list with the emoji and count kept.
pub struct ReactionCollector {
    feed: Arc<dyn HistoryFeed>,
}

impl ReactionCollector {
    pub fn new(feed: Arc<dyn HistoryFeed>) -> Self {
        Self { feed }
    }

    pub async fn collect(
        &self,
        channel_id: u64,
        message_id: u64,
        reaction: &FeedReaction,
    ) -> ReactionRecord {
        let users = match self
            .feed
            .reactors(channel_id, message_id, &reaction.emoji)
            .await
        {
            Ok(users) => users.into_iter().map(reactor_record).collect(),
            Err(err) => {
                warn!(
                    "failed to enumerate {} reactors on message {}: {}",
                    reaction.emoji, message_id, err
                );
                Vec::new()
            }
        };

        ReactionRecord {
            emoji: reaction.emoji.clone(),
            count: reaction.count,
            users,
        }
    }
}

fn reactor_record(user: FeedUser) -> ReactorRecord {
    ReactorRecord {
        id: user.id,
        name: user.name,
        discriminator: user.discriminator,
    }
}
