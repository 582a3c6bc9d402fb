use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::feed::HistoryFeed;
use crate::utils::sanitize::sanitize_name;

pub mod archiver;
pub mod attachments;
pub mod checkpoint;
pub mod reactions;
pub mod record;

pub use self::archiver::{ChannelOutcome, MessageArchiver};
pub use self::checkpoint::CheckpointMap;

/// Failure classes the orchestrator branches on: remote-feed trouble is
/// recoverable at channel granularity, local storage trouble is not.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("local storage failure: {0}")]
    Storage(#[from] io::Error),
    #[error("history feed failure: {0}")]
    Feed(#[source] anyhow::Error),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub communities: usize,
    pub channels_archived: usize,
    pub channels_skipped: usize,
    pub messages_written: u64,
}

/// Drives one full archival pass: communities, then channels, committing
/// each community's checkpoint once all of its channels have been visited.
pub struct ArchiveCore {
    feed: Arc<dyn HistoryFeed>,
    archiver: MessageArchiver,
    backup_root: PathBuf,
}

impl ArchiveCore {
    pub fn new(feed: Arc<dyn HistoryFeed>, backup_root: PathBuf) -> Self {
        Self {
            archiver: MessageArchiver::new(feed.clone()),
            feed,
            backup_root,
        }
    }

    pub async fn run(&self) -> anyhow::Result<RunSummary> {
        let mut summary = RunSummary::default();

        for community in self.feed.communities().await? {
            let community_dir = self
                .backup_root
                .join(format!("{}_{}", sanitize_name(&community.name), community.id));
            std::fs::create_dir_all(&community_dir)?;
            info!(
                "backing up community {} ({}) -> {}",
                community.name,
                community.id,
                community_dir.display()
            );

            let mut checkpoints = CheckpointMap::load(&community_dir);
            if !checkpoints.is_empty() {
                info!(
                    "resuming from {} channel checkpoint(s) for {}",
                    checkpoints.len(),
                    community.name
                );
            }

            let channels = match self.feed.channels(community.id).await {
                Ok(channels) => channels,
                Err(err) => {
                    warn!(
                        "failed to list channels of {}: {}; moving on",
                        community.name, err
                    );
                    continue;
                }
            };

            for channel in channels {
                if !channel.can_read_history {
                    info!(
                        "skipping {} ({}): no read-history permission",
                        channel.name, channel.id
                    );
                    summary.channels_skipped += 1;
                    continue;
                }

                let resume = checkpoints.resume_boundary(channel.id);
                match self.archiver.archive(&channel, &community_dir, resume).await {
                    Ok(outcome) => {
                        checkpoints.advance(channel.id, outcome.max_ms_seen);
                        summary.channels_archived += 1;
                        summary.messages_written += outcome.records_written;
                        info!(
                            "archived {} ({}): {} new messages",
                            channel.name, channel.id, outcome.records_written
                        );
                    }
                    Err(ArchiveError::Feed(err)) => {
                        warn!(
                            "channel {} ({}) failed: {}; moving on",
                            channel.name, channel.id, err
                        );
                    }
                    // Continuing without durable storage cannot produce a
                    // trustworthy archive.
                    Err(ArchiveError::Storage(err)) => return Err(err.into()),
                }
            }

            checkpoints.commit(&community_dir)?;
            summary.communities += 1;
        }

        Ok(summary)
    }
}
