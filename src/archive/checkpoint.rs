use std::collections::BTreeMap;
use std::io;
use std::path::Path;

use serde_json::Value;
use tracing::warn;

/// Per-community checkpoint file, stored at the community directory root.
pub const CHECKPOINT_FILE: &str = "backup_info.json";

/// Channel id to the highest message timestamp (milliseconds since epoch)
/// archived so far. A channel absent from the map has never been archived
/// and gets a full fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckpointMap {
    entries: BTreeMap<u64, i64>,
}

impl CheckpointMap {
    /// Reads the community's checkpoint file. A missing, unreadable, or
    /// malformed file yields an empty map: corruption costs a redundant
    /// re-fetch, never the run.
    pub fn load(community_dir: &Path) -> Self {
        let path = community_dir.join(CHECKPOINT_FILE);
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Self::default(),
            Err(err) => {
                warn!("could not read checkpoint {}: {}", path.display(), err);
                return Self::default();
            }
        };

        let parsed: BTreeMap<String, Value> = match serde_json::from_str(&raw) {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!(
                    "malformed checkpoint {}: {}; starting from scratch",
                    path.display(),
                    err
                );
                return Self::default();
            }
        };

        let mut entries = BTreeMap::new();
        for (key, value) in parsed {
            let Ok(channel_id) = key.parse::<u64>() else {
                warn!(
                    "skipping unparsable checkpoint key {:?} in {}",
                    key,
                    path.display()
                );
                continue;
            };
            let Some(ms) = value.as_i64() else {
                warn!(
                    "skipping non-integer checkpoint value for channel {} in {}",
                    channel_id,
                    path.display()
                );
                continue;
            };
            entries.insert(channel_id, ms);
        }
        Self { entries }
    }

    /// Exclusive resume instant for a channel; zero means full fetch.
    pub fn resume_boundary(&self, channel_id: u64) -> i64 {
        self.entries.get(&channel_id).copied().unwrap_or(0)
    }

    pub fn contains(&self, channel_id: u64) -> bool {
        self.entries.contains_key(&channel_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Raises a channel's high-water mark. Never moves it backwards.
    pub fn advance(&mut self, channel_id: u64, last_archived_ms: i64) {
        let entry = self.entries.entry(channel_id).or_insert(last_archived_ms);
        if last_archived_ms > *entry {
            *entry = last_archived_ms;
        }
    }

    /// Overwrites the checkpoint file: string keys, pretty-printed. The body
    /// goes to a temporary file first and is renamed into place so a crash
    /// mid-write cannot corrupt the previous checkpoint.
    pub fn commit(&self, community_dir: &Path) -> io::Result<()> {
        let encoded: BTreeMap<String, i64> = self
            .entries
            .iter()
            .map(|(id, ms)| (id.to_string(), *ms))
            .collect();
        let body = serde_json::to_string_pretty(&encoded).map_err(io::Error::other)?;

        let tmp = community_dir.join(format!("{CHECKPOINT_FILE}.tmp"));
        std::fs::write(&tmp, body)?;
        std::fs::rename(&tmp, community_dir.join(CHECKPOINT_FILE))
    }
}
