use serde::{Deserialize, Serialize};

/// One line of `messages.jsonl`. Field order is the on-disk order; a record
/// is never rewritten once appended, so later edits on the remote side are
/// not reflected beyond the `edited` flag captured at archival time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: u64,
    pub author: AuthorRecord,
    pub timestamp: String,
    pub content: String,
    pub attachments: Vec<AttachmentRecord>,
    pub edited: bool,
    pub reactions: Vec<ReactionRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorRecord {
    pub name: String,
    pub discriminator: String,
    pub id: u64,
}

/// `local_path` is `null` when the download failed; the remote URL is always
/// kept so the attachment stays recoverable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachmentRecord {
    pub id: u64,
    pub filename: String,
    pub url: String,
    pub local_path: Option<String>,
}

/// `users` may be empty even when `count > 0` if reactor enumeration failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReactionRecord {
    pub emoji: String,
    pub count: u64,
    pub users: Vec<ReactorRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReactorRecord {
    pub id: u64,
    pub name: String,
    pub discriminator: String,
}
