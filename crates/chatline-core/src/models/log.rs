use serde::{Deserialize, Serialize};

use super::ids::{ConversationId, LogId, UserId};

/// Log type discriminant as carried on the wire.
/// Feed (0) marks system-generated notices; everything else is user content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub enum LogType {
    Feed,
    Text,
    Photo,
    File,
    Other(u32),
}

impl From<u32> for LogType {
    fn from(value: u32) -> Self {
        match value {
            0 => LogType::Feed,
            1 => LogType::Text,
            2 => LogType::Photo,
            18 => LogType::File,
            other => LogType::Other(other),
        }
    }
}

impl From<LogType> for u32 {
    fn from(value: LogType) -> Self {
        match value {
            LogType::Feed => 0,
            LogType::Text => 1,
            LogType::Photo => 2,
            LogType::File => 18,
            LogType::Other(other) => other,
        }
    }
}

/// Immutable unit of a conversation's history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    pub log_id: LogId,
    /// Conversation the log was posted to
    pub conversation_id: ConversationId,
    pub sender_id: UserId,
    #[serde(rename = "type")]
    pub log_type: LogType,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<String>,
    /// Unix seconds
    #[serde(default)]
    pub sent_at: u64,
}

impl LogRecord {
    pub fn is_feed(&self) -> bool {
        self.log_type == LogType::Feed
    }

    /// Decode the system notice carried by a feed log.
    /// Returns None for non-feed logs and for feed content that doesn't parse.
    pub fn feed(&self) -> Option<FeedRecord> {
        if !self.is_feed() {
            return None;
        }
        serde_json::from_str(&self.content).ok()
    }
}

/// Feed subtype discriminant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum FeedType {
    Invite,
    Leave,
    OpenLinkJoin,
    OpenLinkKicked,
    /// A message was deleted for every participant
    DeleteToAll,
    Other(i32),
}

impl From<i32> for FeedType {
    fn from(value: i32) -> Self {
        match value {
            1 => FeedType::Invite,
            2 => FeedType::Leave,
            4 => FeedType::OpenLinkJoin,
            6 => FeedType::OpenLinkKicked,
            14 => FeedType::DeleteToAll,
            other => FeedType::Other(other),
        }
    }
}

impl From<FeedType> for i32 {
    fn from(value: FeedType) -> Self {
        match value {
            FeedType::Invite => 1,
            FeedType::Leave => 2,
            FeedType::OpenLinkJoin => 4,
            FeedType::OpenLinkKicked => 6,
            FeedType::DeleteToAll => 14,
            FeedType::Other(other) => other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedMember {
    pub user_id: UserId,
    #[serde(default)]
    pub nickname: String,
}

/// System notice decoded from the content of a feed log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedRecord {
    pub feed_type: FeedType,
    #[serde(default)]
    pub members: Vec<FeedMember>,
    /// Log the notice refers to (e.g. the deleted message)
    #[serde(default, rename = "logId", skip_serializing_if = "Option::is_none")]
    pub target_log_id: Option<LogId>,
    #[serde(default)]
    pub hidden: bool,
}
