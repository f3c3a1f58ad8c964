use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::{
    ConversationId, ConversationKind, ConversationMeta, ConversationRef, ConversationUserInfo,
    LinkId, LogId, LogRecord, MemberType, UserId,
};

/// Closed vocabulary of push notifications the core understands
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PushTag {
    MessagePost,
    SystemFeedPost,
    ReadReceipt,
    MetaChange,
    MemberLeft,
    MemberJoined,
    MessageDeleteSync,
    MembershipLeft,
    MembershipJoined,
    OpenMemberTypeChange,
    OpenProfileChange,
    /// Anything else; routed nowhere
    Unknown(String),
}

impl PushTag {
    /// Map a protocol method name (or its vocabulary alias) to a tag
    pub fn from_method(method: &str) -> Self {
        match method {
            "MSG" | "message-post" => PushTag::MessagePost,
            "FEED" | "system-feed-post" => PushTag::SystemFeedPost,
            "DECUNREAD" | "read-receipt" => PushTag::ReadReceipt,
            "CHGMETA" | "meta-change" => PushTag::MetaChange,
            "DELMEM" | "member-left" => PushTag::MemberLeft,
            "NEWMEM" | "member-joined" => PushTag::MemberJoined,
            "SYNCDLMSG" | "message-delete-sync" => PushTag::MessageDeleteSync,
            "LEFT" | "membership-left" => PushTag::MembershipLeft,
            "SYNCJOIN" | "membership-joined" => PushTag::MembershipJoined,
            "SYNCMEMT" | "open-member-type-change" => PushTag::OpenMemberTypeChange,
            "SYNCLINKPF" | "open-profile-change" => PushTag::OpenProfileChange,
            other => PushTag::Unknown(other.to_string()),
        }
    }

    pub fn method(&self) -> &str {
        match self {
            PushTag::MessagePost => "MSG",
            PushTag::SystemFeedPost => "FEED",
            PushTag::ReadReceipt => "DECUNREAD",
            PushTag::MetaChange => "CHGMETA",
            PushTag::MemberLeft => "DELMEM",
            PushTag::MemberJoined => "NEWMEM",
            PushTag::MessageDeleteSync => "SYNCDLMSG",
            PushTag::MembershipLeft => "LEFT",
            PushTag::MembershipJoined => "SYNCJOIN",
            PushTag::OpenMemberTypeChange => "SYNCMEMT",
            PushTag::OpenProfileChange => "SYNCLINKPF",
            PushTag::Unknown(method) => method,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, PushTag::Unknown(_))
    }
}

/// Decoded frame handed over by the transport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushEnvelope {
    pub method: String,
    #[serde(default)]
    pub body: Value,
}

/// A push ready for routing: tag plus its still-opaque body
#[derive(Debug, Clone, PartialEq)]
pub struct PushMessage {
    pub tag: PushTag,
    pub body: Value,
}

impl PushMessage {
    pub fn new(tag: PushTag, body: Value) -> Self {
        Self { tag, body }
    }

    /// Decode the body into the shape its tag implies.
    /// Undecodable bodies are logged and dropped.
    pub(crate) fn decode<T: DeserializeOwned>(&self) -> Option<T> {
        match T::deserialize(&self.body) {
            Ok(body) => Some(body),
            Err(e) => {
                tracing::debug!(
                    method = self.tag.method(),
                    error = %e,
                    "dropping push with undecodable body"
                );
                None
            }
        }
    }
}

impl From<PushEnvelope> for PushMessage {
    fn from(envelope: PushEnvelope) -> Self {
        Self {
            tag: PushTag::from_method(&envelope.method),
            body: envelope.body,
        }
    }
}

// ===== Bodies =====

/// message-post / system-feed-post
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ChatPostBody {
    pub conversation_id: ConversationId,
    pub log: LogRecord,
}

/// read-receipt
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ReadReceiptBody {
    pub conversation_id: ConversationId,
    pub user_id: UserId,
    pub watermark: LogId,
}

/// meta-change
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MetaChangeBody {
    pub conversation_id: ConversationId,
    pub meta: ConversationMeta,
}

/// member-left / member-joined / message-delete-sync: the target
/// conversation comes from the embedded log
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FeedLogBody {
    pub log: LogRecord,
}

/// membership-left
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MembershipLeftBody {
    pub conversation_id: ConversationId,
}

/// membership-joined
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MembershipJoinedBody {
    pub conversation_id: ConversationId,
    #[serde(default)]
    pub kind: ConversationKind,
    #[serde(default)]
    pub link_id: Option<LinkId>,
}

impl MembershipJoinedBody {
    pub fn reference(&self) -> ConversationRef {
        ConversationRef {
            conversation_id: self.conversation_id,
            kind: self.kind,
            link_id: self.link_id,
        }
    }
}

/// open-member-type-change
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MemberTypeBody {
    pub conversation_id: ConversationId,
    pub user_id: UserId,
    pub member_type: MemberType,
}

/// open-profile-change
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ProfileBody {
    pub conversation_id: ConversationId,
    pub profile: ConversationUserInfo,
}
