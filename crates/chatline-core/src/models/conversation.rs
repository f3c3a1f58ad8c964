use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use super::ids::{ConversationId, LinkId, LogId, UserId};
use super::log::LogRecord;

/// Which sub-registry a conversation lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationKind {
    #[default]
    Ordinary,
    /// Addressable through an invite link
    Open,
}

/// Conversation-level setting type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum MetaType {
    Notice,
    Group,
    Title,
    Profile,
    Privilege,
    Other(i32),
}

impl From<i32> for MetaType {
    fn from(value: i32) -> Self {
        match value {
            1 => MetaType::Notice,
            2 => MetaType::Group,
            3 => MetaType::Title,
            4 => MetaType::Profile,
            6 => MetaType::Privilege,
            other => MetaType::Other(other),
        }
    }
}

impl From<MetaType> for i32 {
    fn from(value: MetaType) -> Self {
        match value {
            MetaType::Notice => 1,
            MetaType::Group => 2,
            MetaType::Title => 3,
            MetaType::Profile => 4,
            MetaType::Privilege => 6,
            MetaType::Other(other) => other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationMeta {
    #[serde(rename = "type")]
    pub meta_type: MetaType,
    #[serde(default)]
    pub revision: i64,
    pub author_id: UserId,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub updated_at: u64,
}

/// Latest meta value per type
pub type MetaMap = BTreeMap<MetaType, ConversationMeta>;

/// Cached per-conversation metadata.
///
/// Held behind an `Arc` and replaced wholesale on every commit, so a snapshot
/// taken before an update keeps describing the state it was taken from.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationInfo {
    pub id: ConversationId,
    pub kind: ConversationKind,
    pub link_id: Option<LinkId>,
    pub display_name: Option<String>,
    pub last_log_id: Option<LogId>,
    pub last_log: Option<LogRecord>,
    pub meta_map: Arc<MetaMap>,
}

impl ConversationInfo {
    pub fn new(id: ConversationId, kind: ConversationKind) -> Self {
        Self {
            id,
            kind,
            link_id: None,
            display_name: None,
            last_log_id: None,
            last_log: None,
            meta_map: Arc::new(MetaMap::new()),
        }
    }

    pub fn meta(&self, meta_type: MetaType) -> Option<&ConversationMeta> {
        self.meta_map.get(&meta_type)
    }

    /// Apply a partial update, producing the next snapshot
    pub(crate) fn patched(&self, patch: InfoPatch) -> Self {
        let mut next = self.clone();
        if let Some(last_log) = patch.last_log {
            next.last_log_id = Some(last_log.log_id);
            next.last_log = Some(last_log);
        }
        if let Some(meta_map) = patch.meta_map {
            next.meta_map = meta_map;
        }
        next
    }
}

/// Partial update for [`ConversationInfo`]; unset fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct InfoPatch {
    pub last_log: Option<LogRecord>,
    pub meta_map: Option<Arc<MetaMap>>,
}

impl InfoPatch {
    /// Sets both `last_log_id` and `last_log`
    pub fn last_log(record: LogRecord) -> Self {
        Self {
            last_log: Some(record),
            ..Default::default()
        }
    }

    pub fn meta_map(meta_map: Arc<MetaMap>) -> Self {
        Self {
            meta_map: Some(meta_map),
            ..Default::default()
        }
    }
}

/// Member role inside an open conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum MemberType {
    Owner,
    #[default]
    Normal,
    Manager,
    Bot,
    Other(i32),
}

impl From<i32> for MemberType {
    fn from(value: i32) -> Self {
        match value {
            1 => MemberType::Owner,
            2 => MemberType::Normal,
            4 => MemberType::Manager,
            8 => MemberType::Bot,
            other => MemberType::Other(other),
        }
    }
}

impl From<MemberType> for i32 {
    fn from(value: MemberType) -> Self {
        match value {
            MemberType::Owner => 1,
            MemberType::Normal => 2,
            MemberType::Manager => 4,
            MemberType::Bot => 8,
            MemberType::Other(other) => other,
        }
    }
}

/// Cached profile of a conversation member
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationUserInfo {
    pub user_id: UserId,
    #[serde(default)]
    pub nickname: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_image_url: Option<String>,
    #[serde(default)]
    pub member_type: MemberType,
}

/// Highest log a user has acknowledged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadMark {
    pub user_id: UserId,
    pub log_id: LogId,
}

/// Minimal reference used to resolve a conversation the client just joined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationRef {
    pub conversation_id: ConversationId,
    #[serde(default)]
    pub kind: ConversationKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_id: Option<LinkId>,
}

/// Everything needed to materialize a conversation in the cache
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSeed {
    pub id: ConversationId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_log: Option<LogRecord>,
    #[serde(default)]
    pub meta: Vec<ConversationMeta>,
    #[serde(default)]
    pub users: Vec<ConversationUserInfo>,
    #[serde(default)]
    pub watermarks: Vec<ReadMark>,
}

impl ConversationSeed {
    pub fn new(id: ConversationId) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenConversationSeed {
    pub link_id: LinkId,
    #[serde(flatten)]
    pub seed: ConversationSeed,
}

/// One entry of the bulk conversation list received at session start.
/// The caller decides the discriminant; nothing is inferred from the shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ConversationEntry {
    Ordinary(ConversationSeed),
    Open(OpenConversationSeed),
}

impl ConversationEntry {
    pub fn id(&self) -> ConversationId {
        match self {
            ConversationEntry::Ordinary(seed) => seed.id,
            ConversationEntry::Open(open) => open.seed.id,
        }
    }

    pub fn kind(&self) -> ConversationKind {
        match self {
            ConversationEntry::Ordinary(_) => ConversationKind::Ordinary,
            ConversationEntry::Open(_) => ConversationKind::Open,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_entry_discriminant() {
        let entries: Vec<ConversationEntry> = serde_json::from_value(json!([
            {"kind": "ordinary", "id": 1, "displayName": "family"},
            {"kind": "open", "id": 2, "linkId": 900},
        ]))
        .unwrap();

        assert_eq!(entries[0].kind(), ConversationKind::Ordinary);
        assert_eq!(entries[0].id(), ConversationId(1));
        assert_eq!(entries[1].kind(), ConversationKind::Open);
        match &entries[1] {
            ConversationEntry::Open(open) => {
                assert_eq!(open.link_id, LinkId(900));
                assert_eq!(open.seed.id, ConversationId(2));
            }
            other => panic!("expected open entry, got {:?}", other),
        }
    }

    #[test]
    fn test_patch_leaves_previous_snapshot_untouched() {
        let info = ConversationInfo::new(ConversationId(1), ConversationKind::Ordinary);
        let mut map = (*info.meta_map).clone();
        map.insert(
            MetaType::Title,
            ConversationMeta {
                meta_type: MetaType::Title,
                revision: 1,
                author_id: UserId(5),
                content: "weekend".to_string(),
                updated_at: 0,
            },
        );
        let next = info.patched(InfoPatch::meta_map(Arc::new(map)));

        assert!(info.meta(MetaType::Title).is_none());
        assert_eq!(next.meta(MetaType::Title).unwrap().content, "weekend");
        assert!(!Arc::ptr_eq(&info.meta_map, &next.meta_map));
    }

    #[test]
    fn test_member_type_defaults_to_normal() {
        let user: ConversationUserInfo =
            serde_json::from_value(json!({"userId": 3, "nickname": "mina"})).unwrap();
        assert_eq!(user.member_type, MemberType::Normal);
    }
}
