use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::context::EventEmitter;
use crate::events::ClientEvent;
use crate::models::{
    ConversationId, ConversationInfo, ConversationKind, ConversationSeed, ConversationUserInfo,
    InfoPatch, LinkId, LogId, MetaMap, UserId,
};

/// Read side of a conversation's cached state
pub trait ConversationStore: Send + Sync {
    /// Snapshot of the current info; later commits don't change it
    fn current_info(&self) -> Arc<ConversationInfo>;
    fn lookup_user(&self, user_id: UserId) -> Option<ConversationUserInfo>;
}

/// Write side of a conversation's cached state
pub trait ConversationUpdater: Send + Sync {
    fn commit_info(&self, patch: InfoPatch);
    /// Applies whether or not `user_id` has a cached profile
    fn commit_watermark(&self, user_id: UserId, log_id: LogId);
    fn remove_user(&self, user_id: UserId) -> bool;
    fn commit_user(&self, user: ConversationUserInfo);
}

struct ConversationState {
    info: Arc<ConversationInfo>,
    users: HashMap<UserId, ConversationUserInfo>,
    watermarks: HashMap<UserId, LogId>,
}

struct ConversationInner {
    id: ConversationId,
    kind: ConversationKind,
    state: RwLock<ConversationState>,
    events: EventEmitter<ClientEvent>,
}

/// Live conversation held by the registry. Cloning shares the same cache.
#[derive(Clone)]
pub struct Conversation {
    inner: Arc<ConversationInner>,
}

impl Conversation {
    pub fn new(info: ConversationInfo) -> Self {
        Self {
            inner: Arc::new(ConversationInner {
                id: info.id,
                kind: info.kind,
                state: RwLock::new(ConversationState {
                    info: Arc::new(info),
                    users: HashMap::new(),
                    watermarks: HashMap::new(),
                }),
                events: EventEmitter::new(),
            }),
        }
    }

    /// Materialize a conversation from initial-load or join data
    pub fn from_seed(
        kind: ConversationKind,
        link_id: Option<LinkId>,
        seed: ConversationSeed,
    ) -> Self {
        let mut info = ConversationInfo::new(seed.id, kind);
        info.link_id = link_id;
        info.display_name = seed.display_name;
        if let Some(last_log) = seed.last_log {
            info.last_log_id = Some(last_log.log_id);
            info.last_log = Some(last_log);
        }
        info.meta_map = Arc::new(
            seed.meta
                .into_iter()
                .map(|meta| (meta.meta_type, meta))
                .collect::<MetaMap>(),
        );

        let conversation = Self::new(info);
        {
            let mut state = conversation.inner.state.write();
            for user in seed.users {
                state.users.insert(user.user_id, user);
            }
            for mark in seed.watermarks {
                state.watermarks.insert(mark.user_id, mark.log_id);
            }
        }
        conversation
    }

    pub fn id(&self) -> ConversationId {
        self.inner.id
    }

    pub fn kind(&self) -> ConversationKind {
        self.inner.kind
    }

    pub fn is_open(&self) -> bool {
        self.inner.kind == ConversationKind::Open
    }

    /// Conversation-scope observers
    pub fn events(&self) -> &EventEmitter<ClientEvent> {
        &self.inner.events
    }

    pub fn info(&self) -> Arc<ConversationInfo> {
        self.current_info()
    }

    pub fn user(&self, user_id: UserId) -> Option<ConversationUserInfo> {
        self.lookup_user(user_id)
    }

    pub fn users(&self) -> Vec<ConversationUserInfo> {
        let state = self.inner.state.read();
        let mut users: Vec<_> = state.users.values().cloned().collect();
        users.sort_by_key(|u| u.user_id);
        users
    }

    pub fn user_count(&self) -> usize {
        self.inner.state.read().users.len()
    }

    pub fn watermark(&self, user_id: UserId) -> Option<LogId> {
        self.inner.state.read().watermarks.get(&user_id).copied()
    }

    /// Members whose watermark is below `log_id`
    pub fn unread_count(&self, log_id: LogId) -> usize {
        let state = self.inner.state.read();
        state
            .users
            .keys()
            .filter(|user_id| state.watermarks.get(user_id).is_none_or(|w| *w < log_id))
            .count()
    }

    /// Whether both handles point at the same cache
    pub fn same_as(&self, other: &Conversation) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Replace every member at once (used after a full member refresh)
    pub(crate) fn replace_users(&self, users: Vec<ConversationUserInfo>) {
        let mut state = self.inner.state.write();
        state.users = users.into_iter().map(|u| (u.user_id, u)).collect();
    }
}

impl ConversationStore for Conversation {
    fn current_info(&self) -> Arc<ConversationInfo> {
        self.inner.state.read().info.clone()
    }

    fn lookup_user(&self, user_id: UserId) -> Option<ConversationUserInfo> {
        self.inner.state.read().users.get(&user_id).cloned()
    }
}

impl ConversationUpdater for Conversation {
    fn commit_info(&self, patch: InfoPatch) {
        let mut state = self.inner.state.write();
        let next = state.info.patched(patch);
        state.info = Arc::new(next);
    }

    fn commit_watermark(&self, user_id: UserId, log_id: LogId) {
        self.inner.state.write().watermarks.insert(user_id, log_id);
    }

    fn remove_user(&self, user_id: UserId) -> bool {
        let mut state = self.inner.state.write();
        state.watermarks.remove(&user_id);
        state.users.remove(&user_id).is_some()
    }

    fn commit_user(&self, user: ConversationUserInfo) {
        self.inner.state.write().users.insert(user.user_id, user);
    }
}

impl fmt::Debug for Conversation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Conversation")
            .field("id", &self.inner.id)
            .field("kind", &self.inner.kind)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConversationMeta, LogRecord, LogType, MetaType, ReadMark};
    use crate::test_support::meta;

    fn user(id: i64, nickname: &str) -> ConversationUserInfo {
        ConversationUserInfo {
            user_id: UserId(id),
            nickname: nickname.to_string(),
            profile_image_url: None,
            member_type: Default::default(),
        }
    }

    #[test]
    fn test_from_seed() {
        let seed = ConversationSeed {
            id: ConversationId(10),
            display_name: Some("team".to_string()),
            last_log: Some(LogRecord {
                log_id: LogId(44),
                conversation_id: ConversationId(10),
                sender_id: UserId(1),
                log_type: LogType::Text,
                content: "hi".to_string(),
                attachment: None,
                sent_at: 0,
            }),
            meta: vec![ConversationMeta {
                meta_type: MetaType::Notice,
                revision: 2,
                author_id: UserId(1),
                content: "be nice".to_string(),
                updated_at: 0,
            }],
            users: vec![user(1, "ara"), user(2, "bo")],
            watermarks: vec![ReadMark {
                user_id: UserId(2),
                log_id: LogId(40),
            }],
        };

        let conversation = Conversation::from_seed(ConversationKind::Open, Some(LinkId(5)), seed);
        let info = conversation.info();

        assert!(conversation.is_open());
        assert_eq!(info.link_id, Some(LinkId(5)));
        assert_eq!(info.last_log_id, Some(LogId(44)));
        assert_eq!(info.meta(MetaType::Notice).unwrap().content, "be nice");
        assert_eq!(conversation.user_count(), 2);
        assert_eq!(conversation.watermark(UserId(2)), Some(LogId(40)));
        assert_eq!(conversation.unread_count(LogId(44)), 2);
        assert_eq!(conversation.unread_count(LogId(40)), 1);
    }

    #[test]
    fn test_watermark_without_user_record() {
        let conversation = Conversation::new(ConversationInfo::new(
            ConversationId(1),
            ConversationKind::Ordinary,
        ));
        conversation.commit_watermark(UserId(99), LogId(7));

        assert!(conversation.lookup_user(UserId(99)).is_none());
        assert_eq!(conversation.watermark(UserId(99)), Some(LogId(7)));
    }

    #[test]
    fn test_commit_info_replaces_snapshot() {
        let conversation = Conversation::new(ConversationInfo::new(
            ConversationId(1),
            ConversationKind::Ordinary,
        ));
        let before = conversation.current_info();
        conversation.commit_info(InfoPatch::meta_map(Arc::new(
            [(MetaType::Title, meta(MetaType::Title, "renamed"))].into_iter().collect(),
        )));

        assert!(before.meta(MetaType::Title).is_none());
        assert_eq!(conversation.info().meta(MetaType::Title).unwrap().content, "renamed");
        assert!(!Arc::ptr_eq(&before, &conversation.info()));
    }

    #[test]
    fn test_user_lifecycle() {
        let conversation = Conversation::new(ConversationInfo::new(
            ConversationId(1),
            ConversationKind::Ordinary,
        ));
        conversation.commit_user(user(3, "cy"));
        conversation.commit_watermark(UserId(3), LogId(1));

        assert_eq!(conversation.user(UserId(3)).unwrap().nickname, "cy");
        assert!(conversation.remove_user(UserId(3)));
        assert!(!conversation.remove_user(UserId(3)));
        assert!(conversation.watermark(UserId(3)).is_none());

        conversation.replace_users(vec![user(4, "di"), user(5, "ed")]);
        let ids: Vec<_> = conversation.users().iter().map(|u| u.user_id).collect();
        assert_eq!(ids, vec![UserId(4), UserId(5)]);
    }
}
