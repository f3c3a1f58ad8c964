use std::sync::Arc;

use crate::models::{
    ConversationId, ConversationInfo, ConversationMeta, ConversationUserInfo, FeedRecord,
    LogRecord, MemberType, MetaType, ReadMark,
};
use crate::store::Conversation;

/// Events raised from inside one conversation
#[derive(Debug, Clone)]
pub enum ConversationEvent {
    /// A message or system feed was posted
    Chat {
        record: LogRecord,
        conversation: Conversation,
    },
    /// A member acknowledged logs up to `read.log_id`.
    /// `user` is None when the member isn't in the local cache.
    ChatRead {
        read: ReadMark,
        conversation: Conversation,
        user: Option<ConversationUserInfo>,
    },
    /// A meta value changed. `info` is the snapshot from before the change.
    MetaChange {
        conversation: Conversation,
        meta_type: MetaType,
        meta: ConversationMeta,
        info: Arc<ConversationInfo>,
    },
    UserLeft {
        record: LogRecord,
        conversation: Conversation,
        user: ConversationUserInfo,
        feed: FeedRecord,
    },
    UserJoin {
        record: LogRecord,
        conversation: Conversation,
        user: ConversationUserInfo,
        feed: FeedRecord,
    },
    /// A message was deleted for everyone
    ChatDeleted {
        record: LogRecord,
        conversation: Conversation,
        feed: FeedRecord,
    },
    /// Open conversations only: a member's role changed
    PermChanged {
        conversation: Conversation,
        user: ConversationUserInfo,
        previous: MemberType,
    },
    /// Open conversations only: a member replaced their link profile
    ProfileChanged {
        conversation: Conversation,
        previous: ConversationUserInfo,
        current: ConversationUserInfo,
    },
}

impl ConversationEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ConversationEvent::Chat { .. } => "chat",
            ConversationEvent::ChatRead { .. } => "chat_read",
            ConversationEvent::MetaChange { .. } => "meta_change",
            ConversationEvent::UserLeft { .. } => "user_left",
            ConversationEvent::UserJoin { .. } => "user_join",
            ConversationEvent::ChatDeleted { .. } => "chat_deleted",
            ConversationEvent::PermChanged { .. } => "perm_changed",
            ConversationEvent::ProfileChanged { .. } => "profile_changed",
        }
    }

    pub fn conversation(&self) -> &Conversation {
        match self {
            ConversationEvent::Chat { conversation, .. }
            | ConversationEvent::ChatRead { conversation, .. }
            | ConversationEvent::MetaChange { conversation, .. }
            | ConversationEvent::UserLeft { conversation, .. }
            | ConversationEvent::UserJoin { conversation, .. }
            | ConversationEvent::ChatDeleted { conversation, .. }
            | ConversationEvent::PermChanged { conversation, .. }
            | ConversationEvent::ProfileChanged { conversation, .. } => conversation,
        }
    }
}

/// Events raised when the set of conversations changes
#[derive(Debug, Clone)]
pub enum ListEvent {
    ConversationLeft { conversation: Conversation },
    ConversationJoined { conversation: Conversation },
}

impl ListEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ListEvent::ConversationLeft { .. } => "conversation_left",
            ListEvent::ConversationJoined { .. } => "conversation_joined",
        }
    }

    pub fn conversation(&self) -> &Conversation {
        match self {
            ListEvent::ConversationLeft { conversation }
            | ListEvent::ConversationJoined { conversation } => conversation,
        }
    }
}

/// Everything observable at client scope
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// Boxed to keep list events small
    Conversation(Box<ConversationEvent>),
    List(ListEvent),
}

impl ClientEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::Conversation(event) => event.name(),
            ClientEvent::List(event) => event.name(),
        }
    }

    pub fn as_conversation(&self) -> Option<&ConversationEvent> {
        match self {
            ClientEvent::Conversation(event) => Some(event),
            ClientEvent::List(_) => None,
        }
    }

    pub fn as_list(&self) -> Option<&ListEvent> {
        match self {
            ClientEvent::Conversation(_) => None,
            ClientEvent::List(event) => Some(event),
        }
    }

    pub fn conversation_id(&self) -> ConversationId {
        match self {
            ClientEvent::Conversation(event) => event.conversation().id(),
            ClientEvent::List(event) => event.conversation().id(),
        }
    }
}

impl From<ConversationEvent> for ClientEvent {
    fn from(event: ConversationEvent) -> Self {
        ClientEvent::Conversation(Box::new(event))
    }
}

impl From<ListEvent> for ClientEvent {
    fn from(event: ListEvent) -> Self {
        ClientEvent::List(event)
    }
}
