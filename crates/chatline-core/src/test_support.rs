//! Builders and a scriptable session shared by the unit tests

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

use crate::context::EventEmitter;
use crate::events::ClientEvent;
use crate::models::{
    ConversationId, ConversationMeta, ConversationRef, ConversationSeed, ConversationUserInfo,
    LogId, LogRecord, LogType, MemberType, MetaType, UserId,
};
use crate::push::{PushMessage, PushTag};
use crate::session::{Session, SessionError, SessionResult};

pub(crate) fn user(id: i64, nickname: &str) -> ConversationUserInfo {
    ConversationUserInfo {
        user_id: UserId(id),
        nickname: nickname.to_string(),
        profile_image_url: None,
        member_type: MemberType::Normal,
    }
}

pub(crate) fn text_log(conversation: i64, log_id: i64, sender: i64, text: &str) -> LogRecord {
    LogRecord {
        log_id: LogId(log_id),
        conversation_id: ConversationId(conversation),
        sender_id: UserId(sender),
        log_type: LogType::Text,
        content: text.to_string(),
        attachment: None,
        sent_at: 0,
    }
}

/// Feed log whose content is the JSON-encoded `feed`
pub(crate) fn feed_log(conversation: i64, log_id: i64, sender: i64, feed: Value) -> LogRecord {
    LogRecord {
        log_type: LogType::Feed,
        content: feed.to_string(),
        ..text_log(conversation, log_id, sender, "")
    }
}

pub(crate) fn meta(meta_type: MetaType, content: &str) -> ConversationMeta {
    ConversationMeta {
        meta_type,
        revision: 1,
        author_id: UserId(1),
        content: content.to_string(),
        updated_at: 0,
    }
}

pub(crate) fn chat_push(tag: PushTag, conversation: i64, log: &LogRecord) -> PushMessage {
    PushMessage::new(tag, json!({"conversationId": conversation, "log": log}))
}

pub(crate) fn feed_push(tag: PushTag, log: &LogRecord) -> PushMessage {
    PushMessage::new(tag, json!({ "log": log }))
}

pub(crate) fn meta_push(conversation: i64, meta: ConversationMeta) -> PushMessage {
    PushMessage::new(
        PushTag::MetaChange,
        json!({"conversationId": conversation, "meta": meta}),
    )
}

pub(crate) fn read_push(conversation: i64, user: i64, watermark: i64) -> PushMessage {
    PushMessage::new(
        PushTag::ReadReceipt,
        json!({"conversationId": conversation, "userId": user, "watermark": watermark}),
    )
}

/// Collect every event reaching `emitter`
pub(crate) fn record_events(emitter: &EventEmitter<ClientEvent>) -> Arc<Mutex<Vec<ClientEvent>>> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    emitter.subscribe(move |event: &ClientEvent| sink.lock().push(event.clone()));
    events
}

/// Session double. Unscripted member and conversation fetches fail with
/// `NotFound`; unscripted user fetches resolve to nothing.
pub(crate) struct MockSession {
    latest_users: Mutex<SessionResult<Vec<ConversationUserInfo>>>,
    latest_user_failures: Mutex<u32>,
    latest_user_calls: Mutex<Vec<(ConversationId, Vec<UserId>)>>,
    members: Mutex<HashMap<ConversationId, SessionResult<Vec<ConversationUserInfo>>>>,
    conversations: Mutex<HashMap<ConversationId, SessionResult<ConversationSeed>>>,
    conversation_failures: Mutex<u32>,
    conversation_calls: Mutex<u32>,
}

impl MockSession {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            latest_users: Mutex::new(Ok(Vec::new())),
            latest_user_failures: Mutex::new(0),
            latest_user_calls: Mutex::new(Vec::new()),
            members: Mutex::new(HashMap::new()),
            conversations: Mutex::new(HashMap::new()),
            conversation_failures: Mutex::new(0),
            conversation_calls: Mutex::new(0),
        })
    }

    pub fn set_latest_users(&self, result: SessionResult<Vec<ConversationUserInfo>>) {
        *self.latest_users.lock() = result;
    }

    /// Fail the next `times` user fetches with a retryable error
    pub fn fail_latest_users_times(&self, times: u32) {
        *self.latest_user_failures.lock() = times;
    }

    pub fn latest_user_calls(&self) -> Vec<(ConversationId, Vec<UserId>)> {
        self.latest_user_calls.lock().clone()
    }

    pub fn set_members(
        &self,
        conversation: ConversationId,
        result: SessionResult<Vec<ConversationUserInfo>>,
    ) {
        self.members.lock().insert(conversation, result);
    }

    pub fn set_conversation(
        &self,
        conversation: ConversationId,
        result: SessionResult<ConversationSeed>,
    ) {
        self.conversations.lock().insert(conversation, result);
    }

    /// Fail the next `times` conversation fetches with a retryable error
    pub fn fail_conversation_times(&self, times: u32) {
        *self.conversation_failures.lock() = times;
    }

    pub fn conversation_calls(&self) -> u32 {
        *self.conversation_calls.lock()
    }
}

fn take_failure(remaining: &Mutex<u32>) -> bool {
    let mut remaining = remaining.lock();
    if *remaining == 0 {
        return false;
    }
    *remaining -= 1;
    true
}

#[async_trait]
impl Session for MockSession {
    async fn fetch_latest_users(
        &self,
        conversation: ConversationId,
        users: Vec<UserId>,
    ) -> SessionResult<Vec<ConversationUserInfo>> {
        self.latest_user_calls.lock().push((conversation, users));
        if take_failure(&self.latest_user_failures) {
            return Err(SessionError::Rejected { status: -500 });
        }
        self.latest_users.lock().clone()
    }

    async fn fetch_members(
        &self,
        conversation: ConversationId,
    ) -> SessionResult<Vec<ConversationUserInfo>> {
        self.members
            .lock()
            .get(&conversation)
            .cloned()
            .unwrap_or_else(|| Err(SessionError::NotFound(format!("members of {}", conversation))))
    }

    async fn fetch_conversation(
        &self,
        reference: ConversationRef,
    ) -> SessionResult<ConversationSeed> {
        *self.conversation_calls.lock() += 1;
        if take_failure(&self.conversation_failures) {
            return Err(SessionError::Rejected { status: -500 });
        }
        let id = reference.conversation_id;
        self.conversations
            .lock()
            .get(&id)
            .cloned()
            .unwrap_or_else(|| Err(SessionError::NotFound(format!("conversation {}", id))))
    }
}
