use std::sync::Arc;

use chatline_core::{
    ChatClient, ClientEvent, Conversation, ConversationEvent, CoreConfig, ListEvent,
};
use parking_lot::Mutex;
use serde_json::{json, Value};

use super::fixture::{Fixture, FixtureSession};

/// Output of a replay: client-scope events in emission order, then the
/// registry contents once every push has settled.
#[derive(Debug, Clone, Default)]
pub struct ReplayReport {
    pub events: Vec<Value>,
    pub conversations: Vec<Value>,
}

/// Initialize a client from `fixture` and feed it every recorded push.
/// Each push's resolutions settle before the next push is delivered.
pub async fn replay(fixture: Fixture, config: CoreConfig) -> ReplayReport {
    let Fixture {
        conversations,
        session,
        pushes,
    } = fixture;

    let client = ChatClient::new(Arc::new(FixtureSession::new(session)), config);
    client.initialize(conversations).await;

    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    let listener = client
        .events()
        .subscribe(move |event: &ClientEvent| sink.lock().push(summarize_event(event)));

    let total = pushes.len();
    for (index, envelope) in pushes.into_iter().enumerate() {
        tracing::debug!(index, method = %envelope.method, "replaying push");
        client.handle_push(envelope).settled().await;
    }
    client.events().unsubscribe(listener);
    tracing::info!(pushes = total, "replay finished");

    let events = std::mem::take(&mut *events.lock());
    ReplayReport {
        events,
        conversations: client
            .registry()
            .all_conversations()
            .map(|conversation| summarize_conversation(&conversation))
            .collect(),
    }
}

/// One JSON object per event: its name, conversation, and the fields that
/// identify what changed
pub fn summarize_event(event: &ClientEvent) -> Value {
    let mut summary = json!({
        "event": event.name(),
        "conversationId": event.conversation_id(),
    });
    let details = match event {
        ClientEvent::Conversation(event) => match event.as_ref() {
            ConversationEvent::Chat { record, .. } => json!({
                "logId": record.log_id,
                "senderId": record.sender_id,
                "content": record.content,
            }),
            ConversationEvent::ChatRead { read, user, .. } => json!({
                "userId": read.user_id,
                "logId": read.log_id,
                "nickname": user.as_ref().map(|user| user.nickname.clone()),
            }),
            ConversationEvent::MetaChange {
                meta_type,
                meta,
                info,
                ..
            } => json!({
                "metaType": meta_type,
                "content": meta.content,
                "previous": info.meta(*meta_type).map(|previous| previous.content.clone()),
            }),
            ConversationEvent::UserLeft { user, feed, .. }
            | ConversationEvent::UserJoin { user, feed, .. } => json!({
                "userId": user.user_id,
                "nickname": user.nickname,
                "feedType": feed.feed_type,
            }),
            ConversationEvent::ChatDeleted { record, feed, .. } => json!({
                "logId": record.log_id,
                "targetLogId": feed.target_log_id,
            }),
            ConversationEvent::PermChanged { user, previous, .. } => json!({
                "userId": user.user_id,
                "previous": previous,
                "memberType": user.member_type,
            }),
            ConversationEvent::ProfileChanged {
                previous, current, ..
            } => json!({
                "userId": current.user_id,
                "previousNickname": previous.nickname,
                "nickname": current.nickname,
            }),
        },
        ClientEvent::List(ListEvent::ConversationLeft { conversation })
        | ClientEvent::List(ListEvent::ConversationJoined { conversation }) => json!({
            "kind": conversation.kind(),
        }),
    };

    if let (Value::Object(summary), Value::Object(details)) = (&mut summary, details) {
        summary.extend(details);
    }
    summary
}

fn summarize_conversation(conversation: &Conversation) -> Value {
    let info = conversation.info();
    json!({
        "id": info.id,
        "kind": info.kind,
        "linkId": info.link_id,
        "displayName": info.display_name,
        "lastLogId": info.last_log_id,
        "members": conversation
            .users()
            .into_iter()
            .map(|user| user.nickname)
            .collect::<Vec<_>>(),
        // Members who haven't read up to the last log
        "unread": info.last_log_id.map(|log_id| conversation.unread_count(log_id)),
        "meta": info.meta_map.values().collect::<Vec<_>>(),
    })
}
