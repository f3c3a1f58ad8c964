use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::context::EventContext;
use crate::events::{ClientEvent, ConversationEvent};
use crate::models::{FeedType, InfoPatch, LogRecord, ReadMark};
use crate::push::{
    ChatPostBody, FeedLogBody, MemberTypeBody, MetaChangeBody, ProfileBody, PushMessage, PushTag,
    ReadReceiptBody,
};
use crate::session::{with_retry, RetryPolicy, Session};
use crate::store::{Conversation, ConversationStore, ConversationUpdater};

use super::spawn_resolution;

/// Applies pushes addressed to one conversation and re-emits them as typed events.
///
/// Every failure is a silent drop: a push for another conversation, an
/// undecodable body, an unknown member or a failed fetch leaves the cache
/// untouched and emits nothing.
#[derive(Clone)]
pub struct ConversationEventRouter {
    conversation: Conversation,
    session: Arc<dyn Session>,
    retry: Arc<dyn RetryPolicy>,
}

impl ConversationEventRouter {
    pub fn new(
        conversation: Conversation,
        session: Arc<dyn Session>,
        retry: Arc<dyn RetryPolicy>,
    ) -> Self {
        Self {
            conversation,
            session,
            retry,
        }
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Route one push. `parent` is the enclosing (list) scope.
    /// Returns the handle of any asynchronous resolution it started.
    pub fn push_received(
        &self,
        push: &PushMessage,
        parent: &EventContext<ClientEvent>,
    ) -> Option<JoinHandle<()>> {
        match push.tag {
            PushTag::MessagePost | PushTag::SystemFeedPost => self.on_chat(push, parent),
            PushTag::ReadReceipt => self.on_read_receipt(push, parent),
            PushTag::MetaChange => self.on_meta_change(push, parent),
            PushTag::MemberLeft => self.on_member_left(push, parent),
            PushTag::MemberJoined => return self.on_member_joined(push, parent),
            PushTag::MessageDeleteSync => self.on_delete_sync(push, parent),
            PushTag::OpenMemberTypeChange => self.on_member_type_change(push, parent),
            PushTag::OpenProfileChange => self.on_profile_change(push, parent),
            PushTag::MembershipLeft | PushTag::MembershipJoined | PushTag::Unknown(_) => {}
        }
        None
    }

    fn scope(&self, parent: &EventContext<ClientEvent>) -> EventContext<ClientEvent> {
        parent.child(self.conversation.events().clone())
    }

    fn emit(&self, parent: &EventContext<ClientEvent>, event: ConversationEvent) {
        tracing::trace!(
            conversation_id = %self.conversation.id(),
            event = event.name(),
            "emitting"
        );
        self.scope(parent).emit(&ClientEvent::from(event));
    }

    /// Log body addressed to this conversation, if any
    fn own_log(&self, push: &PushMessage) -> Option<LogRecord> {
        let body: FeedLogBody = push.decode()?;
        (body.log.conversation_id == self.conversation.id()).then_some(body.log)
    }

    fn on_chat(&self, push: &PushMessage, parent: &EventContext<ClientEvent>) {
        let Some(body) = push.decode::<ChatPostBody>() else {
            return;
        };
        if body.conversation_id != self.conversation.id() {
            return;
        }

        // Observers see the previous last log; no staleness check on commit
        self.emit(
            parent,
            ConversationEvent::Chat {
                record: body.log.clone(),
                conversation: self.conversation.clone(),
            },
        );
        self.conversation.commit_info(InfoPatch::last_log(body.log));
    }

    fn on_read_receipt(&self, push: &PushMessage, parent: &EventContext<ClientEvent>) {
        let Some(body) = push.decode::<ReadReceiptBody>() else {
            return;
        };
        if body.conversation_id != self.conversation.id() {
            return;
        }

        let user = self.conversation.lookup_user(body.user_id);
        self.conversation.commit_watermark(body.user_id, body.watermark);
        self.emit(
            parent,
            ConversationEvent::ChatRead {
                read: ReadMark {
                    user_id: body.user_id,
                    log_id: body.watermark,
                },
                conversation: self.conversation.clone(),
                user,
            },
        );
    }

    fn on_meta_change(&self, push: &PushMessage, parent: &EventContext<ClientEvent>) {
        let Some(body) = push.decode::<MetaChangeBody>() else {
            return;
        };
        if body.conversation_id != self.conversation.id() {
            return;
        }

        let info = self.conversation.current_info();
        let mut meta_map = (*info.meta_map).clone();
        meta_map.insert(body.meta.meta_type, body.meta.clone());

        // Emitted against the pre-update snapshot, committed afterwards
        self.emit(
            parent,
            ConversationEvent::MetaChange {
                conversation: self.conversation.clone(),
                meta_type: body.meta.meta_type,
                meta: body.meta,
                info,
            },
        );
        self.conversation.commit_info(InfoPatch::meta_map(Arc::new(meta_map)));
    }

    fn on_member_left(&self, push: &PushMessage, parent: &EventContext<ClientEvent>) {
        let Some(record) = self.own_log(push) else {
            return;
        };
        let Some(user) = self.conversation.lookup_user(record.sender_id) else {
            tracing::debug!(
                conversation_id = %self.conversation.id(),
                user_id = %record.sender_id,
                "member-left for unknown user"
            );
            return;
        };

        self.conversation.remove_user(user.user_id);

        if let Some(feed) = record.feed() {
            self.emit(
                parent,
                ConversationEvent::UserLeft {
                    record,
                    conversation: self.conversation.clone(),
                    user,
                    feed,
                },
            );
        }
    }

    fn on_member_joined(
        &self,
        push: &PushMessage,
        parent: &EventContext<ClientEvent>,
    ) -> Option<JoinHandle<()>> {
        let record = self.own_log(push)?;
        let feed = record.feed()?;

        let conversation = self.conversation.clone();
        let session = self.session.clone();
        let retry = self.retry.clone();
        let scope = self.scope(parent);
        let sender_id = record.sender_id;

        spawn_resolution("member-joined", async move {
            let fetched = with_retry(retry.as_ref(), || {
                session.fetch_latest_users(conversation.id(), vec![sender_id])
            })
            .await;

            let users = match fetched {
                Ok(users) => users,
                Err(e) => {
                    tracing::debug!(
                        conversation_id = %conversation.id(),
                        user_id = %sender_id,
                        error = %e,
                        "dropping member-joined after failed profile fetch"
                    );
                    return;
                }
            };

            // The conversation may have been removed meanwhile; it is updated regardless
            for user in users {
                conversation.commit_user(user.clone());
                scope.emit(&ClientEvent::from(ConversationEvent::UserJoin {
                    record: record.clone(),
                    conversation: conversation.clone(),
                    user,
                    feed: feed.clone(),
                }));
            }
        })
    }

    fn on_delete_sync(&self, push: &PushMessage, parent: &EventContext<ClientEvent>) {
        let Some(record) = self.own_log(push) else {
            return;
        };
        let Some(feed) = record.feed() else {
            return;
        };
        if feed.feed_type != FeedType::DeleteToAll {
            return;
        }

        self.emit(
            parent,
            ConversationEvent::ChatDeleted {
                record,
                conversation: self.conversation.clone(),
                feed,
            },
        );
    }

    fn on_member_type_change(&self, push: &PushMessage, parent: &EventContext<ClientEvent>) {
        if !self.conversation.is_open() {
            return;
        }
        let Some(body) = push.decode::<MemberTypeBody>() else {
            return;
        };
        if body.conversation_id != self.conversation.id() {
            return;
        }
        let Some(mut user) = self.conversation.lookup_user(body.user_id) else {
            return;
        };

        let previous = user.member_type;
        user.member_type = body.member_type;
        self.conversation.commit_user(user.clone());
        self.emit(
            parent,
            ConversationEvent::PermChanged {
                conversation: self.conversation.clone(),
                user,
                previous,
            },
        );
    }

    fn on_profile_change(&self, push: &PushMessage, parent: &EventContext<ClientEvent>) {
        if !self.conversation.is_open() {
            return;
        }
        let Some(body) = push.decode::<ProfileBody>() else {
            return;
        };
        if body.conversation_id != self.conversation.id() {
            return;
        }
        let Some(previous) = self.conversation.lookup_user(body.profile.user_id) else {
            return;
        };

        self.conversation.commit_user(body.profile.clone());
        self.emit(
            parent,
            ConversationEvent::ProfileChanged {
                conversation: self.conversation.clone(),
                previous,
                current: body.profile,
            },
        );
    }
}
