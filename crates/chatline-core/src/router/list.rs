use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::context::EventContext;
use crate::events::{ClientEvent, ListEvent};
use crate::models::ConversationKind;
use crate::push::{MembershipJoinedBody, MembershipLeftBody, PushMessage, PushTag};
use crate::session::{with_retry, RetryPolicy};
use crate::store::{ConversationListStore, ConversationListUpdater};

use super::spawn_resolution;

/// Handles pushes that add or remove whole conversations from one list
pub struct ConversationListEventRouter<L> {
    kind: ConversationKind,
    list: L,
    retry: Arc<dyn RetryPolicy>,
}

impl<L> ConversationListEventRouter<L>
where
    L: ConversationListStore + ConversationListUpdater + Clone + 'static,
{
    pub fn new(kind: ConversationKind, list: L, retry: Arc<dyn RetryPolicy>) -> Self {
        Self { kind, list, retry }
    }

    pub fn kind(&self) -> ConversationKind {
        self.kind
    }

    /// `ctx` is the list scope; list events are emitted through it directly
    pub fn push_received(
        &self,
        push: &PushMessage,
        ctx: &EventContext<ClientEvent>,
    ) -> Option<JoinHandle<()>> {
        match push.tag {
            PushTag::MembershipLeft => {
                self.on_left(push, ctx);
                None
            }
            PushTag::MembershipJoined => self.on_joined(push, ctx),
            _ => None,
        }
    }

    fn on_left(&self, push: &PushMessage, ctx: &EventContext<ClientEvent>) {
        let Some(body) = push.decode::<MembershipLeftBody>() else {
            return;
        };
        let Some(conversation) = self.list.lookup(body.conversation_id) else {
            return;
        };

        if !self.list.remove_conversation(&conversation) {
            return;
        }
        tracing::debug!(conversation_id = %conversation.id(), "conversation left");
        ctx.emit(&ClientEvent::List(ListEvent::ConversationLeft { conversation }));
    }

    fn on_joined(
        &self,
        push: &PushMessage,
        ctx: &EventContext<ClientEvent>,
    ) -> Option<JoinHandle<()>> {
        let body = push.decode::<MembershipJoinedBody>()?;
        if body.kind != self.kind {
            return None;
        }

        let reference = body.reference();
        let list = self.list.clone();
        let retry = self.retry.clone();
        let ctx = ctx.clone();

        spawn_resolution("membership-joined", async move {
            let added = with_retry(retry.as_ref(), || list.add_conversation(reference)).await;

            match added {
                Ok(conversation) => {
                    tracing::debug!(conversation_id = %conversation.id(), "conversation joined");
                    ctx.emit(&ClientEvent::List(ListEvent::ConversationJoined { conversation }));
                }
                Err(e) => {
                    tracing::debug!(
                        conversation_id = %reference.conversation_id,
                        error = %e,
                        "dropping membership-joined after failed resolution"
                    );
                }
            }
        })
    }
}
