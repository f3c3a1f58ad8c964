use std::sync::Arc;

use crate::context::{EventContext, EventEmitter};
use crate::events::ClientEvent;
use crate::models::{ConversationEntry, ConversationId, ConversationKind, ConversationSeed, LinkId};
use crate::push::PushMessage;
use crate::router::PendingResolutions;
use crate::session::{RetryPolicy, Session};

use super::conversation::Conversation;
use super::conversation_list::{ConversationList, ConversationListStore, IdClaims};

/// Two-tier registry of every conversation the client participates in:
/// ordinary conversations and link-addressed open conversations.
///
/// The two lists share one id-claim table, so an id is only ever held by one.
pub struct ConversationRegistry {
    ordinary: ConversationList,
    open: ConversationList,
    /// List scope; sits between conversation scope and the client root
    events: EventEmitter<ClientEvent>,
}

impl ConversationRegistry {
    pub fn new(session: Arc<dyn Session>, retry: Arc<dyn RetryPolicy>) -> Self {
        let claims = IdClaims::default();
        Self {
            ordinary: ConversationList::new(
                ConversationKind::Ordinary,
                claims.clone(),
                session.clone(),
                retry.clone(),
            ),
            open: ConversationList::new(ConversationKind::Open, claims, session, retry),
            events: EventEmitter::new(),
        }
    }

    pub fn ordinary(&self) -> &ConversationList {
        &self.ordinary
    }

    pub fn open(&self) -> &ConversationList {
        &self.open
    }

    pub fn events(&self) -> &EventEmitter<ClientEvent> {
        &self.events
    }

    pub fn lookup(&self, id: ConversationId) -> Option<Conversation> {
        self.ordinary.lookup(id).or_else(|| self.open.lookup(id))
    }

    pub fn size(&self) -> usize {
        self.ordinary.len() + self.open.len()
    }

    /// Ordinary conversations then open ones. Both lists are snapshotted at
    /// call time; later membership changes don't affect a running traversal.
    pub fn all_conversations(&self) -> impl Iterator<Item = Conversation> {
        self.ordinary
            .conversations()
            .into_iter()
            .chain(self.open.conversations())
    }

    /// Populate both lists from the session-start conversation list.
    /// Existing contents are dropped first.
    pub async fn initialize(&self, entries: Vec<ConversationEntry>) {
        self.ordinary.clear();
        self.open.clear();

        let mut ordinary: Vec<(ConversationSeed, Option<LinkId>)> = Vec::new();
        let mut open: Vec<(ConversationSeed, Option<LinkId>)> = Vec::new();
        for entry in entries {
            match entry {
                ConversationEntry::Ordinary(seed) => ordinary.push((seed, None)),
                ConversationEntry::Open(entry) => open.push((entry.seed, Some(entry.link_id))),
            }
        }
        tracing::info!(
            ordinary = ordinary.len(),
            open = open.len(),
            "initializing conversation registry"
        );

        // Ordinary is polled first, so it wins an id listed under both kinds
        futures::join!(self.ordinary.initialize(ordinary), self.open.initialize(open));
    }

    /// Forward a push to both lists through one shared list-scope context
    pub fn push_received(
        &self,
        push: &PushMessage,
        parent: &EventContext<ClientEvent>,
    ) -> PendingResolutions {
        tracing::trace!(method = push.tag.method(), "routing push");
        let ctx = parent.child(self.events.clone());
        let mut pending = self.ordinary.push_received(push, &ctx);
        pending.extend(self.open.push_received(push, &ctx));
        pending
    }
}
