use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;

use crate::context::EventContext;
use crate::events::ClientEvent;
use crate::models::{ConversationId, ConversationKind, ConversationRef, ConversationSeed, LinkId};
use crate::push::PushMessage;
use crate::router::{ConversationEventRouter, ConversationListEventRouter, PendingResolutions};
use crate::session::{RetryPolicy, Retryable, Session, SessionError};

use super::conversation::Conversation;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ListError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("conversation {id} is already claimed by the {holder:?} list")]
    Claimed {
        id: ConversationId,
        holder: ConversationKind,
    },
}

impl Retryable for ListError {
    fn session_error(&self) -> Option<&SessionError> {
        match self {
            ListError::Session(e) => Some(e),
            ListError::Claimed { .. } => None,
        }
    }
}

/// Lookup side of a conversation list
pub trait ConversationListStore: Send + Sync {
    fn lookup(&self, id: ConversationId) -> Option<Conversation>;
}

/// Membership side of a conversation list
#[async_trait]
pub trait ConversationListUpdater: Send + Sync {
    /// Resolve and start tracking a conversation the client joined
    async fn add_conversation(&self, reference: ConversationRef) -> Result<Conversation, ListError>;
    fn remove_conversation(&self, conversation: &Conversation) -> bool;
}

/// Which list currently owns each id. Shared by both lists of a registry so
/// an id can never be held by both.
#[derive(Clone, Default)]
pub(crate) struct IdClaims {
    inner: Arc<Mutex<HashMap<ConversationId, ConversationKind>>>,
}

impl IdClaims {
    /// Fails with the current holder if the id is already claimed
    fn claim(&self, id: ConversationId, kind: ConversationKind) -> Result<(), ConversationKind> {
        let mut claims = self.inner.lock();
        match claims.get(&id) {
            Some(holder) => Err(*holder),
            None => {
                claims.insert(id, kind);
                Ok(())
            }
        }
    }

    fn release(&self, id: ConversationId, kind: ConversationKind) {
        let mut claims = self.inner.lock();
        if claims.get(&id) == Some(&kind) {
            claims.remove(&id);
        }
    }
}

#[derive(Default)]
struct ListState {
    /// Insertion order
    order: Vec<ConversationId>,
    routers: HashMap<ConversationId, ConversationEventRouter>,
}

struct ListInner {
    kind: ConversationKind,
    state: RwLock<ListState>,
    claims: IdClaims,
    session: Arc<dyn Session>,
    retry: Arc<dyn RetryPolicy>,
}

/// Sub-registry holding every conversation of one kind.
/// Cloning shares the same list.
#[derive(Clone)]
pub struct ConversationList {
    inner: Arc<ListInner>,
}

impl ConversationList {
    pub(crate) fn new(
        kind: ConversationKind,
        claims: IdClaims,
        session: Arc<dyn Session>,
        retry: Arc<dyn RetryPolicy>,
    ) -> Self {
        Self {
            inner: Arc::new(ListInner {
                kind,
                state: RwLock::new(ListState::default()),
                claims,
                session,
                retry,
            }),
        }
    }

    pub fn kind(&self) -> ConversationKind {
        self.inner.kind
    }

    pub fn len(&self) -> usize {
        self.inner.state.read().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: ConversationId) -> bool {
        self.inner.state.read().routers.contains_key(&id)
    }

    /// Snapshot of the held conversations in insertion order
    pub fn conversations(&self) -> Vec<Conversation> {
        let state = self.inner.state.read();
        state
            .order
            .iter()
            .filter_map(|id| state.routers.get(id))
            .map(|router| router.conversation().clone())
            .collect()
    }

    pub fn clear(&self) {
        let mut state = self.inner.state.write();
        for id in state.order.drain(..) {
            self.inner.claims.release(id, self.inner.kind);
        }
        state.routers.clear();
    }

    /// Load conversations from the session-start list, then refresh each
    /// one's members. Ids already claimed elsewhere are skipped.
    pub async fn initialize(&self, seeds: Vec<(ConversationSeed, Option<LinkId>)>) {
        let mut loaded = Vec::with_capacity(seeds.len());
        for (seed, link_id) in seeds {
            if let Err(holder) = self.inner.claims.claim(seed.id, self.inner.kind) {
                tracing::warn!(
                    conversation_id = %seed.id,
                    kind = ?self.inner.kind,
                    holder = ?holder,
                    "skipping conversation already held by another list"
                );
                continue;
            }
            let conversation = Conversation::from_seed(self.inner.kind, link_id, seed);
            self.insert(conversation.clone());
            loaded.push(conversation);
        }

        futures::future::join_all(loaded.iter().map(|c| self.refresh_members(c))).await;
        tracing::debug!(
            kind = ?self.inner.kind,
            count = loaded.len(),
            "conversation list initialized"
        );
    }

    async fn refresh_members(&self, conversation: &Conversation) {
        match self.inner.session.fetch_members(conversation.id()).await {
            Ok(users) => conversation.replace_users(users),
            Err(e) => {
                tracing::warn!(
                    conversation_id = %conversation.id(),
                    error = %e,
                    "member refresh failed, keeping cached members"
                );
            }
        }
    }

    fn insert(&self, conversation: Conversation) {
        let id = conversation.id();
        let router = ConversationEventRouter::new(
            conversation,
            self.inner.session.clone(),
            self.inner.retry.clone(),
        );
        let mut state = self.inner.state.write();
        if state.routers.insert(id, router).is_none() {
            state.order.push(id);
        }
    }

    /// Route a push through every held conversation, then through the list router.
    /// `ctx` is the list scope shared with the sibling list.
    pub fn push_received(
        &self,
        push: &PushMessage,
        ctx: &EventContext<ClientEvent>,
    ) -> PendingResolutions {
        // Collected up front so no lock is held while listeners run
        let routers: Vec<ConversationEventRouter> = {
            let state = self.inner.state.read();
            state
                .order
                .iter()
                .filter_map(|id| state.routers.get(id).cloned())
                .collect()
        };

        let mut pending = PendingResolutions::new();
        for router in &routers {
            pending.push(router.push_received(push, ctx));
        }

        let list_router = ConversationListEventRouter::new(
            self.inner.kind,
            self.clone(),
            self.inner.retry.clone(),
        );
        pending.push(list_router.push_received(push, ctx));
        pending
    }
}

impl ConversationListStore for ConversationList {
    fn lookup(&self, id: ConversationId) -> Option<Conversation> {
        self.inner
            .state
            .read()
            .routers
            .get(&id)
            .map(|router| router.conversation().clone())
    }
}

#[async_trait]
impl ConversationListUpdater for ConversationList {
    async fn add_conversation(
        &self,
        reference: ConversationRef,
    ) -> Result<Conversation, ListError> {
        let id = reference.conversation_id;
        let kind = self.inner.kind;
        if let Some(existing) = self.lookup(id) {
            return Ok(existing);
        }
        self.inner
            .claims
            .claim(id, kind)
            .map_err(|holder| ListError::Claimed { id, holder })?;

        match self.inner.session.fetch_conversation(reference).await {
            Ok(mut seed) => {
                seed.id = id;
                let conversation = Conversation::from_seed(kind, reference.link_id, seed);
                self.insert(conversation.clone());
                Ok(conversation)
            }
            Err(e) => {
                self.inner.claims.release(id, kind);
                Err(e.into())
            }
        }
    }

    fn remove_conversation(&self, conversation: &Conversation) -> bool {
        let id = conversation.id();
        let mut state = self.inner.state.write();
        if state.routers.remove(&id).is_none() {
            return false;
        }
        state.order.retain(|held| *held != id);
        self.inner.claims.release(id, self.inner.kind);
        true
    }
}
