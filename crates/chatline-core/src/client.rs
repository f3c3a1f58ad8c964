use std::sync::Arc;

use crate::config::CoreConfig;
use crate::context::{EventContext, EventEmitter};
use crate::events::ClientEvent;
use crate::models::ConversationEntry;
use crate::push::{PushEnvelope, PushMessage};
use crate::router::PendingResolutions;
use crate::session::Session;
use crate::store::ConversationRegistry;

/// Client-scope entry point: owns the conversation registry and the root
/// of the event chain. Transports hand every push to [`ChatClient::handle_push`].
pub struct ChatClient {
    config: CoreConfig,
    registry: ConversationRegistry,
    events: EventEmitter<ClientEvent>,
}

impl ChatClient {
    pub fn new(session: Arc<dyn Session>, config: CoreConfig) -> Self {
        let registry = ConversationRegistry::new(session, config.retry_policy());
        Self {
            config,
            registry,
            events: EventEmitter::new(),
        }
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// Client scope; sees every event from every conversation
    pub fn events(&self) -> &EventEmitter<ClientEvent> {
        &self.events
    }

    pub fn registry(&self) -> &ConversationRegistry {
        &self.registry
    }

    pub fn root_context(&self) -> EventContext<ClientEvent> {
        EventContext::root(self.events.clone())
    }

    pub async fn initialize(&self, entries: Vec<ConversationEntry>) {
        self.registry.initialize(entries).await;
        tracing::info!(conversations = self.registry.size(), "client initialized");
    }

    pub fn handle_push(&self, envelope: PushEnvelope) -> PendingResolutions {
        self.process_push(&PushMessage::from(envelope))
    }

    pub fn process_push(&self, push: &PushMessage) -> PendingResolutions {
        if !push.tag.is_known() {
            tracing::debug!(method = push.tag.method(), "ignoring unknown push");
            return PendingResolutions::new();
        }
        self.registry.push_received(push, &self.root_context())
    }
}
