pub mod client;
pub mod config;
pub mod context;
pub mod events;
pub mod models;
pub mod push;
pub mod router;
pub mod session;
pub mod store;
pub mod tracing_setup;

#[cfg(test)]
mod test_support;

pub use client::ChatClient;
pub use config::{ConfigError, CoreConfig, RetryConfig};
pub use context::{EventContext, EventEmitter, ListenerId};
pub use events::{ClientEvent, ConversationEvent, ListEvent};
pub use push::{PushEnvelope, PushMessage, PushTag};
pub use router::PendingResolutions;
pub use session::{FixedBackoff, NoRetry, RetryPolicy, Session, SessionError, SessionResult};
pub use store::{Conversation, ConversationList, ConversationRegistry, ListError};
