pub mod conversation;
pub mod conversation_list;
pub mod registry;

pub use conversation::{Conversation, ConversationStore, ConversationUpdater};
pub use conversation_list::{
    ConversationList, ConversationListStore, ConversationListUpdater, ListError,
};
pub use registry::ConversationRegistry;
