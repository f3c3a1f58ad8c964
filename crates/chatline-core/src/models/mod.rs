pub mod conversation;
pub mod ids;
pub mod log;

pub use conversation::{
    ConversationEntry, ConversationInfo, ConversationKind, ConversationMeta, ConversationRef,
    ConversationSeed, ConversationUserInfo, InfoPatch, MemberType, MetaMap, MetaType,
    OpenConversationSeed, ReadMark,
};
pub use ids::{ConversationId, LinkId, LogId, UserId};
pub use log::{FeedMember, FeedRecord, FeedType, LogRecord, LogType};
