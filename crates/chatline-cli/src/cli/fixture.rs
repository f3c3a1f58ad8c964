use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chatline_core::models::{
    ConversationEntry, ConversationId, ConversationRef, ConversationSeed, ConversationUserInfo,
    UserId,
};
use chatline_core::{PushEnvelope, Session, SessionError, SessionResult};
use serde::Deserialize;

/// Recorded session: the start-up conversation list, what the server answers
/// to lookups, and the pushes to replay in order.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fixture {
    #[serde(default)]
    pub conversations: Vec<ConversationEntry>,
    #[serde(default)]
    pub session: SessionFixture,
    #[serde(default)]
    pub pushes: Vec<PushEnvelope>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionFixture {
    /// Profiles returned by latest-user lookups
    #[serde(default)]
    pub users: Vec<ConversationUserInfo>,
    #[serde(default)]
    pub members: Vec<MemberList>,
    /// Conversations that can be joined during the replay
    #[serde(default)]
    pub conversations: Vec<ConversationSeed>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberList {
    pub conversation_id: ConversationId,
    #[serde(default)]
    pub users: Vec<ConversationUserInfo>,
}

impl Fixture {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read fixture: {}", path.display()))?;
        Self::from_json(&content)
            .with_context(|| format!("Failed to parse fixture: {}", path.display()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to deserialize fixture")
    }
}

/// Answers session calls from a fixture instead of a server
pub struct FixtureSession {
    data: SessionFixture,
}

impl FixtureSession {
    pub fn new(data: SessionFixture) -> Self {
        Self { data }
    }
}

#[async_trait]
impl Session for FixtureSession {
    async fn fetch_latest_users(
        &self,
        conversation: ConversationId,
        users: Vec<UserId>,
    ) -> SessionResult<Vec<ConversationUserInfo>> {
        let found: Vec<_> = self
            .data
            .users
            .iter()
            .filter(|user| users.contains(&user.user_id))
            .cloned()
            .collect();
        if found.is_empty() {
            return Err(SessionError::NotFound(format!(
                "users {:?} in conversation {}",
                users, conversation
            )));
        }
        Ok(found)
    }

    async fn fetch_members(
        &self,
        conversation: ConversationId,
    ) -> SessionResult<Vec<ConversationUserInfo>> {
        self.data
            .members
            .iter()
            .find(|members| members.conversation_id == conversation)
            .map(|members| members.users.clone())
            .ok_or_else(|| SessionError::NotFound(format!("members of {}", conversation)))
    }

    async fn fetch_conversation(
        &self,
        reference: ConversationRef,
    ) -> SessionResult<ConversationSeed> {
        self.data
            .conversations
            .iter()
            .find(|seed| seed.id == reference.conversation_id)
            .cloned()
            .ok_or_else(|| {
                SessionError::NotFound(format!("conversation {}", reference.conversation_id))
            })
    }
}
