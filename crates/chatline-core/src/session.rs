//! Collaborators the core calls out to: the remote session and the policy
//! deciding whether a failed resolution is attempted again.

use async_trait::async_trait;
use std::time::Duration;

use crate::models::{
    ConversationId, ConversationRef, ConversationSeed, ConversationUserInfo, UserId,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("request rejected by server (status {status})")]
    Rejected { status: i32 },
    #[error("session is not connected")]
    Disconnected,
    #[error("{0} not found")]
    NotFound(String),
    #[error("session error: {0}")]
    Other(String),
}

pub type SessionResult<T> = Result<T, SessionError>;

/// Remote calls made while reconciling pushes
#[async_trait]
pub trait Session: Send + Sync {
    /// Latest profiles of `users` inside `conversation`
    async fn fetch_latest_users(
        &self,
        conversation: ConversationId,
        users: Vec<UserId>,
    ) -> SessionResult<Vec<ConversationUserInfo>>;

    /// Every member of `conversation`
    async fn fetch_members(
        &self,
        conversation: ConversationId,
    ) -> SessionResult<Vec<ConversationUserInfo>>;

    /// Full state of a conversation the client just joined
    async fn fetch_conversation(
        &self,
        reference: ConversationRef,
    ) -> SessionResult<ConversationSeed>;
}

/// Decides whether a failed asynchronous resolution gets another attempt
pub trait RetryPolicy: Send + Sync {
    /// Delay before attempt `attempt + 1`, or None to give up.
    /// `attempt` counts from 1.
    fn backoff(&self, attempt: u32, error: &SessionError) -> Option<Duration>;
}

/// Drop on first failure
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRetry;

impl RetryPolicy for NoRetry {
    fn backoff(&self, _attempt: u32, _error: &SessionError) -> Option<Duration> {
        None
    }
}

/// Up to `max_attempts` extra attempts spaced by `delay`
#[derive(Debug, Clone, Copy)]
pub struct FixedBackoff {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy for FixedBackoff {
    fn backoff(&self, attempt: u32, error: &SessionError) -> Option<Duration> {
        if *error == SessionError::Disconnected || attempt > self.max_attempts {
            return None;
        }
        Some(self.delay)
    }
}

/// Errors that may carry a retryable session failure
pub(crate) trait Retryable {
    fn session_error(&self) -> Option<&SessionError>;
}

impl Retryable for SessionError {
    fn session_error(&self) -> Option<&SessionError> {
        Some(self)
    }
}

/// Run `op` until it succeeds or `policy` gives up
pub(crate) async fn with_retry<T, E, F, Fut>(policy: &dyn RetryPolicy, mut op: F) -> Result<T, E>
where
    E: Retryable + std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
{
    let mut attempt = 1;
    loop {
        let error = match op().await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };
        let delay = error
            .session_error()
            .and_then(|session_error| policy.backoff(attempt, session_error));
        match delay {
            Some(delay) => {
                tracing::debug!(attempt, error = %error, ?delay, "retrying resolution");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            None => return Err(error),
        }
    }
}
