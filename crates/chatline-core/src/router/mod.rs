pub mod conversation;
pub mod list;

pub use conversation::ConversationEventRouter;
pub use list::ConversationListEventRouter;

use std::future::Future;
use tokio::task::JoinHandle;

/// Asynchronous resolutions started while routing a push.
///
/// Routing never waits on these; callers that care about completion
/// (replay tools, tests) can await them with [`PendingResolutions::settled`].
#[derive(Debug, Default)]
pub struct PendingResolutions {
    handles: Vec<JoinHandle<()>>,
}

impl PendingResolutions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub(crate) fn push(&mut self, handle: Option<JoinHandle<()>>) {
        if let Some(handle) = handle {
            self.handles.push(handle);
        }
    }

    pub fn extend(&mut self, other: PendingResolutions) {
        self.handles.extend(other.handles);
    }

    /// Wait for every resolution to finish
    pub async fn settled(self) {
        for handle in self.handles {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "push resolution task failed");
            }
        }
    }
}

/// Spawn onto the ambient tokio runtime, if there is one
pub(crate) fn spawn_resolution<F>(what: &'static str, fut: F) -> Option<JoinHandle<()>>
where
    F: Future<Output = ()> + Send + 'static,
{
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => Some(handle.spawn(fut)),
        Err(_) => {
            tracing::warn!(what, "no async runtime available, dropping push resolution");
            None
        }
    }
}
