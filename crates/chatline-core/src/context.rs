//! Scoped event propagation.
//!
//! An [`EventEmitter`] is a listener registry for one observer scope
//! (a conversation, the conversation list, the client). An [`EventContext`]
//! links emitters into a chain: emitting through a context fires its own
//! emitter first, then every ancestor in order, ending at the root.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Handle returned by [`EventEmitter::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener<E> = Arc<dyn Fn(&E) + Send + Sync>;

struct EmitterInner<E> {
    listeners: RwLock<Vec<(ListenerId, Listener<E>)>>,
    next_id: AtomicU64,
}

/// Listener registry for a single scope. Cloning shares the registry.
pub struct EventEmitter<E> {
    inner: Arc<EmitterInner<E>>,
}

impl<E> Clone for EventEmitter<E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<E> Default for EventEmitter<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> EventEmitter<E> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(EmitterInner {
                listeners: RwLock::new(Vec::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Register a listener. Listeners fire in registration order.
    pub fn subscribe<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let id = ListenerId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        self.inner.listeners.write().push((id, Arc::new(listener)));
        id
    }

    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self.inner.listeners.write();
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.read().len()
    }

    /// Fire every listener of this scope only
    pub fn emit(&self, event: &E) {
        // Snapshot so listeners can (un)subscribe without deadlocking
        let listeners: Vec<Listener<E>> = self
            .inner
            .listeners
            .read()
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in listeners {
            listener(event);
        }
    }

    pub fn same_as(&self, other: &EventEmitter<E>) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

/// Node in the propagation chain
pub struct EventContext<E> {
    emitter: EventEmitter<E>,
    parent: Option<Arc<EventContext<E>>>,
}

impl<E> Clone for EventContext<E> {
    fn clone(&self) -> Self {
        Self {
            emitter: self.emitter.clone(),
            parent: self.parent.clone(),
        }
    }
}

impl<E> EventContext<E> {
    /// Context with no parent (client scope)
    pub fn root(emitter: EventEmitter<E>) -> Self {
        Self {
            emitter,
            parent: None,
        }
    }

    /// Narrower scope whose emissions bubble up through `self`
    pub fn child(&self, emitter: EventEmitter<E>) -> Self {
        Self {
            emitter,
            parent: Some(Arc::new(self.clone())),
        }
    }

    pub fn emitter(&self) -> &EventEmitter<E> {
        &self.emitter
    }

    pub fn parent(&self) -> Option<&EventContext<E>> {
        self.parent.as_deref()
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Number of scopes an emission visits
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut scope = Some(self);
        while let Some(ctx) = scope {
            depth += 1;
            scope = ctx.parent();
        }
        depth
    }

    /// Fire the local scope, then each ancestor up to the root
    pub fn emit(&self, event: &E) {
        let mut scope = Some(self);
        while let Some(ctx) = scope {
            ctx.emitter.emit(event);
            scope = ctx.parent();
        }
    }
}

impl<E> Drop for EventContext<E> {
    // Unlink uniquely owned ancestors one at a time so long chains don't drop recursively
    fn drop(&mut self) {
        let mut parent = self.parent.take();
        while let Some(ctx) = parent {
            match Arc::try_unwrap(ctx) {
                Ok(mut ctx) => parent = ctx.parent.take(),
                Err(_) => break,
            }
        }
    }
}
