//! In-process identity provider.
//!
//! Holds the current identity and fans out changes to every subscriber. A new
//! subscriber is told the current state right away, the same way hosted auth
//! SDKs fire their state listener on registration.

use super::{Identity, IdentityProvider, Listener, Subscription};
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, PoisonError, Weak,
    },
};
use tracing::trace;

type Registry<I> = Mutex<HashMap<u64, Arc<Listener<I>>>>;

struct HubInner<I> {
    current: Mutex<Option<Arc<I>>>,
    listeners: Registry<I>,
    next_id: AtomicU64,
}

pub struct SessionHub<I> {
    inner: Arc<HubInner<I>>,
}

impl<I> Clone for SessionHub<I> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<I: Identity> Default for SessionHub<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: Identity> SessionHub<I> {
    /// A hub with nobody signed in.
    #[must_use]
    pub fn new() -> Self {
        Self::with_current(None)
    }

    #[must_use]
    pub fn with_current(current: Option<Arc<I>>) -> Self {
        Self {
            inner: Arc::new(HubInner {
                current: Mutex::new(current),
                listeners: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(0),
            }),
        }
    }

    #[must_use]
    pub fn current(&self) -> Option<Arc<I>> {
        self.inner
            .current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn sign_in(&self, identity: Arc<I>) {
        self.replace(Some(identity));
    }

    pub fn sign_out(&self) {
        self.replace(None);
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn replace(&self, identity: Option<Arc<I>>) {
        {
            let mut current = self
                .inner
                .current
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            current.clone_from(&identity);
        }
        self.notify(&identity);
    }

    fn notify(&self, identity: &Option<Arc<I>>) {
        // Snapshot so listeners run without the registry lock held.
        let listeners: Vec<Arc<Listener<I>>> = self
            .inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();

        trace!(
            listeners = listeners.len(),
            signed_in = identity.is_some(),
            "identity state changed"
        );

        for listener in listeners {
            listener(identity.clone());
        }
    }
}

fn unregister<I>(inner: &Weak<HubInner<I>>, id: u64) {
    if let Some(inner) = inner.upgrade() {
        inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
        trace!(id, "identity listener removed");
    }
}

impl<I: Identity> IdentityProvider for SessionHub<I> {
    type Identity = I;

    fn subscribe(&self, listener: Listener<I>) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let listener = Arc::new(listener);

        self.inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, listener.clone());

        listener(self.current());

        let weak = Arc::downgrade(&self.inner);
        Subscription::new(move || unregister(&weak, id))
    }
}
