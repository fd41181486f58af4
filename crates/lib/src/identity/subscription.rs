//! Subscription handle for identity-change events

use tokio::sync::mpsc;

use super::IdentityEvent;

type UnsubscribeFn = Box<dyn FnOnce() + Send>;

/// Receiving end of an [`IdentityStore::subscribe`](super::IdentityStore::subscribe) call.
///
/// Events arrive in the order the store emitted them. Unsubscription runs exactly
/// once, either explicitly through [`IdentitySubscription::unsubscribe`] or when the
/// handle is dropped.
pub struct IdentitySubscription {
    receiver: mpsc::UnboundedReceiver<IdentityEvent>,
    on_unsubscribe: Option<UnsubscribeFn>,
}

impl IdentitySubscription {
    /// Wrap a receiver together with the hook that detaches it from the store.
    pub fn new(
        receiver: mpsc::UnboundedReceiver<IdentityEvent>,
        on_unsubscribe: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            receiver,
            on_unsubscribe: Some(Box::new(on_unsubscribe)),
        }
    }

    /// Wrap a receiver whose sender side needs no explicit detaching.
    pub fn detached(receiver: mpsc::UnboundedReceiver<IdentityEvent>) -> Self {
        Self {
            receiver,
            on_unsubscribe: None,
        }
    }

    /// Wait for the next event. Returns `None` once the store side is gone.
    pub async fn recv(&mut self) -> Option<IdentityEvent> {
        self.receiver.recv().await
    }

    /// Take an already-delivered event without waiting.
    pub fn try_recv(&mut self) -> Option<IdentityEvent> {
        self.receiver.try_recv().ok()
    }

    /// Stop receiving events.
    pub fn unsubscribe(mut self) {
        self.detach();
    }

    fn detach(&mut self) {
        self.receiver.close();
        if let Some(hook) = self.on_unsubscribe.take() {
            hook();
        }
    }
}

impl Drop for IdentitySubscription {
    fn drop(&mut self) {
        self.detach();
    }
}

impl std::fmt::Debug for IdentitySubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentitySubscription")
            .field("attached", &self.on_unsubscribe.is_some())
            .finish()
    }
}
