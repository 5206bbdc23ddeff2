use std::{fmt, sync::Arc};

use parking_lot::Mutex;
use serde_json::Value;
use slotmap::{SlotMap, new_key_type};
use tracing::{debug, trace, warn};

use crate::{Payload, Topic};

new_key_type! {
    /// Opaque recipient handle minted by [`EventBus::register`].
    pub struct SubscriberId;
}

/// Value returned by a handler. `None` means "nothing to report".
pub type Reply = Option<Value>;

/// Topic or addressed handler.
pub type Handler = Arc<dyn Fn(&Payload) -> Reply + Send + Sync>;

/// Broadcast handler, invoked for every [`EventBus::broadcast`].
pub type BroadcastHandler = Arc<dyn Fn(&Payload) + Send + Sync>;

/// One `(recipient, topic, handler)` record.
struct Subscription {
    /// Registration sequence; orders invocation and identifies one-shot removal.
    seq: u64,
    /// Owning recipient.
    recipient: SubscriberId,
    /// Subscribed topic.
    topic: Topic,
    /// Callback.
    handler: Handler,
    /// Remove after the first invocation.
    once: bool,
}

/// Mutable bus state behind the lock.
#[derive(Default)]
struct Inner {
    /// Registered recipients and their labels.
    recipients: SlotMap<SubscriberId, String>,
    /// Topic subscriptions in registration order.
    subscriptions: Vec<Subscription>,
    /// Broadcast-only registrations in registration order.
    broadcast: Vec<(SubscriberId, BroadcastHandler)>,
    /// Next subscription sequence number.
    next_seq: u64,
}

impl Inner {
    /// Snapshot matching handlers and drop one-shot ones from the table.
    fn take_matching<F>(&mut self, mut pred: F) -> Vec<Handler>
    where
        F: FnMut(&Subscription) -> bool,
    {
        let mut out = Vec::new();
        let mut spent = Vec::new();
        for sub in self.subscriptions.iter().filter(|s| pred(s)) {
            out.push(sub.handler.clone());
            if sub.once {
                spent.push(sub.seq);
            }
        }
        if !spent.is_empty() {
            self.subscriptions.retain(|s| !spent.contains(&s.seq));
        }
        out
    }
}

/// Process-wide publish/subscribe router.
///
/// Cloning yields another handle onto the same bus. Handlers are snapshotted
/// before invocation, so a handler may itself publish, subscribe or
/// unsubscribe without deadlocking.
#[derive(Clone, Default)]
pub struct EventBus {
    /// Shared state.
    inner: Arc<Mutex<Inner>>,
}

impl EventBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint a recipient handle. `label` is used in logs only.
    pub fn register(&self, label: impl Into<String>) -> SubscriberId {
        let label = label.into();
        trace!(recipient = %label, "register subscriber");
        self.inner.lock().recipients.insert(label)
    }

    /// Label a recipient was registered with.
    pub fn label(&self, recipient: SubscriberId) -> Option<String> {
        self.inner.lock().recipients.get(recipient).cloned()
    }

    /// Remove a recipient and every subscription it holds.
    pub fn deregister(&self, recipient: SubscriberId) {
        let mut inner = self.inner.lock();
        inner.subscriptions.retain(|s| s.recipient != recipient);
        inner.broadcast.retain(|(r, _)| *r != recipient);
        if let Some(label) = inner.recipients.remove(recipient) {
            trace!(recipient = %label, "deregister subscriber");
        }
    }

    /// Subscribe `handler` to `topic` on behalf of `recipient`.
    ///
    /// Multiple handlers per `(recipient, topic)` run in registration order.
    pub fn subscribe<F>(&self, recipient: SubscriberId, topic: Topic, handler: F)
    where
        F: Fn(&Payload) -> Reply + Send + Sync + 'static,
    {
        self.insert(recipient, topic, Arc::new(handler), false);
    }

    /// Like [`subscribe`](Self::subscribe), but the subscription is removed
    /// after its first invocation.
    pub fn subscribe_once<F>(&self, recipient: SubscriberId, topic: Topic, handler: F)
    where
        F: Fn(&Payload) -> Reply + Send + Sync + 'static,
    {
        self.insert(recipient, topic, Arc::new(handler), true);
    }

    /// Subscribe an already shared handler.
    pub fn subscribe_handler(&self, recipient: SubscriberId, topic: Topic, handler: Handler, once: bool) {
        self.insert(recipient, topic, handler, once);
    }

    /// Store one subscription record.
    fn insert(&self, recipient: SubscriberId, topic: Topic, handler: Handler, once: bool) {
        let mut inner = self.inner.lock();
        if !inner.recipients.contains_key(recipient) {
            warn!(topic = %topic, "subscribe from unregistered recipient");
        }
        let seq = inner.next_seq;
        inner.next_seq += 1;
        trace!(topic = %topic, once, "subscribe");
        inner.subscriptions.push(Subscription {
            seq,
            recipient,
            topic,
            handler,
            once,
        });
    }

    /// Register a broadcast-only handler, independent of topic.
    pub fn subscribe_broadcast<F>(&self, recipient: SubscriberId, handler: F)
    where
        F: Fn(&Payload) + Send + Sync + 'static,
    {
        self.inner.lock().broadcast.push((recipient, Arc::new(handler)));
    }

    /// Remove every subscription of `recipient` to `topic`. No-op if none match.
    pub fn unsubscribe(&self, recipient: SubscriberId, topic: &Topic) {
        let mut inner = self.inner.lock();
        let before = inner.subscriptions.len();
        inner
            .subscriptions
            .retain(|s| !(s.recipient == recipient && &s.topic == topic));
        let removed = before - inner.subscriptions.len();
        if removed > 0 {
            trace!(topic = %topic, removed, "unsubscribe");
        }
    }

    /// Invoke every handler subscribed to `topic`, regardless of recipient.
    ///
    /// Returns whether any handler existed. Publishing to a topic nobody
    /// listens on is logged and otherwise ignored.
    pub fn publish(&self, topic: &Topic, payload: &Payload) -> bool {
        let handlers = self.inner.lock().take_matching(|s| &s.topic == topic);
        if handlers.is_empty() {
            debug!(topic = %topic, "publish: no subscribers");
            return false;
        }
        trace!(topic = %topic, handlers = handlers.len(), ?payload, "publish");
        for h in handlers {
            let _reply = h(payload);
        }
        true
    }

    /// Invoke only the handlers `recipient` subscribed to `topic`.
    ///
    /// Every matching handler runs in registration order; the first one's
    /// reply is returned. `None` when nothing matched.
    pub fn send_event(&self, recipient: SubscriberId, topic: &Topic, payload: &Payload) -> Reply {
        let handlers = self
            .inner
            .lock()
            .take_matching(|s| s.recipient == recipient && &s.topic == topic);
        if handlers.is_empty() {
            debug!(topic = %topic, "send_event: no handler for recipient");
            return None;
        }
        let mut first = None;
        for (i, h) in handlers.into_iter().enumerate() {
            let reply = h(payload);
            if i == 0 {
                first = Some(reply);
            }
        }
        first.flatten()
    }

    /// Invoke every broadcast handler.
    pub fn broadcast(&self, payload: &Payload) {
        let handlers: Vec<BroadcastHandler> = self
            .inner
            .lock()
            .broadcast
            .iter()
            .map(|(_, h)| h.clone())
            .collect();
        trace!(handlers = handlers.len(), "broadcast");
        for h in handlers {
            h(payload);
        }
    }

    /// Whether `recipient` holds at least one subscription to `topic`.
    pub fn is_subscribed(&self, recipient: SubscriberId, topic: &Topic) -> bool {
        self.inner
            .lock()
            .subscriptions
            .iter()
            .any(|s| s.recipient == recipient && &s.topic == topic)
    }

    /// Number of topic subscriptions across all recipients.
    pub fn subscription_count(&self) -> usize {
        self.inner.lock().subscriptions.len()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("EventBus")
            .field("recipients", &inner.recipients.len())
            .field("subscriptions", &inner.subscriptions.len())
            .field("broadcast", &inner.broadcast.len())
            .finish()
    }
}
