use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tankmon_common::types::Notification;
use tokio::sync::mpsc;

struct Subscriber {
    id: u64,
    tx: mpsc::UnboundedSender<Notification>,
}

/// Handle returned by [`NotificationHub::subscribe`]. Holds the receiving
/// end of the subscriber's channel; the `id` is the token for
/// [`NotificationHub::unsubscribe`].
pub struct Subscription {
    id: u64,
    rx: mpsc::UnboundedReceiver<Notification>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub async fn recv(&mut self) -> Option<Notification> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<Notification> {
        self.rx.try_recv().ok()
    }

    /// Split into (id, receiver) so a transport can own the stream while
    /// keeping the unsubscribe token.
    pub fn into_parts(self) -> (u64, mpsc::UnboundedReceiver<Notification>) {
        (self.id, self.rx)
    }
}

/// Process-wide fan-out registry for fired notifications.
///
/// Constructed explicitly and shared by reference between the evaluation
/// engine (publisher) and the streaming transport (subscribers); there is no
/// global instance. Delivery is synchronous, in registration order, and a
/// broken subscriber never blocks the rest: a send onto a closed channel
/// drops that subscriber and delivery continues.
pub struct NotificationHub {
    subscribers: Mutex<Vec<Subscriber>>,
    next_id: AtomicU64,
}

impl NotificationHub {
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a new live receiver.
    pub fn subscribe(&self) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock().push(Subscriber { id, tx });
        tracing::debug!(subscriber_id = id, "Subscriber registered");
        Subscription { id, rx }
    }

    /// Remove a subscriber. Returns true if it was still registered.
    pub fn unsubscribe(&self, id: u64) -> bool {
        let mut subs = self.lock();
        let before = subs.len();
        subs.retain(|s| s.id != id);
        subs.len() < before
    }

    /// Deliver one notification to every registered subscriber, in
    /// registration order. Subscribers whose channel has closed are pruned.
    /// Returns the number of successful deliveries.
    pub fn publish(&self, notification: &Notification) -> usize {
        let mut delivered = 0;
        self.lock().retain(|sub| {
            if sub.tx.send(notification.clone()).is_ok() {
                delivered += 1;
                true
            } else {
                tracing::debug!(subscriber_id = sub.id, "Pruning closed subscriber");
                false
            }
        });
        delivered
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Subscriber>> {
        self.subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for NotificationHub {
    fn default() -> Self {
        Self::new()
    }
}
