//! Per-topic broadcast stream
//!
//! Every registered topic owns one `BroadcastStream`. Each attached
//! subscriber gets its own bounded queue; `publish` offers the event to every
//! queue with `try_send` so a slow consumer drops locally instead of stalling
//! the publisher or the other subscribers.
//!
//! Overflow policy: drop-newest. When a subscriber's queue is full the event
//! being published is discarded for that subscriber only and counted in
//! [`BroadcastStream::dropped_events`]; the subscriber stays attached and will
//! receive later events once it catches up.
//!
//! `publish` and `detach` serialize on the same mutex, so once `detach`
//! returns no later publish can reach the removed queue.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::{TryRecvError, TrySendError};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::broker::message::Event;
use crate::utils::RelayError;

pub type SubscriberId = Uuid;

#[derive(Debug)]
pub struct BroadcastStream {
    topic: Arc<str>,
    buffer: usize,
    subscribers: Mutex<HashMap<SubscriberId, mpsc::Sender<Event>>>,
    dropped: AtomicU64,
}

impl BroadcastStream {
    /// Creates a stream whose subscriber queues hold at most `buffer` events.
    /// A zero buffer is bumped to one, since tokio channels need capacity.
    pub fn new(topic: &str, buffer: usize) -> Self {
        Self {
            topic: Arc::from(topic),
            buffer: buffer.max(1),
            subscribers: Mutex::new(HashMap::new()),
            dropped: AtomicU64::new(0),
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Registers a new subscriber and returns its handle.
    pub fn attach(self: &Arc<Self>) -> Subscription {
        let (tx, rx) = mpsc::channel(self.buffer);
        let id = Uuid::new_v4();
        self.lock_subscribers().insert(id, tx);
        debug!(topic = %self.topic, subscriber = %id, "subscriber attached");

        Subscription {
            id,
            topic: self.topic.clone(),
            receiver: rx,
            stream: Arc::downgrade(self),
            detached: false,
        }
    }

    /// Removes a subscriber. Returns `false` if it was already gone.
    pub fn detach(&self, id: SubscriberId) -> bool {
        let removed = self.lock_subscribers().remove(&id).is_some();
        if removed {
            debug!(topic = %self.topic, subscriber = %id, "subscriber detached");
        }
        removed
    }

    /// Offers `event` to every attached subscriber and returns how many
    /// queues accepted it. Never waits on a subscriber.
    pub fn publish(&self, event: &Event) -> usize {
        let mut subscribers = self.lock_subscribers();
        let mut delivered = 0;

        subscribers.retain(|id, sender| match sender.try_send(event.clone()) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                let err = RelayError::SlowConsumer {
                    topic: self.topic.to_string(),
                    subscriber: *id,
                };
                warn!(error = %err, "dropping event for full subscriber queue");
                true
            }
            Err(TrySendError::Closed(_)) => {
                debug!(topic = %self.topic, subscriber = %id, "pruning closed subscriber");
                false
            }
        });

        delivered
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock_subscribers().len()
    }

    /// Total events dropped on this topic because a subscriber queue was full.
    pub fn dropped_events(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn lock_subscribers(&self) -> MutexGuard<'_, HashMap<SubscriberId, mpsc::Sender<Event>>> {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Handle returned by `attach`: the receiving side of one subscriber queue.
///
/// Dropping the handle detaches it. Events already queued before the detach
/// can still be drained with `recv`, which then returns `None`.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriberId,
    topic: Arc<str>,
    receiver: mpsc::Receiver<Event>,
    stream: Weak<BroadcastStream>,
    detached: bool,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub async fn recv(&mut self) -> Option<Event> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Result<Event, TryRecvError> {
        self.receiver.try_recv()
    }

    /// Unregisters from the stream. Safe to call more than once.
    pub fn detach(&mut self) {
        if self.detached {
            return;
        }
        self.detached = true;
        if let Some(stream) = self.stream.upgrade() {
            stream.detach(self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.detach();
    }
}
